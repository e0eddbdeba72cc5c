//! Controllers that tie the 2-D plots to the 3-D views.

mod camera_sync;
mod selection_bridge;
mod transfer;

pub use camera_sync::{CameraSyncController, Readout, SyncState};
pub use selection_bridge::SelectionBridge;
pub use transfer::{
    ChannelEditor, IsovalueMarker, TransferFunctionController, DEFAULT_NUM_BINS,
    DEFAULT_UNCERTAINTY_FILTER,
};
