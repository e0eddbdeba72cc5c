mod buffers;
mod compositor;
mod linked;
mod renderer;
mod sampler;
mod software;
#[cfg(test)]
mod testing;

pub use buffers::{ColorBuffer, DepthBuffer, PixelChannel, ViewportSize};
pub use compositor::{CompositeReport, DepthCompositor};
pub use linked::{
    CameraSyncController, ChannelEditor, IsovalueMarker, Readout, SelectionBridge, SyncState,
    TransferFunctionController, DEFAULT_NUM_BINS, DEFAULT_UNCERTAINTY_FILTER,
};
pub use renderer::{Renderer, VolumeChannel};
pub use sampler::{DirectionalSampler, SampleError, SamplerSettings};
pub use software::{software_compositor, RenderMode, SoftwareRenderer};
