mod bounds;
mod camera;

pub use bounds::{Bounds, ClipPlane};
pub use camera::{
    Camera, CameraPose, ViewUpChoice, DEFAULT_VIEW_ANGLE, VIEW_UP_ALIGNMENT_THRESHOLD,
};
