pub mod axes;
pub mod core;
pub mod cube;
pub mod depth;
pub mod gui;
pub mod pipeline;

pub use self::core::{FrameStatus, Renderer};
