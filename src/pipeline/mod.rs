#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod canvas;
pub mod detector;
pub mod render_loop;
pub mod rgba_converter;
pub mod session;
pub mod skeleton;
pub mod source;

// Re-exports for convenience
pub use canvas::{Canvas, Surface};
pub use detector::{MoveNet, MoveNetLoader, PoseDetector, SupportedModel, adjacent_pairs};
pub use render_loop::{FrameSummary, LoopStats, RenderLoop, RenderOptions, render_frame};
pub use session::{PoseSession, StartupEvent};
pub use skeleton::{OverlayMode, OverlayStyle};
pub use source::{ChannelSource, FrameSource, FrameWait};
