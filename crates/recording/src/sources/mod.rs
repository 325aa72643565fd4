#[cfg(feature = "webcam")]
mod webcam;
#[cfg(feature = "webcam")]
pub use webcam::*;

#[cfg(feature = "tello")]
mod tello;
#[cfg(feature = "tello")]
pub use tello::*;

use skycap_media_info::{VideoFrame, VideoInfo};

/// A live, frame-producing device.
///
/// Frames are produced one at a time into a slot owned by the source. The
/// returned reference is valid until the next call to [`next_frame`](Self::next_frame).
pub trait VideoSource: Sized {
    type Config;

    fn open(config: Self::Config) -> anyhow::Result<Self>;

    /// Geometry and nominal rate, fixed once the source is open.
    fn video_info(&self) -> VideoInfo;

    /// Blocks until the next frame is available. Failure is terminal.
    fn next_frame(&mut self) -> anyhow::Result<&VideoFrame>;

    fn close(&mut self) -> anyhow::Result<()>;
}
