use skycap_media_info::{VideoFrame, VideoInfo};
use std::path::Path;

/// A persistent destination whose geometry is fixed when it is opened.
pub trait VideoSink: Sized {
    type Config;

    /// Creates the output at `path`. The parent directory must already exist.
    fn open(config: Self::Config, path: &Path, video_info: VideoInfo) -> anyhow::Result<Self>;

    /// Appends a copy of `frame`. Frames that don't match the declared
    /// geometry are rejected.
    fn append(&mut self, frame: &VideoFrame) -> anyhow::Result<()>;

    fn frames_written(&self) -> u64;

    /// Flushes and closes the output.
    fn close(&mut self) -> anyhow::Result<()>;
}
