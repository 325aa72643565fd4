use anyhow::{Context, anyhow};
use skycap_enc_ffmpeg::{MP4File, Mpeg4Encoder, Mpeg4EncoderBuilder};
use skycap_media_info::{FourCC, VideoFrame, VideoInfo};
use std::path::{Path, PathBuf};
use tracing::*;

use super::VideoSink;

#[derive(Clone, Copy, Debug)]
pub struct Mp4SinkConfig {
    pub fourcc: FourCC,
    pub bpp: f32,
}

impl Default for Mp4SinkConfig {
    fn default() -> Self {
        Self {
            fourcc: FourCC::MP4V,
            bpp: Mpeg4EncoderBuilder::QUALITY_BPP,
        }
    }
}

/// MPEG-4 Part 2 in an mp4 container.
pub struct Mp4Sink {
    file: MP4File,
}

impl Mp4Sink {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl VideoSink for Mp4Sink {
    type Config = Mp4SinkConfig;

    fn open(config: Self::Config, path: &Path, video_info: VideoInfo) -> anyhow::Result<Self> {
        ffmpeg::init().context("ffmpeg init")?;

        let file = MP4File::init("mp4-sink", PathBuf::from(path), |output| {
            Mpeg4Encoder::builder(video_info)
                .with_bpp(config.bpp)
                .with_fourcc(config.fourcc)
                .build(output)
        })
        .with_context(|| format!("Creating '{}'", path.display()))?;

        Ok(Self { file })
    }

    fn append(&mut self, frame: &VideoFrame) -> anyhow::Result<()> {
        if self.file.is_finished() {
            return Err(anyhow!("'{}' is already closed", self.file.path().display()));
        }

        self.file.queue_video_frame(frame)?;

        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.file.frames_written()
    }

    fn close(&mut self) -> anyhow::Result<()> {
        let result = self.file.finish()?;

        info!(
            "Wrote {} frames to '{}'",
            result.frames_written,
            self.file.path().display()
        );

        result.video_finish.context("video encoder flush")?;

        Ok(())
    }
}
