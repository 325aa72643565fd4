use skycap_camera::CameraStream;
use skycap_media_info::{VideoFrame, VideoInfo};
use tracing::debug;

use super::VideoSource;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebcamSourceConfig {
    pub channel: u32,
}

pub struct WebcamSource {
    stream: CameraStream,
    current: Option<VideoFrame>,
}

impl WebcamSource {
    pub fn channel(&self) -> u32 {
        self.stream.channel()
    }
}

impl VideoSource for WebcamSource {
    type Config = WebcamSourceConfig;

    fn open(config: Self::Config) -> anyhow::Result<Self> {
        let stream = CameraStream::open(config.channel)?;

        Ok(Self {
            stream,
            current: None,
        })
    }

    fn video_info(&self) -> VideoInfo {
        self.stream.video_info()
    }

    fn next_frame(&mut self) -> anyhow::Result<&VideoFrame> {
        let frame = self.stream.capture_frame()?;

        Ok(self.current.insert(frame))
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.current = None;
        self.stream.stop_capturing()?;

        debug!("Released camera channel {}", self.stream.channel());

        Ok(())
    }
}
