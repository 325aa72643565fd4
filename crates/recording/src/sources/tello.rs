use anyhow::anyhow;
use skycap_media_info::{VideoFrame, VideoInfo};
use skycap_tello::{TelloConfig, TelloVideoStream};
use tracing::debug;

use super::VideoSource;

/// The drone's video feed. The command channel (connect, `streamon`,
/// reboot) is driven by the caller around the recording.
pub struct TelloSource {
    stream: Option<TelloVideoStream>,
    info: VideoInfo,
    current: Option<VideoFrame>,
}

impl VideoSource for TelloSource {
    type Config = TelloConfig;

    fn open(config: Self::Config) -> anyhow::Result<Self> {
        let stream = TelloVideoStream::open(&config)?;
        let info = stream.video_info();

        Ok(Self {
            stream: Some(stream),
            info,
            current: None,
        })
    }

    fn video_info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> anyhow::Result<&VideoFrame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow!("Tello video feed is closed"))?;
        let frame = stream.next_frame()?;

        Ok(self.current.insert(frame))
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.current = None;

        if self.stream.take().is_some() {
            debug!("Closed Tello video feed");
        }

        Ok(())
    }
}
