use std::fmt::{self, Display};

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
};
use skycap_media_info::{FrameError, RawVideoFormat, VideoFrame, VideoInfo};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CameraInfo {
    index: String,
    display_name: String,
    description: String,
}

impl CameraInfo {
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.index, self.display_name)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Failed to query cameras: {0}")]
pub struct ListCamerasError(#[from] nokhwa::NokhwaError);

pub fn list_cameras() -> Result<Vec<CameraInfo>, ListCamerasError> {
    Ok(nokhwa::query(ApiBackend::Auto)?
        .into_iter()
        .map(|info| CameraInfo {
            index: info.index().to_string(),
            display_name: info.human_name(),
            description: info.description().to_string(),
        })
        .collect())
}

#[derive(thiserror::Error, Debug)]
pub enum OpenError {
    #[error("Error opening camera channel {channel}. Please check if an external camera is connected: {source}")]
    DeviceUnavailable {
        channel: u32,
        #[source]
        source: nokhwa::NokhwaError,
    },
    #[error("OpenStream/{0}")]
    OpenStream(nokhwa::NokhwaError),
}

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("Stream is closed")]
    Closed,
    #[error("Frame/{0}")]
    Frame(nokhwa::NokhwaError),
    #[error("Decode/{0}")]
    Decode(nokhwa::NokhwaError),
    #[error("{0}")]
    InvalidFrame(#[from] FrameError),
}

/// An open webcam delivering RGB24 frames.
pub struct CameraStream {
    channel: u32,
    camera: Camera,
    info: VideoInfo,
    is_open: bool,
}

impl CameraStream {
    pub fn open(channel: u32) -> Result<Self, OpenError> {
        nokhwa::nokhwa_initialize(move |granted| {
            debug!("Camera access granted: {granted}");
        });

        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(channel), format)
            .map_err(|source| OpenError::DeviceUnavailable { channel, source })?;

        camera.open_stream().map_err(OpenError::OpenStream)?;

        let resolution = camera.resolution();
        let info = VideoInfo::from_raw(
            RawVideoFormat::Rgb24,
            resolution.width(),
            resolution.height(),
            camera.frame_rate(),
        )
        .with_fallback_fps();

        info!("Opened camera channel {channel}: {info}");

        Ok(Self {
            channel,
            camera,
            info,
            is_open: true,
        })
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn video_info(&self) -> VideoInfo {
        self.info
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Blocks until the device delivers the next frame.
    pub fn capture_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        if !self.is_open {
            return Err(CaptureError::Closed);
        }

        let buffer = self.camera.frame().map_err(CaptureError::Frame)?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(CaptureError::Decode)?;

        let (width, height) = (image.width(), image.height());

        Ok(VideoFrame::new(
            RawVideoFormat::Rgb24,
            width,
            height,
            image.into_raw(),
        )?)
    }

    pub fn stop_capturing(&mut self) -> Result<(), nokhwa::NokhwaError> {
        if !self.is_open {
            return Ok(());
        }

        self.is_open = false;
        self.camera.stop_stream()
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        let _ = self.stop_capturing();
    }
}
