use ffmpeg::{
    Dictionary, codec as avcodec,
    format::{self as avformat, Pixel},
    frame as avframe,
    software::scaling,
    util::error::EAGAIN,
};
use skycap_frame_ffmpeg::{FromFFmpegError, from_ffmpeg};
use skycap_media_info::{RawVideoFormat, VideoFrame, VideoInfo};
use tracing::{debug, info};

use crate::TelloConfig;

#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    #[error("Open '{url}'/{source}")]
    Open {
        url: String,
        #[source]
        source: ffmpeg::Error,
    },
    #[error("No video stream")]
    NoVideoStream,
    #[error("Decoder/{0}")]
    Decoder(ffmpeg::Error),
    #[error("Decode/{0}")]
    Decode(ffmpeg::Error),
    #[error("Scale/{0}")]
    Scale(ffmpeg::Error),
    #[error("Video feed ended")]
    EndOfStream,
    #[error("{0}")]
    Frame(#[from] FromFFmpegError),
}

/// Decoded Tello video feed, converted to RGB24.
pub struct TelloVideoStream {
    input: avformat::context::Input,
    decoder: avcodec::decoder::Video,
    stream_index: usize,
    scaler: Option<scaling::Context>,
    pending: Option<VideoFrame>,
    info: VideoInfo,
}

impl TelloVideoStream {
    /// Opens the feed and blocks until the first picture decodes, which fixes the geometry.
    pub fn open(config: &TelloConfig) -> Result<Self, VideoError> {
        let mut options = Dictionary::new();
        options.set("timeout", &config.video_timeout.as_micros().to_string());
        options.set("fifo_size", "5000000");
        options.set("overrun_nonfatal", "1");

        let input = avformat::input_with_dictionary(&config.video_url, options).map_err(
            |source| VideoError::Open {
                url: config.video_url.clone(),
                source,
            },
        )?;

        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(VideoError::NoVideoStream)?;
        let stream_index = input_stream.index();

        let mut decoder = avcodec::Context::from_parameters(input_stream.parameters())
            .map_err(VideoError::Decoder)?
            .decoder()
            .video()
            .map_err(VideoError::Decoder)?;
        decoder.set_time_base(input_stream.time_base());

        let mut stream = Self {
            input,
            decoder,
            stream_index,
            scaler: None,
            pending: None,
            info: VideoInfo::from_raw(RawVideoFormat::Rgb24, 0, 0, config.frame_rate),
        };

        let first = stream.decode_next()?;
        stream.info = VideoInfo::from_raw(
            RawVideoFormat::Rgb24,
            first.width(),
            first.height(),
            config.frame_rate,
        )
        .with_fallback_fps();
        stream.pending = Some(first);

        info!("Opened Tello video feed '{}': {}", config.video_url, stream.info);

        Ok(stream)
    }

    pub fn video_info(&self) -> VideoInfo {
        self.info
    }

    pub fn next_frame(&mut self) -> Result<VideoFrame, VideoError> {
        if let Some(frame) = self.pending.take() {
            return Ok(frame);
        }

        self.decode_next()
    }

    fn decode_next(&mut self) -> Result<VideoFrame, VideoError> {
        let mut decoded = avframe::Video::empty();

        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return self.convert(&decoded),
                Err(ffmpeg::Error::Eof) => return Err(VideoError::EndOfStream),
                Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => {}
                Err(e) => return Err(VideoError::Decode(e)),
            }

            let Some((stream, packet)) = self.input.packets().next() else {
                return Err(VideoError::EndOfStream);
            };

            if stream.index() != self.stream_index {
                continue;
            }

            match self.decoder.send_packet(&packet) {
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => return Err(VideoError::EndOfStream),
                Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => {}
                // corrupt NAL units are common on the wifi link; skip them
                Err(ffmpeg::Error::InvalidData) => {
                    debug!("Dropping undecodable packet");
                }
                Err(e) => return Err(VideoError::Decode(e)),
            }
        }
    }

    fn convert(&mut self, decoded: &avframe::Video) -> Result<VideoFrame, VideoError> {
        if decoded.format() == Pixel::RGB24 {
            return Ok(from_ffmpeg(decoded)?);
        }

        let mut scaler = match self.scaler.take() {
            Some(scaler)
                if scaler.input().width == decoded.width()
                    && scaler.input().height == decoded.height()
                    && scaler.input().format == decoded.format() =>
            {
                scaler
            }
            _ => scaling::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                Pixel::RGB24,
                decoded.width(),
                decoded.height(),
                scaling::Flags::BILINEAR,
            )
            .map_err(VideoError::Scale)?,
        };

        let mut rgb = avframe::Video::empty();
        let result = scaler.run(decoded, &mut rgb).map_err(VideoError::Scale);
        self.scaler = Some(scaler);
        result?;

        Ok(from_ffmpeg(&rgb)?)
    }
}

unsafe impl Send for TelloVideoStream {}
