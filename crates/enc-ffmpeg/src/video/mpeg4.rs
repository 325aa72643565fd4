use ffmpeg::{
    Dictionary,
    codec::{self, context, encoder},
    format::{self, Pixel},
    frame,
    software::scaling,
    threading::Config,
};
use skycap_frame_ffmpeg::{RawVideoFormatExt, VideoFrameExt};
use skycap_media_info::{FourCC, VideoFrame, VideoInfo, ensure_even};
use tracing::{debug, error};

use crate::base::EncoderBase;

/// MPEG-4 Part 2 encoder, tagged `mp4v` by default.
pub struct Mpeg4EncoderBuilder {
    bpp: f32,
    input_config: VideoInfo,
    fourcc: FourCC,
}

#[derive(thiserror::Error, Debug)]
pub enum Mpeg4EncoderError {
    #[error("{0:?}")]
    FFmpeg(#[from] ffmpeg::Error),
    #[error("Codec not found")]
    CodecNotFound,
    #[error("Pixel format {0:?} not supported")]
    PixFmtNotSupported(Pixel),
    #[error("Invalid frame rate {0}")]
    InvalidFrameRate(u32),
}

#[derive(thiserror::Error, Debug)]
pub enum QueueFrameError {
    #[error("Frame {width}x{height} {format:?} does not match stream {expected}")]
    GeometryMismatch {
        width: u32,
        height: u32,
        format: skycap_media_info::RawVideoFormat,
        expected: VideoInfo,
    },
    #[error("Converter/{0}")]
    Converter(ffmpeg::Error),
    #[error("Encode/{0}")]
    Encode(ffmpeg::Error),
}

impl Mpeg4EncoderBuilder {
    pub const QUALITY_BPP: f32 = 0.3;

    pub fn new(input_config: VideoInfo) -> Self {
        Self {
            input_config,
            bpp: Self::QUALITY_BPP,
            fourcc: FourCC::MP4V,
        }
    }

    pub fn with_bpp(mut self, bpp: f32) -> Self {
        self.bpp = bpp;
        self
    }

    pub fn with_fourcc(mut self, fourcc: FourCC) -> Self {
        self.fourcc = fourcc;
        self
    }

    pub fn build(
        self,
        output: &mut format::context::Output,
    ) -> Result<Mpeg4Encoder, Mpeg4EncoderError> {
        let input_config = &self.input_config;

        if input_config.frame_rate == 0 {
            return Err(Mpeg4EncoderError::InvalidFrameRate(input_config.frame_rate));
        }

        let codec = encoder::find(codec::Id::MPEG4).ok_or(Mpeg4EncoderError::CodecNotFound)?;

        let input_format = input_config.pixel_format.as_ffmpeg();
        let output_format = Pixel::YUV420P;
        let output_width = ensure_even(input_config.width);
        let output_height = ensure_even(input_config.height);

        let converter = if input_format != output_format
            || output_width != input_config.width
            || output_height != input_config.height
        {
            debug!(
                "Converting from {:?} {}x{} to {:?} {}x{} for MPEG-4 encoding",
                input_format,
                input_config.width,
                input_config.height,
                output_format,
                output_width,
                output_height
            );
            Some(
                scaling::Context::get(
                    input_format,
                    input_config.width,
                    input_config.height,
                    output_format,
                    output_width,
                    output_height,
                    scaling::Flags::BILINEAR,
                )
                .map_err(|e| {
                    error!(
                        "Failed to create converter from {:?} to {:?}: {:?}",
                        input_format, output_format, e
                    );
                    Mpeg4EncoderError::PixFmtNotSupported(input_format)
                })?,
            )
        } else {
            None
        };

        let mut encoder_ctx = context::Context::new_with_codec(codec);

        encoder_ctx.set_threading(Config::count(4));
        let mut encoder = encoder_ctx.encoder().video()?;

        let frame_rate = ffmpeg::Rational(input_config.frame_rate as i32, 1);

        encoder.set_width(output_width);
        encoder.set_height(output_height);
        encoder.set_format(output_format);
        encoder.set_time_base(frame_rate.invert());
        encoder.set_frame_rate(Some(frame_rate));
        encoder.set_gop(input_config.frame_rate * 2);

        if output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER)
        {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        unsafe {
            (*encoder.as_mut_ptr()).codec_tag = self.fourcc.as_u32();
        }

        let bitrate = get_bitrate(
            output_width,
            output_height,
            input_config.frame_rate as f32,
            self.bpp,
        );

        encoder.set_bit_rate(bitrate);

        let encoder = encoder.open_with(Dictionary::new())?;

        let mut output_stream = output.add_stream(codec)?;
        let stream_index = output_stream.index();
        output_stream.set_time_base(frame_rate.invert());
        output_stream.set_rate(frame_rate);
        output_stream.set_parameters(&encoder);

        unsafe {
            (*(*output_stream.as_mut_ptr()).codecpar).codec_tag = self.fourcc.as_u32();
        }

        Ok(Mpeg4Encoder {
            base: EncoderBase::new(stream_index),
            encoder,
            config: self.input_config,
            fourcc: self.fourcc,
            converter,
        })
    }
}

pub struct Mpeg4Encoder {
    base: EncoderBase,
    encoder: encoder::Video,
    config: VideoInfo,
    fourcc: FourCC,
    converter: Option<scaling::Context>,
}

impl Mpeg4Encoder {
    pub fn builder(input_config: VideoInfo) -> Mpeg4EncoderBuilder {
        Mpeg4EncoderBuilder::new(input_config)
    }

    pub fn config(&self) -> &VideoInfo {
        &self.config
    }

    pub fn fourcc(&self) -> FourCC {
        self.fourcc
    }

    pub fn frames_sent(&self) -> u64 {
        self.base.frames_sent()
    }

    pub fn queue_frame(
        &mut self,
        frame: &VideoFrame,
        output: &mut format::context::Output,
    ) -> Result<(), QueueFrameError> {
        if !self.config.accepts(frame) {
            return Err(QueueFrameError::GeometryMismatch {
                width: frame.width(),
                height: frame.height(),
                format: frame.format(),
                expected: self.config,
            });
        }

        let frame = frame.as_ffmpeg();

        let mut frame = if let Some(converter) = &mut self.converter {
            let mut new_frame = frame::Video::empty();
            converter
                .run(&frame, &mut new_frame)
                .map_err(QueueFrameError::Converter)?;
            new_frame
        } else {
            frame
        };

        self.base.update_pts(&mut frame);

        self.base
            .send_frame(&frame, output, &mut self.encoder)
            .map_err(QueueFrameError::Encode)
    }

    pub fn flush(&mut self, output: &mut format::context::Output) -> Result<(), ffmpeg::Error> {
        self.base.process_eof(output, &mut self.encoder)
    }
}

unsafe impl Send for Mpeg4Encoder {}

fn get_bitrate(width: u32, height: u32, frame_rate: f32, bpp: f32) -> usize {
    // higher frame rates don't really need double the bitrate
    let frame_rate_multiplier = (frame_rate - 30.0).max(0.0) * 0.6 + 30.0;
    let pixels_per_second = (width * height) as f32 * frame_rate_multiplier;

    (pixels_per_second * bpp) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_scales_with_area() {
        let vga = get_bitrate(640, 480, 30.0, Mpeg4EncoderBuilder::QUALITY_BPP);
        let hd = get_bitrate(1280, 720, 30.0, Mpeg4EncoderBuilder::QUALITY_BPP);

        assert_eq!(vga, (640.0 * 480.0 * 30.0 * 0.3) as usize);
        assert!(hd > vga * 2);
    }

    #[test]
    fn high_frame_rates_are_discounted() {
        let at_30 = get_bitrate(640, 480, 30.0, 0.3);
        let at_60 = get_bitrate(640, 480, 60.0, 0.3);

        assert!(at_60 > at_30);
        assert!(at_60 < at_30 * 2);
    }
}
