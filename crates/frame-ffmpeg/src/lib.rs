use ffmpeg::{format::Pixel, frame::Video as FFVideo};
use skycap_media_info::{FrameError, RawVideoFormat, VideoFrame};

pub trait RawVideoFormatExt {
    fn as_ffmpeg(&self) -> Pixel;
}

impl RawVideoFormatExt for RawVideoFormat {
    fn as_ffmpeg(&self) -> Pixel {
        match self {
            RawVideoFormat::Rgb24 => Pixel::RGB24,
            RawVideoFormat::Bgr24 => Pixel::BGR24,
            RawVideoFormat::Yuv420p => Pixel::YUV420P,
        }
    }
}

pub fn raw_format_for(pixel: Pixel) -> Option<RawVideoFormat> {
    Some(match pixel {
        Pixel::RGB24 => RawVideoFormat::Rgb24,
        Pixel::BGR24 => RawVideoFormat::Bgr24,
        Pixel::YUV420P => RawVideoFormat::Yuv420p,
        _ => return None,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum FromFFmpegError {
    #[error("Pixel format {0:?} not supported")]
    PixFmtNotSupported(Pixel),
    #[error("{0}")]
    Frame(#[from] FrameError),
}

pub trait VideoFrameExt {
    /// Creates an ffmpeg video frame from the packed frame.
    /// Only size, format, and data are set.
    fn as_ffmpeg(&self) -> FFVideo;
}

impl VideoFrameExt for VideoFrame {
    fn as_ffmpeg(&self) -> FFVideo {
        let width = self.width() as usize;
        let height = self.height() as usize;
        let mut ff_frame = FFVideo::new(self.format().as_ffmpeg(), self.width(), self.height());

        let data = self.data();

        match self.format().packed_bytes_per_pixel() {
            Some(bpp) => {
                let stride = ff_frame.stride(0);
                copy_plane(data, width * bpp, ff_frame.data_mut(0), stride, height);
            }
            None => {
                let (chroma_width, chroma_height) = (width.div_ceil(2), height.div_ceil(2));
                let luma_len = width * height;
                let chroma_len = chroma_width * chroma_height;

                let stride = ff_frame.stride(0);
                copy_plane(&data[..luma_len], width, ff_frame.data_mut(0), stride, height);

                let stride = ff_frame.stride(1);
                copy_plane(
                    &data[luma_len..luma_len + chroma_len],
                    chroma_width,
                    ff_frame.data_mut(1),
                    stride,
                    chroma_height,
                );

                let stride = ff_frame.stride(2);
                copy_plane(
                    &data[luma_len + chroma_len..],
                    chroma_width,
                    ff_frame.data_mut(2),
                    stride,
                    chroma_height,
                );
            }
        }

        ff_frame
    }
}

/// Copies an ffmpeg frame into a tightly packed [`VideoFrame`], dropping row padding.
pub fn from_ffmpeg(frame: &FFVideo) -> Result<VideoFrame, FromFFmpegError> {
    let format = raw_format_for(frame.format())
        .ok_or(FromFFmpegError::PixFmtNotSupported(frame.format()))?;

    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let mut data = vec![0u8; format.frame_size(frame.width(), frame.height())];

    match format.packed_bytes_per_pixel() {
        Some(bpp) => {
            copy_plane(frame.data(0), frame.stride(0), &mut data, width * bpp, height);
        }
        None => {
            let (chroma_width, chroma_height) = (width.div_ceil(2), height.div_ceil(2));
            let luma_len = width * height;
            let chroma_len = chroma_width * chroma_height;

            let (luma, chroma) = data.split_at_mut(luma_len);
            let (u, v) = chroma.split_at_mut(chroma_len);

            copy_plane(frame.data(0), frame.stride(0), luma, width, height);
            copy_plane(frame.data(1), frame.stride(1), u, chroma_width, chroma_height);
            copy_plane(frame.data(2), frame.stride(2), v, chroma_width, chroma_height);
        }
    }

    Ok(VideoFrame::new(format, frame.width(), frame.height(), data)?)
}

fn copy_plane(src: &[u8], src_stride: usize, dst: &mut [u8], dst_stride: usize, rows: usize) {
    let row_bytes = src_stride.min(dst_stride);

    if src_stride == dst_stride {
        let copy_len = src.len().min(dst.len()).min(src_stride * rows);
        dst[..copy_len].copy_from_slice(&src[..copy_len]);
        return;
    }

    for row in 0..rows {
        let src_start = row * src_stride;
        let dst_start = row * dst_stride;

        let (Some(src_row), Some(dst_row)) = (
            src.get(src_start..src_start + row_bytes),
            dst.get_mut(dst_start..dst_start + row_bytes),
        ) else {
            break;
        };

        dst_row.copy_from_slice(src_row);
    }
}
