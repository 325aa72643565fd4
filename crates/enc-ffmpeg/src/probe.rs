use ffmpeg::format as avformat;
use skycap_media_info::FourCC;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFileInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Option<u32>,
    pub frame_count: u64,
    pub codec_tag: Option<FourCC>,
}

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("Open/{0}")]
    Open(ffmpeg::Error),
    #[error("No video stream")]
    NoVideoStream,
    #[error("Decoder/{0}")]
    Decoder(ffmpeg::Error),
}

/// Reads geometry and counts the video packets of a recorded file.
pub fn probe_video_file(path: &Path) -> Result<VideoFileInfo, ProbeError> {
    let mut input = avformat::input(path).map_err(ProbeError::Open)?;

    let (stream_index, width, height, fps, codec_tag) = {
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(ProbeError::NoVideoStream)?;

        let decoder = ffmpeg::codec::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(ProbeError::Decoder)?;

        let rate = stream.avg_frame_rate();
        let fps = (rate.denominator() != 0)
            .then(|| (rate.numerator() as f64 / rate.denominator() as f64).round() as u32);

        let raw_tag = unsafe { (*stream.parameters().as_ptr()).codec_tag };
        let codec_tag = (raw_tag != 0).then(|| FourCC::new(raw_tag.to_le_bytes()));

        (
            stream.index(),
            decoder.width(),
            decoder.height(),
            fps,
            codec_tag,
        )
    };

    let frame_count = input
        .packets()
        .filter(|(stream, _)| stream.index() == stream_index)
        .count() as u64;

    Ok(VideoFileInfo {
        width,
        height,
        fps,
        frame_count,
        codec_tag,
    })
}

pub fn probe_media_valid(path: &Path) -> bool {
    probe_video_file(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_fails_to_open() {
        ffmpeg::init().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let result = probe_video_file(&dir.path().join("missing.mp4"));

        assert!(matches!(result, Err(ProbeError::Open(_))));
        assert!(!probe_media_valid(&dir.path().join("missing.mp4")));
    }
}
