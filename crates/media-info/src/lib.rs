use std::{fmt, str::FromStr, time::Duration};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RawVideoFormat {
    Rgb24,
    Bgr24,
    Yuv420p,
}

impl RawVideoFormat {
    /// Bytes per pixel for packed formats, `None` for planar ones.
    pub const fn packed_bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::Rgb24 | Self::Bgr24 => Some(3),
            Self::Yuv420p => None,
        }
    }

    pub const fn frame_size(&self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Rgb24 | Self::Bgr24 => pixels * 3,
            Self::Yuv420p => pixels + 2 * (width.div_ceil(2) as usize * height.div_ceil(2) as usize),
        }
    }
}

/// Geometry of a video stream: what a source produces and what a sink accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub pixel_format: RawVideoFormat,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl VideoInfo {
    pub const DEFAULT_FPS: u32 = 30;

    pub const fn from_raw(pixel_format: RawVideoFormat, width: u32, height: u32, fps: u32) -> Self {
        Self {
            pixel_format,
            width,
            height,
            frame_rate: fps,
        }
    }

    pub fn fps(&self) -> u32 {
        self.frame_rate
    }

    pub fn frame_size(&self) -> usize {
        self.pixel_format.frame_size(self.width, self.height)
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }

    /// Whether a frame can be appended to a stream declared with this geometry.
    pub fn accepts(&self, frame: &VideoFrame) -> bool {
        frame.width() == self.width
            && frame.height() == self.height
            && frame.format() == self.pixel_format
    }

    /// Replaces a zero frame rate (devices that don't report one) with [`Self::DEFAULT_FPS`].
    pub fn with_fallback_fps(mut self) -> Self {
        if self.frame_rate == 0 {
            self.frame_rate = Self::DEFAULT_FPS;
        }
        self
    }
}

impl fmt::Display for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{}fps ({:?})",
            self.width, self.height, self.frame_rate, self.pixel_format
        )
    }
}

/// Four-character codec identifier, e.g. `mp4v`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCC([u8; 4]);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid fourcc '{0}': expected exactly four ASCII characters")]
pub struct InvalidFourCC(String);

impl FourCC {
    pub const MP4V: Self = Self(*b"mp4v");

    pub const fn new(code: [u8; 4]) -> Self {
        Self(code)
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Little-endian packing used by container tags (`MKTAG`).
    pub const fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }
}

impl FromStr for FourCC {
    type Err = InvalidFourCC;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| InvalidFourCC(s.to_string()))?;

        if !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(InvalidFourCC(s.to_string()));
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("Frame data is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// A single decoded picture. Data is tightly packed, no row padding.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFrame {
    format: RawVideoFormat,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl VideoFrame {
    pub fn new(
        format: RawVideoFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }

        let expected = format.frame_size(width, height);
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            format,
            width,
            height,
            data,
        })
    }

    /// A frame with every byte set to `value`.
    pub fn filled(info: &VideoInfo, value: u8) -> Self {
        Self {
            format: info.pixel_format,
            width: info.width,
            height: info.height,
            data: vec![value; info.frame_size()],
        }
    }

    pub fn format(&self) -> RawVideoFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Row stride in bytes of the first plane.
    pub fn stride(&self) -> usize {
        match self.format.packed_bytes_per_pixel() {
            Some(bpp) => self.width as usize * bpp,
            None => self.width as usize,
        }
    }
}

impl fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}

pub fn ensure_even(value: u32) -> u32 {
    let adjusted = value - (value % 2);
    if adjusted == 0 { 2 } else { adjusted }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_parses_and_packs_little_endian() {
        let tag: FourCC = "mp4v".parse().unwrap();

        assert_eq!(tag, FourCC::MP4V);
        assert_eq!(tag.to_string(), "mp4v");
        assert_eq!(
            tag.as_u32(),
            (b'm' as u32) | (b'p' as u32) << 8 | (b'4' as u32) << 16 | (b'v' as u32) << 24
        );
    }

    #[test]
    fn fourcc_rejects_wrong_length() {
        assert!("mp4".parse::<FourCC>().is_err());
        assert!("mp4vv".parse::<FourCC>().is_err());
        assert!("mp 4".parse::<FourCC>().is_err());
    }

    #[test]
    fn frame_size_per_format() {
        assert_eq!(RawVideoFormat::Rgb24.frame_size(640, 480), 640 * 480 * 3);
        assert_eq!(RawVideoFormat::Yuv420p.frame_size(4, 4), 16 + 2 * 4);
        assert_eq!(RawVideoFormat::Yuv420p.frame_size(3, 3), 9 + 2 * 4);
    }

    #[test]
    fn frame_rejects_wrong_buffer_length() {
        let err = VideoFrame::new(RawVideoFormat::Rgb24, 2, 2, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            FrameError::SizeMismatch {
                expected: 12,
                actual: 11
            }
        );

        assert!(matches!(
            VideoFrame::new(RawVideoFormat::Rgb24, 0, 2, vec![]),
            Err(FrameError::Empty { .. })
        ));
    }

    #[test]
    fn info_accepts_only_matching_frames() {
        let info = VideoInfo::from_raw(RawVideoFormat::Rgb24, 640, 480, 30);

        assert!(info.accepts(&VideoFrame::filled(&info, 0)));

        let other = VideoInfo::from_raw(RawVideoFormat::Rgb24, 320, 240, 30);
        assert!(!info.accepts(&VideoFrame::filled(&other, 0)));
    }

    #[test]
    fn zero_fps_falls_back_to_default() {
        let info = VideoInfo::from_raw(RawVideoFormat::Rgb24, 640, 480, 0).with_fallback_fps();
        assert_eq!(info.fps(), VideoInfo::DEFAULT_FPS);

        let info = VideoInfo::from_raw(RawVideoFormat::Rgb24, 640, 480, 15).with_fallback_fps();
        assert_eq!(info.fps(), 15);
    }

    #[test]
    fn ensure_even_never_returns_zero() {
        assert_eq!(ensure_even(0), 2);
        assert_eq!(ensure_even(1), 2);
        assert_eq!(ensure_even(641), 640);
    }
}
