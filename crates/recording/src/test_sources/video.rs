use anyhow::{anyhow, bail};
use skycap_media_info::{RawVideoFormat, VideoFrame, VideoInfo};
use std::time::Instant;

use super::ReleaseLog;
use crate::{Resource, VideoSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TestPattern {
    SmpteColorBars,
    ColorGradient,
    #[default]
    FrameCounter,
    Checkerboard,
    SolidColor {
        r: u8,
        g: u8,
        b: u8,
    },
}

#[derive(Debug, Clone)]
pub struct SyntheticSourceConfig {
    pub video_info: VideoInfo,
    pub pattern: TestPattern,
    /// `open` fails, as a missing device would.
    pub fail_open: bool,
    /// 1-based index of the read that fails.
    pub fail_at: Option<u64>,
    /// Pace reads at the nominal frame rate.
    pub realtime: bool,
    pub log: Option<ReleaseLog>,
}

impl Default for SyntheticSourceConfig {
    fn default() -> Self {
        Self {
            video_info: VideoInfo::from_raw(RawVideoFormat::Rgb24, 640, 480, 30),
            pattern: TestPattern::default(),
            fail_open: false,
            fail_at: None,
            realtime: false,
            log: None,
        }
    }
}

impl SyntheticSourceConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.video_info.width = width;
        self.video_info.height = height;
        self
    }

    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.video_info.frame_rate = fps;
        self
    }

    pub fn with_pixel_format(mut self, format: RawVideoFormat) -> Self {
        self.video_info.pixel_format = format;
        self
    }

    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn failing_at(mut self, frame: u64) -> Self {
        self.fail_at = Some(frame);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    pub fn with_log(mut self, log: ReleaseLog) -> Self {
        self.log = Some(log);
        self
    }
}

/// Generates test patterns. Panics if closed twice.
pub struct SyntheticSource {
    config: SyntheticSourceConfig,
    current: VideoFrame,
    frames_produced: u64,
    started: Option<Instant>,
    closed: bool,
}

impl SyntheticSource {
    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl VideoSource for SyntheticSource {
    type Config = SyntheticSourceConfig;

    fn open(config: Self::Config) -> anyhow::Result<Self> {
        if config.fail_open {
            bail!("Synthetic device unavailable");
        }

        let info = config.video_info;
        if info.width == 0 || info.height == 0 {
            bail!("Synthetic source has zero area ({}x{})", info.width, info.height);
        }

        Ok(Self {
            current: VideoFrame::filled(&info, 0),
            config,
            frames_produced: 0,
            started: None,
            closed: false,
        })
    }

    fn video_info(&self) -> VideoInfo {
        self.config.video_info
    }

    fn next_frame(&mut self) -> anyhow::Result<&VideoFrame> {
        if self.closed {
            bail!("Synthetic source is closed");
        }

        let frame_number = self.frames_produced + 1;
        if self.config.fail_at == Some(frame_number) {
            return Err(anyhow!("Synthetic read failure at frame {frame_number}"));
        }

        if self.config.realtime {
            let started = *self.started.get_or_insert_with(Instant::now);
            let due = started + self.config.video_info.frame_duration() * self.frames_produced as u32;
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }

        fill_pattern(
            &mut self.current,
            &self.config.video_info,
            self.config.pattern,
            self.frames_produced,
        );
        self.frames_produced = frame_number;

        Ok(&self.current)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        assert!(!self.closed, "synthetic source released twice");
        self.closed = true;

        if let Some(log) = &self.config.log {
            log.record(Resource::Source);
        }

        Ok(())
    }
}

fn fill_pattern(frame: &mut VideoFrame, info: &VideoInfo, pattern: TestPattern, frame_number: u64) {
    let width = info.width as usize;
    let height = info.height as usize;

    let color_at = |x: usize, y: usize| -> (u8, u8, u8) {
        match pattern {
            TestPattern::SmpteColorBars => SMPTE_BARS[(x * 8 / width).min(7)],
            TestPattern::ColorGradient => {
                let phase = (frame_number % 256) as u8;
                (
                    ((x * 255 / width) as u8).wrapping_add(phase),
                    ((y * 255 / height) as u8).wrapping_add(phase),
                    (((x + y) * 255 / (width + height)) as u8).wrapping_add(phase),
                )
            }
            TestPattern::FrameCounter => {
                let v = (frame_number % 256) as u8;
                (v, v, v)
            }
            TestPattern::Checkerboard => {
                let offset = (frame_number / 15) as usize;
                if ((x / 32) + (y / 32) + offset) % 2 == 0 {
                    (255, 255, 255)
                } else {
                    (0, 0, 0)
                }
            }
            TestPattern::SolidColor { r, g, b } => (r, g, b),
        }
    };

    match info.pixel_format {
        RawVideoFormat::Rgb24 | RawVideoFormat::Bgr24 => {
            let is_bgr = info.pixel_format == RawVideoFormat::Bgr24;
            let stride = frame.stride();
            let data = frame.data_mut();

            for y in 0..height {
                for x in 0..width {
                    let (r, g, b) = color_at(x, y);
                    let offset = y * stride + x * 3;
                    let px = &mut data[offset..offset + 3];
                    if is_bgr {
                        px.copy_from_slice(&[b, g, r]);
                    } else {
                        px.copy_from_slice(&[r, g, b]);
                    }
                }
            }
        }
        RawVideoFormat::Yuv420p => {
            let chroma_width = width.div_ceil(2);
            let chroma_height = height.div_ceil(2);
            let (luma, chroma) = frame.data_mut().split_at_mut(width * height);
            let (u_plane, v_plane) = chroma.split_at_mut(chroma_width * chroma_height);

            for y in 0..height {
                for x in 0..width {
                    let (r, g, b) = color_at(x, y);
                    luma[y * width + x] = rgb_to_y(r, g, b);
                }
            }

            for y in 0..chroma_height {
                for x in 0..chroma_width {
                    let (r, g, b) = color_at(x * 2, y * 2);
                    let (u, v) = rgb_to_uv(r, g, b);
                    u_plane[y * chroma_width + x] = u;
                    v_plane[y * chroma_width + x] = v;
                }
            }
        }
    }
}

const SMPTE_BARS: [(u8, u8, u8); 8] = [
    (192, 192, 192),
    (192, 192, 0),
    (0, 192, 192),
    (0, 192, 0),
    (192, 0, 192),
    (192, 0, 0),
    (0, 0, 192),
    (0, 0, 0),
];

fn rgb_to_y(r: u8, g: u8, b: u8) -> u8 {
    let y = 16.0 + 0.257 * r as f32 + 0.504 * g as f32 + 0.098 * b as f32;
    y.clamp(0.0, 255.0) as u8
}

fn rgb_to_uv(r: u8, g: u8, b: u8) -> (u8, u8) {
    let u = 128.0 - 0.148 * r as f32 - 0.291 * g as f32 + 0.439 * b as f32;
    let v = 128.0 + 0.439 * r as f32 - 0.368 * g as f32 - 0.071 * b as f32;
    (u.clamp(0.0, 255.0) as u8, v.clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_counter_advances() {
        let mut source = SyntheticSource::open(
            SyntheticSourceConfig::default().with_resolution(8, 4),
        )
        .unwrap();

        assert_eq!(source.next_frame().unwrap().data()[0], 0);
        assert_eq!(source.next_frame().unwrap().data()[0], 1);
        assert_eq!(source.frames_produced(), 2);
    }

    #[test]
    fn bgr_solid_color_is_swapped() {
        let mut source = SyntheticSource::open(
            SyntheticSourceConfig::default()
                .with_resolution(2, 2)
                .with_pixel_format(RawVideoFormat::Bgr24)
                .with_pattern(TestPattern::SolidColor { r: 10, g: 20, b: 30 }),
        )
        .unwrap();

        assert_eq!(&source.next_frame().unwrap().data()[..3], &[30, 20, 10]);
    }

    #[test]
    fn yuv_frames_fill_every_plane() {
        let info = VideoInfo::from_raw(RawVideoFormat::Yuv420p, 6, 4, 30);
        let mut source = SyntheticSource::open(
            SyntheticSourceConfig::default()
                .with_resolution(6, 4)
                .with_pixel_format(RawVideoFormat::Yuv420p)
                .with_pattern(TestPattern::SmpteColorBars),
        )
        .unwrap();

        let frame = source.next_frame().unwrap();
        assert!(info.accepts(frame));
        assert_eq!(frame.data().len(), 6 * 4 + 2 * 3 * 2);
    }

    #[test]
    fn read_fails_at_configured_frame() {
        let mut source =
            SyntheticSource::open(SyntheticSourceConfig::default().with_resolution(4, 4).failing_at(2))
                .unwrap();

        assert!(source.next_frame().is_ok());
        assert!(source.next_frame().is_err());
        assert_eq!(source.frames_produced(), 1);
    }

    #[test]
    fn open_failure() {
        assert!(SyntheticSource::open(SyntheticSourceConfig::default().failing_open()).is_err());
    }
}
