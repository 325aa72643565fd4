use std::time::Duration;

use serde::{Deserialize, Serialize};
use skycap_media_info::VideoFrame;
use skycap_preview::{HeadlessPreview, PreviewError};
#[cfg(feature = "window")]
use skycap_preview::WindowPreview;

/// Where frames are shown and where the quit key is read from.
pub trait PreviewSurface {
    fn render(&mut self, frame: &VideoFrame) -> anyhow::Result<()>;

    /// Waits at most `timeout` and reports whether the quit key was pressed.
    fn poll_quit(&mut self, timeout: Duration) -> anyhow::Result<bool>;

    fn close(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewMode {
    #[default]
    Window,
    Headless,
}

pub enum Preview {
    #[cfg(feature = "window")]
    Window(WindowPreview),
    Headless(HeadlessPreview),
}

impl Preview {
    pub fn open(mode: PreviewMode, title: &str, quit_key: char) -> Result<Self, PreviewError> {
        match mode {
            #[cfg(feature = "window")]
            PreviewMode::Window => WindowPreview::open(title, quit_key).map(Self::Window),
            #[cfg(not(feature = "window"))]
            PreviewMode::Window => {
                tracing::warn!("Built without window support, previewing '{title}' headless");
                HeadlessPreview::open(quit_key).map(Self::Headless)
            }
            PreviewMode::Headless => HeadlessPreview::open(quit_key).map(Self::Headless),
        }
    }

    pub fn mode(&self) -> PreviewMode {
        match self {
            #[cfg(feature = "window")]
            Self::Window(_) => PreviewMode::Window,
            Self::Headless(_) => PreviewMode::Headless,
        }
    }
}

impl PreviewSurface for Preview {
    fn render(&mut self, frame: &VideoFrame) -> anyhow::Result<()> {
        match self {
            #[cfg(feature = "window")]
            Self::Window(window) => PreviewSurface::render(window, frame),
            Self::Headless(headless) => PreviewSurface::render(headless, frame),
        }
    }

    fn poll_quit(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        match self {
            #[cfg(feature = "window")]
            Self::Window(window) => PreviewSurface::poll_quit(window, timeout),
            Self::Headless(headless) => PreviewSurface::poll_quit(headless, timeout),
        }
    }

    fn close(&mut self) -> anyhow::Result<()> {
        match self {
            #[cfg(feature = "window")]
            Self::Window(window) => PreviewSurface::close(window),
            Self::Headless(headless) => PreviewSurface::close(headless),
        }
    }
}

#[cfg(feature = "window")]
impl PreviewSurface for WindowPreview {
    fn render(&mut self, frame: &VideoFrame) -> anyhow::Result<()> {
        Ok(self.show(frame)?)
    }

    fn poll_quit(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        Ok(WindowPreview::poll_quit(self, timeout)?)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        Ok(WindowPreview::close(self)?)
    }
}

impl PreviewSurface for HeadlessPreview {
    fn render(&mut self, frame: &VideoFrame) -> anyhow::Result<()> {
        Ok(self.show(frame)?)
    }

    fn poll_quit(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        Ok(HeadlessPreview::poll_quit(self, timeout)?)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        Ok(HeadlessPreview::close(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_query::{DeviceQuery, Keycode, MouseState};
    use serde::de::{IntoDeserializer, value::Error};

    struct HeldKeys(Vec<Keycode>);

    impl DeviceQuery for HeldKeys {
        fn get_mouse(&self) -> MouseState {
            MouseState::default()
        }

        fn get_keys(&self) -> Vec<Keycode> {
            self.0.clone()
        }
    }

    fn parse(mode: &str) -> Result<PreviewMode, Error> {
        PreviewMode::deserialize(mode.into_deserializer())
    }

    #[test]
    fn preview_mode_from_config_strings() {
        assert_eq!(parse("window").unwrap(), PreviewMode::Window);
        assert_eq!(parse("headless").unwrap(), PreviewMode::Headless);
        assert!(parse("fullscreen").is_err());
        assert_eq!(PreviewMode::default(), PreviewMode::Window);
    }

    #[test]
    fn headless_preview_counts_rendered_frames() {
        let info = skycap_media_info::VideoInfo::from_raw(
            skycap_media_info::RawVideoFormat::Rgb24,
            4,
            2,
            30,
        );
        let mut preview = Preview::Headless(
            HeadlessPreview::with_keyboard('q', HeldKeys(vec![Keycode::A])).unwrap(),
        );
        assert_eq!(preview.mode(), PreviewMode::Headless);

        preview.render(&VideoFrame::filled(&info, 0)).unwrap();
        assert!(!preview.poll_quit(Duration::from_millis(1)).unwrap());
        PreviewSurface::close(&mut preview).unwrap();

        assert!(preview.render(&VideoFrame::filled(&info, 0)).is_err());
    }

    #[test]
    fn headless_poll_goes_through_the_surface() {
        let mut preview = Preview::Headless(
            HeadlessPreview::with_keyboard('q', HeldKeys(vec![Keycode::Q])).unwrap(),
        );

        let quit: anyhow::Result<bool> = preview.poll_quit(Duration::from_millis(1));
        assert!(quit.unwrap());

        PreviewSurface::close(&mut preview).unwrap();
        let err = preview.poll_quit(Duration::from_millis(1)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreviewError>(),
            Some(PreviewError::Closed)
        ));
    }
}
