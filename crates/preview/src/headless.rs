use std::time::Duration;

use device_query::{DeviceQuery, DeviceState, Keycode};
use skycap_media_info::VideoFrame;
use tracing::trace;

use crate::PreviewError;

pub fn keycode_for(key: char) -> Option<Keycode> {
    Some(match key.to_ascii_lowercase() {
        'a' => Keycode::A,
        'b' => Keycode::B,
        'c' => Keycode::C,
        'd' => Keycode::D,
        'e' => Keycode::E,
        'f' => Keycode::F,
        'g' => Keycode::G,
        'h' => Keycode::H,
        'i' => Keycode::I,
        'j' => Keycode::J,
        'k' => Keycode::K,
        'l' => Keycode::L,
        'm' => Keycode::M,
        'n' => Keycode::N,
        'o' => Keycode::O,
        'p' => Keycode::P,
        'q' => Keycode::Q,
        'r' => Keycode::R,
        's' => Keycode::S,
        't' => Keycode::T,
        'u' => Keycode::U,
        'v' => Keycode::V,
        'w' => Keycode::W,
        'x' => Keycode::X,
        'y' => Keycode::Y,
        'z' => Keycode::Z,
        '0' => Keycode::Key0,
        '1' => Keycode::Key1,
        '2' => Keycode::Key2,
        '3' => Keycode::Key3,
        '4' => Keycode::Key4,
        '5' => Keycode::Key5,
        '6' => Keycode::Key6,
        '7' => Keycode::Key7,
        '8' => Keycode::Key8,
        '9' => Keycode::Key9,
        _ => return None,
    })
}

/// No window: frames are only counted, and the quit key is read from the global keyboard state.
pub struct HeadlessPreview {
    keyboard: Box<dyn DeviceQuery>,
    quit_key: Keycode,
    frames_shown: u64,
    is_open: bool,
}

impl HeadlessPreview {
    /// Connects to the system keyboard. Fails instead of panicking when there
    /// is no display server (or, on macOS, no accessibility permission).
    pub fn open(quit_key: char) -> Result<Self, PreviewError> {
        let quit_key = keycode_for(quit_key).ok_or(PreviewError::UnsupportedKey(quit_key))?;
        let keyboard = DeviceState::checked_new().ok_or(PreviewError::NoKeyboard)?;

        Ok(Self::from_keycode(quit_key, Box::new(keyboard)))
    }

    /// Reads the quit key from `keyboard` instead of the system keyboard.
    pub fn with_keyboard(
        quit_key: char,
        keyboard: impl DeviceQuery + 'static,
    ) -> Result<Self, PreviewError> {
        let quit_key = keycode_for(quit_key).ok_or(PreviewError::UnsupportedKey(quit_key))?;

        Ok(Self::from_keycode(quit_key, Box::new(keyboard)))
    }

    fn from_keycode(quit_key: Keycode, keyboard: Box<dyn DeviceQuery>) -> Self {
        Self {
            keyboard,
            quit_key,
            frames_shown: 0,
            is_open: true,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn show(&mut self, frame: &VideoFrame) -> Result<(), PreviewError> {
        if !self.is_open {
            return Err(PreviewError::Closed);
        }

        self.frames_shown += 1;
        trace!(
            "Headless preview frame {} ({}x{})",
            self.frames_shown,
            frame.width(),
            frame.height()
        );

        Ok(())
    }

    pub fn poll_quit(&mut self, timeout: Duration) -> Result<bool, PreviewError> {
        if !self.is_open {
            return Err(PreviewError::Closed);
        }

        std::thread::sleep(timeout);

        Ok(self.keyboard.get_keys().contains(&self.quit_key))
    }

    pub fn close(&mut self) -> Result<(), PreviewError> {
        self.is_open = false;
        Ok(())
    }
}
