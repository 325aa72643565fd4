use std::time::Duration;

use opencv::{
    core::{CV_8UC3, Mat, Scalar},
    highgui,
    prelude::*,
};
use skycap_media_info::VideoFrame;
use tracing::debug;

use crate::{PreviewError, is_quit_key, write_bgr};

/// An on-screen highgui window.
pub struct WindowPreview {
    title: String,
    quit_key: char,
    is_open: bool,
}

impl WindowPreview {
    pub fn open(title: impl Into<String>, quit_key: char) -> Result<Self, PreviewError> {
        let title = title.into();

        highgui::named_window(&title, highgui::WINDOW_AUTOSIZE)?;
        debug!("Opened preview window '{title}'");

        Ok(Self {
            title,
            quit_key,
            is_open: true,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn show(&mut self, frame: &VideoFrame) -> Result<(), PreviewError> {
        if !self.is_open {
            return Err(PreviewError::Closed);
        }

        let mut mat = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            CV_8UC3,
            Scalar::all(0.0),
        )?;
        write_bgr(frame.format(), frame.data(), mat.data_bytes_mut()?)?;

        highgui::imshow(&self.title, &mat)?;

        Ok(())
    }

    /// Pumps window events for up to `timeout` and reports whether the quit key was pressed.
    pub fn poll_quit(&mut self, timeout: Duration) -> Result<bool, PreviewError> {
        if !self.is_open {
            return Err(PreviewError::Closed);
        }

        let delay = (timeout.as_millis() as i32).max(1);
        let key = highgui::wait_key(delay)?;

        Ok(is_quit_key(key, self.quit_key))
    }

    pub fn close(&mut self) -> Result<(), PreviewError> {
        if !self.is_open {
            return Ok(());
        }

        self.is_open = false;
        highgui::destroy_window(&self.title)?;
        // destroy only takes effect once events are pumped again
        highgui::wait_key(1)?;

        debug!("Closed preview window '{}'", self.title);

        Ok(())
    }
}

impl Drop for WindowPreview {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
