#[cfg(feature = "window")]
mod window;
#[cfg(feature = "window")]
pub use window::*;

mod headless;
pub use headless::*;

use skycap_media_info::RawVideoFormat;

#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[cfg(feature = "window")]
    #[error("OpenCV/{0}")]
    OpenCV(#[from] opencv::Error),
    #[error("Pixel format {0:?} can't be displayed")]
    UnsupportedFormat(RawVideoFormat),
    #[error("Quit key '{0}' is not an ASCII letter or digit")]
    UnsupportedKey(char),
    #[error("No keyboard to read the quit key from (is a display available?)")]
    NoKeyboard,
    #[error("Preview is closed")]
    Closed,
}

/// Matches a `wait_key` result against the quit key, ignoring case the same
/// way [`keycode_for`] does. Negative codes mean no key was pressed.
pub fn is_quit_key(key: i32, quit_key: char) -> bool {
    if key < 0 || !quit_key.is_ascii() {
        return false;
    }

    let pressed = (key & 0xFF) as u8;
    pressed.eq_ignore_ascii_case(&(quit_key as u8))
}

/// Writes a packed RGB/BGR frame as BGR, the channel order display toolkits expect.
pub fn write_bgr(format: RawVideoFormat, src: &[u8], dst: &mut [u8]) -> Result<(), PreviewError> {
    match format {
        RawVideoFormat::Bgr24 => {
            let len = src.len().min(dst.len());
            dst[..len].copy_from_slice(&src[..len]);
        }
        RawVideoFormat::Rgb24 => {
            for (d, s) in dst.chunks_exact_mut(3).zip(src.chunks_exact(3)) {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
            }
        }
        other => return Err(PreviewError::UnsupportedFormat(other)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_is_swapped_to_bgr() {
        let src = [1, 2, 3, 4, 5, 6];
        let mut dst = [0u8; 6];

        write_bgr(RawVideoFormat::Rgb24, &src, &mut dst).unwrap();

        assert_eq!(dst, [3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn quit_key_ignores_case() {
        assert!(is_quit_key('q' as i32, 'q'));
        assert!(is_quit_key('Q' as i32, 'q'));
        assert!(is_quit_key('q' as i32, 'Q'));
        // highgui may set modifier bits above the low byte
        assert!(is_quit_key(0x10_0000 | 'Q' as i32, 'q'));
        assert!(!is_quit_key(-1, 'q'));
        assert!(!is_quit_key('w' as i32, 'q'));
        assert_eq!(keycode_for('Q'), keycode_for('q'));
    }

    #[test]
    fn planar_frames_are_rejected() {
        let mut dst = [0u8; 6];

        assert!(matches!(
            write_bgr(RawVideoFormat::Yuv420p, &[0; 6], &mut dst),
            Err(PreviewError::UnsupportedFormat(RawVideoFormat::Yuv420p))
        ));
    }
}
