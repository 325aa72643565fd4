mod core;
pub use core::*;

mod teardown;
pub use teardown::*;

#[cfg(feature = "ffmpeg")]
mod ffmpeg;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::*;
