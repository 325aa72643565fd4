//! Capture-to-sink recording: frames are pulled from a [`VideoSource`],
//! appended to a [`VideoSink`] and rendered to a [`PreviewSurface`] until the
//! quit key is pressed or a stage fails, after which everything is released
//! exactly once in a fixed order.

mod capture_pipeline;
pub mod output;
pub mod output_pipeline;
mod preview;
mod session;
pub mod sources;
pub mod test_sources;

pub use capture_pipeline::*;
pub use output::{OutputDirError, OutputName, ensure_output_dir};
pub use output_pipeline::{Resource, Resources, TeardownReport, VideoSink};
pub use preview::*;
pub use session::*;
pub use sources::VideoSource;
