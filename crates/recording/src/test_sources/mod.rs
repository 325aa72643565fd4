//! Synthetic sources, sinks and previews for exercising the pipeline without
//! hardware.

mod fakes;
mod video;

pub use fakes::*;
pub use video::*;
