pub mod mp4;
pub use mp4::*;
