pub mod mpeg4;
pub use mpeg4::*;
