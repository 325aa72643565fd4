mod base;

mod video;
pub use video::*;

mod mux;
pub use mux::*;

pub mod probe;
