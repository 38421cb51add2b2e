pub mod check;
pub mod info;
pub mod sample;

pub use check::*;
pub use info::*;
pub use sample::*;
