mod bounded;
mod error;
mod palette;

pub use bounded::*;
pub use error::*;
pub use palette::*;
