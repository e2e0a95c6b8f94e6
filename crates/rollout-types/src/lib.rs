pub mod domain;
pub mod error;
pub mod item;
mod util;

pub use domain::*;
pub use error::{Error, Result};
pub use item::*;
pub use util::*;
