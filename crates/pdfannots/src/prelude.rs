pub use crate::error::Error;

pub use anstream::eprintln;
pub use color_eyre::eyre::{Context, Result};
pub use std::format as f;
