//! Data types for synchronized tables.

mod cell;
mod table;

pub use cell::*;
pub use table::*;
