//! Data types shared across the grid engine.

mod column;
mod row;
mod span;
mod window;

pub use column::*;
pub use row::*;
pub use span::*;
pub use window::*;
