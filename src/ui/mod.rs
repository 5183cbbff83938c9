//! CLI styling components.

pub mod prompt;
mod spinner;
pub mod status;
mod table;

pub use spinner::Spinner;
pub use status::StatusLine;
pub use table::{Align, Table};
