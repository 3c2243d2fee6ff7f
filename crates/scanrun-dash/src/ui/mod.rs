//! Terminal rendering of the run dashboard.

mod render;

pub use render::{render, results_lines, status_line};
