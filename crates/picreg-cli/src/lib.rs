//! Command-line host for the PIC registration core.
//!
//! Drives `picreg-model` through the same commit contract the original grid
//! widget used: a wafer prompt at startup, per-cell interactive entry (or a
//! batch CSV), completeness validation, the atomic CSV export, the optional
//! shop-order lookup and tracking page, and the timestamped archive copy.

mod batch;
mod cli;
mod prompt;

pub use batch::{load_grid, read_grid};
pub use cli::{parse_args, run, run_with_args, Args};
pub use prompt::{enter_rows, prompt_wafer};
