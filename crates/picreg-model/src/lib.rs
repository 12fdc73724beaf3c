//! Core in-memory model for the PIC registration tool.
//!
//! The crate is intentionally UI-free so it can be driven by any host that
//! can deliver cell commits:
//! - [`GridStore`] holds the registration table and enforces the entry rules
//!   (duplicate rejection for identifier columns, GRN fill-down,
//!   completeness checks)
//! - [`WaferNumber`] is the run-scoped wafer identifier, valid by
//!   construction
//! - [`render_csv`] turns a validated table plus wafer number into the exact
//!   `OSA,CHIP,BATCH_NUMBER` artifact downstream systems ingest

mod export;
mod grid;
mod wafer;

pub use export::{
    normalize_chip, render_csv, ExportError, ExportOptions, LineEnding, EXPORT_HEADER,
};
pub use grid::{Column, CommitError, Committed, CompletenessReport, EmptyCell, GridStore, Row};
pub use wafer::{WaferNumber, WaferNumberError};
