//! Non-interactive input: load a registration grid from a CSV file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use picreg_model::{Column, GridStore};

/// Load a batch input file of `code,chip[,grn]` records (header optional)
/// into a fresh grid.
pub fn load_grid(path: &Path) -> Result<GridStore> {
    let file =
        File::open(path).with_context(|| format!("open batch input {}", path.display()))?;
    read_grid(BufReader::new(file))
        .with_context(|| format!("read batch input {}", path.display()))
}

/// Parse and replay batch records through the commit contract.
///
/// Records are replayed the way an operator would have entered them: rows
/// are appended and their codes/chips committed first (so duplicates are
/// rejected with the offending record named), then the non-empty GRN cells
/// are committed top to bottom, letting the fill-down cascade produce the
/// same final grid as interactive entry.
pub fn read_grid(reader: impl Read) -> Result<GridStore> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records: Vec<(String, String, String)> = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record.with_context(|| format!("record {}", index + 1))?;
        if record.len() > 3 {
            bail!(
                "record {} has {} fields (expected code,chip[,grn])",
                index + 1,
                record.len()
            );
        }
        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        records.push((field(0), field(1), field(2)));
    }

    // Optional header row, as written by the export or by hand. Only a full
    // header triple is skipped; a first data row whose OSA code merely looks
    // header-ish stays.
    if records.first().is_some_and(is_header) {
        records.remove(0);
    }

    let mut grid = GridStore::new();
    for (row, (code, chip, _)) in records.iter().enumerate() {
        grid.push_row();
        grid.try_commit(row, Column::Code, code.as_str())
            .with_context(|| format!("record {}", row + 1))?;
        grid.try_commit(row, Column::Chip, chip.as_str())
            .with_context(|| format!("record {}", row + 1))?;
    }
    for (row, (_, _, grn)) in records.iter().enumerate() {
        if !grn.is_empty() {
            grid.try_commit(row, Column::Grn, grn.as_str())
                .with_context(|| format!("record {}", row + 1))?;
        }
    }

    Ok(grid)
}

/// Recognized header triples: the export's own header and the widget's
/// column names.
fn is_header(record: &(String, String, String)) -> bool {
    let (code, chip, grn) = record;
    code.eq_ignore_ascii_case("osa")
        && chip.eq_ignore_ascii_case("chip")
        && (grn.eq_ignore_ascii_case("grn") || grn.eq_ignore_ascii_case("batch_number"))
}
