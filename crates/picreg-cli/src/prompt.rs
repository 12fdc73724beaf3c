//! Interactive entry: the wafer prompt loop and per-cell row entry.
//!
//! Both run over any `BufRead`/`Write` pair so tests can script them; the
//! binary wires them to stdin/stderr. EOF anywhere means the operator closed
//! the session, which is a deliberate abort, not an error.

use std::io::{self, BufRead, Write};

use picreg_model::{Column, GridStore, WaferNumber};

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Prompt for the run's wafer number until a valid one is entered.
///
/// Re-prompts indefinitely on rejection, mirroring the startup dialog loop
/// of the original tool. Two consecutive empty inputs (or EOF) cancel the
/// run: returns `None`.
pub fn prompt_wafer(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<Option<WaferNumber>> {
    let mut empty_streak = 0u32;
    loop {
        write!(output, "Wafer number: ")?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(None);
        };
        if line.is_empty() {
            empty_streak += 1;
            if empty_streak >= 2 {
                return Ok(None);
            }
            writeln!(output, "a wafer number is required (empty again to cancel)")?;
            continue;
        }
        empty_streak = 0;
        match line.parse::<WaferNumber>() {
            Ok(wafer) => return Ok(Some(wafer)),
            Err(err) => writeln!(output, "{err}")?,
        }
    }
}

/// Commit one cell, re-prompting on rejection (duplicate identifiers).
///
/// Returns `false` on EOF.
fn commit_with_retry(
    input: &mut impl BufRead,
    output: &mut impl Write,
    grid: &mut GridStore,
    row: usize,
    column: Column,
    mut value: String,
) -> io::Result<bool> {
    loop {
        match grid.try_commit(row, column, value) {
            Ok(_) => return Ok(true),
            Err(err) => {
                writeln!(output, "{err}")?;
                write!(output, "row {} {column}: ", row + 1)?;
                output.flush()?;
                match read_line(input)? {
                    Some(next) => value = next,
                    None => return Ok(false),
                }
            }
        }
    }
}

/// Append rows to `grid` from per-cell prompts until a blank OSA code (or
/// EOF) ends the entry.
///
/// Every value flows through [`GridStore::try_commit`], so duplicate
/// identifiers are rejected at the cell (and re-prompted) and a GRN entry
/// cascades into the rows below, exactly as the grid widget used to behave.
pub fn enter_rows(
    input: &mut impl BufRead,
    output: &mut impl Write,
    grid: &mut GridStore,
) -> io::Result<()> {
    loop {
        let row = grid.row_count();
        write!(output, "row {} OSA (blank to finish): ", row + 1)?;
        output.flush()?;
        let code = match read_line(input)? {
            Some(value) if !value.is_empty() => value,
            _ => return Ok(()),
        };

        grid.push_row();
        if !commit_with_retry(input, output, grid, row, Column::Code, code)? {
            return Ok(());
        }

        write!(output, "row {} Chip: ", row + 1)?;
        output.flush()?;
        let Some(chip) = read_line(input)? else {
            return Ok(());
        };
        if !commit_with_retry(input, output, grid, row, Column::Chip, chip)? {
            return Ok(());
        }

        write!(output, "row {} GRN (fills down): ", row + 1)?;
        output.flush()?;
        let Some(mut grn) = read_line(input)? else {
            return Ok(());
        };
        if grn.is_empty() && row > 0 {
            // The widget's fill-down already covered freshly provisioned
            // rows; in serial entry, carry the previous row's GRN instead.
            grn = grid
                .value(row - 1, Column::Grn)
                .unwrap_or_default()
                .to_string();
        }
        if !grn.is_empty() && !commit_with_retry(input, output, grid, row, Column::Grn, grn)? {
            return Ok(());
        }
    }
}
