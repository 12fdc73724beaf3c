use core::fmt;

use crate::{GridStore, WaferNumber};

/// Fixed header line of the export artifact. Downstream consumers key on
/// these exact column names.
pub const EXPORT_HEADER: &str = "OSA,CHIP,BATCH_NUMBER";

/// Record terminator used between CSV lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`.
    Lf,
    /// `\r\n`.
    CrLf,
}

impl LineEnding {
    /// The terminator bytes.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// The host platform's native terminator.
    pub const fn platform() -> Self {
        #[cfg(windows)]
        {
            LineEnding::CrLf
        }
        #[cfg(not(windows))]
        {
            LineEnding::Lf
        }
    }
}

impl Default for LineEnding {
    fn default() -> Self {
        Self::platform()
    }
}

/// Rendering options for [`render_csv`].
#[derive(Copy, Clone, Debug, Default)]
pub struct ExportOptions {
    /// Record terminator. Defaults to the platform's native one; tests pin
    /// an explicit value.
    pub line_ending: LineEnding,
}

/// Errors raised by [`render_csv`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportError {
    /// The table has no rows at all.
    EmptyGrid,
    /// A chip cell was empty, so no identifier could be derived. Run
    /// [`GridStore::validate_complete`] before rendering to collect every
    /// missing cell instead of failing on the first.
    EmptyChip { row: usize },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::EmptyGrid => f.write_str("no registration data to export"),
            ExportError::EmptyChip { row } => {
                write!(f, "row {} has no chip code", row + 1)
            }
        }
    }
}

impl std::error::Error for ExportError {}

/// Derive the canonical export identifier from a raw chip code.
///
/// Values already carrying the `CD` prefix are passed through verbatim —
/// they are treated as fully derived, so no wafer suffix is appended and
/// re-normalizing an exported value is a no-op. Everything else gets the
/// trailing-marker treatment:
///
/// - a trailing ASCII digit gains the `_A` suffix (`A1` → `A1_A`)
/// - a trailing non-digit is split off behind an underscore
///   (`A1B` → `A1_B`)
///
/// followed by the `CD` prefix and `-<wafer>` suffix. Returns `None` for an
/// empty chip code, which has no last character to classify.
pub fn normalize_chip(chip: &str, wafer: &WaferNumber) -> Option<String> {
    if chip.starts_with("CD") {
        return Some(chip.to_string());
    }

    let last = chip.chars().last()?;
    let transformed = if last.is_ascii_digit() {
        format!("{chip}_A")
    } else {
        let body = &chip[..chip.len() - last.len_utf8()];
        format!("{body}_{last}")
    };

    Some(format!("CD{transformed}-{wafer}"))
}

/// Render the grid to the export artifact.
///
/// One line per row after the fixed header, fields in `code`, normalized
/// chip, `grn` order, comma-separated, no quoting (identifiers never contain
/// commas), and no terminator after the last row. Callers are expected to
/// have validated completeness; an empty chip cell fails the render, while
/// an empty code or GRN cell renders as an empty field.
pub fn render_csv(
    grid: &GridStore,
    wafer: &WaferNumber,
    options: ExportOptions,
) -> Result<String, ExportError> {
    if grid.is_empty() {
        return Err(ExportError::EmptyGrid);
    }

    let terminator = options.line_ending.as_str();
    let mut text = String::from(EXPORT_HEADER);
    for (index, row) in grid.rows().iter().enumerate() {
        let chip =
            normalize_chip(&row.chip, wafer).ok_or(ExportError::EmptyChip { row: index })?;
        text.push_str(terminator);
        text.push_str(&row.code);
        text.push(',');
        text.push_str(&chip);
        text.push(',');
        text.push_str(&row.grn);
    }

    Ok(text)
}
