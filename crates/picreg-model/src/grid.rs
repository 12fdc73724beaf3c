use core::fmt;

use serde::{Deserialize, Serialize};

/// Columns of the registration grid, in widget order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    /// Optical-subassembly identifier (the lookup key column).
    Code,
    /// Raw chip/die code, normalized at export time.
    Chip,
    /// Batch/group reference number; fills downward once entered.
    Grn,
}

impl Column {
    /// Column position as the grid widget reports it.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Column::Code => 0,
            Column::Chip => 1,
            Column::Grn => 2,
        }
    }

    /// Convert a raw widget column index.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Column::Code),
            1 => Some(Column::Chip),
            2 => Some(Column::Grn),
            _ => None,
        }
    }

    /// User-visible column name.
    pub const fn name(self) -> &'static str {
        match self {
            Column::Code => "OSA",
            Column::Chip => "Chip",
            Column::Grn => "GRN",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single registration row: OSA code, raw chip code, batch number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub code: String,
    pub chip: String,
    pub grn: String,
}

impl Row {
    /// Read a cell by column.
    pub fn value(&self, column: Column) -> &str {
        match column {
            Column::Code => &self.code,
            Column::Chip => &self.chip,
            Column::Grn => &self.grn,
        }
    }

    fn value_mut(&mut self, column: Column) -> &mut String {
        match column {
            Column::Code => &mut self.code,
            Column::Chip => &mut self.chip,
            Column::Grn => &mut self.grn,
        }
    }
}

/// A successful commit: the rows whose cells were written, ascending.
///
/// `Code`/`Chip` commits write exactly one row; a `Grn` commit also rewrites
/// every row below it (fill-down), and the host should refresh all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Committed {
    pub rows: Vec<usize>,
}

/// Errors raised by [`GridStore::try_commit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitError {
    RowOutOfBounds { row: usize, rows: usize },
    DuplicateValue {
        value: String,
        column: Column,
        conflicting_row: usize,
    },
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::RowOutOfBounds { row, rows } => {
                write!(f, "row index {row} out of bounds ({rows} rows)")
            }
            CommitError::DuplicateValue {
                value,
                column,
                conflicting_row,
            } => {
                write!(
                    f,
                    "{column} value '{value}' already exists at row {conflicting_row}"
                )
            }
        }
    }
}

impl std::error::Error for CommitError {}

/// A cell that still needs a value before export.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmptyCell {
    pub row: usize,
    pub column: Column,
}

impl fmt::Display for EmptyCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}, {}", self.row + 1, self.column)
    }
}

/// Result of [`GridStore::validate_complete`]: the empty `Code`/`Chip` cells
/// in row-major order. An empty report means the grid is ready to export.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    pub missing: Vec<EmptyCell>,
}

impl CompletenessReport {
    /// Returns true if no cell is missing.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// The in-memory registration table.
///
/// Rows are appended empty by the host (the grid widget used to provision
/// them); cell values change only through [`GridStore::try_commit`], which
/// enforces the duplicate and fill-down rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridStore {
    rows: Vec<Row>,
}

impl GridStore {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Create a table of `count` empty rows.
    pub fn with_rows(count: usize) -> Self {
        Self {
            rows: vec![Row::default(); count],
        }
    }

    /// Append an empty row, returning its index.
    pub fn push_row(&mut self) -> usize {
        self.rows.push(Row::default());
        self.rows.len() - 1
    }

    /// Number of rows in the table.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, in entry order.
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// A row by index.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// A cell value by coordinates.
    pub fn value(&self, row: usize, column: Column) -> Option<&str> {
        self.rows.get(row).map(|r| r.value(column))
    }

    /// Commit `value` into the cell at (`row`, `column`).
    ///
    /// `Grn` commits always succeed and cascade the value into every row
    /// below `row`, overwriting whatever those rows held. `Code`/`Chip`
    /// commits are rejected when another row already holds the same
    /// non-empty value in the same column; empty values never conflict
    /// (they mean "not yet filled"). On rejection the table is unchanged.
    pub fn try_commit(
        &mut self,
        row: usize,
        column: Column,
        value: impl Into<String>,
    ) -> Result<Committed, CommitError> {
        let value = value.into();
        if row >= self.rows.len() {
            return Err(CommitError::RowOutOfBounds {
                row,
                rows: self.rows.len(),
            });
        }

        if column == Column::Grn {
            for r in &mut self.rows[row..] {
                r.grn = value.clone();
            }
            return Ok(Committed {
                rows: (row..self.rows.len()).collect(),
            });
        }

        if !value.is_empty() {
            for (index, other) in self.rows.iter().enumerate() {
                if index != row && other.value(column) == value.as_str() {
                    return Err(CommitError::DuplicateValue {
                        value,
                        column,
                        conflicting_row: index,
                    });
                }
            }
        }

        *self.rows[row].value_mut(column) = value;
        Ok(Committed { rows: vec![row] })
    }

    /// Check every row for empty `Code`/`Chip` cells (`Grn` is exempt).
    pub fn validate_complete(&self) -> CompletenessReport {
        let mut missing = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            for column in [Column::Code, Column::Chip] {
                if row.value(column).is_empty() {
                    missing.push(EmptyCell { row: index, column });
                }
            }
        }
        CompletenessReport { missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn grid(rows: &[(&str, &str, &str)]) -> GridStore {
        GridStore {
            rows: rows
                .iter()
                .map(|(code, chip, grn)| Row {
                    code: code.to_string(),
                    chip: chip.to_string(),
                    grn: grn.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn column_index_round_trips() {
        for column in [Column::Code, Column::Chip, Column::Grn] {
            assert_eq!(Column::from_index(column.index()), Some(column));
        }
        assert_eq!(Column::from_index(3), None);
    }

    #[test]
    fn commit_writes_a_single_identifier_cell() {
        let mut store = GridStore::with_rows(2);
        let committed = store.try_commit(1, Column::Code, "OSA7").unwrap();
        assert_eq!(committed.rows, vec![1]);
        assert_eq!(store.value(1, Column::Code), Some("OSA7"));
        assert_eq!(store.value(0, Column::Code), Some(""));
    }

    #[test]
    fn commit_out_of_bounds_is_rejected() {
        let mut store = GridStore::with_rows(2);
        assert_eq!(
            store.try_commit(2, Column::Code, "X").unwrap_err(),
            CommitError::RowOutOfBounds { row: 2, rows: 2 }
        );
    }

    #[test]
    fn duplicate_identifier_is_rejected_and_store_unchanged() {
        let mut store = grid(&[("X", "A1", ""), ("", "", ""), ("Y", "A2", "")]);
        let before = store.clone();
        assert_eq!(
            store.try_commit(2, Column::Code, "X").unwrap_err(),
            CommitError::DuplicateValue {
                value: "X".to_string(),
                column: Column::Code,
                conflicting_row: 0,
            }
        );
        assert_eq!(store, before);
    }

    #[test]
    fn duplicate_check_is_per_column() {
        // The same string in *different* columns is fine.
        let mut store = grid(&[("X", "", ""), ("", "", "")]);
        store.try_commit(1, Column::Chip, "X").unwrap();
        assert_eq!(store.value(1, Column::Chip), Some("X"));
    }

    #[test]
    fn duplicate_check_is_case_sensitive() {
        let mut store = grid(&[("osa1", "", ""), ("", "", "")]);
        store.try_commit(1, Column::Code, "OSA1").unwrap();
    }

    #[test]
    fn empty_values_never_conflict() {
        let mut store = grid(&[("", "", ""), ("", "", "")]);
        store.try_commit(1, Column::Code, "").unwrap();
        store.try_commit(0, Column::Chip, "").unwrap();
    }

    #[test]
    fn recommitting_a_rows_own_value_is_allowed() {
        let mut store = grid(&[("X", "", ""), ("Y", "", "")]);
        store.try_commit(0, Column::Code, "X").unwrap();
    }

    #[test]
    fn grn_commit_fills_down() {
        let mut store = GridStore::with_rows(4);
        let committed = store.try_commit(1, Column::Grn, "G1").unwrap();
        assert_eq!(committed.rows, vec![1, 2, 3]);
        assert_eq!(store.value(0, Column::Grn), Some(""));
        for row in 1..4 {
            assert_eq!(store.value(row, Column::Grn), Some("G1"));
        }
    }

    #[test]
    fn earlier_grn_commit_overwrites_only_from_its_row_down() {
        let mut store = GridStore::with_rows(4);
        store.try_commit(2, Column::Grn, "G1").unwrap();
        store.try_commit(1, Column::Grn, "G2").unwrap();
        assert_eq!(store.value(0, Column::Grn), Some(""));
        assert_eq!(store.value(1, Column::Grn), Some("G2"));
        assert_eq!(store.value(2, Column::Grn), Some("G2"));
        assert_eq!(store.value(3, Column::Grn), Some("G2"));
    }

    #[test]
    fn grn_commit_never_checks_duplicates() {
        let mut store = grid(&[("", "", "G1"), ("", "", "")]);
        store.try_commit(1, Column::Grn, "G1").unwrap();
    }

    #[test]
    fn validate_complete_reports_empty_cells_in_row_major_order() {
        let store = grid(&[("OSA1", "", ""), ("", "", ""), ("OSA3", "A3", "")]);
        let report = store.validate_complete();
        assert!(!report.is_complete());
        assert_eq!(
            report.missing,
            vec![
                EmptyCell {
                    row: 0,
                    column: Column::Chip
                },
                EmptyCell {
                    row: 1,
                    column: Column::Code
                },
                EmptyCell {
                    row: 1,
                    column: Column::Chip
                },
            ]
        );
    }

    #[test]
    fn validate_complete_exempts_the_grn_column() {
        let store = grid(&[("OSA1", "A1", ""), ("OSA2", "A2", "")]);
        assert!(store.validate_complete().is_complete());
    }

    #[test]
    fn validate_complete_on_an_empty_table_is_complete() {
        // "Ready to export" vs "nothing to export" is the caller's call; the
        // exporter separately rejects empty tables.
        assert!(GridStore::new().validate_complete().is_complete());
    }

    /// A random commit script. Duplicate rejections are expected along the
    /// way; the invariant is about what successful commits leave behind.
    fn commit_script() -> impl Strategy<Value = Vec<(usize, usize, String)>> {
        proptest::collection::vec(
            (0usize..6, 0usize..3, "[A-D0-9]{0,2}"),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn successful_commits_never_leave_duplicate_identifiers(script in commit_script()) {
            let mut store = GridStore::with_rows(6);
            for (row, column, value) in script {
                let column = Column::from_index(column).unwrap();
                let _ = store.try_commit(row, column, value);
            }
            for column in [Column::Code, Column::Chip] {
                for (i, a) in store.rows().iter().enumerate() {
                    for b in &store.rows()[i + 1..] {
                        if a.value(column) == b.value(column) {
                            prop_assert!(a.value(column).is_empty());
                        }
                    }
                }
            }
        }

        #[test]
        fn grn_commit_leaves_the_tail_uniform(script in commit_script(), last_row in 0usize..6) {
            let mut store = GridStore::with_rows(6);
            for (row, column, value) in script {
                let column = Column::from_index(column).unwrap();
                let _ = store.try_commit(row, column, value);
            }
            store.try_commit(last_row, Column::Grn, "FINAL").unwrap();
            for row in last_row..store.row_count() {
                prop_assert_eq!(store.value(row, Column::Grn), Some("FINAL"));
            }
        }
    }
}
