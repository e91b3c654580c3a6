//! Baseline/working pair of a table and the rectangle diff between them.
//!
//! `GridSnapshot` owns two versions of a table:
//! - the baseline, as last loaded or saved
//! - the working copy, freely mutated by the caller
//!
//! [`GridSnapshot::diff`] computes the smallest rectangle covering every
//! position where the two disagree, including positions where only one side
//! has a row or a cell. The remote write primitive is range based, so one
//! rectangle (possibly with unchanged cells inside) beats a sparse cell list.

use log::debug;

use crate::rect::{Rect, RectBuilder};
use crate::types::{CellValue, Row, Table};

/// A table snapshot with change tracking against its last synchronized state.
#[derive(Debug, Clone, Default)]
pub struct GridSnapshot {
    baseline: Table,
    working: Table,
}

impl GridSnapshot {
    /// Create a snapshot whose baseline and working copy are both `table`.
    #[must_use]
    pub fn new(table: Table) -> Self {
        let mut snapshot = Self::default();
        snapshot.load(table);
        snapshot
    }

    /// Replace both baseline and working copy with `table`.
    pub fn load(&mut self, table: Table) {
        self.baseline.clone_from(&table);
        self.working = table;
    }

    /// The working copy.
    #[must_use]
    pub fn working(&self) -> &Table {
        &self.working
    }

    /// Mutable access to the working copy. Writes out of range extend it.
    pub fn working_mut(&mut self) -> &mut Table {
        &mut self.working
    }

    /// The table as of the last load or commit.
    #[must_use]
    pub fn baseline(&self) -> &Table {
        &self.baseline
    }

    /// Make the current working copy the new baseline.
    pub fn commit(&mut self) {
        self.baseline.clone_from(&self.working);
    }

    /// Whether the working copy differs from the baseline anywhere.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.diff().is_some()
    }

    /// Bounding rectangle of every differing position, or `None`.
    #[must_use]
    pub fn diff(&self) -> Option<Rect> {
        let working = &self.working;
        let baseline = &self.baseline;

        let height = working.height().max(baseline.height());
        let width = working.width().max(baseline.width());
        if height == 0 || width == 0 {
            return None;
        }

        // One side has no rows at all: everything the other side has changed.
        if working.is_absent() || baseline.is_absent() {
            let rect = Rect::new(0, 0, height - 1, width - 1);
            debug!("diff: one side absent, full extent {rect:?}");
            return Some(rect);
        }

        let mut builder = RectBuilder::default();
        for row in 0..height {
            match (working.row(row), baseline.row(row)) {
                (Some(w), Some(b)) => diff_row(&mut builder, row, w, b, width),
                _ => builder.include_full_row(row, width),
            }
        }

        let rect = builder.finish();
        debug!("diff: {height}x{width} tables, changed {rect:?}");
        rect
    }

    /// Copy the cells inside `rect` out of `source`, re-indexed to `(0, 0)`.
    ///
    /// Source rows that are absent or out of range come back as empty rows.
    /// Array-shaped rows come back exactly `rect.width()` cells wide, with
    /// [`CellValue::Empty`] for positions past the end of the source row.
    #[must_use]
    pub fn extract(rect: &Rect, source: &Table) -> Table {
        (rect.min_row()..=rect.max_row())
            .map(|row| match source.row(row).and_then(Row::cells) {
                Some(cells) => Row::new(
                    (rect.min_col()..=rect.max_col())
                        .map(|col| cells.get(col).cloned().unwrap_or_default())
                        .collect(),
                ),
                None => Row::new(Vec::new()),
            })
            .collect::<Vec<_>>()
            .into()
    }

    /// Extract `rect` from the working copy.
    #[must_use]
    pub fn extract_working(&self, rect: &Rect) -> Table {
        Self::extract(rect, &self.working)
    }
}

fn diff_row(builder: &mut RectBuilder, row: usize, working: &Row, baseline: &Row, width: usize) {
    match (working.cells(), baseline.cells()) {
        (Some(w), Some(b)) => {
            for col in 0..w.len().max(b.len()) {
                if !same_cell(w.get(col), b.get(col)) {
                    builder.include(row, col);
                }
            }
        }
        (None, None) => {}
        // Array-shaped on one side only: rewrite the whole row.
        _ => builder.include_full_row(row, width),
    }
}

/// Present-vs-missing is a difference; two present cells compare structurally.
fn same_cell(a: Option<&CellValue>, b: Option<&CellValue>) -> bool {
    a == b
}
