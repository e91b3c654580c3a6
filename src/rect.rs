//! The diff rectangle: an inclusive, zero-based bounding box of cell positions.

use serde::{Deserialize, Serialize};

/// Inclusive bounding box of changed cell positions.
///
/// An empty diff is represented as `Option::<Rect>::None`, never as a
/// degenerate rectangle. Corners are always ordered (`min <= max`), including
/// after deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Corners")]
pub struct Rect {
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
}

#[derive(Deserialize)]
struct Corners {
    min_row: usize,
    min_col: usize,
    max_row: usize,
    max_col: usize,
}

impl From<Corners> for Rect {
    fn from(c: Corners) -> Self {
        Self::new(c.min_row, c.min_col, c.max_row, c.max_col)
    }
}

impl Rect {
    /// A rectangle spanning `(min_row, min_col)..=(max_row, max_col)`.
    ///
    /// Corners are normalized so that `min <= max` on both axes.
    #[must_use]
    pub fn new(min_row: usize, min_col: usize, max_row: usize, max_col: usize) -> Self {
        Self {
            min_row: min_row.min(max_row),
            min_col: min_col.min(max_col),
            max_row: min_row.max(max_row),
            max_col: min_col.max(max_col),
        }
    }

    /// A 1x1 rectangle.
    #[must_use]
    pub fn cell(row: usize, col: usize) -> Self {
        Self::new(row, col, row, col)
    }

    #[must_use]
    pub fn min_row(&self) -> usize {
        self.min_row
    }

    #[must_use]
    pub fn min_col(&self) -> usize {
        self.min_col
    }

    #[must_use]
    pub fn max_row(&self) -> usize {
        self.max_row
    }

    #[must_use]
    pub fn max_col(&self) -> usize {
        self.max_col
    }

    /// The top-left corner as `(row, col)`.
    #[must_use]
    pub fn origin(&self) -> (usize, usize) {
        (self.min_row, self.min_col)
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.max_row - self.min_row + 1
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.max_col - self.min_col + 1
    }

    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.min_row..=self.max_row).contains(&row) && (self.min_col..=self.max_col).contains(&col)
    }
}

/// Accumulates rows and columns into a bounding box.
///
/// Rows and columns are tracked independently: a full-row change includes
/// its row once and the two edge columns, which is all a bounding box needs.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RectBuilder {
    rows: Option<(usize, usize)>,
    cols: Option<(usize, usize)>,
}

impl RectBuilder {
    pub(crate) fn include_row(&mut self, row: usize) {
        self.rows = Some(widen(self.rows, row));
    }

    pub(crate) fn include_col(&mut self, col: usize) {
        self.cols = Some(widen(self.cols, col));
    }

    pub(crate) fn include(&mut self, row: usize, col: usize) {
        self.include_row(row);
        self.include_col(col);
    }

    /// Include every column of `row` in a table `width` columns wide.
    pub(crate) fn include_full_row(&mut self, row: usize, width: usize) {
        if let Some(last) = width.checked_sub(1) {
            self.include_row(row);
            self.include_col(0);
            self.include_col(last);
        }
    }

    pub(crate) fn finish(self) -> Option<Rect> {
        let (min_row, max_row) = self.rows?;
        let (min_col, max_col) = self.cols?;
        Some(Rect::new(min_row, min_col, max_row, max_col))
    }
}

fn widen(bounds: Option<(usize, usize)>, value: usize) -> (usize, usize) {
    match bounds {
        Some((min, max)) => (min.min(value), max.max(value)),
        None => (value, value),
    }
}
