use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use super::CellValue;

/// One row slot of a [`Table`].
///
/// A slot is either array-shaped (an ordered list of cells, possibly empty)
/// or absent. Absent and empty are different shapes: the diff treats a
/// change between them as a full-row change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    cells: Option<Vec<CellValue>>,
}

impl Row {
    #[must_use]
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells: Some(cells) }
    }

    #[must_use]
    pub fn absent() -> Self {
        Self { cells: None }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.cells.is_none()
    }

    /// The cells, or `None` for an absent slot.
    #[must_use]
    pub fn cells(&self) -> Option<&[CellValue]> {
        self.cells.as_deref()
    }

    /// Number of cells; 0 for an absent slot.
    #[must_use]
    pub fn width(&self) -> usize {
        self.cells.as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn get(&self, col: usize) -> Option<&CellValue> {
        self.cells.as_ref().and_then(|cells| cells.get(col))
    }

    /// Mutable cells, turning an absent slot into an empty row first.
    pub fn cells_mut(&mut self) -> &mut Vec<CellValue> {
        self.cells.get_or_insert_with(Vec::new)
    }
}

impl From<Vec<CellValue>> for Row {
    fn from(cells: Vec<CellValue>) -> Self {
        Self::new(cells)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cells = deserializer.deserialize_any(ArrayOrAbsent::<CellValue>::new())?;
        Ok(Self { cells })
    }
}

/// A jagged two-dimensional table of opaque cell values.
///
/// The table itself may be absent (for example a remote range that returned
/// no array at all). Reads out of range return `None`; writes out of range
/// extend the table with absent rows and [`CellValue::Empty`] cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Table {
    rows: Option<Vec<Row>>,
}

impl Default for Table {
    /// An empty, array-shaped table.
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Table {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows: Some(rows) }
    }

    /// A table that is not array-shaped at all.
    #[must_use]
    pub fn absent() -> Self {
        Self { rows: None }
    }

    /// Build a table from nested vectors of anything convertible to a cell.
    #[must_use]
    pub fn from_values<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<CellValue>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| Row::new(row.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.rows.is_none()
    }

    /// All row slots; empty for an absent table.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        self.rows.as_deref().unwrap_or_default()
    }

    /// Number of row slots; 0 for an absent table.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows().len()
    }

    /// Width of the widest array-shaped row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows().iter().map(Row::width).max().unwrap_or(0)
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows().get(row)
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.row(row).and_then(|r| r.get(col))
    }

    /// Mutable row slot, extending the table with absent rows as needed.
    #[allow(clippy::indexing_slicing)] // resized above
    pub fn row_mut(&mut self, row: usize) -> &mut Row {
        let rows = self.rows.get_or_insert_with(Vec::new);
        if rows.len() <= row {
            rows.resize_with(row + 1, Row::absent);
        }
        &mut rows[row]
    }

    /// Mutable cells of a row, extending the table and materializing an
    /// absent slot as an empty row.
    pub fn cells_mut(&mut self, row: usize) -> &mut Vec<CellValue> {
        self.row_mut(row).cells_mut()
    }

    /// Mutable cell, extending the row with [`CellValue::Empty`] as needed.
    #[allow(clippy::indexing_slicing)] // resized above
    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut CellValue {
        let cells = self.cells_mut(row);
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        &mut cells[col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) {
        *self.cell_mut(row, col) = value.into();
    }

    pub fn push_row(&mut self, row: impl Into<Row>) {
        self.rows.get_or_insert_with(Vec::new).push(row.into());
    }

    /// Drop every row at or after `height`.
    pub fn truncate(&mut self, height: usize) {
        if let Some(rows) = self.rows.as_mut() {
            rows.truncate(height);
        }
    }

    /// Replace a row with an absent slot. Out-of-range rows are left alone.
    pub fn clear_row(&mut self, row: usize) {
        if let Some(slot) = self.rows.as_mut().and_then(|rows| rows.get_mut(row)) {
            *slot = Row::absent();
        }
    }
}

impl From<Vec<Row>> for Table {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = deserializer.deserialize_any(ArrayOrAbsent::<Row>::new())?;
        Ok(Self { rows })
    }
}

/// Accepts a JSON array as `Some(items)` and any other value as `None`.
struct ArrayOrAbsent<T>(PhantomData<T>);

impl<T> ArrayOrAbsent<T> {
    fn new() -> Self {
        Self(PhantomData)
    }
}

impl<'de, T: Deserialize<'de>> Visitor<'de> for ArrayOrAbsent<T> {
    type Value = Option<Vec<T>>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array or any non-array value")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Some(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(None)
    }
}
