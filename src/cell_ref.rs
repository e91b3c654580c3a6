//! A1-notation helpers: column letters, cell references and sheet ranges.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SheetSyncError};

/// Convert a 0-indexed column into letters (`0` → `A`, `26` → `AA`).
#[must_use]
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col + 1; // Convert to 1-based
    while n > 0 {
        n -= 1;
        let letter = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ"
            .get(n % 26)
            .copied()
            .map_or('A', char::from);
        result.insert(0, letter);
        n /= 26;
    }
    result
}

/// Parse a cell reference like "B3" into 0-indexed `(row, col)`.
///
/// Letters must come before digits; `$` markers are ignored.
#[must_use]
pub fn parse_cell_ref(cell_ref: &str) -> Option<(usize, usize)> {
    let mut col: usize = 0;
    let mut row: usize = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for b in cell_ref.trim().bytes() {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = b.to_ascii_uppercase();
            col = col.checked_mul(26)?.checked_add(usize::from(upper - b'A') + 1)?;
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row.checked_mul(10)?.checked_add(usize::from(b - b'0'))?;
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((row - 1, col - 1))
}

/// A tab plus an optional anchor cell, e.g. `Data`, `Data!B3` or
/// `'My Tab'!B3:D9`.
///
/// The table's `(0, 0)` maps to the anchor (A1 when absent). Any end cell is
/// kept for fetching but does not affect write addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    tab: String,
    origin_row: usize,
    origin_col: usize,
    end: Option<String>,
}

impl SheetRange {
    /// A whole tab anchored at A1.
    #[must_use]
    pub fn tab(name: impl Into<String>) -> Self {
        Self {
            tab: name.into(),
            origin_row: 0,
            origin_col: 0,
            end: None,
        }
    }

    #[must_use]
    pub fn tab_name(&self) -> &str {
        &self.tab
    }

    #[must_use]
    pub fn origin(&self) -> (usize, usize) {
        (self.origin_row, self.origin_col)
    }

    /// The range to read the table from.
    ///
    /// An anchor without an end cell has no open-ended A1 form covering
    /// every column, so the whole tab is read and the caller drops the rows
    /// and columns before [`SheetRange::origin`].
    #[must_use]
    pub fn fetch_range(&self) -> String {
        if self.end.is_some() {
            self.to_string()
        } else {
            quote_tab(&self.tab)
        }
    }

    /// Whether [`SheetRange::fetch_range`] returns cells before the origin.
    #[must_use]
    pub fn fetches_whole_tab(&self) -> bool {
        self.end.is_none()
    }

    /// A1 address of table cell `(row, col)`, offset by the anchor.
    #[must_use]
    pub fn cell_a1(&self, row: usize, col: usize) -> String {
        format!(
            "{}!{}{}",
            quote_tab(&self.tab),
            col_to_letter(self.origin_col + col),
            self.origin_row + row + 1
        )
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tab = quote_tab(&self.tab);
        if self.origin_row == 0 && self.origin_col == 0 && self.end.is_none() {
            return f.write_str(&tab);
        }
        write!(
            f,
            "{tab}!{}{}",
            col_to_letter(self.origin_col),
            self.origin_row + 1
        )?;
        if let Some(end) = &self.end {
            write!(f, ":{end}")?;
        }
        Ok(())
    }
}

impl FromStr for SheetRange {
    type Err = SheetSyncError;

    fn from_str(s: &str) -> Result<Self> {
        let (tab, cells) = split_tab(s.trim())?;
        if tab.is_empty() {
            return Err(SheetSyncError::CellRef(format!("missing tab name in {s:?}")));
        }
        let Some(cells) = cells else {
            return Ok(Self::tab(tab));
        };

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };
        let (origin_row, origin_col) = parse_cell_ref(start)
            .ok_or_else(|| SheetSyncError::CellRef(format!("bad anchor {start:?} in {s:?}")))?;
        if let Some(end) = end {
            parse_cell_ref(end)
                .ok_or_else(|| SheetSyncError::CellRef(format!("bad end cell {end:?} in {s:?}")))?;
        }

        Ok(Self {
            tab,
            origin_row,
            origin_col,
            end: end.map(|e| e.trim().to_ascii_uppercase()),
        })
    }
}

/// Split `Tab!A1` / `'It''s'!A1` into the unquoted tab name and the cell part.
fn split_tab(s: &str) -> Result<(String, Option<&str>)> {
    let Some(quoted) = s.strip_prefix('\'') else {
        return Ok(match s.rsplit_once('!') {
            Some((tab, cells)) => (tab.to_string(), Some(cells)),
            None => (s.to_string(), None),
        });
    };

    let mut tab = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch != '\'' {
            tab.push(ch);
            continue;
        }
        if matches!(chars.peek(), Some((_, '\''))) {
            chars.next();
            tab.push('\'');
            continue;
        }
        let rest = quoted.get(idx + 1..).unwrap_or_default();
        return match rest.strip_prefix('!') {
            Some(cells) => Ok((tab, Some(cells))),
            None if rest.is_empty() => Ok((tab, None)),
            None => Err(SheetSyncError::CellRef(format!("unexpected {rest:?} after tab name"))),
        };
    }
    Err(SheetSyncError::CellRef(format!("unterminated quote in {s:?}")))
}

/// Quote a tab name for A1 notation when it is not a plain identifier.
fn quote_tab(tab: &str) -> String {
    if !tab.is_empty() && tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}
