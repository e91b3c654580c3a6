//! Load/save orchestration over an injected remote table.
//!
//! `SyncedSheet` pulls a table through [`RemoteTable::fetch`], lets the caller
//! edit it in memory and pushes back only the changed rectangle through
//! [`RemoteTable::write`]. There are no retries here: a failed save leaves
//! the baseline as it was, so calling `save` again resends the same (or a
//! larger) rectangle.

use log::{debug, info, warn};

use crate::error::Result;
use crate::rect::Rect;
use crate::snapshot::GridSnapshot;
use crate::types::Table;

/// The remote side of a synchronized table.
pub trait RemoteTable {
    /// Fetch the full current table.
    ///
    /// A range that does not exist yet should come back as an empty or
    /// absent table, not as an error.
    fn fetch(&mut self) -> Result<Table>;

    /// Overwrite the rectangular footprint of `values` so that its `(0, 0)`
    /// cell lands at `(origin_row, origin_col)`.
    ///
    /// A row of `values` with no cells means the row no longer exists
    /// locally: the remote row must be blank from `origin_col` onward.
    fn write(&mut self, origin_row: usize, origin_col: usize, values: &Table) -> Result<()>;
}

impl<R: RemoteTable + ?Sized> RemoteTable for &mut R {
    fn fetch(&mut self) -> Result<Table> {
        (**self).fetch()
    }

    fn write(&mut self, origin_row: usize, origin_col: usize, values: &Table) -> Result<()> {
        (**self).write(origin_row, origin_col, values)
    }
}

/// A table kept in sync with a [`RemoteTable`].
///
/// Single writer: one load → mutate → save sequence at a time. Callers that
/// share it across threads must serialize access themselves.
#[derive(Debug)]
pub struct SyncedSheet<R> {
    remote: R,
    snapshot: GridSnapshot,
}

impl<R: RemoteTable> SyncedSheet<R> {
    /// Wrap `remote` without loading anything yet.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            snapshot: GridSnapshot::default(),
        }
    }

    /// Wrap `remote` and load it immediately.
    pub fn open(remote: R) -> Result<Self> {
        let mut sheet = Self::new(remote);
        sheet.load()?;
        Ok(sheet)
    }

    /// Replace baseline and working copy with the remote table.
    ///
    /// On error nothing is changed.
    pub fn load(&mut self) -> Result<()> {
        let table = self.remote.fetch()?;
        debug!(
            "loaded table: {} rows, {} columns",
            table.height(),
            table.width()
        );
        self.snapshot.load(table);
        Ok(())
    }

    /// Write the changed rectangle back and re-baseline.
    ///
    /// Returns the rectangle that was written, or `None` when nothing
    /// changed (no write is issued). On error the baseline is untouched.
    pub fn save(&mut self) -> Result<Option<Rect>> {
        let Some(rect) = self.snapshot.diff() else {
            debug!("save: no changes");
            return Ok(None);
        };

        let values = self.snapshot.extract_working(&rect);
        info!(
            "writing {}x{} cells at ({}, {})",
            rect.height(),
            rect.width(),
            rect.min_row(),
            rect.min_col()
        );

        if let Err(e) = self.remote.write(rect.min_row(), rect.min_col(), &values) {
            warn!("write failed, keeping baseline: {e}");
            return Err(e);
        }

        self.snapshot.commit();
        Ok(Some(rect))
    }

    /// Bounding rectangle of unsaved changes.
    #[must_use]
    pub fn diff(&self) -> Option<Rect> {
        self.snapshot.diff()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.snapshot.is_dirty()
    }

    /// The working copy.
    #[must_use]
    pub fn values(&self) -> &Table {
        self.snapshot.working()
    }

    /// Mutable working copy.
    pub fn values_mut(&mut self) -> &mut Table {
        self.snapshot.working_mut()
    }

    #[must_use]
    pub fn snapshot(&self) -> &GridSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    /// Drop the snapshot and hand back the remote.
    pub fn into_remote(self) -> R {
        self.remote
    }
}
