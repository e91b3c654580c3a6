//! sheetsync - keep an in-memory table in sync with a remote spreadsheet range
//!
//! Load a table once, edit it freely, and save back only the smallest
//! rectangle covering what changed:
//! - Baseline/working snapshot with a guarded cell-by-cell diff
//! - Jagged rows and non-array ("absent") rows and tables
//! - Injected fetch/write collaborator, so any backend can sit behind it
//! - Google Sheets v4 client with service account (JWT bearer) auth
//!
//! # Usage
//!
//! ```no_run
//! use sheetsync::{ClientConfig, ServiceAccountAuth, ServiceAccountKey, SheetsClient};
//!
//! # fn main() -> sheetsync::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let key = ServiceAccountKey::from_env_value(&std::env::var("GOOGLE_SERVICE_ACCOUNT").unwrap_or_default())?;
//! let auth = ServiceAccountAuth::new(key, vec![sheetsync::SPREADSHEETS_SCOPE.to_string()], &config)?;
//! let client = SheetsClient::new(auth, &config)?;
//!
//! let mut sheet = client.open("1bCjxjp...", "Test234")?;
//! sheet.values_mut().set(5, 0, "this is 5,0");
//! sheet.save()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cell_ref;
pub mod config;
pub mod error;
pub mod rect;
pub mod sheets;
pub mod snapshot;
pub mod sync;
pub mod types;

pub use auth::{ServiceAccountAuth, ServiceAccountKey, StaticToken, TokenProvider};
pub use cell_ref::SheetRange;
pub use config::ClientConfig;
pub use error::{Result, SheetSyncError};
pub use rect::Rect;
pub use sheets::{SheetTab, SheetsClient, SPREADSHEETS_SCOPE};
pub use snapshot::GridSnapshot;
pub use sync::{RemoteTable, SyncedSheet};
pub use types::*;
