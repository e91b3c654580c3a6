//! Google Sheets v4 REST client and the [`RemoteTable`] binding for one tab.
//!
//! Only the calls the sync engine needs are covered: read a range, write a
//! range, add a tab, create a spreadsheet. Every request carries a bearer
//! token from the injected [`TokenProvider`].

use log::{debug, info, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::TokenProvider;
use crate::cell_ref::SheetRange;
use crate::config::ClientConfig;
use crate::error::{Result, SheetSyncError};
use crate::sync::{RemoteTable, SyncedSheet};
use crate::types::{CellValue, Row, Table};

/// OAuth scope granting read/write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Body of a `values.get` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    /// Missing when the range holds no data.
    #[serde(default)]
    values: Table,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    add_sheet: Option<AddSheetReply>,
}

#[derive(Debug, Deserialize)]
struct AddSheetReply {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

/// Authenticated client for the Sheets REST API.
#[derive(Debug)]
pub struct SheetsClient<A> {
    auth: A,
    http: Client,
    base_url: Url,
}

impl<A: TokenProvider> SheetsClient<A> {
    pub fn new(auth: A, config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.sheets_base_url)
            .map_err(|e| SheetSyncError::Config(format!("sheets base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetSyncError::Config(format!(
                "sheets base URL {base_url} cannot hold a path"
            )));
        }
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            auth,
            http,
            base_url,
        })
    }

    #[must_use]
    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// Load `range` of a spreadsheet into a synchronized table.
    ///
    /// `range` is a tab name optionally anchored at a cell, e.g. `Data` or
    /// `Data!B3`. A missing tab is created and comes back empty.
    pub fn open(&self, spreadsheet_id: &str, range: &str) -> Result<SyncedSheet<SheetTab<'_, A>>> {
        let range: SheetRange = range.parse()?;
        SyncedSheet::open(SheetTab::new(self, spreadsheet_id, range))
    }

    /// Read a range. `Ok(None)` means the range does not exist (HTTP 400).
    pub fn fetch_values(&self, spreadsheet_id: &str, range: &str) -> Result<Option<Table>> {
        let fetch_err = |reason: String| SheetSyncError::Fetch {
            range: range.to_string(),
            reason,
        };

        let url = self.endpoint(&[spreadsheet_id, "values", range])?;
        let (status, body) = self
            .send(self.http.get(url))
            .map_err(|e| fetch_err(e.to_string()))?;

        if status.is_success() {
            let table = decode_value_range(&body).map_err(|e| fetch_err(e.to_string()))?;
            debug!("fetched {range}: {} rows", table.height());
            Ok(Some(table))
        } else if status == StatusCode::BAD_REQUEST {
            debug!("{range} not found: {body}");
            Ok(None)
        } else {
            Err(fetch_err(format!("status {status}: {body}")))
        }
    }

    /// Overwrite the footprint of `values` starting at the top-left of `range`.
    pub fn write_values(&self, spreadsheet_id: &str, range: &str, values: &Table) -> Result<()> {
        self.put_values(spreadsheet_id, range, values, values.width())
    }

    /// Like [`SheetsClient::write_values`], but rows without cells are
    /// blanked `clear_width` cells wide.
    pub fn write_values_clearing(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &Table,
        clear_width: usize,
    ) -> Result<()> {
        self.put_values(spreadsheet_id, range, values, clear_width)
    }

    fn put_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &Table,
        clear_width: usize,
    ) -> Result<()> {
        let write_err = |reason: String| SheetSyncError::Write {
            range: range.to_string(),
            reason,
        };

        let mut url = self.endpoint(&[spreadsheet_id, "values", range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let request = self.http.put(url).json(&write_body(values, clear_width));
        let (status, body) = self.send(request).map_err(|e| write_err(e.to_string()))?;

        if !status.is_success() {
            return Err(write_err(format!("status {status}: {body}")));
        }
        info!("wrote {} rows to {range}", values.height());
        Ok(())
    }

    /// Add a tab titled `title`, returning its numeric sheet id.
    pub fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<i64> {
        const OPERATION: &str = "adding tab";

        let url = self.endpoint(&[&format!("{spreadsheet_id}:batchUpdate")])?;
        let request = self.http.post(url).json(&json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        }));
        let body = self.send_ok(request, OPERATION)?;

        let sheet_id = decode_add_sheet(&body)?.ok_or_else(|| SheetSyncError::Api {
            operation: OPERATION,
            reason: format!("no addSheet reply for {title:?}"),
        })?;
        info!("added tab {title:?} (sheet id {sheet_id}) to {spreadsheet_id}");
        Ok(sheet_id)
    }

    /// Create a new spreadsheet, returning its id.
    pub fn create_spreadsheet(&self, title: &str) -> Result<String> {
        let url = self.endpoint(&[])?;
        let request = self
            .http
            .post(url)
            .json(&json!({ "properties": { "title": title } }));
        let body = self.send_ok(request, "creating spreadsheet")?;

        let created: CreatedSpreadsheet = serde_json::from_str(&body)?;
        info!("created spreadsheet {title:?}: {}", created.spreadsheet_id);
        Ok(created.spreadsheet_id)
    }

    /// `base_url` with `segments` appended as percent-encoded path segments.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SheetSyncError::Config("sheets base URL cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let token = self.auth.bearer_token()?;
        let response = request.bearer_auth(token).send()?;
        let status = response.status();
        let body = response.text()?;
        Ok((status, body))
    }

    fn send_ok(&self, request: RequestBuilder, operation: &'static str) -> Result<String> {
        let api_err = |reason: String| SheetSyncError::Api { operation, reason };
        let (status, body) = self.send(request).map_err(|e| api_err(e.to_string()))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(api_err(format!("status {status}: {body}")))
        }
    }
}

/// One range of one spreadsheet, as a [`RemoteTable`].
///
/// Remembers how wide the remote table is known to be, so that rows removed
/// locally are blanked across everything the remote may still hold.
#[derive(Debug)]
pub struct SheetTab<'c, A> {
    client: &'c SheetsClient<A>,
    spreadsheet_id: String,
    range: SheetRange,
    known_width: usize,
}

impl<'c, A: TokenProvider> SheetTab<'c, A> {
    pub fn new(client: &'c SheetsClient<A>, spreadsheet_id: impl Into<String>, range: SheetRange) -> Self {
        Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
            range,
            known_width: 0,
        }
    }

    #[must_use]
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    #[must_use]
    pub fn range(&self) -> &SheetRange {
        &self.range
    }

    /// Widest remote row seen so far, in table columns.
    #[must_use]
    pub fn known_width(&self) -> usize {
        self.known_width
    }
}

impl<A: TokenProvider> RemoteTable for SheetTab<'_, A> {
    fn fetch(&mut self) -> Result<Table> {
        let fetch_range = self.range.fetch_range();
        let Some(table) = self.client.fetch_values(&self.spreadsheet_id, &fetch_range)? else {
            let tab = self.range.tab_name();
            warn!("{fetch_range} not found, adding tab {tab:?}");
            self.client
                .add_sheet(&self.spreadsheet_id, tab)
                .map_err(|e| SheetSyncError::Fetch {
                    range: fetch_range.clone(),
                    reason: e.to_string(),
                })?;
            self.known_width = 0;
            return Ok(Table::default());
        };

        let table = if self.range.fetches_whole_tab() {
            let (rows, cols) = self.range.origin();
            shift_origin(table, rows, cols)
        } else {
            table
        };
        self.known_width = table.width();
        Ok(table)
    }

    fn write(&mut self, origin_row: usize, origin_col: usize, values: &Table) -> Result<()> {
        let range = self.range.cell_a1(origin_row, origin_col);
        let clear_width = self
            .known_width
            .saturating_sub(origin_col)
            .max(values.width());
        self.client
            .write_values_clearing(&self.spreadsheet_id, &range, values, clear_width)?;
        self.known_width = self.known_width.max(origin_col + values.width());
        Ok(())
    }
}

fn decode_value_range(body: &str) -> serde_json::Result<Table> {
    let value_range: ValueRange = serde_json::from_str(body)?;
    Ok(value_range.values)
}

fn decode_add_sheet(body: &str) -> Result<Option<i64>> {
    let response: BatchUpdateResponse = serde_json::from_str(body)?;
    Ok(response
        .replies
        .into_iter()
        .find_map(|reply| reply.add_sheet)
        .map(|reply| reply.properties.sheet_id))
}

/// Request body for `values.update`.
///
/// Every row is padded to the widest row with `""` and empty cells are sent
/// as `""`: the API skips `null`, and the write has to overwrite its whole
/// footprint. A row without cells stands for a row that no longer exists
/// locally and is blanked `clear_width` cells wide.
pub(crate) fn write_body(values: &Table, clear_width: usize) -> Value {
    let width = values.width();
    let rows: Vec<Vec<Value>> = values
        .rows()
        .iter()
        .map(|row| {
            let cells = row.cells().unwrap_or_default();
            let target = if cells.is_empty() {
                width.max(clear_width)
            } else {
                width
            };
            let mut out: Vec<Value> = cells.iter().map(cell_to_json).collect();
            out.resize(target, Value::String(String::new()));
            out
        })
        .collect();
    json!({ "majorDimension": "ROWS", "values": rows })
}

fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Empty => Value::String(String::new()),
        CellValue::Bool(b) => Value::Bool(*b),
        // NaN and infinities have no JSON form; the cell is blanked.
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map_or_else(|| Value::String(String::new()), Value::Number),
        CellValue::Text(s) => Value::String(s.clone()),
        // A cell holds a scalar; structured values travel as their JSON text.
        CellValue::Nested(_) | CellValue::Object(_) => {
            Value::String(serde_json::to_string(cell).unwrap_or_default())
        }
    }
}

/// Drop the first `rows` rows and the first `cols` cells of every row.
fn shift_origin(table: Table, rows: usize, cols: usize) -> Table {
    if table.is_absent() || (rows == 0 && cols == 0) {
        return table;
    }
    table
        .rows()
        .iter()
        .skip(rows)
        .map(|row| match row.cells() {
            Some(cells) => Row::new(cells.iter().skip(cols).cloned().collect()),
            None => Row::absent(),
        })
        .collect::<Vec<_>>()
        .into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    fn client(base: &str) -> SheetsClient<StaticToken> {
        let config = ClientConfig {
            sheets_base_url: base.to_string(),
            ..ClientConfig::default()
        };
        SheetsClient::new(StaticToken::new("t"), &config).unwrap()
    }

    #[test]
    fn test_values_endpoint_encodes_range() {
        let client = client("https://sheets.googleapis.com/v4/spreadsheets/");
        let url = client.endpoint(&["abc", "values", "'My Tab'!B3"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20Tab'!B3"
        );
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let client = client("http://localhost:8080/v4/spreadsheets");
        let url = client.endpoint(&["abc:batchUpdate"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v4/spreadsheets/abc:batchUpdate");
        let url = client.endpoint(&[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v4/spreadsheets");
    }

    #[test]
    fn test_bad_base_url_is_config_error() {
        let config = ClientConfig {
            sheets_base_url: "not a url".into(),
            ..ClientConfig::default()
        };
        let err = SheetsClient::new(StaticToken::new("t"), &config).unwrap_err();
        assert!(matches!(err, SheetSyncError::Config(_)));
    }

    #[test]
    fn test_decode_value_range() {
        let table = decode_value_range(
            r#"{"range": "Test234!A1:Z1000", "majorDimension": "ROWS", "values": [["x", "y"], ["z"]]}"#,
        )
        .unwrap();
        assert_eq!(table, Table::from_values(vec![vec!["x", "y"], vec!["z"]]));
    }

    #[test]
    fn test_decode_value_range_with_object_cell() {
        let table = decode_value_range(r#"{"values": [["a", {"k": 1}]]}"#).unwrap();
        assert_eq!(table.get(0, 0), Some(&CellValue::from("a")));
        assert!(matches!(table.get(0, 1), Some(CellValue::Object(_))));
    }

    #[test]
    fn test_decode_value_range_without_values_is_empty() {
        let table = decode_value_range(r#"{"range": "Test234!A1:Z1000", "majorDimension": "ROWS"}"#)
            .unwrap();
        assert!(!table.is_absent());
        assert_eq!(table.height(), 0);
    }

    #[test]
    fn test_write_body_pads_footprint() {
        let values = Table::new(vec![
            Row::new(vec!["Z".into(), CellValue::Empty, 3.into()]),
            Row::new(vec![]),
            Row::absent(),
            Row::new(vec![true.into()]),
        ]);
        assert_eq!(
            write_body(&values, 0),
            json!({
                "majorDimension": "ROWS",
                "values": [["Z", "", 3.0], ["", "", ""], ["", "", ""], [true, "", ""]]
            })
        );
    }

    #[test]
    fn test_write_body_nested_cell_as_text() {
        let values = Table::from_values([[CellValue::Nested(vec![1.into(), "a".into()])]]);
        assert_eq!(write_body(&values, 0)["values"], json!([["[1.0,\"a\"]"]]));
    }

    #[test]
    fn test_write_body_blanks_removed_rows_to_clear_width() {
        // Two trailing rows deleted from a table two columns wide.
        let values = Table::new(vec![Row::new(vec![]), Row::new(vec![])]);
        assert_eq!(write_body(&values, 0)["values"], json!([[], []]));
        assert_eq!(
            write_body(&values, 2)["values"],
            json!([["", ""], ["", ""]])
        );
    }

    #[test]
    fn test_write_body_clear_width_leaves_populated_rows_alone() {
        let values = Table::new(vec![Row::new(vec!["a".into()]), Row::absent()]);
        assert_eq!(write_body(&values, 3)["values"], json!([["a"], ["", "", ""]]));
    }

    #[test]
    fn test_write_body_blanks_non_finite_numbers() {
        let values = Table::from_values([[f64::NAN, f64::INFINITY, 1.5]]);
        assert_eq!(write_body(&values, 0)["values"], json!([["", "", 1.5]]));
    }

    #[test]
    fn test_write_body_object_cell_as_text() {
        let cell: CellValue = serde_json::from_str(r#"{"k": 1}"#).unwrap();
        let values = Table::from_values([[cell]]);
        assert_eq!(write_body(&values, 0)["values"], json!([["{\"k\":1}"]]));
    }

    #[test]
    fn test_decode_add_sheet_reply() {
        let body = r#"{"spreadsheetId": "abc", "replies": [{"addSheet": {"properties": {"sheetId": 42, "title": "Test234"}}}]}"#;
        assert_eq!(decode_add_sheet(body).unwrap(), Some(42));
        assert_eq!(decode_add_sheet(r#"{"replies": [{}]}"#).unwrap(), None);
    }

    #[test]
    fn test_shift_origin_drops_leading_rows_and_columns() {
        let table = Table::new(vec![
            Row::new(vec!["".into(), "".into()]),
            Row::new(vec!["".into(), "a".into(), "b".into()]),
            Row::absent(),
        ]);
        let shifted = shift_origin(table, 1, 1);
        assert_eq!(
            shifted,
            Table::new(vec![Row::new(vec!["a".into(), "b".into()]), Row::absent()])
        );
    }
}
