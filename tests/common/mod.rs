//! Common test utilities: an in-memory remote table and table builders.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use sheetsync::{CellValue, RemoteTable, Result, Row, SheetSyncError, Table};

/// One recorded call to [`RemoteTable::write`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCall {
    pub origin_row: usize,
    pub origin_col: usize,
    pub values: Table,
}

/// A remote table held in memory, behaving like a spreadsheet tab.
///
/// Writes are recorded and applied to `table` so a later fetch sees them. A
/// written row without cells blanks the rest of the remote row. Fetches drop
/// trailing blank rows, as a sheet does. Failures can be queued for the next
/// fetch or write.
#[derive(Debug, Default)]
pub struct FakeRemote {
    pub table: Table,
    pub writes: Vec<WriteCall>,
    pub fetches: usize,
    fetch_failures: VecDeque<String>,
    write_failures: VecDeque<String>,
}

impl FakeRemote {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    pub fn fail_next_fetch(&mut self, reason: &str) {
        self.fetch_failures.push_back(reason.to_string());
    }

    pub fn fail_next_write(&mut self, reason: &str) {
        self.write_failures.push_back(reason.to_string());
    }

    pub fn last_write(&self) -> &WriteCall {
        self.writes.last().expect("no write recorded")
    }
}

impl RemoteTable for FakeRemote {
    fn fetch(&mut self) -> Result<Table> {
        self.fetches += 1;
        if let Some(reason) = self.fetch_failures.pop_front() {
            return Err(SheetSyncError::Fetch {
                range: "fake".into(),
                reason,
            });
        }
        Ok(without_trailing_blank_rows(&self.table))
    }

    fn write(&mut self, origin_row: usize, origin_col: usize, values: &Table) -> Result<()> {
        if let Some(reason) = self.write_failures.pop_front() {
            return Err(SheetSyncError::Write {
                range: "fake".into(),
                reason,
            });
        }
        for (r, row) in values.rows().iter().enumerate() {
            let cells = row.cells().unwrap_or_default();
            if cells.is_empty() {
                self.table.cells_mut(origin_row + r).truncate(origin_col);
                continue;
            }
            for (c, cell) in cells.iter().enumerate() {
                self.table.set(origin_row + r, origin_col + c, cell.clone());
            }
        }
        self.writes.push(WriteCall {
            origin_row,
            origin_col,
            values: values.clone(),
        });
        Ok(())
    }
}

/// `table` without the blank rows at its end.
pub fn without_trailing_blank_rows(table: &Table) -> Table {
    if table.is_absent() {
        return table.clone();
    }
    let blank = |row: &Row| row.cells().unwrap_or_default().iter().all(CellValue::is_empty);
    let keep = table.rows().iter().rposition(|row| !blank(row)).map_or(0, |i| i + 1);
    let mut trimmed = table.clone();
    trimmed.truncate(keep);
    trimmed
}

/// A table of text cells.
pub fn text_table(rows: &[&[&str]]) -> Table {
    Table::from_values(rows.iter().map(|row| row.iter().copied()))
}

/// A `rows` x `cols` table whose cells name their own position, e.g. `r2c1`.
pub fn labelled_grid(rows: usize, cols: usize) -> Table {
    Table::from_values((0..rows).map(|r| (0..cols).map(move |c| format!("r{r}c{c}"))))
}

// ============================================================================
// Scripted HTTP server
// ============================================================================

/// One request received by [`ScriptedServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query exactly as sent, e.g. `/v4/spreadsheets/abc/values/Data`.
    pub target: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

/// A local HTTP server answering each connection with the next scripted
/// `(status, body)` pair, then closing it. Once the script runs out the
/// listener is dropped, so any extra request fails to connect.
pub struct ScriptedServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptedServer {
    pub fn start(responses: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();

        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut socket, _peer)) = listener.accept() else {
                    return;
                };
                let request = read_request(&mut socket);
                recorded.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason_phrase(status),
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes());
                let _ = socket.flush();
            }
        });

        Self {
            url: format!("http://{addr}"),
            requests,
            handle: Some(handle),
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait for the script to finish and return every request.
    pub fn finish(mut self) -> Vec<RecordedRequest> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.requests()
    }
}

fn read_request(socket: &mut TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).unwrap();
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    RecordedRequest {
        method,
        target,
        headers,
        body,
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

/// Decode an `application/x-www-form-urlencoded` body.
pub fn form_fields(body: &str) -> HashMap<String, String> {
    reqwest::Url::parse(&format!("http://form.invalid/?{body}"))
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
