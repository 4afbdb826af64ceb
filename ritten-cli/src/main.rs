//! ritten-cli: command-line client for the Rittenadministratie REST API
//!
//! Covers the same flow as the web frontend: upload an XML export, page and
//! search through the resulting session, download it as a spreadsheet and
//! clean it up afterwards.
//!
//! # Subcommands
//! - `upload <file>`: upload an XML export
//! - `data <session> [--page] [--per-page] [--search]`: browse records
//! - `download <session> [-o <path>]`: save the `.xlsx` export
//! - `sessions`: list live sessions
//! - `delete <session>`: drop a session
//! - `status`: show server health

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000/api";
const DEFAULT_PER_PAGE: u32 = 50;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "ritten-cli",
    version,
    about = "Rittenadministratie: upload, browse and export trip XML"
)]
struct Cli {
    /// API base URL including the mount path (overrides RITTEN_HTTP_URL env var)
    #[arg(long, env = "RITTEN_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload an XML export and open a session
    Upload {
        /// Path to the `.xml` file
        file: PathBuf,
    },

    /// Show a page of records from a session
    Data {
        session: String,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,

        /// Case-insensitive text to match against any field
        #[arg(short, long)]
        search: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Download a session as an Excel workbook
    Download {
        session: String,

        /// Output path (defaults to the name suggested by the server)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List live sessions
    Sessions,

    /// Delete a session
    Delete { session: String },

    /// Show server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub session_id: String,
    pub filename: String,
    pub total_records: usize,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Trip {
    pub rit_id: String,
    pub datum_tijd_registratie: String,
    #[serde(rename = "type")]
    pub trip_type: String,
    pub bestuurder_id: String,
    pub km_stand_begin: String,
    pub km_stand_eind: String,
    pub prijs: String,
    pub latitude_begin: String,
    pub longitude_begin: String,
    pub latitude_eind: String,
    pub longitude_eind: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: usize,
    pub pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct SessionInfo {
    pub filename: String,
    pub upload_time: String,
    pub total_records: usize,
}

#[derive(Debug, Deserialize)]
pub struct DataResponse {
    pub data: Vec<Trip>,
    pub pagination: Pagination,
    pub session_info: SessionInfo,
}

#[derive(Debug, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub filename: String,
    pub upload_time: String,
    pub total_records: usize,
}

#[derive(Debug, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

// ============================================================================
// Formatting
// ============================================================================

/// One trip as a single aligned line.
pub fn format_trip_line(trip: &Trip) -> String {
    format!(
        "{:<12} {:<20} {:<8} {:<12} {:>8} → {:<8} {:>10}  ({}, {}) → ({}, {})",
        trip.rit_id,
        trip.datum_tijd_registratie,
        trip.trip_type,
        trip.bestuurder_id,
        trip.km_stand_begin,
        trip.km_stand_eind,
        trip.prijs,
        trip.latitude_begin,
        trip.longitude_begin,
        trip.latitude_eind,
        trip.longitude_eind,
    )
}

/// Pull `filename=` out of a `Content-Disposition` header value.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

/// Where a download lands when no `--output` is given.
pub fn download_path(disposition: Option<&str>, session: &str) -> PathBuf {
    let name = disposition
        .and_then(filename_from_disposition)
        .and_then(|name| {
            // only keep the final component of whatever the server suggested
            Path::new(&name)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| format!("{}_output.xlsx", session));
    PathBuf::from(name)
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()?)
}

/// Turn a non-2xx response into an error carrying the server's message.
fn check(resp: Response) -> anyhow::Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or(body);
    bail!("server returned {}: {}", status, message)
}

fn do_upload(server: &str, file: &Path) -> anyhow::Result<()> {
    let form = reqwest::blocking::multipart::Form::new()
        .file("file", file)
        .with_context(|| format!("cannot read {}", file.display()))?;

    let url = format!("{}/upload", server);
    let resp = check(client()?.post(&url).multipart(form).send()?)?;
    let upload: UploadResponse = resp.json()?;

    println!("{}", upload.message);
    println!("Session:  {}", upload.session_id);
    println!("File:     {}", upload.filename);
    println!("Records:  {}", upload.total_records);
    Ok(())
}

fn do_data(
    server: &str,
    session: &str,
    page: u32,
    per_page: u32,
    search: Option<&str>,
    json_output: bool,
) -> anyhow::Result<()> {
    let url = format!("{}/data/{}", server, session);
    let mut query = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
    if let Some(s) = search {
        query.push(("search", s.to_string()));
    }

    let resp = check(client()?.get(&url).query(&query).send()?)?;

    if json_output {
        let body: serde_json::Value = resp.json()?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let data: DataResponse = resp.json()?;
    println!(
        "{} (uploaded {}, {} records)",
        data.session_info.filename, data.session_info.upload_time, data.session_info.total_records
    );
    if data.data.is_empty() {
        eprintln!("No records on this page");
    }
    for trip in &data.data {
        println!("{}", format_trip_line(trip));
    }
    println!(
        "Page {}/{} ({} per page, {} matching)",
        data.pagination.page, data.pagination.pages, data.pagination.per_page, data.pagination.total
    );
    Ok(())
}

fn do_download(server: &str, session: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let url = format!("{}/download/{}", server, session);
    let resp = check(client()?.get(&url).send()?)?;

    let disposition = resp
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let path = output.unwrap_or_else(|| download_path(disposition.as_deref(), session));

    let bytes = resp.bytes()?;
    std::fs::write(&path, &bytes).with_context(|| format!("cannot write {}", path.display()))?;
    println!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn do_sessions(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/sessions", server);
    let list: SessionsResponse = check(client()?.get(&url).send()?)?.json()?;

    if list.sessions.is_empty() {
        eprintln!("No active sessions");
        return Ok(());
    }
    for s in &list.sessions {
        println!(
            "{}  {:<30} {:>7} records  {}",
            s.session_id, s.filename, s.total_records, s.upload_time
        );
    }
    Ok(())
}

fn do_delete(server: &str, session: &str) -> anyhow::Result<()> {
    let url = format!("{}/sessions/{}", server, session);
    let body: serde_json::Value = check(client()?.delete(&url).send()?)?.json()?;
    println!("{}", body["message"].as_str().unwrap_or("deleted"));
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client()?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Server:   {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:  {}", body["version"].as_str().unwrap_or("?"));
            println!("Sessions: {}", body["sessions"]);
        }
        Ok(r) => {
            eprintln!("ritten-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("ritten-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Upload { file } => do_upload(&server, &file),
        Commands::Data {
            session,
            page,
            per_page,
            search,
            json,
        } => do_data(&server, &session, page, per_page, search.as_deref(), json),
        Commands::Download { session, output } => do_download(&server, &session, output),
        Commands::Sessions => do_sessions(&server),
        Commands::Delete { session } => do_delete(&server, &session),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("ritten-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // TEST 1: filename extracted from the server's Content-Disposition
    // ========================================================================
    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition("attachment; filename=ritten_output.xlsx").as_deref(),
            Some("ritten_output.xlsx")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=\"quoted.xlsx\"").as_deref(),
            Some("quoted.xlsx")
        );
        assert_eq!(filename_from_disposition("attachment"), None);
        assert_eq!(filename_from_disposition("attachment; filename="), None);
    }

    // ========================================================================
    // TEST 2: download path falls back to the session id
    // ========================================================================
    #[test]
    fn test_download_path_fallback() {
        assert_eq!(
            download_path(Some("attachment; filename=ritten_output.xlsx"), "abc"),
            PathBuf::from("ritten_output.xlsx")
        );
        assert_eq!(download_path(None, "abc"), PathBuf::from("abc_output.xlsx"));
        assert_eq!(
            download_path(Some("attachment"), "abc"),
            PathBuf::from("abc_output.xlsx")
        );
    }

    // ========================================================================
    // TEST 3: server-suggested names cannot escape the working directory
    // ========================================================================
    #[test]
    fn test_download_path_strips_directories() {
        assert_eq!(
            download_path(Some("attachment; filename=../../etc/ritten.xlsx"), "abc"),
            PathBuf::from("ritten.xlsx")
        );
    }

    // ========================================================================
    // TEST 4: data response parses, missing trip fields default to empty
    // ========================================================================
    #[test]
    fn test_data_response_deserializes() {
        let body = serde_json::json!({
            "data": [
                {"rit_id": "R1", "type": "Taxi", "prijs": "12.50"},
                {"rit_id": "R2"}
            ],
            "pagination": {"page": 1, "per_page": 50, "total": 2, "pages": 1},
            "session_info": {
                "filename": "ritten.xml",
                "upload_time": "2026-03-14T09:26:53.589793",
                "total_records": 2
            }
        });
        let parsed: DataResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].trip_type, "Taxi");
        assert_eq!(parsed.data[1].prijs, "");
        assert_eq!(parsed.pagination.pages, 1);
        assert_eq!(parsed.session_info.total_records, 2);
    }

    // ========================================================================
    // TEST 5: trip line carries the key columns
    // ========================================================================
    #[test]
    fn test_format_trip_line() {
        let trip = Trip {
            rit_id: "R1".to_string(),
            trip_type: "Taxi".to_string(),
            km_stand_begin: "100".to_string(),
            km_stand_eind: "120".to_string(),
            prijs: "12.50".to_string(),
            ..Default::default()
        };
        let line = format_trip_line(&trip);
        assert!(line.starts_with("R1"));
        assert!(line.contains("Taxi"));
        assert!(line.contains("100 → 120"));
        assert!(line.contains("12.50"));
    }

    // ========================================================================
    // TEST 6: sessions listing parses
    // ========================================================================
    #[test]
    fn test_sessions_response_deserializes() {
        let body = serde_json::json!({
            "sessions": [{
                "session_id": "7b5c24ab-1234-4678-9abc-def012345678",
                "filename": "ritten.xml",
                "upload_time": "2026-03-14T09:26:53.589793",
                "total_records": 5
            }]
        });
        let parsed: SessionsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.sessions[0].filename, "ritten.xml");
        assert_eq!(parsed.sessions[0].total_records, 5);
    }
}
