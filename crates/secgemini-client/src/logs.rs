//! Log ingestion through the logs-processor sidecar.
//!
//! A JSONL file is identified by the keyed BLAKE2s hash of its bytes. The sidecar
//! creates one table per hash; when the table already exists the upload is
//! skipped, so re-sending an identical file costs a single request. New
//! tables are filled in batches of complete lines read from fixed-size
//! chunks of the file.

use std::collections::HashMap;
use std::path::Path;

use secgemini_core::constants::logs_endpoints;
use serde_json::{Value, json};
use blake2::Blake2sMac256;
use blake2::digest::{KeyInit, Mac};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::errors::SessionError;
use crate::http::NetworkClient;

/// Key mixed into every logs hash.
pub const LOGS_HASH_KEY: &[u8] = b"secgemini";

/// Bytes read per upload batch.
pub const UPLOAD_CHUNK_SIZE: usize = 10_000_000;

const HASH_READ_SIZE: usize = 4096;

/// Outcome of [`upload_logs`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogsUpload {
    /// Keyed content hash naming the logs table.
    pub logs_hash: String,
    /// Whether the sidecar created a new table. `false` means the file was
    /// uploaded before and nothing was sent.
    pub table_created: bool,
    /// Lines the sidecar reported as inserted.
    pub inserted_log_lines: u64,
}

/// BLAKE2s-256 of the file at `path` keyed with [`LOGS_HASH_KEY`], lowercase hex.
pub async fn compute_file_hash(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = <Blake2sMac256 as KeyInit>::new_from_slice(LOGS_HASH_KEY)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let mut buf = vec![0u8; HASH_READ_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hash = format!("{:x}", hasher.finalize().into_bytes());
    debug!(path = %path.display(), logs_hash = %hash, "computed logs hash");
    Ok(hash)
}

/// Split `buffer + chunk` into complete lines.
///
/// Lines keep their trailing `\n`. The incomplete tail is returned as the
/// buffer for the next chunk.
pub fn parse_chunk(chunk: &[u8], mut buffer: Vec<u8>) -> (Vec<String>, Vec<u8>) {
    buffer.extend_from_slice(chunk);
    let Some(last_newline) = buffer.iter().rposition(|&b| b == b'\n') else {
        return (Vec::new(), buffer);
    };
    let rest = buffer.split_off(last_newline + 1);
    let lines = String::from_utf8_lossy(&buffer)
        .split_inclusive('\n')
        .map(str::to_owned)
        .collect();
    (lines, rest)
}

/// Create the logs table for `path` and upload its lines if the table is new.
pub async fn upload_logs(
    client: &NetworkClient,
    path: &Path,
    can_log: bool,
    custom_fields_mapping: Option<&HashMap<String, String>>,
) -> Result<LogsUpload, SessionError> {
    upload_logs_in_chunks(client, path, can_log, custom_fields_mapping, UPLOAD_CHUNK_SIZE).await
}

pub(crate) async fn upload_logs_in_chunks(
    client: &NetworkClient,
    path: &Path,
    can_log: bool,
    custom_fields_mapping: Option<&HashMap<String, String>>,
    chunk_size: usize,
) -> Result<LogsUpload, SessionError> {
    let io_error = |source| SessionError::Io {
        path: path.display().to_string(),
        source,
    };
    let logs_hash = compute_file_hash(path).await.map_err(io_error)?;
    let can_log_param = if can_log { "true" } else { "false" };

    info!(logs_hash = %logs_hash, can_log, "creating logs table");
    let resp = client
        .post_query(
            logs_endpoints::CREATE_LOGS_TABLE,
            &[("logs_hash", logs_hash.as_str()), ("can_log", can_log_param)],
            None,
        )
        .await;
    if !resp.ok {
        return Err(SessionError::Http {
            operation: "create logs table",
            message: resp.error_message,
        });
    }

    let table_created = resp.data.get("table_created").and_then(Value::as_bool) == Some(true);
    let mut upload = LogsUpload {
        logs_hash,
        table_created,
        inserted_log_lines: 0,
    };
    if !table_created {
        warn!(logs_hash = %upload.logs_hash, response = %resp.data, "logs table already exists, skipping upload");
        return Ok(upload);
    }

    let mut file = tokio::fs::File::open(path).await.map_err(io_error)?;
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut buffer = Vec::new();
    loop {
        let n = file.read(&mut chunk).await.map_err(io_error)?;
        let lines = if n == 0 {
            // Final line without a trailing newline.
            if buffer.is_empty() {
                break;
            }
            vec![String::from_utf8_lossy(&std::mem::take(&mut buffer)).into_owned()]
        } else {
            let (lines, rest) = parse_chunk(&chunk[..n], std::mem::take(&mut buffer));
            buffer = rest;
            lines
        };
        if lines.is_empty() {
            continue;
        }

        info!(lines = lines.len(), logs_hash = %upload.logs_hash, "uploading log lines");
        let mut payload = json!({
            "logs_hash": upload.logs_hash,
            "can_log": can_log,
            "log_lines": lines,
        });
        if let Some(mapping) = custom_fields_mapping.filter(|m| !m.is_empty()) {
            payload["custom_fields_mapping"] = json!(mapping);
        }
        let resp = client.post(logs_endpoints::UPLOAD_LOGS, &payload).await;
        if !resp.ok {
            return Err(SessionError::Http {
                operation: "upload logs",
                message: resp.error_message,
            });
        }
        upload.inserted_log_lines += resp.data.get("inserted_log_lines").and_then(Value::as_u64).unwrap_or(0);
    }

    info!(
        logs_hash = %upload.logs_hash,
        inserted_log_lines = upload.inserted_log_lines,
        "logs upload complete"
    );
    Ok(upload)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
