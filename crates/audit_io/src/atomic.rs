//! Atomic file writes and canonical-JSON hashing.
//!
//! Every artefact write goes through a `.tmp` sibling, `sync_all`, then
//! `rename` into place, so a crash mid-write never leaves a half-written
//! file at the real path.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::{IoError, IoResult};

pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn commit_tmp(tmp: &Path, dest: &Path) -> IoResult<()> {
    std::fs::rename(tmp, dest).map_err(|e| IoError::Path { path: dest.display().to_string(), source: e })
}

/// Write `bytes` to `path` atomically (`.tmp`, fsync, rename).
pub fn write_bytes_atomically(path: &Path, bytes: &[u8]) -> IoResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| IoError::Path { path: parent.display().to_string(), source: e })?;
    }
    let tmp = tmp_path_for(path);
    {
        let mut file = std::fs::File::create(&tmp).map_err(|e| IoError::Path { path: tmp.display().to_string(), source: e })?;
        file.write_all(bytes).map_err(|e| IoError::Path { path: tmp.display().to_string(), source: e })?;
        file.sync_all().map_err(|e| IoError::Path { path: tmp.display().to_string(), source: e })?;
    }
    commit_tmp(&tmp, path)
}

/// Recursively sort object keys so two semantically-identical JSON values
/// always serialize to the same bytes.
pub fn canonicalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> =
                map.iter().map(|(k, v)| (k.clone(), canonicalize_value(v))).collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_value).collect()),
        other => other.clone(),
    }
}

/// Serialize `value` as canonical, LF-terminated JSON bytes.
pub fn to_canonical_bytes(value: &Value) -> IoResult<Vec<u8>> {
    let canonical = canonicalize_value(value);
    let mut out = serde_json::to_vec(&canonical).map_err(|e| IoError::Json { path: "<value>".to_string(), source: e })?;
    out.push(b'\n');
    Ok(out)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
