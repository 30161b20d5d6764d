// {{{ Copyright (c) Paul R. Tagliamonte <paultag@debian.org>, 2024
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE. }}}

//! A resumable, append-only per-file progress ledger.
//!
//! Each stage (validate/encrypt/decrypt/upload/download) gets its own
//! `.cjson` file: one JSON object per line, indexed by `(absolute_path,
//! mtime, size)` with the file's declared metadata carried alongside and
//! compared field-by-field. A file whose identity or declared metadata has
//! changed since the last recorded line is treated as not-yet-processed, so
//! a resumed run recomputes exactly the files that changed or were never
//! finished -- including recovering from a log truncated mid-write.

use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Identity of a file at the moment a ledger entry was written: its path,
/// last-modified time (as seconds since the epoch), and size. If any of
/// these differ from what's on disk now, the entry is stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileKey {
    /// Absolute path to the file this entry describes.
    pub path: PathBuf,
    /// Last-modified time, seconds since the Unix epoch.
    pub mtime: u64,
    /// Size in bytes.
    pub size: u64,
}

impl FileKey {
    /// Build a [FileKey] by `stat`-ing `path`.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let mtime = meta
            .modified()?
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Ok(Self {
            path: canonicalize_lossy(path),
            mtime,
            size: meta.len(),
        })
    }
}

/// Canonicalize `path`, falling back to the path as given if it doesn't
/// currently exist on disk (e.g. a deleted file still named in `keep`).
fn canonicalize_lossy(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_owned())
}

#[derive(Serialize, Deserialize)]
struct Entry<S, M> {
    key: FileKey,
    metadata: M,
    state: S,
}

/// An append-only JSON-lines ledger of per-file progress for one pipeline
/// stage, generic over the state payload (`S`) and the declared-metadata
/// snapshot (`M`) recorded for each file.
pub struct FileProgressLogger<S, M> {
    path: PathBuf,
    entries: HashMap<PathBuf, (FileKey, M, S)>,
}

impl<S, M> FileProgressLogger<S, M>
where
    S: Serialize + DeserializeOwned + PartialEq + Clone,
    M: Serialize + DeserializeOwned + PartialEq + Clone,
{
    /// Open (or create) the ledger at `path`, replaying any existing
    /// entries. A trailing partial line (the log was truncated mid-write)
    /// is tolerated and simply dropped.
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let mut entries = HashMap::new();
        if path.exists() {
            let file = std::fs::File::open(&path)?;
            for (lineno, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Entry<S, M>>(&line) {
                    Ok(entry) => {
                        entries.insert(
                            entry.key.path.clone(),
                            (entry.key, entry.metadata, entry.state),
                        );
                    }
                    Err(e) => {
                        warn!(
                            "ledger {}: dropping unreadable line {}: {}",
                            path.display(),
                            lineno,
                            e
                        );
                    }
                }
            }
        }
        Ok(Self { path, entries })
    }

    /// Return the recorded state for `path` if its [FileKey] still matches
    /// what's on disk and its recorded metadata still equals `metadata`.
    pub fn get(&self, path: &Path, metadata: &M) -> Option<&S> {
        let current = FileKey::from_path(path).ok()?;
        let (key, recorded_metadata, state) = self.entries.get(&current.path)?;
        if *key == current && recorded_metadata == metadata {
            Some(state)
        } else {
            None
        }
    }

    /// Return the recorded state for `path`, or compute and persist a fresh
    /// one with `compute` if the existing entry is missing or stale.
    pub fn get_or_compute<E>(
        &mut self,
        path: &Path,
        metadata: &M,
        compute: impl FnOnce() -> Result<S, E>,
    ) -> Result<S, E>
    where
        E: From<std::io::Error>,
    {
        if let Some(state) = self.get(path, metadata) {
            debug!("ledger {}: reusing recorded state", path.display());
            return Ok(state.clone());
        }
        let state = compute()?;
        self.set(path, metadata.clone(), state.clone())?;
        Ok(state)
    }

    /// Record `state` for `path` under `metadata`, appending a new line to
    /// the ledger file.
    pub fn set(&mut self, path: &Path, metadata: M, state: S) -> std::io::Result<()> {
        let key = FileKey::from_path(path)?;
        let entry = Entry {
            key: key.clone(),
            metadata: metadata.clone(),
            state: state.clone(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        self.entries
            .insert(key.path.clone(), (key, metadata, state));
        Ok(())
    }

    /// Rewrite the ledger file retaining only entries whose path and
    /// metadata match one of `keep`'s `(path, metadata)` pairs.
    pub fn cleanup(&mut self, keep: &[(PathBuf, M)]) -> std::io::Result<()> {
        let keep: Vec<(PathBuf, &M)> = keep
            .iter()
            .map(|(path, metadata)| (canonicalize_lossy(path), metadata))
            .collect();
        self.entries.retain(|path, (_, metadata, _)| {
            keep.iter().any(|(p, m)| p == path && **m == *metadata)
        });
        let mut file = std::fs::File::create(&self.path)?;
        for (key, metadata, state) in self.entries.values() {
            let entry = Entry {
                key: key.clone(),
                metadata: metadata.clone(),
                state: state.clone(),
            };
            writeln!(file, "{}", serde_json::to_string(&entry)?)?;
        }
        Ok(())
    }
}

/// Per-file state recorded by the validation stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationState {
    /// Whether the file's checksum and size matched the declared metadata.
    pub valid: bool,
    /// SHA-256 of the file contents, hex-encoded.
    pub checksum: String,
    /// Whether the file's FASTQ/BAM sanity checks (and, for paired-end
    /// FASTQ, its R1/R2 line-count agreement) reported no errors. `true`
    /// for file types the sanity scanner doesn't apply to.
    pub sequence_data_valid: bool,
}

/// Per-file state recorded by the encryption stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncryptionState {
    /// Whether encryption completed successfully.
    pub encryption_successful: bool,
    /// SHA-256 of the encrypted (`.c4gh`) file, hex-encoded.
    pub encrypted_checksum: String,
    /// Size in bytes of the encrypted file.
    pub encrypted_size: u64,
}

/// Per-file state recorded by the decryption stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecryptionState {
    /// Whether decryption completed successfully.
    pub decryption_successful: bool,
    /// SHA-256 of the decrypted file, hex-encoded.
    pub decrypted_checksum: String,
}

/// Per-file state recorded by the upload stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadState {
    /// Whether every part of this file was uploaded and the multipart
    /// upload completed.
    pub upload_successful: bool,
    /// The S3 key this file was uploaded to.
    pub s3_key: String,
}

/// Per-file state recorded by the download stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadState {
    /// Whether the object was fully downloaded.
    pub download_successful: bool,
    /// Size in bytes of the downloaded file.
    pub size: u64,
}


// vim: foldmethod=marker
