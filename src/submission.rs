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

//! A submission on disk: the four well-known subdirectories under a
//! submission root, and the object-store key layout they map to.

use crate::errors::FileError;
use crate::metadata::validate::validate_file_path;
use crate::metadata::GrzSubmissionMetadata;
use std::path::{Path, PathBuf};

/// The four subdirectories a submission directory is made of, plus the
/// handful of well-known file names under them.
#[derive(Clone, Debug)]
pub struct SubmissionPaths {
    root: PathBuf,
}

impl SubmissionPaths {
    /// A submission rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The submission's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `metadata/metadata.json`.
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join("metadata").join("metadata.json")
    }

    /// `metadata/metadata.orig.json`, the archive stage's pre-redaction
    /// sidecar.
    pub fn metadata_orig_path(&self) -> PathBuf {
        self.root.join("metadata").join("metadata.orig.json")
    }

    /// `files/`, where plaintext sequencing artifacts live.
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    /// `encrypted_files/`, the `.c4gh` sibling of each plaintext file.
    pub fn encrypted_files_dir(&self) -> PathBuf {
        self.root.join("encrypted_files")
    }

    /// `logs/`, the append-only progress ledgers.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create all four subdirectories if they don't already exist (used by
    /// the download preflight, which only needs three of them -- `files`
    /// is populated by decryption, not download itself).
    pub fn create_all(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.metadata_path().parent().unwrap())?;
        std::fs::create_dir_all(self.encrypted_files_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    /// The absolute path to the plaintext file for a metadata-declared
    /// relative file path.
    pub fn plaintext_path(&self, relative: &str) -> PathBuf {
        self.files_dir().join(relative)
    }

    /// The absolute path to the `.c4gh` sibling of a metadata-declared
    /// relative file path.
    pub fn encrypted_path(&self, relative: &str) -> PathBuf {
        let mut name = self.encrypted_files_dir().join(relative).into_os_string();
        name.push(".c4gh");
        PathBuf::from(name)
    }

    /// The progress ledger for a given stage name (`validate`, `encrypt`,
    /// `decrypt`, `upload`, `download`).
    pub fn ledger_path(&self, stage: &str) -> PathBuf {
        self.logs_dir().join(format!("progress_{stage}.cjson"))
    }
}

/// The object-store key under which a submission's metadata document is
/// stored.
pub fn metadata_key(submission_id: &str) -> String {
    format!("{submission_id}/metadata/metadata.json")
}

/// The object-store key for the encrypted sibling of `relative_path`.
pub fn file_key(submission_id: &str, relative_path: &str) -> Result<String, FileError> {
    validate_file_path(relative_path)
        .map_err(|_| FileError::BadFormat(format!("invalid file path {relative_path:?}")))?;
    Ok(format!("{submission_id}/files/{relative_path}.c4gh"))
}

/// The object-store key for an archived log file, preserving its path
/// relative to the submission's `logs/` directory.
pub fn log_key(submission_id: &str, relative_path: &str) -> String {
    format!("{submission_id}/logs/{relative_path}")
}

/// The zero-byte marker key written while cleaning is in progress.
pub fn cleaning_marker_key(submission_id: &str) -> String {
    format!("{submission_id}/cleaning")
}

/// The zero-byte marker key written once cleaning has completed.
pub fn cleaned_marker_key(submission_id: &str) -> String {
    format!("{submission_id}/cleaned")
}

/// Every plaintext file declared by a metadata document, as `(relative_path,
/// declared_size, declared_checksum)` triples, in document order.
pub fn declared_files(metadata: &GrzSubmissionMetadata) -> Vec<&crate::metadata::File> {
    metadata
        .donors
        .iter()
        .flat_map(|d| &d.lab_data)
        .flat_map(|l| &l.sequence_data.files)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypted_path_appends_c4gh_suffix() {
        let paths = SubmissionPaths::new("/tmp/sub");
        assert_eq!(
            paths.encrypted_path("a/b.fastq.gz"),
            PathBuf::from("/tmp/sub/encrypted_files/a/b.fastq.gz.c4gh")
        );
    }

    #[test]
    fn file_key_rejects_traversal() {
        assert!(file_key("sub-1", "../escape").is_err());
    }

    #[test]
    fn file_key_matches_layout() {
        let key = file_key("260914050_2024-07-15_abcd1234", "a/b.fastq.gz").unwrap();
        assert_eq!(key, "260914050_2024-07-15_abcd1234/files/a/b.fastq.gz.c4gh");
    }

    #[test]
    fn metadata_key_matches_layout() {
        assert_eq!(metadata_key("sub-1"), "sub-1/metadata/metadata.json");
    }
}

// vim: foldmethod=marker
