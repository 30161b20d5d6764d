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

//! Small helper to cut down on the boilerplate of wiring up `Display` and
//! `std::error::Error` for the plain enums scattered through this crate.

/// Given an enum type which already derives `Debug`, implement
/// [`std::fmt::Display`] (by way of its `Debug` representation) and
/// [`std::error::Error`].
macro_rules! error_enum {
    ($type:ty) => {
        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:?}", self)
            }
        }
        impl std::error::Error for $type {}
    };
}

pub(crate) use error_enum;

/// Problems with a [crate::config] value before any I/O has happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Both (or neither) of a mutually-exclusive pair of fields were set,
    /// e.g. `grz_public_key` and `grz_public_key_path`.
    MutuallyExclusiveFields(&'static str, &'static str),

    /// A required field was missing.
    Missing(&'static str),
}
error_enum!(ConfigError);

/// Problems with the submission metadata document, distinct from I/O or
/// crypto failures.
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataError {
    /// The document failed JSON Schema-equivalent structural validation.
    Malformed(String),

    /// A declared schema version is not one this crate knows how to
    /// validate.
    UnsupportedSchemaVersion(String),

    /// A cross-field invariant (see the metadata validator) did not hold.
    InvariantViolated(String),

    /// The caller-supplied LE/GRZ identifiers did not match the document.
    IdentifierMismatch {
        /// Field name that disagreed.
        field: &'static str,
    },
}
error_enum!(MetadataError);

/// Problems locating or reading a file referenced by the submission.
#[derive(Clone, Debug, PartialEq)]
pub enum FileError {
    /// No file exists at the expected path.
    Missing(std::path::PathBuf),

    /// The path exists but is not a regular file.
    NotAFile(std::path::PathBuf),

    /// The computed checksum did not match the declared one.
    ChecksumMismatch {
        /// File this checksum belongs to.
        path: std::path::PathBuf,
        /// Checksum declared in the metadata.
        expected: String,
        /// Checksum actually computed from the bytes on disk.
        actual: String,
    },

    /// The file's size on disk did not match the declared size.
    SizeMismatch {
        /// File this size belongs to.
        path: std::path::PathBuf,
        /// Size declared in the metadata.
        expected: u64,
        /// Size actually observed on disk.
        actual: u64,
    },

    /// The file failed a format-specific sanity check (FASTQ line framing,
    /// BAM magic bytes, ...).
    BadFormat(String),
}
error_enum!(FileError);

/// Problems with the Crypt4GH container or key material.
#[derive(Clone, Debug, PartialEq)]
pub enum CryptoError {
    /// The container's magic bytes or version did not match Crypt4GH v1.
    BadHeader,

    /// None of the header packets could be opened with the available keys.
    KeyMismatch,

    /// A segment failed AEAD authentication.
    CorruptSegment,

    /// The stream ended in the middle of a header or segment.
    Truncated,

    /// The referenced key file does not exist.
    KeyFileMissing(std::path::PathBuf),

    /// The key file's passphrase was wrong, or none could be found.
    BadPassphrase,
}
error_enum!(CryptoError);

/// Problems talking to the object store.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferError {
    /// The requested object does not exist.
    NotFound(String),

    /// An object already exists where this operation expected none.
    AlreadyExists(String),

    /// The credentials in use do not permit this operation.
    PermissionDenied(String),

    /// A network-level failure (timeout, connection reset, DNS, ...).
    Network(String),

    /// Anything else the object store reported.
    Other(String),
}
error_enum!(TransferError);

/// The crate-wide error type composing every fallible subsystem.
#[derive(Debug)]
pub enum Error {
    /// See [ConfigError].
    Config(ConfigError),
    /// See [MetadataError].
    Metadata(MetadataError),
    /// See [FileError].
    File(FileError),
    /// See [CryptoError].
    Crypto(CryptoError),
    /// See [TransferError].
    Transfer(TransferError),
    /// Local I/O failure not otherwise classified above.
    Io(std::io::Error),
    /// The submission's metadata key already exists in the object store.
    AlreadySubmitted,
    /// The external checker subprocess was interrupted by the user
    /// (exit code 130, or a `SIGINT` observed while waiting on it).
    Cancelled,
}
error_enum!(Error);

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}
impl From<MetadataError> for Error {
    fn from(e: MetadataError) -> Self {
        Error::Metadata(e)
    }
}
impl From<FileError> for Error {
    fn from(e: FileError) -> Self {
        Error::File(e)
    }
}
impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        Error::Crypto(e)
    }
}
impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Error::Transfer(e)
    }
}
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

// vim: foldmethod=marker
