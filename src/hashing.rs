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

//! Streaming digests over a bounded buffer, with an optional progress
//! callback. Everything that needs to hash a file -- checksum validation,
//! Crypt4GH session-key naming, submission ID derivation -- goes through
//! here rather than reading whole files into memory.

use md5::Md5;
use sha2::{Digest as _, Sha256};
use std::io::{self, Read};
use std::str::FromStr;

/// Bytes read per chunk while streaming a digest. Matches the historical
/// default chunk size used by the submission tooling this crate replaces.
pub const CHUNK_SIZE: usize = 1 << 16;

/// A digest of `HASH_LEN` raw bytes, displayed and parsed as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest<const HASH_LEN: usize>([u8; HASH_LEN]);

/// A SHA-256 digest, the only checksum type accepted in submission metadata.
pub type DigestSha256 = Digest<32>;

/// An MD5 digest, still produced by some Crypt4GH-adjacent tooling for
/// legacy comparison even though it is not used for any cryptographic
/// purpose here.
pub type DigestMd5 = Digest<16>;

impl<const HASH_LEN: usize> std::fmt::Debug for Digest<HASH_LEN> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl<const HASH_LEN: usize> std::fmt::Display for Digest<HASH_LEN> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Error conditions encountered when parsing a [Digest] from hex.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DigestParseError {
    /// The input was empty.
    Empty,
    /// The input was not exactly `HASH_LEN * 2` hex characters.
    BadLength,
    /// The input contained non-hex characters.
    InvalidEncoding,
}
crate::errors::error_enum!(DigestParseError);

impl<const HASH_LEN: usize> FromStr for Digest<HASH_LEN> {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, DigestParseError> {
        if s.is_empty() {
            return Err(DigestParseError::Empty);
        }
        let bytes = hex::decode(s).map_err(|_| DigestParseError::InvalidEncoding)?;
        Ok(Self(
            bytes.try_into().map_err(|_| DigestParseError::BadLength)?,
        ))
    }
}

impl<const HASH_LEN: usize> Digest<HASH_LEN> {
    /// Return the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Return the first `n` bytes hex-encoded. Used for deriving shortened
    /// identifiers (see [crate::identifiers]).
    pub fn hex_prefix(&self, n: usize) -> String {
        hex::encode(&self.0[..n.min(HASH_LEN)])
    }
}

impl<const HASH_LEN: usize> serde::Serialize for Digest<HASH_LEN> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, const HASH_LEN: usize> serde::Deserialize<'de> for Digest<HASH_LEN> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Stream `reader` through SHA-256, calling `on_progress` with the number of
/// bytes consumed so far after every chunk.
pub fn sha256_with_progress<R: Read>(
    mut reader: R,
    mut on_progress: impl FnMut(u64),
) -> io::Result<DigestSha256> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
        on_progress(total);
    }
    Ok(Digest(hasher.finalize().into()))
}

/// Stream `reader` through SHA-256 without progress reporting.
pub fn sha256(reader: impl Read) -> io::Result<DigestSha256> {
    sha256_with_progress(reader, |_| {})
}

/// Stream `reader` through MD5.
pub fn md5(mut reader: impl Read) -> io::Result<DigestMd5> {
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest(hasher.finalize().into()))
}


// vim: foldmethod=marker
