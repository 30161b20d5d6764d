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

//! The object-store boundary: an [ObjectStore] trait modelling the eight
//! S3 operations this crate needs, a real [s3::S3ObjectStore]
//! implementation, and an in-memory [mock::MockObjectStore] the test suite
//! runs against.

pub mod mock;
#[cfg(feature = "s3")]
pub mod s3;

use crate::errors::TransferError;
use async_trait::async_trait;

/// Maximum number of parts a multipart upload may be split into.
pub const MAX_CHUNKS: u64 = 1000;
/// Below this size, a single `put_object` is used instead of multipart.
pub const MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;
/// S3's own hard cap on a single part's size.
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Compute the effective multipart chunk size for an object of `size`
/// bytes given a configured `target_chunk` size (see §4.5).
pub fn chunk_size(size: u64, target_chunk: u64) -> u64 {
    if target_chunk == 0 {
        return MAX_PART_SIZE.min(size.max(1));
    }
    let chunk = if size / target_chunk > MAX_CHUNKS {
        size.div_ceil(MAX_CHUNKS)
    } else {
        target_chunk
    };
    chunk.min(MAX_PART_SIZE)
}

/// An object summary as returned by [ObjectStore::list_objects_v2].
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSummary {
    /// The object's key.
    pub key: String,
    /// The object's size in bytes.
    pub size: u64,
}

/// A single uploaded part, as returned by [ObjectStore::upload_part].
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedPart {
    /// 1-based part number.
    pub part_number: i32,
    /// The ETag the store assigned this part.
    pub etag: String,
}

/// The eight S3-compatible operations the transfer engine needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Return the object's size if it exists.
    async fn head_object(&self, key: &str) -> Result<Option<u64>, TransferError>;

    /// Upload `body` as a single object (used below the multipart threshold).
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), TransferError>;

    /// Begin a multipart upload, returning its upload ID.
    async fn create_multipart_upload(&self, key: &str) -> Result<String, TransferError>;

    /// Upload one part of a multipart upload.
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart, TransferError>;

    /// Complete a multipart upload given its parts, in ascending part-number
    /// order.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<(), TransferError>;

    /// Abort an in-progress multipart upload.
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str)
        -> Result<(), TransferError>;

    /// List objects under `prefix`.
    async fn list_objects_v2(&self, prefix: &str) -> Result<Vec<ObjectSummary>, TransferError>;

    /// Delete every listed key, batched as the store requires.
    async fn delete_objects(&self, keys: Vec<String>) -> Result<(), TransferError>;

    /// Download an entire object.
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, TransferError>;

    /// Download the `length` bytes starting at `offset`, for multipart
    /// (ranged) downloads of large objects.
    async fn get_object_range(
        &self,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, TransferError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_uses_target_below_max_chunks() {
        let size = 1024 * 1024 * 1024; // 1 GiB
        let target = 256 * 1024 * 1024; // 256 MiB
        assert_eq!(chunk_size(size, target), target);
    }

    #[test]
    fn chunk_size_grows_past_max_chunks() {
        let target = 8 * 1024 * 1024; // 8 MiB
        let size = target * (MAX_CHUNKS + 500); // would need 1500 parts at target size
        let chunk = chunk_size(size, target);
        assert!(size.div_ceil(chunk) <= MAX_CHUNKS);
        assert!(chunk > target);
    }

    #[test]
    fn chunk_size_never_exceeds_s3_part_limit() {
        let chunk = chunk_size(u64::MAX / 2, 1);
        assert!(chunk <= MAX_PART_SIZE);
    }

    #[test]
    fn chunk_count_never_exceeds_max_chunks() {
        for size in [
            MULTIPART_THRESHOLD,
            10 * 1024 * 1024 * 1024,
            900 * 1024 * 1024 * 1024,
        ] {
            let chunk = chunk_size(size, 256 * 1024 * 1024);
            assert!(
                size.div_ceil(chunk) <= MAX_CHUNKS,
                "size={size} chunk={chunk}"
            );
        }
    }
}

// vim: foldmethod=marker
