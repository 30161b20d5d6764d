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

//! An in-memory [ObjectStore], standing in for a real S3-compatible
//! service in tests.

use super::{ObjectStore, ObjectSummary, UploadedPart};
use crate::errors::TransferError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    objects: HashMap<String, Vec<u8>>,
    uploads: HashMap<String, (String, HashMap<i32, Vec<u8>>)>,
    next_upload_id: u64,
}

/// An in-memory object store, useful for testing the worker and transfer
/// logic without a network dependency.
#[derive(Default)]
pub struct MockObjectStore {
    state: Mutex<State>,
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn head_object(&self, key: &str) -> Result<Option<u64>, TransferError> {
        let state = self.state.lock().unwrap();
        Ok(state.objects.get(key).map(|v| v.len() as u64))
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), TransferError> {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(key.to_owned(), body);
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<String, TransferError> {
        let mut state = self.state.lock().unwrap();
        state.next_upload_id += 1;
        let upload_id = format!("upload-{}", state.next_upload_id);
        state
            .uploads
            .insert(upload_id.clone(), (key.to_owned(), HashMap::new()));
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart, TransferError> {
        let mut state = self.state.lock().unwrap();
        let (upload_key, parts) = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| TransferError::NotFound(upload_id.to_owned()))?;
        if upload_key != key {
            return Err(TransferError::NotFound(key.to_owned()));
        }
        let etag = format!("etag-{part_number}-{}", body.len());
        parts.insert(part_number, body);
        Ok(UploadedPart { part_number, etag })
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        mut parts: Vec<UploadedPart>,
    ) -> Result<(), TransferError> {
        let mut state = self.state.lock().unwrap();
        let (upload_key, stored_parts) = state
            .uploads
            .remove(upload_id)
            .ok_or_else(|| TransferError::NotFound(upload_id.to_owned()))?;
        if upload_key != key {
            return Err(TransferError::NotFound(key.to_owned()));
        }
        parts.sort_by_key(|p| p.part_number);
        let mut assembled = Vec::new();
        for part in &parts {
            let body = stored_parts
                .get(&part.part_number)
                .ok_or_else(|| TransferError::Other("missing part".into()))?;
            assembled.extend_from_slice(body);
        }
        state.objects.insert(key.to_owned(), assembled);
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        _key: &str,
        upload_id: &str,
    ) -> Result<(), TransferError> {
        let mut state = self.state.lock().unwrap();
        state.uploads.remove(upload_id);
        Ok(())
    }

    async fn list_objects_v2(&self, prefix: &str) -> Result<Vec<ObjectSummary>, TransferError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| ObjectSummary {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect())
    }

    async fn delete_objects(&self, keys: Vec<String>) -> Result<(), TransferError> {
        let mut state = self.state.lock().unwrap();
        for key in keys {
            state.objects.remove(&key);
        }
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, TransferError> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| TransferError::NotFound(key.to_owned()))
    }

    async fn get_object_range(
        &self,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, TransferError> {
        let state = self.state.lock().unwrap();
        let object = state
            .objects
            .get(key)
            .ok_or_else(|| TransferError::NotFound(key.to_owned()))?;
        let start = offset as usize;
        let end = (start + length as usize).min(object.len());
        Ok(object.get(start..end).unwrap_or_default().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_head_reports_size() {
        let store = MockObjectStore::default();
        store
            .put_object("a/b.txt", b"hello".to_vec())
            .await
            .unwrap();
        assert_eq!(store.head_object("a/b.txt").await.unwrap(), Some(5));
        assert_eq!(store.head_object("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn multipart_upload_assembles_parts_in_order() {
        let store = MockObjectStore::default();
        let upload_id = store.create_multipart_upload("big.bin").await.unwrap();
        let p2 = store
            .upload_part("big.bin", &upload_id, 2, b"world".to_vec())
            .await
            .unwrap();
        let p1 = store
            .upload_part("big.bin", &upload_id, 1, b"hello ".to_vec())
            .await
            .unwrap();
        store
            .complete_multipart_upload("big.bin", &upload_id, vec![p2, p1])
            .await
            .unwrap();
        let body = store.get_object("big.bin").await.unwrap();
        assert_eq!(body, b"hello world");
    }

    #[tokio::test]
    async fn list_objects_filters_by_prefix() {
        let store = MockObjectStore::default();
        store.put_object("sub/a.txt", vec![1]).await.unwrap();
        store.put_object("sub/b.txt", vec![1, 2]).await.unwrap();
        store
            .put_object("other/c.txt", vec![1, 2, 3])
            .await
            .unwrap();
        let listed = store.list_objects_v2("sub/").await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn get_object_range_returns_requested_slice() {
        let store = MockObjectStore::default();
        store
            .put_object("big.bin", b"0123456789".to_vec())
            .await
            .unwrap();
        let slice = store.get_object_range("big.bin", 3, 4).await.unwrap();
        assert_eq!(slice, b"3456");
    }

    #[tokio::test]
    async fn delete_objects_removes_listed_keys() {
        let store = MockObjectStore::default();
        store.put_object("a", vec![1]).await.unwrap();
        store.put_object("b", vec![2]).await.unwrap();
        store.delete_objects(vec!["a".to_owned()]).await.unwrap();
        assert_eq!(store.head_object("a").await.unwrap(), None);
        assert_eq!(store.head_object("b").await.unwrap(), Some(1));
    }
}

// vim: foldmethod=marker
