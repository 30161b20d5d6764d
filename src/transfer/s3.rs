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

//! The real [ObjectStore] implementation, backed by `aws-sdk-s3` against
//! any S3-compatible endpoint.

use super::{ObjectStore, ObjectSummary, UploadedPart};
use crate::config::S3Options;
use crate::errors::TransferError;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectIdentifier};
use aws_sdk_s3::Client;

/// An [ObjectStore] backed by a real S3-compatible service.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from a submission's [S3Options], falling back to the
    /// environment for credentials not given inline.
    pub async fn connect(options: &S3Options) -> Result<Self, TransferError> {
        let access_key = options
            .resolve_access_key()
            .ok_or_else(|| TransferError::Other("no access key configured".into()))?;
        let secret = options
            .resolve_secret()
            .ok_or_else(|| TransferError::Other("no secret key configured".into()))?;
        let credentials = Credentials::new(access_key, secret, None, None, "grz-core");
        let config = aws_sdk_s3::Config::builder()
            .endpoint_url(&options.endpoint_url)
            .region(Region::new(options.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();
        Ok(S3ObjectStore {
            client: Client::from_conf(config),
            bucket: options.bucket.clone(),
        })
    }
}

fn map_sdk_err<E: std::fmt::Debug>(err: E) -> TransferError {
    TransferError::Other(format!("{err:?}"))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head_object(&self, key: &str) -> Result<Option<u64>, TransferError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(output.content_length().map(|len| len as u64)),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(None)
                } else {
                    Err(map_sdk_err(err))
                }
            }
        }
    }

    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), TransferError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<String, TransferError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(map_sdk_err)?;
        output
            .upload_id()
            .map(str::to_owned)
            .ok_or_else(|| TransferError::Other("no upload id returned".into()))
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<UploadedPart, TransferError> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(map_sdk_err)?;
        let etag = output
            .e_tag()
            .map(str::to_owned)
            .ok_or_else(|| TransferError::Other("no etag returned for part".into()))?;
        Ok(UploadedPart { part_number, etag })
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<(), TransferError> {
        let completed_parts: Vec<CompletedPart> = parts
            .into_iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(p.etag)
                    .build()
            })
            .collect();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
    ) -> Result<(), TransferError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn list_objects_v2(&self, prefix: &str) -> Result<Vec<ObjectSummary>, TransferError> {
        let mut summaries = Vec::new();
        let mut continuation_token = None;
        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }
            let output = request.send().await.map_err(map_sdk_err)?;
            for object in output.contents() {
                if let Some(key) = object.key() {
                    summaries.push(ObjectSummary {
                        key: key.to_owned(),
                        size: object.size().unwrap_or(0) as u64,
                    });
                }
            }
            match output.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_owned()),
                None => break,
            }
        }
        Ok(summaries)
    }

    async fn delete_objects(&self, keys: Vec<String>) -> Result<(), TransferError> {
        // S3's batch-delete API accepts at most 1000 keys per request.
        for batch in keys.chunks(1000) {
            let identifiers: Vec<ObjectIdentifier> = batch
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(map_sdk_err)
                })
                .collect::<Result<_, _>>()?;
            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(
                    aws_sdk_s3::types::Delete::builder()
                        .set_objects(Some(identifiers))
                        .build()
                        .map_err(map_sdk_err)?,
                )
                .send()
                .await
                .map_err(map_sdk_err)?;
        }
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, TransferError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(map_sdk_err)?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(map_sdk_err)?
            .into_bytes();
        Ok(bytes.to_vec())
    }

    async fn get_object_range(
        &self,
        key: &str,
        offset: u64,
        length: u64,
    ) -> Result<Vec<u8>, TransferError> {
        let last = offset + length.max(1) - 1;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .range(format!("bytes={offset}-{last}"))
            .send()
            .await
            .map_err(map_sdk_err)?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(map_sdk_err)?
            .into_bytes();
        Ok(bytes.to_vec())
    }
}

// vim: foldmethod=marker
