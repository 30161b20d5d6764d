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

//! Enumerating submissions already uploaded to the object store, and
//! cleaning one up.

use crate::errors::TransferError;
use crate::submission::{cleaned_marker_key, cleaning_marker_key};
use crate::transfer::ObjectStore;
use std::collections::BTreeMap;

/// The lifecycle state a listed submission is classified into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Both `cleaning` and `cleaned` markers are present; this is never
    /// auto-repaired, only reported.
    Error,
    /// Only the `cleaning` marker is present; cleaning was interrupted.
    Cleaning,
    /// Only the `cleaned` marker is present; the submission's files are gone.
    Cleaned,
    /// `metadata/metadata.json` exists and no marker is set.
    Complete,
    /// Neither a marker nor the metadata object exists yet.
    Incomplete,
}

/// One submission as seen by [query_submissions].
#[derive(Clone, Debug)]
pub struct SubmissionListing {
    /// The submission identifier (the first path component under the
    /// bucket).
    pub submission_id: String,
    /// Its classified lifecycle state.
    pub status: SubmissionStatus,
    /// Number of objects found under this submission's prefix.
    pub object_count: usize,
}

/// List every submission under the bucket root, classifying each by the
/// markers and metadata object present under its prefix.
pub async fn query_submissions(
    store: &dyn ObjectStore,
) -> Result<Vec<SubmissionListing>, TransferError> {
    let objects = store.list_objects_v2("").await?;
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for object in objects {
        let Some(submission_id) = object.key.split('/').next() else {
            continue;
        };
        grouped
            .entry(submission_id.to_owned())
            .or_default()
            .push(object.key);
    }

    let mut listings = Vec::new();
    for (submission_id, keys) in grouped {
        let has_cleaning = keys.contains(&cleaning_marker_key(&submission_id));
        let has_cleaned = keys.contains(&cleaned_marker_key(&submission_id));
        let has_metadata = keys.contains(&crate::submission::metadata_key(&submission_id));
        let status = match (has_cleaning, has_cleaned) {
            (true, true) => SubmissionStatus::Error,
            (true, false) => SubmissionStatus::Cleaning,
            (false, true) => SubmissionStatus::Cleaned,
            (false, false) if has_metadata => SubmissionStatus::Complete,
            (false, false) => SubmissionStatus::Incomplete,
        };
        listings.push(SubmissionListing {
            object_count: keys.len(),
            submission_id,
            status,
        });
    }
    Ok(listings)
}

/// Delete every object under `<submission_id>/`, marking progress with the
/// `cleaning`/`cleaned` markers so an interrupted clean is visible to a
/// later [query_submissions] call rather than silently repeated.
pub async fn clean(store: &dyn ObjectStore, submission_id: &str) -> Result<(), TransferError> {
    let cleaning_key = cleaning_marker_key(submission_id);
    store.put_object(&cleaning_key, Vec::new()).await?;

    let prefix = format!("{submission_id}/");
    let objects = store.list_objects_v2(&prefix).await?;
    let keys: Vec<String> = objects
        .into_iter()
        .map(|o| o.key)
        .filter(|k| k != &cleaning_key)
        .collect();

    // S3-compatible stores cap a single batch delete at 1000 keys.
    for batch in keys.chunks(1000) {
        store.delete_objects(batch.to_vec()).await?;
    }

    store.delete_objects(vec![cleaning_key]).await?;
    store
        .put_object(&cleaned_marker_key(submission_id), Vec::new())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::mock::MockObjectStore;

    #[tokio::test]
    async fn classifies_complete_submission() {
        let store = MockObjectStore::default();
        store
            .put_object("sub-1/metadata/metadata.json", b"{}".to_vec())
            .await
            .unwrap();
        let listings = query_submissions(&store).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].status, SubmissionStatus::Complete);
    }

    #[tokio::test]
    async fn classifies_incomplete_submission() {
        let store = MockObjectStore::default();
        store
            .put_object("sub-1/files/a.fastq.gz.c4gh", vec![1, 2, 3])
            .await
            .unwrap();
        let listings = query_submissions(&store).await.unwrap();
        assert_eq!(listings[0].status, SubmissionStatus::Incomplete);
    }

    #[tokio::test]
    async fn classifies_error_when_both_markers_present() {
        let store = MockObjectStore::default();
        store.put_object("sub-1/cleaning", vec![]).await.unwrap();
        store.put_object("sub-1/cleaned", vec![]).await.unwrap();
        let listings = query_submissions(&store).await.unwrap();
        assert_eq!(listings[0].status, SubmissionStatus::Error);
    }

    #[tokio::test]
    async fn clean_removes_everything_and_leaves_cleaned_marker() {
        let store = MockObjectStore::default();
        store
            .put_object("sub-1/metadata/metadata.json", b"{}".to_vec())
            .await
            .unwrap();
        store
            .put_object("sub-1/files/a.fastq.gz.c4gh", vec![1])
            .await
            .unwrap();

        clean(&store, "sub-1").await.unwrap();

        let remaining = store.list_objects_v2("sub-1/").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].key, "sub-1/cleaned");

        let listings = query_submissions(&store).await.unwrap();
        assert_eq!(listings[0].status, SubmissionStatus::Cleaned);
    }
}

// vim: foldmethod=marker
