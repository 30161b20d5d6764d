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

//! The archive redactor: strips case-identifying fields from the metadata
//! document before it is handed to the Genomic Data Center for long-term
//! storage, and mirrors the submission's logs alongside it.

use crate::errors::{Error, Result};
use crate::metadata::GrzSubmissionMetadata;
use crate::submission::{log_key, metadata_key, SubmissionPaths};
use crate::transfer::ObjectStore;
use log::info;
use std::path::{Path, PathBuf};

/// Redact `metadata` in place: the transaction token becomes 64 zeros, the
/// local case identifier becomes empty, and every donor with `relation ==
/// index` has its pseudonym replaced with the literal `"index"`.
pub fn redact(metadata: &GrzSubmissionMetadata) -> GrzSubmissionMetadata {
    let mut redacted = metadata.clone();
    redacted.submission.tan_g = "0".repeat(64);
    redacted.submission.local_case_id = String::new();
    for donor in &mut redacted.donors {
        if donor.relation == crate::metadata::Relation::Index {
            donor.donor_pseudonym = "index".to_owned();
        }
    }
    redacted
}

fn list_files_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            list_files_recursive(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Run the archive stage: redact `metadata.json` (writing the
/// pre-redaction document to `metadata.orig.json` first), upload the
/// redacted document, then mirror every file under `logs/` to
/// `<submission_id>/logs/...`. Must only be called after every encrypted
/// file has already been uploaded successfully.
pub async fn run(
    paths: &SubmissionPaths,
    store: &dyn ObjectStore,
    submission_id: &str,
) -> Result<()> {
    let original = std::fs::read_to_string(paths.metadata_path())?;
    std::fs::write(paths.metadata_orig_path(), &original)?;

    let metadata = GrzSubmissionMetadata::from_json(&original)?;
    let redacted = redact(&metadata);
    let redacted_json = redacted.to_pretty_json();
    std::fs::write(paths.metadata_path(), &redacted_json)?;

    store
        .put_object(&metadata_key(submission_id), redacted_json.into_bytes())
        .await?;
    info!("archive: uploaded redacted metadata for {submission_id}");

    let logs_dir = paths.logs_dir();
    let mut log_files = Vec::new();
    list_files_recursive(&logs_dir, &mut log_files)?;
    for log_file in log_files {
        let relative = log_file
            .strip_prefix(&logs_dir)
            .map_err(|_| Error::Io(std::io::Error::other("log path escaped logs directory")))?
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        let body = std::fs::read(&log_file)?;
        store
            .put_object(&log_key(submission_id, &relative), body)
            .await?;
    }
    info!("archive: mirrored logs for {submission_id}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::*;
    use crate::transfer::mock::MockObjectStore;
    use tempfile::tempdir;

    fn sample_metadata() -> GrzSubmissionMetadata {
        GrzSubmissionMetadata {
            schema_version: "1.0.0".into(),
            submission: SubmissionHeader {
                submission_date: "2024-07-15".into(),
                submission_type: SubmissionType::Initial,
                tan_g: "a".repeat(64),
                submitter_id: "260914050".into(),
                genomic_data_center_id: "GRZK00001".into(),
                clinical_data_node_id: "GRZK00001".into(),
                disease_type: "oncological".into(),
                study_type: StudyType::Single,
                study_subtype: StudySubtype::GermlineOnly,
                coverage_type: CoverageType::Gkv,
                local_case_id: "case-1".into(),
            },
            donors: vec![Donor {
                donor_pseudonym: "real-name".into(),
                gender: donor::Gender::Male,
                relation: Relation::Index,
                mv_consent: Consent::default(),
                research_consents: vec![],
                lab_data: vec![],
            }],
        }
    }

    #[test]
    fn redact_clears_identifying_fields() {
        let redacted = redact(&sample_metadata());
        assert_eq!(redacted.submission.tan_g, "0".repeat(64));
        assert_eq!(redacted.submission.local_case_id, "");
        assert_eq!(redacted.donors[0].donor_pseudonym, "index");
    }

    #[tokio::test]
    async fn run_writes_sidecar_and_uploads_redacted_metadata() {
        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        std::fs::create_dir_all(paths.metadata_path().parent().unwrap()).unwrap();
        std::fs::create_dir_all(paths.logs_dir()).unwrap();
        let original = sample_metadata();
        std::fs::write(paths.metadata_path(), original.to_pretty_json()).unwrap();
        std::fs::write(paths.logs_dir().join("progress_upload.cjson"), "{}\n").unwrap();

        let store = MockObjectStore::default();
        run(&paths, &store, "260914050_2024-07-15_abcd1234")
            .await
            .unwrap();

        let sidecar = std::fs::read_to_string(paths.metadata_orig_path()).unwrap();
        let sidecar_doc = GrzSubmissionMetadata::from_json(&sidecar).unwrap();
        assert_eq!(sidecar_doc.submission.tan_g, "a".repeat(64));

        let uploaded = store
            .get_object("260914050_2024-07-15_abcd1234/metadata/metadata.json")
            .await
            .unwrap();
        let uploaded_doc =
            GrzSubmissionMetadata::from_json(&String::from_utf8(uploaded).unwrap()).unwrap();
        assert_eq!(uploaded_doc.submission.tan_g, "0".repeat(64));

        let uploaded_log = store
            .get_object("260914050_2024-07-15_abcd1234/logs/progress_upload.cjson")
            .await
            .unwrap();
        assert_eq!(uploaded_log, b"{}\n");
    }
}

// vim: foldmethod=marker
