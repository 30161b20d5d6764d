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

//! The stage worker: the single object that drives a submission directory
//! through validate, encrypt, decrypt, upload, archive and download,
//! enforcing the preconditions between stages and recording per-file
//! progress in the ledgers under `logs/`.

use crate::config::S3Options;
use crate::errors::{CryptoError, Error, FileError, Result, TransferError};
use crate::hashing::sha256;
use crate::identifiers::submission_id;
use crate::ledger::{
    DecryptionState, DownloadState, EncryptionState, FileProgressLogger, UploadState,
    ValidationState,
};
use crate::metadata::validate::{
    validate as validate_metadata, Diagnostic, ExpectedIdentifiers, Severity,
};
use crate::metadata::{
    File as FileMetadata, FileType, GrzSubmissionMetadata, ReadOrder, SequencingLayout,
};
use crate::submission::{declared_files, file_key, metadata_key, SubmissionPaths};
use crate::transfer::{chunk_size, ObjectStore, UploadedPart, MULTIPART_THRESHOLD};
use crate::validation::{validate_bam_file, validate_fastq_file, validate_paired_end_reads};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{info, warn};
use std::collections::HashMap;
use std::os::unix::fs::FileExt;
use std::process::Command;
use x25519_dalek::{PublicKey, StaticSecret};

/// The name of the external validator this crate shells out to, if present
/// on `PATH`.
const EXTERNAL_CHECKER: &str = "grz-check";

/// Drives one submission directory through its pipeline stages.
pub struct Worker {
    paths: SubmissionPaths,
    /// Worker tasks available to transfer and hashing operations.
    pub threads: usize,
}

impl Worker {
    /// Build a worker over a submission rooted at `paths`, with a thread
    /// budget of `threads` (see §5's concurrency model).
    pub fn new(paths: SubmissionPaths, threads: usize) -> Self {
        Self { paths, threads }
    }

    /// The submission's on-disk layout.
    pub fn paths(&self) -> &SubmissionPaths {
        &self.paths
    }

    fn ledger_path(&self, stage: &str, force: bool) -> std::io::Result<std::path::PathBuf> {
        std::fs::create_dir_all(self.paths.logs_dir())?;
        let path = self.paths.ledger_path(stage);
        if force && path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(path)
    }

    /// Load and structurally/cross-field validate the metadata document,
    /// then check every declared file's checksum, size, and (for FASTQ/BAM)
    /// format sanity. Delegates to the external `grz-check` binary when
    /// `with_external_checker` is set and it's found on `PATH`; its exit
    /// code 130 is surfaced as [Error::Cancelled].
    pub fn validate(
        &self,
        identifiers: &ExpectedIdentifiers<'_>,
        force: bool,
        with_external_checker: bool,
    ) -> Result<Vec<Diagnostic>> {
        if with_external_checker {
            if let Some(diagnostics) = self.run_external_checker()? {
                return Ok(diagnostics);
            }
            info!("{EXTERNAL_CHECKER} not found on PATH; falling back to built-in validation");
        }

        let metadata_path = self.paths.metadata_path();
        let contents = std::fs::read_to_string(&metadata_path)?;
        let metadata = GrzSubmissionMetadata::from_json(&contents)?;

        let mut diagnostics = validate_metadata(&metadata, identifiers);

        let ledger_path = self.ledger_path("validate", force)?;
        let mut ledger = FileProgressLogger::<ValidationState, FileMetadata>::open(&ledger_path)?;

        for file in declared_files(&metadata) {
            let plaintext_path = self.paths.plaintext_path(&file.file_path);

            if let Some(state) = ledger.get(&plaintext_path, file) {
                if !state.valid {
                    diagnostics.push(Diagnostic {
                        severity: Severity::Error,
                        message: format!(
                            "{}: checksum or size does not match declared metadata",
                            file.file_path
                        ),
                    });
                }
                continue;
            }

            let on_disk_size = std::fs::metadata(&plaintext_path)?.len();
            let checksum = sha256(std::fs::File::open(&plaintext_path)?)?;
            let valid = on_disk_size == file.file_size_in_bytes
                && checksum
                    .to_string()
                    .eq_ignore_ascii_case(&file.file_checksum);
            if !valid {
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    message: format!(
                        "{}: checksum or size does not match declared metadata",
                        file.file_path
                    ),
                });
            }

            let mut sanity_diagnostics = Vec::new();
            if file.file_type == FileType::Fastq {
                if let Some(read_length) = file.read_length {
                    sanity_diagnostics.extend(validate_fastq_file(&plaintext_path, read_length)?);
                }
            } else if file.file_type == FileType::Bam {
                sanity_diagnostics.extend(validate_bam_file(&plaintext_path)?);
            }
            let sequence_data_valid = !sanity_diagnostics
                .iter()
                .any(|d| d.severity == Severity::Error);
            diagnostics.extend(sanity_diagnostics);

            ledger.set(
                &plaintext_path,
                file.clone(),
                ValidationState {
                    valid,
                    checksum: checksum.to_string(),
                    sequence_data_valid,
                },
            )?;
        }

        // Invariant 7 is cross-file (R1/R2 must agree), so it can't be
        // checked per-file above; group each paired-end, non-long-read lab
        // datum's FASTQ files by (flowcell, lane) and check each pair.
        for donor in &metadata.donors {
            for lab_datum in &donor.lab_data {
                if lab_datum.sequencing_layout != SequencingLayout::PairedEnd
                    || lab_datum.library_type.is_long_read()
                {
                    continue;
                }
                let mut groups: HashMap<(String, String), Vec<&FileMetadata>> = HashMap::new();
                for file in &lab_datum.sequence_data.files {
                    if file.file_type != FileType::Fastq {
                        continue;
                    }
                    let key = (
                        file.flowcell_id.clone().unwrap_or_default(),
                        file.lane_id.clone().unwrap_or_default(),
                    );
                    groups.entry(key).or_default().push(file);
                }
                for group in groups.values() {
                    let r1 = group.iter().find(|f| f.read_order == Some(ReadOrder::R1));
                    let r2 = group.iter().find(|f| f.read_order == Some(ReadOrder::R2));
                    let (Some(r1), Some(r2)) = (r1, r2) else {
                        continue;
                    };
                    let r1_path = self.paths.plaintext_path(&r1.file_path);
                    let r2_path = self.paths.plaintext_path(&r2.file_path);
                    let pairing_diagnostics = validate_paired_end_reads(&r1_path, &r2_path)?;
                    if pairing_diagnostics
                        .iter()
                        .any(|d| d.severity == Severity::Error)
                    {
                        for (file, path) in [(*r1, &r1_path), (*r2, &r2_path)] {
                            if let Some(state) = ledger.get(path, file) {
                                let mut state = state.clone();
                                state.sequence_data_valid = false;
                                ledger.set(path, file.clone(), state)?;
                            }
                        }
                    }
                    diagnostics.extend(pairing_diagnostics);
                }
            }
        }

        Ok(diagnostics)
    }

    /// Run the external checker, returning `Ok(None)` if it isn't on
    /// `PATH` so the caller can fall back to built-in validation.
    fn run_external_checker(&self) -> Result<Option<Vec<Diagnostic>>> {
        let output = match Command::new(EXTERNAL_CHECKER)
            .arg(self.paths.root())
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Io(e)),
        };
        match output.status.code() {
            Some(0) => Ok(Some(Vec::new())),
            Some(130) => Err(Error::Cancelled),
            _ => Ok(Some(vec![Diagnostic {
                severity: Severity::Error,
                message: format!("{EXTERNAL_CHECKER} reported a validation failure"),
            }])),
        }
    }

    /// Encrypt every declared file for `recipient_public_key`, refusing to
    /// run unless every file already has a passing validation entry (when
    /// `require_validation` is set). `submitter_secret_key`, if given, is
    /// used as the header packet's writer identity instead of a fresh
    /// ephemeral keypair.
    pub fn encrypt(
        &self,
        recipient_public_key: &PublicKey,
        submitter_secret_key: Option<&StaticSecret>,
        force: bool,
        require_validation: bool,
    ) -> Result<()> {
        let contents = std::fs::read_to_string(self.paths.metadata_path())?;
        let metadata = GrzSubmissionMetadata::from_json(&contents)?;

        if require_validation {
            let validate_ledger = FileProgressLogger::<ValidationState, FileMetadata>::open(
                self.paths.ledger_path("validate"),
            )?;
            for file in declared_files(&metadata) {
                let plaintext_path = self.paths.plaintext_path(&file.file_path);
                let passed = validate_ledger
                    .get(&plaintext_path, file)
                    .map(|s| s.valid && s.sequence_data_valid)
                    .unwrap_or(false);
                if !passed {
                    return Err(Error::File(FileError::BadFormat(format!(
                        "{}: has not passed validation",
                        file.file_path
                    ))));
                }
            }
        }

        let ledger_path = self.ledger_path("encrypt", force)?;
        let mut ledger = FileProgressLogger::<EncryptionState, FileMetadata>::open(&ledger_path)?;
        std::fs::create_dir_all(self.paths.encrypted_files_dir())?;

        for file in declared_files(&metadata) {
            let plaintext_path = self.paths.plaintext_path(&file.file_path);
            let encrypted_path = self.paths.encrypted_path(&file.file_path);

            if let Some(state) = ledger.get(&plaintext_path, file) {
                if state.encryption_successful {
                    continue;
                }
            }
            if encrypted_path.exists() && !force {
                return Err(Error::File(FileError::BadFormat(format!(
                    "{}: encrypted output already exists with no ledger entry; rerun with --force",
                    file.file_path
                ))));
            }

            if let Some(parent) = encrypted_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut input = std::fs::File::open(&plaintext_path)?;
            let mut output = std::fs::File::create(&encrypted_path)?;
            crate::crypt4gh::encrypt(
                &mut input,
                &mut output,
                recipient_public_key,
                submitter_secret_key,
            )
            .map_err(Error::Crypto)?;
            drop(output);

            let encrypted_size = std::fs::metadata(&encrypted_path)?.len();
            let checksum = sha256(std::fs::File::open(&encrypted_path)?)?;
            ledger.set(
                &plaintext_path,
                file.clone(),
                EncryptionState {
                    encryption_successful: true,
                    encrypted_checksum: checksum.to_string(),
                    encrypted_size,
                },
            )?;
        }

        Ok(())
    }

    /// Decrypt every `.c4gh` sibling back to its plaintext path.
    pub fn decrypt(&self, recipient_secret_key: &StaticSecret, force: bool) -> Result<()> {
        let contents = std::fs::read_to_string(self.paths.metadata_path())?;
        let metadata = GrzSubmissionMetadata::from_json(&contents)?;

        let ledger_path = self.ledger_path("decrypt", force)?;
        let mut ledger = FileProgressLogger::<DecryptionState, FileMetadata>::open(&ledger_path)?;
        std::fs::create_dir_all(self.paths.files_dir())?;

        for file in declared_files(&metadata) {
            let plaintext_path = self.paths.plaintext_path(&file.file_path);
            let encrypted_path = self.paths.encrypted_path(&file.file_path);

            if let Some(state) = ledger.get(&encrypted_path, file) {
                if state.decryption_successful {
                    continue;
                }
            }

            if let Some(parent) = plaintext_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut input = std::fs::File::open(&encrypted_path)
                .map_err(|_| Error::Crypto(CryptoError::KeyFileMissing(encrypted_path.clone())))?;
            let mut output = std::fs::File::create(&plaintext_path)?;
            crate::crypt4gh::decrypt(&mut input, &mut output, recipient_secret_key)
                .map_err(Error::Crypto)?;
            drop(output);

            let checksum = sha256(std::fs::File::open(&plaintext_path)?)?;
            ledger.set(
                &encrypted_path,
                file.clone(),
                DecryptionState {
                    decryption_successful: true,
                    decrypted_checksum: checksum.to_string(),
                },
            )?;
        }

        Ok(())
    }

    /// Upload every encrypted file then the metadata document, refusing to
    /// run unless every file has a successful encryption ledger entry.
    /// Fails with [Error::AlreadySubmitted] if the metadata key already
    /// exists.
    pub async fn upload(&self, store: &dyn ObjectStore, s3_options: &S3Options) -> Result<String> {
        let contents = std::fs::read_to_string(self.paths.metadata_path())?;
        let metadata = GrzSubmissionMetadata::from_json(&contents)?;
        let submission_id = submission_id(
            &metadata.submission.submitter_id,
            &metadata.submission.submission_date,
            &metadata.submission.tan_g,
        );

        let metadata_key = metadata_key(&submission_id);
        if store.head_object(&metadata_key).await?.is_some() {
            return Err(Error::AlreadySubmitted);
        }

        let encrypt_ledger = FileProgressLogger::<EncryptionState, FileMetadata>::open(
            self.paths.ledger_path("encrypt"),
        )?;
        for file in declared_files(&metadata) {
            let plaintext_path = self.paths.plaintext_path(&file.file_path);
            let encrypted = encrypt_ledger
                .get(&plaintext_path, file)
                .map(|s| s.encryption_successful)
                .unwrap_or(false);
            if !encrypted {
                return Err(Error::File(FileError::BadFormat(format!(
                    "{}: has not been encrypted",
                    file.file_path
                ))));
            }
        }

        let mut upload_ledger = FileProgressLogger::<UploadState, FileMetadata>::open(
            self.paths.ledger_path("upload"),
        )?;

        for file in declared_files(&metadata) {
            let plaintext_path = self.paths.plaintext_path(&file.file_path);
            let encrypted_path = self.paths.encrypted_path(&file.file_path);
            let key = file_key(&submission_id, &file.file_path)?;

            if let Some(state) = upload_ledger.get(&plaintext_path, file) {
                if state.upload_successful {
                    continue;
                }
            }

            self.upload_one_file(store, &encrypted_path, &key, s3_options.multipart_chunksize)
                .await?;

            upload_ledger.set(
                &plaintext_path,
                file.clone(),
                UploadState {
                    upload_successful: true,
                    s3_key: key,
                },
            )?;
        }

        store
            .put_object(&metadata_key, contents.clone().into_bytes())
            .await?;
        info!("upload: submission {submission_id} complete");

        Ok(submission_id)
    }

    async fn upload_one_file(
        &self,
        store: &dyn ObjectStore,
        path: &std::path::Path,
        key: &str,
        target_chunk: u64,
    ) -> Result<()> {
        let size = std::fs::metadata(path)?.len();
        let body = std::fs::read(path)?;

        if size < MULTIPART_THRESHOLD {
            store.put_object(key, body).await?;
            return Ok(());
        }

        let chunk = chunk_size(size, target_chunk);
        let upload_id = store.create_multipart_upload(key).await?;

        let uploads = body
            .chunks(chunk as usize)
            .enumerate()
            .map(|(i, part_body)| {
                let part_number = (i + 1) as i32;
                let upload_id = upload_id.clone();
                async move {
                    store
                        .upload_part(key, &upload_id, part_number, part_body.to_vec())
                        .await
                }
            });
        let result: Result<Vec<UploadedPart>> = stream::iter(uploads)
            .buffer_unordered(self.threads.max(1))
            .try_collect()
            .await
            .map_err(Error::Transfer);

        match result {
            Ok(mut parts) => {
                parts.sort_by_key(|p| p.part_number);
                store
                    .complete_multipart_upload(key, &upload_id, parts)
                    .await?;
                Ok(())
            }
            Err(e) => {
                warn!("upload of {key} failed mid-flight; aborting multipart upload");
                store.abort_multipart_upload(key, &upload_id).await.ok();
                Err(e)
            }
        }
    }

    /// Download `key` into `dest`, fanning out ranged GETs across up to
    /// `self.threads` concurrent tasks once the object clears the
    /// multipart threshold. Returns the object's size.
    async fn download_one_file(
        &self,
        store: &dyn ObjectStore,
        key: &str,
        dest: &std::path::Path,
        target_chunk: u64,
    ) -> Result<u64> {
        let size = store
            .head_object(key)
            .await?
            .ok_or_else(|| Error::Transfer(TransferError::NotFound(key.to_owned())))?;

        if size < MULTIPART_THRESHOLD {
            let body = store.get_object(key).await?;
            std::fs::write(dest, &body)?;
            return Ok(size);
        }

        let chunk = chunk_size(size, target_chunk);
        let file = std::fs::File::create(dest)?;
        file.set_len(size)?;

        let mut offset = 0u64;
        let mut ranges = Vec::new();
        while offset < size {
            let length = chunk.min(size - offset);
            ranges.push((offset, length));
            offset += length;
        }

        let fetches = ranges.into_iter().map(|(offset, length)| async move {
            let body = store.get_object_range(key, offset, length).await?;
            Ok::<_, TransferError>((offset, body))
        });
        let parts: Result<Vec<(u64, Vec<u8>)>> = stream::iter(fetches)
            .buffer_unordered(self.threads.max(1))
            .try_collect()
            .await
            .map_err(Error::Transfer);

        for (offset, body) in parts? {
            file.write_at(&body, offset)?;
        }

        Ok(size)
    }

    /// Run the archive stage: see [crate::archive::run].
    pub async fn archive(&self, store: &dyn ObjectStore, submission_id: &str) -> Result<()> {
        crate::archive::run(&self.paths, store, submission_id).await
    }

    /// Download a submission's metadata and encrypted files from the
    /// object store into this worker's submission directory.
    pub async fn download(
        &self,
        store: &dyn ObjectStore,
        s3_options: &S3Options,
        submission_id: &str,
        force: bool,
    ) -> Result<()> {
        self.paths.create_all()?;
        let s3_options_chunk = s3_options.multipart_chunksize;

        let metadata_key = metadata_key(submission_id);
        let metadata_bytes = store.get_object(&metadata_key).await.map_err(|e| match e {
            TransferError::NotFound(_) => {
                Error::Transfer(TransferError::NotFound("metadata not found".into()))
            }
            other => Error::Transfer(other),
        })?;
        std::fs::write(self.paths.metadata_path(), &metadata_bytes)?;
        let metadata = GrzSubmissionMetadata::from_json(&String::from_utf8_lossy(&metadata_bytes))?;

        let ledger_path = self.ledger_path("download", force)?;
        let mut ledger = FileProgressLogger::<DownloadState, FileMetadata>::open(&ledger_path)?;

        for file in declared_files(&metadata) {
            let key = file_key(submission_id, &file.file_path)?;
            let encrypted_path = self.paths.encrypted_path(&file.file_path);

            if let Some(state) = ledger.get(&encrypted_path, file) {
                if state.download_successful {
                    continue;
                }
            }

            if let Some(parent) = encrypted_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let size = self
                .download_one_file(store, &key, &encrypted_path, s3_options_chunk)
                .await?;
            ledger.set(
                &encrypted_path,
                file.clone(),
                DownloadState {
                    download_successful: true,
                    size,
                },
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt4gh::keys::{
        read_private_key, read_public_key, write_private_key, write_public_key,
    };
    use crate::metadata::*;
    use crate::transfer::mock::MockObjectStore;
    use tempfile::tempdir;

    fn write_metadata(paths: &SubmissionPaths, file_size: u64, checksum: &str, read_length: u32) {
        std::fs::create_dir_all(paths.metadata_path().parent().unwrap()).unwrap();
        let metadata = GrzSubmissionMetadata {
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
                donor_pseudonym: "donor-1".into(),
                gender: donor::Gender::Male,
                relation: Relation::Index,
                mv_consent: Consent::default(),
                research_consents: vec![],
                lab_data: vec![LabDatum {
                    lab_data_name: "lab-1".into(),
                    tissue_ontology: "NCIT:C12434".into(),
                    sample_conservation: "fresh-frozen".into(),
                    sequence_type: SequenceType::Dna,
                    sequence_subtype: SequenceSubtype::Germline,
                    library_type: LibraryType::Wgs,
                    enrichment_kit: None,
                    sequencing_layout: SequencingLayout::SingleEnd,
                    tumor_cell_count: vec![],
                    sequence_data: SequenceData {
                        reference_genome: ReferenceGenome::GRCh38,
                        mean_depth_of_coverage: 35.0,
                        min_coverage: 25.0,
                        targeted_regions_above_min_coverage: 0.97,
                        percent_base_above_quality_threshold: sequence_data::QualityThreshold {
                            min_quality: 30,
                            percent: 0.9,
                        },
                        caller: vec![],
                        files: vec![File {
                            file_path: "r1.fastq.gz".into(),
                            file_type: FileType::Fastq,
                            read_length: Some(read_length),
                            checksum_type: ChecksumType::Sha256,
                            file_checksum: checksum.to_owned(),
                            file_size_in_bytes: file_size,
                            read_order: None,
                            flowcell_id: None,
                            lane_id: None,
                        }],
                    },
                }],
            }],
        };
        std::fs::write(paths.metadata_path(), metadata.to_pretty_json()).unwrap();
    }

    fn write_fastq_gz(path: &std::path::Path, sequence: &str) {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write as _;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        writeln!(encoder, "@read").unwrap();
        writeln!(encoder, "{sequence}").unwrap();
        writeln!(encoder, "+").unwrap();
        writeln!(encoder, "{}", "I".repeat(sequence.len())).unwrap();
        encoder.finish().unwrap();
    }

    fn write_fastq_gz_stored(path: &std::path::Path, sequence: &str) {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write as _;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::none());
        writeln!(encoder, "@read").unwrap();
        writeln!(encoder, "{sequence}").unwrap();
        writeln!(encoder, "+").unwrap();
        writeln!(encoder, "{}", "I".repeat(sequence.len())).unwrap();
        encoder.finish().unwrap();
    }

    fn expected() -> ExpectedIdentifiers<'static> {
        ExpectedIdentifiers {
            genomic_data_center_id: "GRZK00001",
            submitter_id: "260914050",
        }
    }

    #[test]
    fn validate_reports_checksum_mismatch() {
        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        write_fastq_gz(&paths.plaintext_path("r1.fastq.gz"), "ACGT");
        let size = std::fs::metadata(paths.plaintext_path("r1.fastq.gz"))
            .unwrap()
            .len();
        write_metadata(&paths, size, &"0".repeat(64), 4);

        let worker = Worker::new(paths, 2);
        let diagnostics = worker.validate(&expected(), false, false).unwrap();
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("checksum or size does not match")));
    }

    #[test]
    fn validate_passes_for_correct_checksum() {
        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        write_fastq_gz(&paths.plaintext_path("r1.fastq.gz"), "ACGT");
        let plaintext_path = paths.plaintext_path("r1.fastq.gz");
        let size = std::fs::metadata(&plaintext_path).unwrap().len();
        let checksum = sha256(std::fs::File::open(&plaintext_path).unwrap())
            .unwrap()
            .to_string();
        write_metadata(&paths, size, &checksum, 100);

        let worker = Worker::new(paths, 2);
        let diagnostics = worker.validate(&expected(), false, false).unwrap();
        let errors: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[tokio::test]
    async fn encrypt_refuses_without_validation() {
        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        write_fastq_gz(&paths.plaintext_path("r1.fastq.gz"), "ACGT");
        let size = std::fs::metadata(paths.plaintext_path("r1.fastq.gz"))
            .unwrap()
            .len();
        write_metadata(&paths, size, &"0".repeat(64), 4);

        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);

        let worker = Worker::new(paths, 2);
        let err = worker.encrypt(&public, None, false, true).unwrap_err();
        assert!(matches!(err, Error::File(_)));
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips_with_validation() {
        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        write_fastq_gz(&paths.plaintext_path("r1.fastq.gz"), "ACGT");
        let plaintext_path = paths.plaintext_path("r1.fastq.gz");
        let size = std::fs::metadata(&plaintext_path).unwrap().len();
        let checksum = sha256(std::fs::File::open(&plaintext_path).unwrap())
            .unwrap()
            .to_string();
        write_metadata(&paths, size, &checksum, 100);

        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);

        let worker = Worker::new(paths.clone(), 2);
        worker.validate(&expected(), false, false).unwrap();
        worker.encrypt(&public, None, false, true).unwrap();

        let original = std::fs::read(&plaintext_path).unwrap();
        std::fs::remove_file(&plaintext_path).unwrap();

        worker.decrypt(&secret, false).unwrap();
        let roundtripped = std::fs::read(&plaintext_path).unwrap();
        assert_eq!(roundtripped, original);
    }

    #[tokio::test]
    async fn upload_refuses_without_encryption() {
        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        write_fastq_gz(&paths.plaintext_path("r1.fastq.gz"), "ACGT");
        let size = std::fs::metadata(paths.plaintext_path("r1.fastq.gz"))
            .unwrap()
            .len();
        write_metadata(&paths, size, &"0".repeat(64), 4);

        let worker = Worker::new(paths, 2);
        let store = MockObjectStore::default();
        let options = S3Options {
            endpoint_url: "https://example.org".into(),
            bucket: "submissions".into(),
            access_key: Some("k".into()),
            secret: Some("s".into()),
            region: "us-east-1".into(),
            multipart_chunksize: crate::config::default_multipart_chunksize(),
            threads: 4,
        };
        let err = worker.upload(&store, &options).await.unwrap_err();
        assert!(matches!(err, Error::File(_)));
    }

    #[tokio::test]
    async fn upload_then_second_upload_fails_already_submitted() {
        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        write_fastq_gz(&paths.plaintext_path("r1.fastq.gz"), "ACGT");
        let plaintext_path = paths.plaintext_path("r1.fastq.gz");
        let size = std::fs::metadata(&plaintext_path).unwrap().len();
        let checksum = sha256(std::fs::File::open(&plaintext_path).unwrap())
            .unwrap()
            .to_string();
        write_metadata(&paths, size, &checksum, 100);

        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);

        let worker = Worker::new(paths, 2);
        worker.validate(&expected(), false, false).unwrap();
        worker.encrypt(&public, None, false, true).unwrap();

        let store = MockObjectStore::default();
        let options = S3Options {
            endpoint_url: "https://example.org".into(),
            bucket: "submissions".into(),
            access_key: Some("k".into()),
            secret: Some("s".into()),
            region: "us-east-1".into(),
            multipart_chunksize: crate::config::default_multipart_chunksize(),
            threads: 4,
        };
        worker.upload(&store, &options).await.unwrap();
        let err = worker.upload(&store, &options).await.unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted));
    }

    #[tokio::test]
    async fn upload_then_download_round_trips_a_multipart_file() {
        use crate::transfer::MULTIPART_THRESHOLD;

        let dir = tempdir().unwrap();
        let paths = SubmissionPaths::new(dir.path());
        // Pseudo-random and stored (not deflated) so the on-disk size
        // clears the multipart threshold and forces the upload/download
        // fan-out path.
        let mut sequence = String::with_capacity(MULTIPART_THRESHOLD as usize + 4096);
        let bases = [b'A', b'C', b'G', b'T'];
        let mut state = 0x2545F4914F6CDD1Du64;
        for _ in 0..(MULTIPART_THRESHOLD as usize + 4096) {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            sequence.push(bases[(state % 4) as usize] as char);
        }
        let plaintext_path = paths.plaintext_path("r1.fastq.gz");
        write_fastq_gz_stored(&plaintext_path, &sequence);
        let size = std::fs::metadata(&plaintext_path).unwrap().len();
        assert!(
            size > MULTIPART_THRESHOLD,
            "fixture too small to exercise multipart"
        );
        let checksum = sha256(std::fs::File::open(&plaintext_path).unwrap())
            .unwrap()
            .to_string();
        write_metadata(&paths, size, &checksum, sequence.len() as u32);

        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);

        let worker = Worker::new(paths, 3);
        worker.validate(&expected(), false, false).unwrap();
        worker.encrypt(&public, None, false, true).unwrap();

        let store = MockObjectStore::default();
        let options = S3Options {
            endpoint_url: "https://example.org".into(),
            bucket: "submissions".into(),
            access_key: Some("k".into()),
            secret: Some("s".into()),
            region: "us-east-1".into(),
            multipart_chunksize: 1024 * 1024,
            threads: 3,
        };
        let submission_id = worker.upload(&store, &options).await.unwrap();

        let download_dir = tempdir().unwrap();
        let download_paths = SubmissionPaths::new(download_dir.path());
        let downloader = Worker::new(download_paths.clone(), 3);
        downloader
            .download(&store, &options, &submission_id, false)
            .await
            .unwrap();

        let original_encrypted =
            std::fs::read(worker.paths().encrypted_path("r1.fastq.gz")).unwrap();
        let downloaded_encrypted =
            std::fs::read(download_paths.encrypted_path("r1.fastq.gz")).unwrap();
        assert_eq!(downloaded_encrypted, original_encrypted);

        downloader.decrypt(&secret, false).unwrap();
        let roundtripped = std::fs::read(download_paths.plaintext_path("r1.fastq.gz")).unwrap();
        let original_plaintext = std::fs::read(&plaintext_path).unwrap();
        assert_eq!(roundtripped, original_plaintext);
    }

    #[test]
    fn key_files_roundtrip_for_worker_use() {
        let dir = tempdir().unwrap();
        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);
        write_public_key(&dir.path().join("k.pub"), &public).unwrap();
        write_private_key(&dir.path().join("k.sec"), &secret, "hunter2").unwrap();

        let read_public = read_public_key(&dir.path().join("k.pub")).unwrap();
        let read_secret = read_private_key(&dir.path().join("k.sec"), "hunter2").unwrap();
        assert_eq!(read_public.as_bytes(), public.as_bytes());
        assert_eq!(read_secret.to_bytes(), secret.to_bytes());
    }
}

// vim: foldmethod=marker
