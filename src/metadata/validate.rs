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

//! The metadata validator: schema gating, structural checks, the twelve
//! cross-field invariants of §3, quality-threshold lookups, and identifier
//! agreement. Each phase yields diagnostics rather than failing fast, so a
//! caller sees every problem in one pass.

use super::lab_datum::SequenceSubtype;
use super::sequence_data::{FileType, ReadOrder};
use super::{quality, ACCEPTED_SCHEMA_VERSIONS};
use super::{GrzSubmissionMetadata, Relation};
use std::collections::{HashMap, HashSet};

/// Severity of a single diagnostic. Only [Severity::Error] diagnostics fail
/// validation; [Severity::Warning] ones are informational.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// A hard validation failure.
    Error,
    /// An informational diagnostic that does not fail validation.
    Warning,
}

/// One validator finding.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Whether this finding fails validation or is merely informational.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Identifiers the caller expects this submission to carry (phase 5,
/// "identifier agreement").
pub struct ExpectedIdentifiers<'a> {
    /// Expected genomic data center identifier.
    pub genomic_data_center_id: &'a str,
    /// Expected submitter identifier.
    pub submitter_id: &'a str,
}

/// Validate `metadata` against every phase in §4.3. Returns every
/// diagnostic found; an empty result (no [Severity::Error] entries) means
/// validation passed.
pub fn validate(
    metadata: &GrzSubmissionMetadata,
    expected: &ExpectedIdentifiers<'_>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    // Phase 1: schema.
    if !ACCEPTED_SCHEMA_VERSIONS.contains(&metadata.schema_version.as_str()) {
        diagnostics.push(Diagnostic::error(format!(
            "unsupported schema version {:?}; accepted versions: {}",
            metadata.schema_version,
            ACCEPTED_SCHEMA_VERSIONS.join(", ")
        )));
        // Nothing downstream can be trusted to parse against the right
        // shape; stop here, matching C4's "unknown versions are rejected".
        return diagnostics;
    }

    // Phase 2: structural (path form; numeric ranges; enum values are
    // already enforced by the type system via serde).
    structural_checks(metadata, &mut diagnostics);

    // Phase 3: cross-field invariants 1-12.
    cross_field_checks(metadata, &mut diagnostics);

    // Phase 4: quality thresholds.
    quality_checks(metadata, &mut diagnostics);

    // Phase 5: identifier agreement.
    if metadata.submission.genomic_data_center_id != expected.genomic_data_center_id {
        diagnostics.push(Diagnostic::error(format!(
            "genomicDataCenterId {:?} does not match expected {:?}",
            metadata.submission.genomic_data_center_id, expected.genomic_data_center_id
        )));
    }
    if metadata.submission.submitter_id != expected.submitter_id {
        diagnostics.push(Diagnostic::error(format!(
            "submitterId {:?} does not match expected {:?}",
            metadata.submission.submitter_id, expected.submitter_id
        )));
    }

    diagnostics
}

fn structural_checks(metadata: &GrzSubmissionMetadata, out: &mut Vec<Diagnostic>) {
    if metadata.submission.tan_g.len() != 64
        || !metadata
            .submission
            .tan_g
            .chars()
            .all(|c| c.is_ascii_hexdigit())
    {
        out.push(Diagnostic::error("tanG must be exactly 64 hex characters"));
    }
    if metadata.submission.submitter_id.len() != 9
        || !metadata
            .submission
            .submitter_id
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        out.push(Diagnostic::error("submitterId must be exactly 9 digits"));
    }

    for donor in &metadata.donors {
        for lab_datum in &donor.lab_data {
            for file in &lab_datum.sequence_data.files {
                if let Err(e) = validate_file_path(&file.file_path) {
                    out.push(Diagnostic::error(format!(
                        "file {:?}: {}",
                        file.file_path, e
                    )));
                }
                if file.file_checksum.len() != 64
                    || !file.file_checksum.chars().all(|c| c.is_ascii_hexdigit())
                {
                    out.push(Diagnostic::error(format!(
                        "file {:?}: fileChecksum must be 64 hex characters",
                        file.file_path
                    )));
                }
                // Invariant 11: extension consistent with file type.
                let lower = file.file_path.to_ascii_lowercase();
                let ext_ok = match file.file_type {
                    FileType::Bam => lower.ends_with(".bam"),
                    FileType::Vcf => lower.ends_with(".vcf") || lower.ends_with(".vcf.gz"),
                    FileType::Bed => lower.ends_with(".bed"),
                    FileType::Fastq => {
                        lower.ends_with(".fastq")
                            || lower.ends_with(".fastq.gz")
                            || lower.ends_with(".fq.gz")
                    }
                };
                if !ext_ok {
                    out.push(Diagnostic::error(format!(
                        "file {:?}: extension inconsistent with declared fileType {:?}",
                        file.file_path, file.file_type
                    )));
                }
                if matches!(file.file_type, FileType::Bam | FileType::Fastq)
                    && file.read_length.is_none()
                {
                    out.push(Diagnostic::error(format!(
                        "file {:?}: readLength is required for {:?} files",
                        file.file_path, file.file_type
                    )));
                }
            }
        }
    }
}

/// Invariant 10: relative, normalized, no `..`, no leading `/`, and short
/// enough once prefixed by `<submission_id>/files/`.
pub fn validate_file_path(path: &str) -> Result<(), &'static str> {
    if path.starts_with('/') {
        return Err("must not start with '/'");
    }
    if path
        .split('/')
        .any(|segment| segment == "." || segment == "..")
    {
        return Err("must not contain '.' or '..' segments");
    }
    // "<submission_id>/files/" is budgeted at 36 bytes of prefix overhead
    // (invariant 10); the remaining 1024 - 36 bytes are available to the
    // relative path itself.
    if path.len() > 1024 - 36 {
        return Err("exceeds the maximum object-store key length once prefixed");
    }
    Ok(())
}

fn cross_field_checks(metadata: &GrzSubmissionMetadata, out: &mut Vec<Diagnostic>) {
    let donors = &metadata.donors;

    // Invariant 1: donor count matches study type.
    let required = metadata.submission.study_type.required_donor_count();
    if donors.len() != required {
        out.push(Diagnostic::error(format!(
            "study type {:?} requires {} donor(s), found {}",
            metadata.submission.study_type,
            required,
            donors.len()
        )));
    }

    // Invariant 2: exactly one index donor.
    let index_count = donors
        .iter()
        .filter(|d| d.relation == Relation::Index)
        .count();
    if index_count != 1 {
        out.push(Diagnostic::error(format!(
            "expected exactly one donor with relation == index, found {}",
            index_count
        )));
    }

    for donor in donors {
        // Invariant 4: lab data names unique within a donor.
        let mut seen_names = HashSet::new();
        for lab_datum in &donor.lab_data {
            if !seen_names.insert(lab_datum.lab_data_name.as_str()) {
                out.push(Diagnostic::error(format!(
                    "donor {:?}: duplicate labDataName {:?}",
                    donor.donor_pseudonym, lab_datum.lab_data_name
                )));
            }
        }

        for lab_datum in &donor.lab_data {
            let prefix = format!(
                "donor {:?}, labDatum {:?}",
                donor.donor_pseudonym, lab_datum.lab_data_name
            );

            // Invariant 3: somatic lab data need a tumor-cell-count entry.
            if lab_datum.sequence_subtype == SequenceSubtype::Somatic
                && lab_datum.tumor_cell_count.is_empty()
            {
                out.push(Diagnostic::error(format!(
                    "{prefix}: somatic sequence subtype requires at least one tumorCellCount entry"
                )));
            }

            let files = &lab_datum.sequence_data.files;

            // Invariant 5: targeted library types need a BED file.
            if lab_datum.library_type.requires_bed_file()
                && !files.iter().any(|f| f.file_type == FileType::Bed)
            {
                out.push(Diagnostic::error(format!(
                    "{prefix}: library type {:?} requires at least one BED file",
                    lab_datum.library_type
                )));
            }

            // Invariant 6: at least one FASTQ; BAM only for _lr types.
            if !files.is_empty() {
                if !files.iter().any(|f| f.file_type == FileType::Fastq) {
                    out.push(Diagnostic::error(format!(
                        "{prefix}: sequence data present but no FASTQ file found"
                    )));
                }
                if files.iter().any(|f| f.file_type == FileType::Bam)
                    && !lab_datum.library_type.is_long_read()
                {
                    out.push(Diagnostic::error(format!(
                        "{prefix}: BAM files are only permitted for long-read (_lr) library types"
                    )));
                }
            }

            // Invariant 9: (flowcell, lane, readOrder) unique within this lab datum.
            let mut seen_triples = HashSet::new();
            for file in files {
                if let (Some(flowcell), Some(lane), Some(order)) =
                    (&file.flowcell_id, &file.lane_id, &file.read_order)
                {
                    if !seen_triples.insert((flowcell.clone(), lane.clone(), *order)) {
                        out.push(Diagnostic::error(format!(
                            "{prefix}: duplicate (flowcell, lane, readOrder) combination for {:?}/{:?}",
                            flowcell, lane
                        )));
                    }
                }
            }

            // Invariant 7: paired-end, non-long-read groups by (flowcell, lane).
            if lab_datum.sequencing_layout == super::lab_datum::SequencingLayout::PairedEnd
                && !lab_datum.library_type.is_long_read()
            {
                let fastqs: Vec<_> = files
                    .iter()
                    .filter(|f| f.file_type == FileType::Fastq)
                    .collect();
                let mut groups: HashMap<(String, String), Vec<&super::File>> = HashMap::new();
                for file in &fastqs {
                    if file.read_order.is_none() {
                        out.push(Diagnostic::error(format!(
                            "{prefix}: FASTQ file {:?} is missing readOrder in a paired-end lab datum",
                            file.file_path
                        )));
                        continue;
                    }
                    let key = (
                        file.flowcell_id.clone().unwrap_or_default(),
                        file.lane_id.clone().unwrap_or_default(),
                    );
                    groups.entry(key).or_default().push(file);
                }
                for (key, group) in groups {
                    let r1 = group
                        .iter()
                        .filter(|f| f.read_order == Some(ReadOrder::R1))
                        .count();
                    let r2 = group
                        .iter()
                        .filter(|f| f.read_order == Some(ReadOrder::R2))
                        .count();
                    if r1 != 1 || r2 != 1 {
                        out.push(Diagnostic::error(format!(
                            "{prefix}: flowcell/lane {:?} -- paired end sequencing layout but not there is not exactly one R1 and one R2",
                            key
                        )));
                    }
                }
            }
        }
    }

    // Invariant 8: shared reference genome across all lab data.
    let mut genomes = HashSet::new();
    for donor in donors {
        for lab_datum in &donor.lab_data {
            genomes.insert(lab_datum.sequence_data.reference_genome);
        }
    }
    if genomes.len() > 1 {
        out.push(Diagnostic::error(
            "all lab data within a submission must share the same reference genome",
        ));
    }
}

fn quality_checks(metadata: &GrzSubmissionMetadata, out: &mut Vec<Diagnostic>) {
    for donor in &metadata.donors {
        for lab_datum in &donor.lab_data {
            let prefix = format!(
                "donor {:?}, labDatum {:?}",
                donor.donor_pseudonym, lab_datum.lab_data_name
            );
            match quality::lookup(
                metadata.submission.study_subtype,
                lab_datum.library_type,
                lab_datum.sequence_subtype,
            ) {
                None => out.push(Diagnostic::warning(format!(
                    "{prefix}: no quality threshold row defined for ({:?}, {:?}, {:?})",
                    metadata.submission.study_subtype,
                    lab_datum.library_type,
                    lab_datum.sequence_subtype
                ))),
                Some(t) => {
                    let sd = &lab_datum.sequence_data;
                    if sd.mean_depth_of_coverage < t.mean_depth_of_coverage {
                        out.push(Diagnostic::error(format!(
                            "{prefix}: meanDepthOfCoverage {} below required {}",
                            sd.mean_depth_of_coverage, t.mean_depth_of_coverage
                        )));
                    }
                    if sd.min_coverage < t.min_coverage {
                        out.push(Diagnostic::error(format!(
                            "{prefix}: minCoverage {} below required {}",
                            sd.min_coverage, t.min_coverage
                        )));
                    }
                    if sd.targeted_regions_above_min_coverage < t.fraction_above_min {
                        out.push(Diagnostic::error(format!(
                            "{prefix}: targetedRegionsAboveMinCoverage {} below required {}",
                            sd.targeted_regions_above_min_coverage, t.fraction_above_min
                        )));
                    }
                    for file in sd
                        .files
                        .iter()
                        .filter(|f| matches!(f.file_type, FileType::Fastq | FileType::Bam))
                    {
                        if let Some(read_length) = file.read_length {
                            if read_length < t.read_length {
                                out.push(Diagnostic::error(format!(
                                    "{prefix}: file {:?} readLength {} below required {}",
                                    file.file_path, read_length, t.read_length
                                )));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Diagnostics for a single file's checksum (not rolled into [validate] so
/// the worker can apply it lazily, one file at a time, against the ledger).
pub fn check_file_checksum(
    declared: &str,
    actual: &crate::hashing::DigestSha256,
) -> Option<Diagnostic> {
    let actual = actual.to_string();
    if declared.eq_ignore_ascii_case(&actual) {
        None
    } else {
        Some(Diagnostic::error(format!(
            "checksum mismatch: recorded {declared:?}, calculated {actual:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::*;

    fn base_metadata() -> GrzSubmissionMetadata {
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
                study_subtype: StudySubtype::TumorGermline,
                coverage_type: CoverageType::Gkv,
                local_case_id: "case-1".into(),
            },
            donors: vec![Donor {
                donor_pseudonym: "donor-1".into(),
                gender: donor::Gender::Female,
                relation: Relation::Index,
                mv_consent: Consent::default(),
                research_consents: vec![],
                lab_data: vec![LabDatum {
                    lab_data_name: "lab-1".into(),
                    tissue_ontology: "NCIT:C12434".into(),
                    sample_conservation: "fresh-frozen".into(),
                    sequence_type: SequenceType::Dna,
                    sequence_subtype: SequenceSubtype::Germline,
                    library_type: LibraryType::Wes,
                    enrichment_kit: None,
                    sequencing_layout: SequencingLayout::PairedEnd,
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
                        files: vec![
                            File {
                                file_path: "lab-1_R1.fastq.gz".into(),
                                file_type: FileType::Fastq,
                                read_length: Some(151),
                                checksum_type: ChecksumType::Sha256,
                                file_checksum: "a".repeat(64),
                                file_size_in_bytes: 100,
                                read_order: Some(ReadOrder::R1),
                                flowcell_id: Some("FC1".into()),
                                lane_id: Some("L1".into()),
                            },
                            File {
                                file_path: "lab-1_R2.fastq.gz".into(),
                                file_type: FileType::Fastq,
                                read_length: Some(151),
                                checksum_type: ChecksumType::Sha256,
                                file_checksum: "b".repeat(64),
                                file_size_in_bytes: 100,
                                read_order: Some(ReadOrder::R2),
                                flowcell_id: Some("FC1".into()),
                                lane_id: Some("L1".into()),
                            },
                            File {
                                file_path: "lab-1.bed".into(),
                                file_type: FileType::Bed,
                                read_length: None,
                                checksum_type: ChecksumType::Sha256,
                                file_checksum: "c".repeat(64),
                                file_size_in_bytes: 100,
                                read_order: None,
                                flowcell_id: None,
                                lane_id: None,
                            },
                        ],
                    },
                }],
            }],
        }
    }

    fn expected() -> ExpectedIdentifiers<'static> {
        ExpectedIdentifiers {
            genomic_data_center_id: "GRZK00001",
            submitter_id: "260914050",
        }
    }

    #[test]
    fn valid_submission_has_no_errors() {
        let metadata = base_metadata();
        let diagnostics = validate(&metadata, &expected());
        let errors: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn missing_r2_is_reported() {
        let mut metadata = base_metadata();
        metadata.donors[0].lab_data[0]
            .sequence_data
            .files
            .iter_mut()
            .for_each(|f| {
                if f.file_type == FileType::Fastq {
                    f.read_order = Some(ReadOrder::R1);
                }
            });
        let diagnostics = validate(&metadata, &expected());
        assert!(diagnostics.iter().any(|d| d
            .message
            .contains("not there is not exactly one R1 and one R2")));
    }

    #[test]
    fn unsupported_schema_version_rejected() {
        let mut metadata = base_metadata();
        metadata.schema_version = "9.9.9".into();
        let diagnostics = validate(&metadata, &expected());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0]
            .message
            .contains("unsupported schema version"));
    }

    #[test]
    fn identifier_mismatch_reported() {
        let metadata = base_metadata();
        let wrong = ExpectedIdentifiers {
            genomic_data_center_id: "GRZK99999",
            submitter_id: "260914050",
        };
        let diagnostics = validate(&metadata, &wrong);
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("genomicDataCenterId")));
    }

    #[test]
    fn wrong_donor_count_for_study_type() {
        let mut metadata = base_metadata();
        metadata.submission.study_type = StudyType::Trio;
        let diagnostics = validate(&metadata, &expected());
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("requires 3 donor")));
    }

    #[test]
    fn somatic_without_tumor_cell_count_rejected() {
        let mut metadata = base_metadata();
        metadata.donors[0].lab_data[0].sequence_subtype = SequenceSubtype::Somatic;
        let diagnostics = validate(&metadata, &expected());
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("tumorCellCount")));
    }

    #[test]
    fn missing_quality_row_is_a_warning_not_an_error() {
        let mut metadata = base_metadata();
        metadata.submission.study_subtype = StudySubtype::TumorOnly;
        metadata.donors[0].lab_data[0].library_type = LibraryType::Panel;
        metadata.donors[0].lab_data[0].sequence_subtype = SequenceSubtype::Unknown;
        // Requires a BED file already present; swap in panel-compatible layout.
        let diagnostics = validate(&metadata, &expected());
        let warning = diagnostics
            .iter()
            .find(|d| d.message.contains("no quality threshold row defined"))
            .unwrap();
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[test]
    fn below_threshold_coverage_is_an_error() {
        let mut metadata = base_metadata();
        metadata.donors[0].lab_data[0]
            .sequence_data
            .mean_depth_of_coverage = 10.0;
        let diagnostics = validate(&metadata, &expected());
        assert!(diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.message.contains("meanDepthOfCoverage")));
    }

    #[test]
    fn rejects_path_traversal() {
        let mut metadata = base_metadata();
        metadata.donors[0].lab_data[0].sequence_data.files[0].file_path =
            "../escape.fastq.gz".into();
        let diagnostics = validate(&metadata, &expected());
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("'.' or '..'")));
    }
}

// vim: foldmethod=marker
