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

//! Sequence data: the reference genome, quality summary, and files
//! produced by one lab datum.

use serde::{Deserialize, Serialize};

/// The reference genome build sequence data was aligned against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceGenome {
    /// GRCh37 / hg19.
    GRCh37,
    /// GRCh38 / hg38.
    GRCh38,
}

/// File format of a sequence data file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Binary Alignment Map.
    Bam,
    /// Variant Call Format.
    Vcf,
    /// Browser Extensible Data (target regions).
    Bed,
    /// FASTQ reads, optionally gzip-compressed.
    Fastq,
}

impl FileType {
    /// The canonical file extension for this type, excluding any `.gz`
    /// suffix (invariant 11).
    pub fn canonical_extension(self) -> &'static str {
        match self {
            FileType::Bam => "bam",
            FileType::Vcf => "vcf",
            FileType::Bed => "bed",
            FileType::Fastq => "fastq",
        }
    }
}

/// Checksum algorithm used for a file's declared digest. Only SHA-256 is
/// accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    /// SHA-256, the only type this crate accepts.
    Sha256,
}

/// Which read of a pair a FASTQ file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadOrder {
    /// The forward read.
    R1,
    /// The reverse read.
    R2,
}

/// One file referenced by a lab datum's sequence data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Path relative to the submission's `files/` directory.
    pub file_path: String,
    /// The file's format.
    pub file_type: FileType,
    /// Read length; required for BAM and FASTQ files.
    #[serde(default)]
    pub read_length: Option<u32>,
    /// The checksum algorithm used for `file_checksum`.
    pub checksum_type: ChecksumType,
    /// The declared SHA-256 checksum, 64 lowercase hex characters.
    pub file_checksum: String,
    /// The declared size in bytes.
    pub file_size_in_bytes: u64,
    /// Which read of a pair this is, for paired-end FASTQ.
    #[serde(default)]
    pub read_order: Option<ReadOrder>,
    /// The sequencer flowcell this read came from.
    #[serde(default)]
    pub flowcell_id: Option<String>,
    /// The sequencer lane this read came from.
    #[serde(default)]
    pub lane_id: Option<String>,
}

/// A (minimum quality, percent of bases at or above it) pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityThreshold {
    /// The minimum Phred quality score.
    pub min_quality: u32,
    /// The percent of bases meeting or exceeding `min_quality`.
    pub percent: f64,
}

/// The sequence data produced by one lab datum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceData {
    /// The reference genome alignment was performed against.
    pub reference_genome: ReferenceGenome,
    /// Mean depth of coverage across the targeted or whole genome.
    pub mean_depth_of_coverage: f64,
    /// The minimum coverage threshold used for `targeted_regions_above_min_coverage`.
    pub min_coverage: f64,
    /// Fraction (0.0-1.0) of targeted regions at or above `min_coverage`.
    pub targeted_regions_above_min_coverage: f64,
    /// Percent of bases at or above a minimum quality score.
    pub percent_base_above_quality_threshold: QualityThreshold,
    /// Variant callers used to produce any VCF files.
    #[serde(default)]
    pub caller: Vec<String>,
    /// The files produced by this sequencing run.
    pub files: Vec<File>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_canonical_extension() {
        assert_eq!(FileType::Bam.canonical_extension(), "bam");
        assert_eq!(FileType::Fastq.canonical_extension(), "fastq");
    }

    #[test]
    fn checksum_type_wire_form() {
        let json = serde_json::to_string(&ChecksumType::Sha256).unwrap();
        assert_eq!(json, "\"sha256\"");
    }
}

// vim: foldmethod=marker
