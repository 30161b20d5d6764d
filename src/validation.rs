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

//! Cheap structural sanity checks on FASTQ and BAM files, run alongside
//! (not instead of) checksum validation.

use crate::metadata::validate::{Diagnostic, Severity};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

fn open_maybe_gzip(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// The result of scanning a single FASTQ file.
#[derive(Clone, Copy)]
pub struct FastqScan {
    /// Total number of lines read.
    pub line_count: u64,
    /// Length of the first sequence line encountered, if any.
    pub observed_read_length: Option<usize>,
}

/// Stream `path` counting lines and capturing the first sequence line's
/// length. Each FASTQ record is four lines: header, sequence, `+`, quality.
pub fn scan_fastq_file(path: &Path) -> std::io::Result<FastqScan> {
    let mut reader = open_maybe_gzip(path)?;
    let mut line_count = 0u64;
    let mut observed_read_length = None;
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            break;
        }
        if line_count % 4 == 1 && observed_read_length.is_none() {
            observed_read_length = Some(line.trim_end().len());
        }
        line_count += 1;
    }
    Ok(FastqScan {
        line_count,
        observed_read_length,
    })
}

/// Validate a single FASTQ file against its declared read length. Does not
/// check pairing -- see [validate_paired_end_reads].
pub fn validate_fastq_file(
    path: &Path,
    declared_read_length: u32,
) -> std::io::Result<Vec<Diagnostic>> {
    let scan = scan_fastq_file(path)?;
    let mut diagnostics = Vec::new();

    if scan.line_count % 4 != 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message: format!(
                "{}: line count {} is not a multiple of 4",
                path.display(),
                scan.line_count
            ),
        });
    }

    if let Some(observed) = scan.observed_read_length {
        if observed as u32 != declared_read_length {
            // Downgraded to a warning; a future schema revision may
            // promote this to an error (see the design notes).
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                message: format!(
                    "{}: observed read length {} differs from declared {}",
                    path.display(),
                    observed,
                    declared_read_length
                ),
            });
        }
    }

    Ok(diagnostics)
}

/// Validate that an R1/R2 pair have equal line counts (invariant for
/// paired-end, non-long-read lab data).
pub fn validate_paired_end_reads(r1: &Path, r2: &Path) -> std::io::Result<Vec<Diagnostic>> {
    let r1_scan = scan_fastq_file(r1)?;
    let r2_scan = scan_fastq_file(r2)?;
    let mut diagnostics = Vec::new();
    if r1_scan.line_count != r2_scan.line_count {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message: format!(
                "{} and {} have mismatched line counts ({} vs {})",
                r1.display(),
                r2.display(),
                r1_scan.line_count,
                r2_scan.line_count
            ),
        });
    }
    Ok(diagnostics)
}

/// Read only the plain-text SAM header blob from a BAM file (magic `BAM\1`
/// followed by a little-endian header length and the header text itself).
/// Never fails; reports if any section beyond `@HD` is populated, since
/// those sections (`@RG`, `@CO`, ...) may carry identifying information.
pub fn validate_bam_file(path: &Path) -> std::io::Result<Vec<Diagnostic>> {
    let file = File::open(path)?;
    let mut reader = GzDecoder::new(file);
    let mut magic = [0u8; 4];
    if reader.read_exact(&mut magic).is_err() || &magic != b"BAM\x01" {
        // Not a BGZF-wrapped BAM we can introspect; nothing to warn about.
        return Ok(vec![]);
    }
    let mut len_bytes = [0u8; 4];
    if reader.read_exact(&mut len_bytes).is_err() {
        return Ok(vec![]);
    }
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let mut header_text = vec![0u8; header_len];
    if reader.read_exact(&mut header_text).is_err() {
        return Ok(vec![]);
    }
    let header_text = String::from_utf8_lossy(&header_text);

    let mut diagnostics = Vec::new();
    for line in header_text.lines() {
        if line.starts_with("@HD") || line.trim().is_empty() {
            continue;
        }
        if let Some(tag) = line.split('\t').next() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                message: format!(
                    "{}: BAM header contains {} section, which may carry identifying information",
                    path.display(),
                    tag
                ),
            });
        }
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_fastq(path: &Path, records: &[(&str, &str)]) {
        let mut f = File::create(path).unwrap();
        for (seq, qual) in records {
            writeln!(f, "@read").unwrap();
            writeln!(f, "{seq}").unwrap();
            writeln!(f, "+").unwrap();
            writeln!(f, "{qual}").unwrap();
        }
    }

    #[test]
    fn valid_fastq_reports_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r1.fastq");
        write_fastq(&path, &[("ACGT", "IIII"), ("ACGT", "IIII")]);
        let diagnostics = validate_fastq_file(&path, 4).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn truncated_fastq_reports_line_count_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r1.fastq");
        std::fs::write(&path, "@read\nACGT\n+\n").unwrap(); // 3 lines, not 4
        let diagnostics = validate_fastq_file(&path, 4).unwrap();
        assert!(diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.message.contains("not a multiple of 4")));
    }

    #[test]
    fn read_length_mismatch_is_a_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r1.fastq");
        write_fastq(&path, &[("ACGTACGT", "IIIIIIII")]);
        let diagnostics = validate_fastq_file(&path, 4).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn mismatched_pair_line_counts_reported() {
        let dir = tempdir().unwrap();
        let r1 = dir.path().join("r1.fastq");
        let r2 = dir.path().join("r2.fastq");
        write_fastq(&r1, &[("ACGT", "IIII"), ("ACGT", "IIII")]);
        write_fastq(&r2, &[("ACGT", "IIII")]);
        let diagnostics = validate_paired_end_reads(&r1, &r2).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn gzip_compressed_fastq_is_transparent() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempdir().unwrap();
        let path = dir.path().join("r1.fastq.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        write!(encoder, "@read\nACGT\n+\nIIII\n").unwrap();
        encoder.finish().unwrap();

        let diagnostics = validate_fastq_file(&path, 4).unwrap();
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn non_bam_file_reports_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not.bam");
        std::fs::write(&path, b"not actually bam data").unwrap();
        let diagnostics = validate_bam_file(&path).unwrap();
        assert!(diagnostics.is_empty());
    }
}

// vim: foldmethod=marker
