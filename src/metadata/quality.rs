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

//! The per-(study-subtype, library-type, sequence-subtype) quality
//! threshold table. A missing row is a warning, not a failure; a present
//! row is enforced strictly.

use super::lab_datum::{LibraryType, SequenceSubtype};
use super::submission::StudySubtype;

/// Minimum quality bar for a (study-subtype, library-type, sequence-subtype)
/// combination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Minimum acceptable mean depth of coverage.
    pub mean_depth_of_coverage: f64,
    /// The `minCoverage` value the fraction-above-minimum threshold applies at.
    pub min_coverage: f64,
    /// Minimum acceptable fraction of targeted regions above `min_coverage`.
    pub fraction_above_min: f64,
    /// Minimum acceptable declared read length for FASTQ/BAM files.
    pub read_length: u32,
}

const TABLE: &[(StudySubtype, LibraryType, SequenceSubtype, Thresholds)] = &[
    (
        StudySubtype::TumorGermline,
        LibraryType::Wes,
        SequenceSubtype::Germline,
        Thresholds {
            mean_depth_of_coverage: 30.0,
            min_coverage: 20.0,
            fraction_above_min: 0.95,
            read_length: 100,
        },
    ),
    (
        StudySubtype::GermlineOnly,
        LibraryType::Wgs,
        SequenceSubtype::Germline,
        Thresholds {
            mean_depth_of_coverage: 30.0,
            min_coverage: 20.0,
            fraction_above_min: 0.95,
            read_length: 100,
        },
    ),
];

/// Look up the quality thresholds for a (study-subtype, library-type,
/// sequence-subtype) combination. `None` means no threshold is defined and
/// the caller should emit a warning rather than enforcing anything.
pub fn lookup(
    study_subtype: StudySubtype,
    library_type: LibraryType,
    sequence_subtype: SequenceSubtype,
) -> Option<Thresholds> {
    TABLE
        .iter()
        .find(|(s, l, q, _)| *s == study_subtype && *l == library_type && *q == sequence_subtype)
        .map(|(_, _, _, t)| *t)
}


// vim: foldmethod=marker
