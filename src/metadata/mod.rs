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

//! The versioned submission metadata document: its wire model, and the
//! validator that checks it against the invariants a submission must
//! satisfy before it can be encrypted and uploaded.

pub mod consent;
pub mod donor;
pub mod lab_datum;
pub mod quality;
pub mod sequence_data;
pub mod submission;
pub mod validate;

pub use consent::{Consent, Provision};
pub use donor::{Donor, Relation};
pub use lab_datum::{LabDatum, LibraryType, SequenceSubtype, SequenceType, SequencingLayout};
pub use sequence_data::{ChecksumType, File, FileType, ReadOrder, ReferenceGenome, SequenceData};
pub use submission::{CoverageType, StudySubtype, StudyType, SubmissionHeader, SubmissionType};

use serde::{Deserialize, Serialize};

/// Schema versions this crate knows how to validate.
pub const ACCEPTED_SCHEMA_VERSIONS: &[&str] = &["1.0.0", "1.1.0"];

/// The full submission metadata document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrzSubmissionMetadata {
    /// Schema version this document was written against.
    pub schema_version: String,
    /// The submission header (§3 "Submission header").
    pub submission: SubmissionHeader,
    /// One entry per donor in this submission.
    pub donors: Vec<Donor>,
}

impl GrzSubmissionMetadata {
    /// Parse a metadata document from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, crate::errors::MetadataError> {
        serde_json::from_str(json)
            .map_err(|e| crate::errors::MetadataError::Malformed(e.to_string()))
    }

    /// Serialize to pretty-printed JSON, matching the form written back to
    /// disk by the archive redactor.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("submission metadata always serializes")
    }

    /// The donor with `relation == index`, if exactly one exists.
    pub fn index_donor(&self) -> Option<&Donor> {
        let mut found = None;
        for donor in &self.donors {
            if donor.relation == Relation::Index {
                if found.is_some() {
                    return None;
                }
                found = Some(donor);
            }
        }
        found
    }
}


// vim: foldmethod=marker
