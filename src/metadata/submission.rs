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

//! The submission header: the fields describing the case as a whole, as
//! opposed to any one donor or lab datum.

use serde::{Deserialize, Serialize};

/// Why this submission exists: a brand-new case, a follow-up on one
/// already submitted, additional data for one, or a correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionType {
    /// A brand-new case.
    Initial,
    /// Additional follow-up data for an existing case.
    Followup,
    /// An addition to an existing submission.
    Addition,
    /// A correction to previously submitted data.
    Correction,
    /// A test submission, never archived for clinical use.
    Test,
}

/// How many index-relative donors this case involves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StudyType {
    /// The index donor alone.
    Single,
    /// The index donor plus one relative.
    Duo,
    /// The index donor plus two relatives.
    Trio,
}

impl StudyType {
    /// The number of donors a submission of this study type must have.
    pub fn required_donor_count(self) -> usize {
        match self {
            StudyType::Single => 1,
            StudyType::Duo => 2,
            StudyType::Trio => 3,
        }
    }
}

/// Whether the index donor's sample is tumor tissue, matched germline
/// tissue, or both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudySubtype {
    /// Tumor tissue only, no matched germline sample.
    TumorOnly,
    /// Tumor tissue with a matched germline sample.
    #[serde(rename = "tumor+germline")]
    TumorGermline,
    /// Germline tissue only; no tumor involved.
    GermlineOnly,
}

/// The payer category for this case, following the German statutory vs.
/// private insurance distinction (`GKV`/`PKV`) plus a catch-all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageType {
    /// Statutory health insurance.
    #[serde(rename = "GKV")]
    Gkv,
    /// Private health insurance.
    #[serde(rename = "PKV")]
    Pkv,
    /// Any other coverage arrangement.
    Other,
}

/// The submission header: submission-wide metadata shared by every donor
/// and lab datum in the case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionHeader {
    /// Date the submission was assembled, `YYYY-MM-DD`.
    pub submission_date: String,
    /// Why this submission exists.
    pub submission_type: SubmissionType,
    /// 64-hex-character transaction token identifying the clinical case.
    /// Redacted to all-zero on archive.
    pub tan_g: String,
    /// The submitting institution's 9-digit identifier.
    pub submitter_id: String,
    /// The receiving Genomic Data Center's identifier.
    pub genomic_data_center_id: String,
    /// The submitting clinical node's identifier.
    pub clinical_data_node_id: String,
    /// Free-text disease classification.
    pub disease_type: String,
    /// How many donors this case involves.
    pub study_type: StudyType,
    /// Whether the index sample is tumor, germline, or both.
    pub study_subtype: StudySubtype,
    /// Payer category.
    pub coverage_type: CoverageType,
    /// The submitting institution's own case identifier. Redacted to the
    /// empty string on archive.
    pub local_case_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn study_type_donor_counts() {
        assert_eq!(StudyType::Single.required_donor_count(), 1);
        assert_eq!(StudyType::Duo.required_donor_count(), 2);
        assert_eq!(StudyType::Trio.required_donor_count(), 3);
    }

    #[test]
    fn study_subtype_wire_form() {
        let json = serde_json::to_string(&StudySubtype::TumorGermline).unwrap();
        assert_eq!(json, "\"tumor+germline\"");
    }
}

// vim: foldmethod=marker
