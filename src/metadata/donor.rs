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

//! A donor: one person contributing biospecimens to a case, identified
//! only by an opaque pseudonym.

use super::consent::Consent;
use super::lab_datum::LabDatum;
use serde::{Deserialize, Serialize};

/// A donor's relationship to the index patient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Relation {
    /// The patient the case is about.
    Index,
    /// The index patient's mother.
    Mother,
    /// The index patient's father.
    Father,
    /// The index patient's brother.
    Brother,
    /// The index patient's sister.
    Sister,
    /// The index patient's child.
    Child,
    /// Any other relation.
    Other,
}

/// Administrative sex as recorded for the donor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Not specified or not applicable.
    Unknown,
}

/// One donor contributing biospecimens to a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    /// Opaque pseudonym identifying this donor. Rewritten to the literal
    /// `"index"` for the index donor on archive.
    pub donor_pseudonym: String,
    /// Administrative sex.
    pub gender: Gender,
    /// Relationship to the index patient.
    pub relation: Relation,
    /// The mandatory consent covering this submission.
    pub mv_consent: Consent,
    /// Additional research-use consents, if any were given.
    #[serde(default)]
    pub research_consents: Vec<Consent>,
    /// Lab data collected from this donor.
    pub lab_data: Vec<LabDatum>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_wire_form_is_camel_case() {
        let json = serde_json::to_string(&Relation::Index).unwrap();
        assert_eq!(json, "\"index\"");
    }
}

// vim: foldmethod=marker
