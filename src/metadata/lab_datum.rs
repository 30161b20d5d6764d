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

//! A lab datum: one sequencing experiment performed on one biospecimen
//! from one donor.

use super::sequence_data::SequenceData;
use serde::{Deserialize, Serialize};

/// DNA or RNA sequencing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SequenceType {
    /// DNA sequencing.
    Dna,
    /// RNA sequencing.
    Rna,
}

/// Whether the sequenced material is tumor or germline tissue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceSubtype {
    /// Germline tissue.
    Germline,
    /// Tumor tissue.
    Somatic,
    /// Neither of the above.
    Other,
    /// Not determined.
    Unknown,
}

/// The sequencing library preparation used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    /// Targeted gene panel.
    Panel,
    /// Long-read targeted gene panel.
    #[serde(rename = "panel_lr")]
    PanelLr,
    /// Whole exome sequencing.
    Wes,
    /// Long-read whole exome sequencing.
    #[serde(rename = "wes_lr")]
    WesLr,
    /// Whole genome sequencing.
    Wgs,
    /// Long-read whole genome sequencing.
    #[serde(rename = "wgs_lr")]
    WgsLr,
    /// Whole exome-plus sequencing.
    Wxs,
    /// Long-read whole exome-plus sequencing.
    #[serde(rename = "wxs_lr")]
    WxsLr,
    /// Any other library type.
    Other,
    /// Not determined.
    Unknown,
}

impl LibraryType {
    /// Whether this library type is one of the `_lr` (long-read) variants.
    pub fn is_long_read(self) -> bool {
        matches!(
            self,
            LibraryType::PanelLr | LibraryType::WesLr | LibraryType::WgsLr | LibraryType::WxsLr
        )
    }

    /// Whether this library type is a targeted panel/exome capture that
    /// requires an accompanying BED file (invariant 5).
    pub fn requires_bed_file(self) -> bool {
        matches!(
            self,
            LibraryType::Panel
                | LibraryType::Wes
                | LibraryType::Wxs
                | LibraryType::PanelLr
                | LibraryType::WesLr
                | LibraryType::WxsLr
        )
    }
}

/// How paired reads are laid out relative to one another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequencingLayout {
    /// A single read per fragment.
    SingleEnd,
    /// Forward and reverse reads per fragment.
    PairedEnd,
    /// Reverse-stranded sequencing.
    Reverse,
    /// Any other layout.
    Other,
}

/// A tumor-cell-content measurement for a somatic sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TumorCellCount {
    /// The method used to estimate tumor cell content.
    pub count_method: String,
    /// The estimated tumor cell fraction, 0.0-1.0.
    pub count: f64,
}

/// One sequencing experiment on one biospecimen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabDatum {
    /// A name unique within the owning donor (invariant 4).
    pub lab_data_name: String,
    /// Tissue ontology reference (e.g. an NCIT code) for the biospecimen.
    pub tissue_ontology: String,
    /// How the sample was conserved (fresh-frozen, FFPE, ...).
    pub sample_conservation: String,
    /// DNA or RNA.
    pub sequence_type: SequenceType,
    /// Germline, somatic, or other/unknown.
    pub sequence_subtype: SequenceSubtype,
    /// The library preparation used.
    pub library_type: LibraryType,
    /// Free-text description of the enrichment kit used, if any.
    #[serde(default)]
    pub enrichment_kit: Option<String>,
    /// How paired reads are laid out.
    pub sequencing_layout: SequencingLayout,
    /// Tumor-cell-content measurements; required for somatic samples
    /// (invariant 3).
    #[serde(default)]
    pub tumor_cell_count: Vec<TumorCellCount>,
    /// The sequence data produced by this experiment.
    pub sequence_data: SequenceData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_type_long_read_flag() {
        assert!(LibraryType::WgsLr.is_long_read());
        assert!(!LibraryType::Wgs.is_long_read());
    }

    #[test]
    fn library_type_requires_bed_file() {
        assert!(LibraryType::Wes.requires_bed_file());
        assert!(!LibraryType::Wgs.requires_bed_file());
    }

    #[test]
    fn library_type_wire_form() {
        let json = serde_json::to_string(&LibraryType::WesLr).unwrap();
        assert_eq!(json, "\"wes_lr\"");
    }
}

// vim: foldmethod=marker
