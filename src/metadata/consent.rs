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

//! Consent modelling. A donor carries one mandatory consent plus a list of
//! research consents; each is a set of [Provision]s, a closed sum type
//! rather than runtime attribute inspection of a generic FHIR resource.

use serde::{Deserialize, Serialize};

/// One granted or denied permission within a consent document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Provision {
    /// Permission was granted for the listed purpose codes.
    Permit {
        /// Purpose-of-use codes this permit applies to.
        codes: Vec<String>,
    },
    /// Permission was denied; `provisions` lists the specific
    /// sub-provisions the denial narrows, if any (empty = blanket denial).
    Deny {
        /// Sub-provisions covered by this denial.
        provisions: Vec<String>,
    },
}

impl Provision {
    /// Whether this provision grants (rather than denies) access.
    pub fn is_permit(&self) -> bool {
        matches!(self, Provision::Permit { .. })
    }
}

/// A consent document: an ordered list of provisions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Consent {
    /// The provisions that make up this consent.
    #[serde(default)]
    pub provisions: Vec<Provision>,
}

impl Consent {
    /// True if this consent grants access under `code` and is not
    /// overridden by a later blanket denial.
    pub fn permits(&self, code: &str) -> bool {
        let mut permitted = false;
        for provision in &self.provisions {
            match provision {
                Provision::Permit { codes } => {
                    if codes.iter().any(|c| c == code) {
                        permitted = true;
                    }
                }
                Provision::Deny { provisions } => {
                    if provisions.is_empty() || provisions.iter().any(|p| p == code) {
                        permitted = false;
                    }
                }
            }
        }
        permitted
    }
}


// vim: foldmethod=marker
