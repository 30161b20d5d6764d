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

//! Deterministic submission-identifier derivation.

use sha2::{Digest, Sha256};

/// Derive the submission identifier for a submission header's
/// `submitter_id`, `submission_date` and `tanG`.
///
/// `<submitter_id>_<submission_date>_<first-8-hex of SHA-256(tanG)>`, stable
/// across machines since it depends only on the metadata, never on wall
/// clock or host state.
pub fn submission_id(submitter_id: &str, submission_date: &str, tan_g: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tan_g.as_bytes());
    let digest = hasher.finalize();
    let prefix = hex::encode(&digest[..4]);
    format!("{submitter_id}_{submission_date}_{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_spec_example() {
        let tan_g = "a".repeat(64);
        let id = submission_id("260914050", "2024-07-15", &tan_g);
        assert!(id.starts_with("260914050_2024-07-15_"));
        let suffix = id.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn is_deterministic() {
        let a = submission_id("1", "2024-01-01", "deadbeef");
        let b = submission_id("1", "2024-01-01", "deadbeef");
        assert_eq!(a, b);
    }

    #[test]
    fn differs_with_tan_g() {
        let a = submission_id("1", "2024-01-01", "aaaa");
        let b = submission_id("1", "2024-01-01", "bbbb");
        assert_ne!(a, b);
    }
}

// vim: foldmethod=marker
