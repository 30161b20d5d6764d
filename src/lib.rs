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

#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

//! 🎉 You found the `grz-core` crate! 🎉
//!
//! This crate is under active development, and "soft launched". *Please do
//! not post widely directing to this crate yet* -- the API shipped today is
//! unstable, and is likely to change -- fairly significantly -- without much
//! regard to very precisely following semver until it stabalizes.
//!
//! # Introduction
//!
//! `grz-core` is the submission pipeline underneath a clinical-genomics data
//! exchange tool: it moves a submission from a clinical laboratory (an
//! "LE") to a Genomic Data Center (a "GRZ") through four stages --
//! [validate][metadata], [encrypt][crypt4gh], [upload][transfer], and
//! [archive][archive] -- plus the [download][transfer]/decrypt path back out.
//!
//! This crate does not own the terminal CLI, the YAML config file format, or
//! logging subscriber setup -- those are the job of whatever binary links
//! this crate in. It owns the typed submission metadata model and validator,
//! a streaming Crypt4GH-compatible encryption engine, a resumable per-file
//! progress ledger, a multipart S3-compatible transfer engine, and archive
//! metadata redaction.
//!
//! # Feature Flags
//!
//! | Flag   | Description                                                         |
//! | ------ | -------------------------------------------------------------------- |
//! | `full` | Enable all optional features.                                       |
//! | `s3`   | Enable the network-backed [transfer::s3] object store (aws-sdk-s3). |
//!
//! Without `s3`, the crate still builds and is fully testable against the
//! in-memory [transfer::mock] object store.

pub mod archive;
pub mod config;
pub mod crypt4gh;
pub mod errors;
pub mod hashing;
pub mod identifiers;
pub mod ledger;
pub mod listing;
pub mod metadata;
pub mod submission;
pub mod transfer;
pub mod validation;
pub mod worker;

// vim: foldmethod=marker
