// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core plumbing for the urbench benchmark harness.
//!
//! This crate holds everything the benchmark adapters and reporters share
//! but that is not benchmark-specific:
//!
//! - [`error`] - the crate-wide [`Error`] type
//! - [`options`] - harness options and their layered configuration sources
//! - [`execution`] - subprocess execution with timeouts
//! - [`workdir`] - versioned working-directory layout
//! - [`fetch`] - git checkouts, downloads and archive extraction

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod execution;
pub mod fetch;
pub mod options;
pub mod workdir;

pub use error::{Error, Result};
pub use options::{CompareMode, Options};
