// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! bift core
//!
//! This module contains the plumbing shared by the search and the numerical
//! routines: error handling, cancellation, progress records and the sinks
//! that receive them.

/// Macros
#[macro_use]
pub mod macros;
/// Cancellation token
mod cancel;
/// Error handling
mod errors;
/// Shared numeric helpers
pub(crate) mod math;
/// Progress sinks
pub mod observers;
/// Progress records
mod records;

pub use anyhow::Error;
pub use cancel::CancelToken;
pub use errors::BiftError;
#[cfg(feature = "slog-logger")]
pub use observers::SlogLogger;
pub use observers::{CollectingSink, NullSink, ProgressSink};
pub use records::{SearchRecord, SearchUpdate};
