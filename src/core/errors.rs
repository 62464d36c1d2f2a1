// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Errors

use thiserror::Error;

/// bift error type
///
/// Only the entry points ([`do_bift`](`crate::search::do_bift`) and
/// [`single_solve`](`crate::search::single_solve`)) produce errors; they
/// reject invalid inputs before any numerical work starts. The numerical
/// routines themselves never fail: non-finite intermediate values are
/// propagated into the evidence, where the search discards them.
#[derive(Debug, Error)]
pub enum BiftError {
    /// Indicates an invalid parameter
    #[error("Invalid parameter: {text:?}")]
    InvalidParameter {
        /// Text
        text: String,
    },
}
