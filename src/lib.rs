// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! bift is a Bayesian Indirect Fourier Transform engine written entirely in
//! Rust.
//!
//! Given a measured small-angle scattering curve I(q) with per-point errors,
//! it infers the real-space pair-distance distribution P(r) on `[0, D_max]`
//! together with the best regularization strength α and maximum dimension
//! D_max, by maximizing a Bayesian evidence over a coarse hyperparameter
//! grid followed by a derivative-free simplex refinement.
//!
//! The engine is deliberately narrow: it reads measurements through the
//! [`Measurement`](`crate::measurement::Measurement`) contract and leaves
//! acquisition, preprocessing, plotting and persistence to the surrounding
//! suite. The numerical core is single-threaded and deterministic;
//! concurrency enters only through the cancellation token and the progress
//! sink, both designed to be shared with a driver thread.
//!
//! # Highlights
//!
//! * [Two-stage hyperparameter search](`crate::search::do_bift`) with
//!   streaming [progress records](`crate::core::SearchRecord`)
//! * [Single solves](`crate::search::single_solve`) at fixed (α, D_max)
//! * [Cooperative cancellation](`crate::core::CancelToken`) polled between
//!   grid cells and simplex iterations
//! * [Progress sinks](`crate::core::observers`) for channels and, with the
//!   `slog-logger` feature, structured terminal logging
//!
//! # Example
//!
//! ```
//! use bift::measurement::ScatterCurve;
//! use bift::search::single_solve;
//! use std::collections::HashMap;
//!
//! # fn run() -> Result<(), bift::core::Error> {
//! // a tiny synthetic curve; real drivers load measured data instead
//! let q: Vec<f64> = (1..=40).map(|k| 0.005 * k as f64).collect();
//! let i: Vec<f64> = q.iter().map(|&qv| (-qv * qv * 720.0).exp()).collect();
//! let err: Vec<f64> = i.iter().map(|iv| 0.01 * iv + 1e-6).collect();
//! let params = HashMap::from([("filename".to_string(), "demo.dat".into())]);
//! let curve = ScatterCurve::new(q, i, err, params)?;
//!
//! let ift = single_solve(1e4, 90.0, &curve, 20)?;
//!
//! assert_eq!(ift.p.len(), 22);
//! assert_eq!(ift.info.algorithm, "BIFT");
//! println!("Rg = {}, I(0) = {}", ift.info.rg, ift.info.i0);
//! # Ok(())
//! # }
//! # fn main() { run().unwrap() }
//! ```
//!
//! A full search runs the same way through
//! [`do_bift`](`crate::search::do_bift`), with a
//! [`ProgressSink`](`crate::core::ProgressSink`) (for example the sending
//! half of an `mpsc` channel) receiving one record per evidence grid cell.
//!
//! # License
//!
//! Licensed under either of
//!
//!   * Apache License, Version 2.0,
//!     ([LICENSE-APACHE](https://www.apache.org/licenses/LICENSE-2.0))
//!   * MIT License ([LICENSE-MIT](https://opensource.org/licenses/MIT))
//!
//! at your option.

#![warn(missing_docs)]
#![allow(unused_attributes)]
// Explicitly disallow EQ comparison of floats; the few deliberate exact
// comparisons carry local allows.
#![deny(clippy::float_cmp)]

#[macro_use]
pub mod core;

/// IFT result artifact
pub mod artifact;
/// Evidence functional
pub mod evidence;
/// Measurement read contract and container
pub mod measurement;
/// Prior P(r) distributions
pub mod prior;
/// Two-stage hyperparameter search
pub mod search;
/// Numerical solvers
pub mod solver;
/// Transform matrix
pub mod transform;

pub use crate::artifact::{GridInfo, IftArtifact, IftInfo};
pub use crate::core::{
    BiftError, CancelToken, Error, ProgressSink, SearchRecord, SearchUpdate,
};
pub use crate::measurement::{Measurement, ScatterCurve};
pub use crate::search::{do_bift, single_solve, SearchConfig};
