// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Progress records
//!
//! The search publishes its progress as a stream of [`SearchRecord`]s, one
//! per evidence grid cell plus a handful of milestone and outcome records.
//! Records are produced in grid-traversal order (`dmax` outer, `alpha`
//! inner) with non-decreasing `spoint`.

use serde::{Deserialize, Serialize};

/// A single progress message published by the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchRecord {
    /// Evidence was evaluated for one grid cell, or a search milestone was
    /// reached (see [`SearchUpdate::status`]).
    Update(SearchUpdate),
    /// The search observed the cancellation flag and stopped. No artifact is
    /// produced.
    Canceled,
    /// The grid produced no finite evidence anywhere. No artifact is
    /// produced.
    Failed,
}

impl SearchRecord {
    /// Returns the inner [`SearchUpdate`] for `Update` records.
    pub fn as_update(&self) -> Option<&SearchUpdate> {
        match self {
            SearchRecord::Update(update) => Some(update),
            _ => None,
        }
    }
}

/// Payload of an [`Update`](`SearchRecord::Update`) record.
///
/// During the grid traversal `alpha` carries `ln(alpha)` (the grid walks
/// log-alpha space); the fine-search milestone and the final record carry
/// linear `alpha`. `chi` is the reduced chi-squared (per windowed data
/// point) and `evidence` is the negated log-evidence the search minimizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchUpdate {
    /// Regularization strength. Log-scale in grid records, linear in the
    /// fine-search milestone and in the final record.
    pub alpha: f64,
    /// Negated log-evidence of this evaluation (smaller is better).
    pub evidence: f64,
    /// Reduced chi-squared of this evaluation.
    pub chi: f64,
    /// Maximum particle dimension of this evaluation.
    pub dmax: f64,
    /// Zero-based index of the current grid cell; equals `tpoint` for the
    /// records emitted after the grid completed.
    pub spoint: usize,
    /// Total number of grid cells.
    pub tpoint: usize,
    /// Milestone annotation, e.g. `"Running a fine search"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
