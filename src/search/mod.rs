// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Hyperparameter search
//!
//! The outer machinery of the engine. [`do_bift`] sweeps a coarse
//! (log α × D_max) evidence grid, refines the optimum with a Nelder-Mead
//! simplex, and assembles the final [`IftArtifact`]; progress streams
//! through a [`ProgressSink`] and a [`CancelToken`] aborts between grid
//! cells or simplex iterations. [`single_solve`] runs the inner solver once
//! at caller-chosen hyperparameters.
//!
//! Both entry points validate their inputs up front and are the only places
//! in the crate that produce errors; everything below them is infallible.

use crate::artifact::{GridInfo, IftArtifact, IftInfo};
use crate::core::math::linspace;
use crate::core::{CancelToken, Error, ProgressSink, SearchRecord, SearchUpdate};
use crate::evidence::evidence;
use crate::measurement::Measurement;
use crate::prior::sphere_prior;
use crate::solver::{NelderMead, Relaxation, SolveSystem};
use nalgebra::{DMatrix, DVector};
use serde_json::Value;
use std::f64::consts::PI;
use std::path::Path;

/// Resolution and hyperparameter bounds of a [`do_bift`] search.
///
/// The defaults match the established driver settings: a 50-point P(r) over
/// a 16-point α grid in `[10, 1e10]` and a 10-point D_max grid in
/// `[10, 400]`.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    n: usize,
    alpha_min: f64,
    alpha_max: f64,
    alpha_points: usize,
    dmax_min: f64,
    dmax_max: f64,
    dmax_points: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            n: 50,
            alpha_min: 10.0,
            alpha_max: 1e10,
            alpha_points: 16,
            dmax_min: 10.0,
            dmax_max: 400.0,
            dmax_points: 10,
        }
    }
}

impl SearchConfig {
    /// Construct a configuration with `n` P(r) points and the default
    /// hyperparameter bounds.
    pub fn new(n: usize) -> Self {
        SearchConfig {
            n,
            ..SearchConfig::default()
        }
    }

    /// Set the α bounds and the number of (log-spaced) α grid points.
    pub fn with_alpha_bounds(
        mut self,
        alpha_max: f64,
        alpha_min: f64,
        points: usize,
    ) -> Result<Self, Error> {
        if alpha_min <= 0.0 || alpha_max <= alpha_min {
            return Err(bift_error!(
                InvalidParameter,
                "`SearchConfig`: alpha bounds must satisfy 0 < alpha_min < alpha_max."
            ));
        }
        if points < 2 {
            return Err(bift_error!(
                InvalidParameter,
                "`SearchConfig`: at least 2 alpha points are required."
            ));
        }
        self.alpha_min = alpha_min;
        self.alpha_max = alpha_max;
        self.alpha_points = points;
        Ok(self)
    }

    /// Set the D_max bounds and the number of (linearly spaced) D_max grid
    /// points.
    pub fn with_dmax_bounds(
        mut self,
        dmax_max: f64,
        dmax_min: f64,
        points: usize,
    ) -> Result<Self, Error> {
        if dmax_min <= 0.0 || dmax_max <= dmax_min {
            return Err(bift_error!(
                InvalidParameter,
                "`SearchConfig`: dmax bounds must satisfy 0 < dmax_min < dmax_max."
            ));
        }
        if points < 2 {
            return Err(bift_error!(
                InvalidParameter,
                "`SearchConfig`: at least 2 dmax points are required."
            ));
        }
        self.dmax_min = dmax_min;
        self.dmax_max = dmax_max;
        self.dmax_points = points;
        Ok(self)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.n < 4 {
            return Err(bift_error!(
                InvalidParameter,
                "`SearchConfig`: at least 4 P(r) points are required."
            ));
        }
        Ok(())
    }
}

/// One evidence evaluation at fixed (α, D_max).
struct Evaluation {
    p: DVector<f64>,
    sys: SolveSystem,
    /// Negated log-evidence; the search minimizes this.
    neg_evidence: f64,
    /// Reduced chi-squared.
    chi: f64,
}

/// Build the r-grid, transform and prior for (α, D_max), run the inner
/// solver and score the outcome. `alpha` is linear here; grid and fine
/// search exponentiate before calling.
fn evaluate(q: &[f64], i: &[f64], err: &[f64], n: usize, alpha: f64, dmax: f64) -> Evaluation {
    let r = linspace(0.0, dmax, n);
    let sys = SolveSystem::assemble(q, i, err, &r);
    let prior = sphere_prior(n, i[0], dmax);

    let report = Relaxation::new().solve(&sys, alpha, &prior);
    let chi_sq = sys.chi_squared(&report.p, i, err);
    let e = evidence(alpha, report.s, chi_sq, &sys.b);

    Evaluation {
        p: report.p,
        sys,
        neg_evidence: -e,
        chi: chi_sq / i.len() as f64,
    }
}

/// Run the full Bayesian search over (α, D_max) and return the resulting
/// artifact.
///
/// Evidence is evaluated on the configured grid (D_max outer, log α inner),
/// one `update` record per cell; the grid optimum then seeds a Nelder-Mead
/// refinement. `Ok(None)` means the search was cancelled or found no finite
/// evidence — the outcome was already published as a `canceled` or `failed`
/// record. Errors are returned for invalid inputs only, before any record
/// is published.
///
/// Grid `update` records report α as `ln(alpha)`; the fine-search milestone
/// and the final record report it linearly.
pub fn do_bift<M, S>(
    data: &M,
    sink: &mut S,
    cancel: &CancelToken,
    config: &SearchConfig,
) -> Result<Option<IftArtifact>, Error>
where
    M: Measurement,
    S: ProgressSink,
{
    config.validate()?;
    validate_measurement(data)?;

    let (w_start, w_end) = data.q_range();
    let q = &data.q()[w_start..w_end];
    let i = &data.intensity()[w_start..w_end];
    let err = &data.err()[w_start..w_end];

    let alpha_points = linspace(
        config.alpha_min.ln(),
        config.alpha_max.ln(),
        config.alpha_points,
    );
    let dmax_points = linspace(config.dmax_min, config.dmax_max, config.dmax_points);
    let total = config.alpha_points * config.dmax_points;

    let mut posteriors = DMatrix::zeros(config.dmax_points, config.alpha_points);
    let mut best: Option<(f64, f64, f64)> = None; // (-E, ln α, dmax)
    let mut best_chi = f64::INFINITY;
    let mut point = 0usize;

    for (dmax_idx, &dmax) in dmax_points.iter().enumerate() {
        for (alpha_idx, &log_alpha) in alpha_points.iter().enumerate() {
            if cancel.is_cancelled() {
                sink.notify(SearchRecord::Canceled)?;
                return Ok(None);
            }

            let cell = evaluate(q, i, err, config.n, log_alpha.exp(), dmax);
            sink.notify(SearchRecord::Update(SearchUpdate {
                alpha: log_alpha,
                evidence: cell.neg_evidence,
                chi: cell.chi,
                dmax,
                spoint: point,
                tpoint: total,
                status: None,
            }))?;

            if cell.neg_evidence.is_finite()
                && best.map_or(true, |(b, _, _)| cell.neg_evidence < b)
            {
                best = Some((cell.neg_evidence, log_alpha, dmax));
            }
            if cell.chi < best_chi {
                best_chi = cell.chi;
            }
            posteriors[(dmax_idx, alpha_idx)] = cell.neg_evidence;
            point += 1;
        }
    }

    let (best_neg_evidence, best_log_alpha, best_dmax) = match best {
        Some(found) => found,
        None => {
            sink.notify(SearchRecord::Failed)?;
            return Ok(None);
        }
    };

    sink.notify(SearchRecord::Update(SearchUpdate {
        alpha: best_log_alpha.exp(),
        evidence: best_neg_evidence,
        chi: best_chi,
        dmax: best_dmax,
        spoint: point,
        tpoint: total,
        status: Some("Running a fine search".to_string()),
    }))?;

    let objective =
        |x: &[f64]| evaluate(q, i, err, config.n, x[0].exp(), x[1]).neg_evidence;
    let refined = NelderMead::new().minimize(objective, &[best_log_alpha, best_dmax], cancel);
    let (alpha_fin, dmax_fin) = match refined {
        Some(x) => (x[0].exp(), x[1]),
        None => {
            sink.notify(SearchRecord::Canceled)?;
            return Ok(None);
        }
    };

    let cell = evaluate(q, i, err, config.n, alpha_fin, dmax_fin);
    let grid = GridInfo {
        dmax_points,
        alpha_points,
        all_posteriors: posteriors,
    };
    let final_update = SearchUpdate {
        alpha: alpha_fin,
        evidence: cell.neg_evidence,
        chi: cell.chi,
        dmax: dmax_fin,
        spoint: point,
        tpoint: total,
        status: None,
    };
    let artifact = assemble(data, cell, alpha_fin, dmax_fin, config.n, Some(grid), None)?;
    sink.notify(SearchRecord::Update(final_update))?;

    Ok(Some(artifact))
}

/// Run one inner solve at fixed (α, D_max) and return the resulting
/// artifact. No progress reporting, no cancellation.
pub fn single_solve<M>(alpha: f64, dmax: f64, data: &M, n: usize) -> Result<IftArtifact, Error>
where
    M: Measurement,
{
    if alpha <= 0.0 {
        return Err(bift_error!(InvalidParameter, "`single_solve`: alpha must be > 0."));
    }
    if dmax <= 0.0 {
        return Err(bift_error!(InvalidParameter, "`single_solve`: dmax must be > 0."));
    }
    if n < 4 {
        return Err(bift_error!(
            InvalidParameter,
            "`single_solve`: at least 4 P(r) points are required."
        ));
    }
    validate_measurement(data)?;

    let (w_start, w_end) = data.q_range();
    let q = &data.q()[w_start..w_end];
    let i = &data.intensity()[w_start..w_end];
    let err = &data.err()[w_start..w_end];

    let cell = evaluate(q, i, err, n, alpha, dmax);
    let log_evidence = -cell.neg_evidence;
    assemble(data, cell, alpha, dmax, n, None, Some(log_evidence))
}

/// Precondition checks shared by the entry points.
fn validate_measurement<M: Measurement>(data: &M) -> Result<(), Error> {
    let (w_start, w_end) = data.q_range();
    let len = data.q().len();
    if w_start >= w_end || w_end > len {
        return Err(bift_error!(
            InvalidParameter,
            format!(
                "invalid q-range ({}, {}) for a q-vector of length {}.",
                w_start, w_end, len
            )
        ));
    }
    if data.intensity().len() != len || data.err().len() != len {
        return Err(bift_error!(
            InvalidParameter,
            "measurement columns must have identical lengths."
        ));
    }
    if data.err()[w_start..w_end].iter().any(|&e| e <= 0.0) {
        return Err(bift_error!(
            InvalidParameter,
            "intensity errors must be strictly positive inside the q-window."
        ));
    }
    ift_filename(data)?;
    Ok(())
}

/// Basename of the measurement filename with its extension swapped for
/// `.ift`. Any directory prefix in the parameter is discarded.
fn ift_filename<M: Measurement>(data: &M) -> Result<String, Error> {
    let name = data
        .parameter("filename")
        .and_then(Value::as_str)
        .ok_or_else(bift_error_closure!(
            InvalidParameter,
            "measurement has no \"filename\" parameter."
        ))?;
    let base = Path::new(name)
        .file_name()
        .ok_or_else(bift_error_closure!(
            InvalidParameter,
            "measurement \"filename\" parameter has no basename."
        ))?;
    Ok(Path::new(base)
        .with_extension("ift")
        .to_string_lossy()
        .into_owned())
}

/// Undo the transform scaling, pin the endpoints, integrate for I(0) and
/// R_g and package the artifact.
fn assemble<M: Measurement>(
    data: &M,
    cell: Evaluation,
    alpha: f64,
    dmax: f64,
    n: usize,
    grid: Option<GridInfo>,
    log_evidence: Option<f64>,
) -> Result<IftArtifact, Error> {
    use crate::core::math::trapz;

    let (w_start, w_end) = data.q_range();
    let fit = cell.sys.fit(&cell.p);

    // two extra grid points take the pinned zeros at r = 0 and r = dmax
    let r = linspace(0.0, dmax, n + 2);
    let dr = r[2] - r[1];
    let mut p = DVector::zeros(n + 2);
    for k in 0..n {
        // the optimization carries P·4π·Δr; divide the scale back out
        p[k + 1] = cell.p[k] / (4.0 * PI * dr);
    }

    let area = trapz(&p, &r);
    let r_sq = r.component_mul(&r);
    let area2 = trapz(&p.component_mul(&r_sq), &r);
    let rg = (area2 / (2.0 * area)).abs().sqrt();
    let i0 = 4.0 * PI * area;

    Ok(IftArtifact {
        p,
        r,
        err_p: DVector::from_element(n + 2, 1.0),
        i_orig: DVector::from_column_slice(&data.intensity()[w_start..w_end]),
        q_orig: DVector::from_column_slice(&data.q()[w_start..w_end]),
        err_orig: DVector::from_column_slice(&data.err()[w_start..w_end]),
        fit,
        info: IftInfo {
            alpha,
            dmax,
            i0,
            chi_squared: cell.chi,
            rg,
            evidence: log_evidence,
            filename: ift_filename(data)?,
            algorithm: "BIFT".to_string(),
            grid,
        },
    })
}
