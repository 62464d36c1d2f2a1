// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Nelder-Mead method
//!
//! The Nelder-Mead method is a heuristic search method for nonlinear
//! optimization problems which does not require derivatives. The fine stage
//! of the hyperparameter search uses it to polish the grid optimum.
//!
//! See [`NelderMead`] for details.
//!
//! ## Reference
//!
//! <https://en.wikipedia.org/wiki/Nelder%E2%80%93Mead_method>

use crate::core::{CancelToken, Error};

/// Relative perturbation applied to non-zero seed coordinates when building
/// the initial simplex.
const NONZDELT: f64 = 0.05;
/// Absolute perturbation applied to zero seed coordinates.
const ZDELT: f64 = 0.00025;

/// # Nelder-Mead method
///
/// Downhill simplex minimization over n variables using a simplex of n+1
/// vertices. The function is evaluated at all vertices and the worst vertex
/// is replaced through reflection, expansion or contraction; if none of
/// those improves it, the whole simplex shrinks towards the best vertex.
///
/// The initial simplex, the termination test (maximum coordinate spread and
/// maximum cost spread against the best vertex) and the iteration budget of
/// `200·n` follow the classic Fortran-lineage defaults, so seeds and
/// tolerances carry over from drivers written against those.
///
/// Between iterations the minimizer polls a [`CancelToken`]; a tripped token
/// abandons the minimization with `None`.
#[derive(Clone, Debug)]
pub struct NelderMead {
    /// Reflection coefficient
    rho: f64,
    /// Expansion coefficient
    chi: f64,
    /// Contraction coefficient
    psi: f64,
    /// Shrink coefficient
    sigma: f64,
    /// Termination tolerance on the coordinate spread of the simplex
    xtol: f64,
    /// Termination tolerance on the cost spread of the simplex
    ftol: f64,
    /// Iteration budget; defaults to `200·n`
    max_iters: Option<u64>,
    /// Cost evaluation budget; defaults to `200·n`
    max_evals: Option<u64>,
}

impl Default for NelderMead {
    fn default() -> Self {
        NelderMead {
            rho: 1.0,
            chi: 2.0,
            psi: 0.5,
            sigma: 0.5,
            xtol: 1e-4,
            ftol: 1e-4,
            max_iters: None,
            max_evals: None,
        }
    }
}

impl NelderMead {
    /// Construct a new instance of `NelderMead` with the default
    /// coefficients (reflection 1, expansion 2, contraction 0.5, shrink 0.5)
    /// and tolerances (`xtol = ftol = 1e-4`).
    pub fn new() -> Self {
        NelderMead::default()
    }

    /// Set the termination tolerance on the coordinate spread.
    ///
    /// Must be larger than 0 and defaults to `1e-4`.
    pub fn with_xtol(mut self, xtol: f64) -> Result<Self, Error> {
        if xtol <= 0.0 {
            return Err(bift_error!(
                InvalidParameter,
                "`Nelder-Mead`: xtol must be > 0."
            ));
        }
        self.xtol = xtol;
        Ok(self)
    }

    /// Set the termination tolerance on the cost spread.
    ///
    /// Must be larger than 0 and defaults to `1e-4`.
    pub fn with_ftol(mut self, ftol: f64) -> Result<Self, Error> {
        if ftol <= 0.0 {
            return Err(bift_error!(
                InvalidParameter,
                "`Nelder-Mead`: ftol must be > 0."
            ));
        }
        self.ftol = ftol;
        Ok(self)
    }

    /// Set the iteration budget. Defaults to `200·n`.
    pub fn with_max_iters(mut self, max_iters: u64) -> Result<Self, Error> {
        if max_iters == 0 {
            return Err(bift_error!(
                InvalidParameter,
                "`Nelder-Mead`: max_iters must be > 0."
            ));
        }
        self.max_iters = Some(max_iters);
        Ok(self)
    }

    /// Set the cost evaluation budget. Defaults to `200·n`.
    pub fn with_max_evals(mut self, max_evals: u64) -> Result<Self, Error> {
        if max_evals == 0 {
            return Err(bift_error!(
                InvalidParameter,
                "`Nelder-Mead`: max_evals must be > 0."
            ));
        }
        self.max_evals = Some(max_evals);
        Ok(self)
    }

    /// Minimize `cost` starting from `x0`.
    ///
    /// Returns the best vertex found, also when the iteration budget runs
    /// out before the tolerances are met. Returns `None` only when `cancel`
    /// was tripped.
    pub fn minimize<F>(&self, mut cost: F, x0: &[f64], cancel: &CancelToken) -> Option<Vec<f64>>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let n = x0.len();
        let max_iters = self.max_iters.unwrap_or(200 * n as u64);
        let max_evals = self.max_evals.unwrap_or(200 * n as u64);
        let mut evals: u64 = 0;

        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        evals += 1;
        simplex.push((x0.to_vec(), cost(x0)));
        for k in 0..n {
            let mut y = x0.to_vec();
            #[allow(clippy::float_cmp)]
            if y[k] != 0.0 {
                y[k] *= 1.0 + NONZDELT;
            } else {
                y[k] = ZDELT;
            }
            evals += 1;
            let fy = cost(&y);
            simplex.push((y, fy));
        }
        sort_simplex(&mut simplex);

        let mut iterations: u64 = 1;
        while evals < max_evals && iterations < max_iters {
            if cancel.is_cancelled() {
                return None;
            }
            if self.within_tolerance(&simplex) {
                break;
            }

            let xbar = centroid(&simplex);
            let worst = simplex[n].0.clone();

            let xr = affine(&xbar, &worst, self.rho);
            evals += 1;
            let fxr = cost(&xr);
            let mut shrink = false;

            if fxr < simplex[0].1 {
                let xe = affine(&xbar, &worst, self.rho * self.chi);
                evals += 1;
                let fxe = cost(&xe);
                if fxe < fxr {
                    simplex[n] = (xe, fxe);
                } else {
                    simplex[n] = (xr, fxr);
                }
            } else if fxr < simplex[n - 1].1 {
                simplex[n] = (xr, fxr);
            } else if fxr < simplex[n].1 {
                // outside contraction
                let xc = affine(&xbar, &worst, self.psi * self.rho);
                evals += 1;
                let fxc = cost(&xc);
                if fxc <= fxr {
                    simplex[n] = (xc, fxc);
                } else {
                    shrink = true;
                }
            } else {
                // inside contraction
                let xcc = affine(&xbar, &worst, -self.psi);
                evals += 1;
                let fxcc = cost(&xcc);
                if fxcc < simplex[n].1 {
                    simplex[n] = (xcc, fxcc);
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].0.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    for (v, b) in vertex.0.iter_mut().zip(best.iter()) {
                        *v = b + self.sigma * (*v - b);
                    }
                    evals += 1;
                    vertex.1 = cost(&vertex.0);
                }
            }

            sort_simplex(&mut simplex);
            iterations += 1;
        }

        Some(simplex.swap_remove(0).0)
    }

    /// True once both the coordinate and the cost spread of the simplex
    /// against its best vertex are within tolerance.
    fn within_tolerance(&self, simplex: &[(Vec<f64>, f64)]) -> bool {
        let (x_best, f_best) = &simplex[0];
        let mut max_dx: f64 = 0.0;
        let mut max_df: f64 = 0.0;
        for (x, fx) in &simplex[1..] {
            for (a, b) in x.iter().zip(x_best.iter()) {
                max_dx = max_dx.max((a - b).abs());
            }
            max_df = max_df.max((fx - f_best).abs());
        }
        max_dx <= self.xtol && max_df <= self.ftol
    }
}

/// Centroid of all vertices but the worst.
fn centroid(simplex: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let n = simplex.len() - 1;
    let mut xbar = vec![0.0; simplex[0].0.len()];
    for (x, _) in &simplex[..n] {
        for (acc, v) in xbar.iter_mut().zip(x.iter()) {
            *acc += v;
        }
    }
    for acc in xbar.iter_mut() {
        *acc /= n as f64;
    }
    xbar
}

/// The point `(1 + t)·a - t·b`: reflection for `t = ρ`, expansion for
/// `t = ρχ`, outside contraction for `t = ψρ` and inside contraction for
/// `t = -ψ`.
fn affine(a: &[f64], b: &[f64], t: f64) -> Vec<f64> {
    a.iter()
        .zip(b.iter())
        .map(|(av, bv)| (1.0 + t) * av - t * bv)
        .collect()
}

/// Sort vertices so the best comes first. NaN costs sort as equal and end
/// up wherever the stable sort leaves them, which keeps them away from the
/// front as long as any vertex is finite.
fn sort_simplex(simplex: &mut [(Vec<f64>, f64)]) {
    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
}
