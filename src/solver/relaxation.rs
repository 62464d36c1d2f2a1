// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Relaxation solver
//!
//! The inner solver of the engine. For fixed (α, D_max) it minimizes the
//! smoothness-regularized least-squares objective by an under-relaxed
//! fixed-point iteration: each sweep rebuilds the smoothness target as a
//! running mean of the current estimate, proposes the exact minimizer of the
//! separable part, and blends it in with relaxation factor ω. When the
//! smoothness and data-fit gradients start pointing in opposite directions
//! the step overshot, and ω is halved until they align again.
//!
//! The solver is deterministic and never fails; non-finite values flow into
//! the returned smoothness score and poison the evidence downstream.
//!
//! See [`Relaxation`] for details.

use crate::solver::SolveSystem;
use nalgebra::DVector;

/// Converged output of one inner solve.
pub struct SolveReport {
    /// The estimated distribution (the transform scale 4π·Δr is still
    /// absorbed in it).
    pub p: DVector<f64>,
    /// Smoothness score `s = -Σ (P_k - m_k)²`.
    pub s: f64,
    /// Outer iterations performed.
    pub iterations: u64,
    /// Final relaxation factor; never larger than its initial value.
    pub omega: f64,
    /// Final cosine between the smoothness and data-fit gradients; 1 at
    /// convergence.
    pub dotsp: f64,
}

/// # Under-relaxed fixed-point solver
///
/// Iteratively estimates P(r) for a fixed regularization strength. The
/// default tuning matches the reference implementation and rarely needs
/// changing.
#[derive(Clone, Debug)]
pub struct Relaxation {
    /// Initial relaxation factor
    omega_init: f64,
    /// Relaxation floor; the iteration stops once ω falls to it
    omega_min: f64,
    /// Factor by which ω shrinks on each backtracking step
    omega_reduce: f64,
    /// Iterations run before any termination test
    min_iters: u64,
    /// Iteration ceiling
    max_iters: u64,
    /// Convergence tolerance on |1 - dotsp|
    dotsp_tol: f64,
}

impl Default for Relaxation {
    fn default() -> Self {
        Relaxation {
            omega_init: 0.5,
            omega_min: 0.001,
            omega_reduce: 2.0,
            min_iters: 10,
            max_iters: 1000,
            dotsp_tol: 0.001,
        }
    }
}

impl Relaxation {
    /// Construct a solver with the reference tuning.
    pub fn new() -> Self {
        Relaxation::default()
    }

    /// Set the iteration ceiling.
    ///
    /// Must be at least the minimum iteration count (10).
    pub fn with_max_iters(mut self, max_iters: u64) -> Result<Self, crate::core::Error> {
        if max_iters < self.min_iters {
            return Err(bift_error!(
                InvalidParameter,
                "`Relaxation`: max_iters must be >= 10."
            ));
        }
        self.max_iters = max_iters;
        Ok(self)
    }

    /// Run the iteration. `prior` doubles as the first guess and as the
    /// initial smoothness target.
    pub fn solve(&self, sys: &SolveSystem, alpha: f64, prior: &DVector<f64>) -> SolveReport {
        let n = prior.len();
        let mut p = prior.clone();
        let mut m = prior.clone();
        let mut p_old = DVector::zeros(n);
        let mut d_p = DVector::zeros(n);
        let mut psi = DVector::zeros(n);
        let mut grad_c = DVector::zeros(n);

        let mut omega = self.omega_init;
        let mut dotsp: f64 = 0.0;
        let mut s = 0.0;
        let mut iterations: u64 = 0;

        while !(iterations >= self.min_iters
            && (iterations >= self.max_iters
                || omega <= self.omega_min
                || (1.0 - dotsp).abs() <= self.dotsp_tol))
        {
            if iterations > 0 {
                // smoothness target: 3-point running mean of the estimate
                m[0] = p[1] / 2.0;
                m[n - 1] = p[n - 2] / 2.0;
                for k in 1..n - 1 {
                    m[k] = (p[k - 1] + p[k] + p[k + 1]) / 3.0;
                }

                // Ψ_j = Σ_k P_k·B_off[k,j], the off-diagonal Hessian action
                psi.gemv_tr(1.0, &sys.b_off, &p, 0.0);
                for k in 0..n {
                    d_p[k] = (alpha * m[k] + sys.f[k] - psi[k]) / (sys.b_diag[k] + alpha);
                }
                p_old.copy_from(&p);
                for k in 0..n {
                    p[k] = (1.0 - omega) * p[k] + omega * d_p[k];
                }
            }

            let (mut s_cur, mut norm_s, mut norm_c, mut dotsp_raw) =
                Self::measures(sys, &p, &m, &mut grad_c);

            // opposed gradients mean the relaxed step overshot: retreat
            // towards the previous iterate until they align. Skipped when α
            // dominates the Hessian diagonal outright.
            while dotsp_raw < 0.0
                && alpha < sys.bkk_max
                && iterations > 1
                && omega > self.omega_min
            {
                omega /= self.omega_reduce;
                for k in 0..n {
                    p[k] = (1.0 - omega) * p_old[k] + omega * d_p[k];
                }
                (s_cur, norm_s, norm_c, dotsp_raw) = Self::measures(sys, &p, &m, &mut grad_c);
            }

            s = s_cur;
            dotsp = Self::normalize(dotsp_raw, norm_s, norm_c);
            iterations += 1;
        }

        SolveReport {
            p,
            s,
            iterations,
            omega,
            dotsp,
        }
    }

    /// Smoothness score, gradient norms and the raw gradient dot product of
    /// the current estimate.
    fn measures(
        sys: &SolveSystem,
        p: &DVector<f64>,
        m: &DVector<f64>,
        grad_c: &mut DVector<f64>,
    ) -> (f64, f64, f64, f64) {
        grad_c.gemv_tr(2.0, &sys.b, p, 0.0);

        let mut s = 0.0;
        let mut norm_s_sq = 0.0;
        let mut norm_c_sq = 0.0;
        let mut dotsp_raw = 0.0;
        for k in 0..p.len() {
            let gs = -2.0 * (p[k] - m[k]);
            let gc = grad_c[k] - 2.0 * sys.f[k];
            s -= (p[k] - m[k]) * (p[k] - m[k]);
            norm_s_sq += gs * gs;
            norm_c_sq += gc * gc;
            dotsp_raw += gs * gc;
        }
        (s, norm_s_sq.sqrt(), norm_c_sq.sqrt(), dotsp_raw)
    }

    /// Cosine of the gradient angle; an exactly vanished gradient counts as
    /// converged.
    #[allow(clippy::float_cmp)]
    fn normalize(dotsp_raw: f64, norm_s: f64, norm_c: f64) -> f64 {
        if norm_s == 0.0 || norm_c == 0.0 {
            1.0
        } else {
            dotsp_raw / (norm_s * norm_c)
        }
    }
}
