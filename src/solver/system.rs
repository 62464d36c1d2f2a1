// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Solve system
//!
//! Everything the inner solver needs that depends only on the q-window and
//! the real-space grid is assembled once per (D_max, N) evaluation: the
//! transform matrix, the error-weighted data-fit Hessian and its split into
//! diagonal and off-diagonal parts, and the weighted data vector.

use crate::transform::trans_matrix;
use nalgebra::{DMatrix, DVector};

/// Precomputed tensors for one inner solve.
pub struct SolveSystem {
    /// Transform matrix, `(q-window length) × (r-grid length)`.
    pub t: DMatrix<f64>,
    /// Data-fit Hessian `B[k, j] = Σ_i T[i,k]·T[i,j]/σ_i²`.
    pub b: DMatrix<f64>,
    /// `B` with its diagonal zeroed.
    pub b_off: DMatrix<f64>,
    /// Diagonal of `B`.
    pub b_diag: DVector<f64>,
    /// Weighted data vector `f_k = Σ_i T[i,k]·I_i/σ_i²`.
    pub f: DVector<f64>,
    /// Overshoot guard `10·max(B_kk)`; backtracking is skipped once α
    /// exceeds it.
    pub bkk_max: f64,
}

impl SolveSystem {
    /// Assemble the tensors for the windowed measurement columns and the
    /// real-space grid `r`.
    pub fn assemble(q: &[f64], intensity: &[f64], err: &[f64], r: &DVector<f64>) -> SolveSystem {
        let t = trans_matrix(q, r);

        // row-weight a copy of T by 1/σ² so B and f fall out of one product each
        let mut tw = t.clone();
        for (i, mut row) in tw.row_iter_mut().enumerate() {
            row /= err[i] * err[i];
        }
        let b = t.tr_mul(&tw);
        let f = tw.tr_mul(&DVector::from_column_slice(intensity));

        let b_diag = b.diagonal();
        let mut b_off = b.clone();
        for k in 0..b_off.nrows() {
            b_off[(k, k)] = 0.0;
        }
        let bkk_max = 10.0 * b_diag.max();

        SolveSystem {
            t,
            b,
            b_off,
            b_diag,
            f,
            bkk_max,
        }
    }

    /// Model intensity `T·p` on the q-window.
    pub fn fit(&self, p: &DVector<f64>) -> DVector<f64> {
        &self.t * p
    }

    /// Unreduced chi-squared `Σ ((I - T·p)/σ)²` of `p` against the windowed
    /// measurement.
    pub fn chi_squared(&self, p: &DVector<f64>, intensity: &[f64], err: &[f64]) -> f64 {
        let model = self.fit(p);
        intensity
            .iter()
            .zip(model.iter())
            .zip(err.iter())
            .map(|((i, m), e)| ((i - m) / e).powi(2))
            .sum()
    }
}
