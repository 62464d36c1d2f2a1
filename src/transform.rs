// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Transform matrix
//!
//! For an isotropic sample, I(q) and P(r) are related through the sinc
//! kernel sin(qr)/(qr). [`trans_matrix`] tabulates that kernel over the
//! measured q-window and the real-space grid, so the model intensity is the
//! matrix-vector product T·P.
//!
//! The physical 4π·Δr factor of the integral is absorbed into P during the
//! optimization and divided out again by the result assembler; it must not
//! be applied here.

use nalgebra::{DMatrix, DVector};

/// Transform matrix T with `T[i, j] = sin(q_i·r_j)/(q_i·r_j)`.
///
/// The removable singularity at `q_i·r_j = 0` evaluates to 1, as does any
/// product whose sinc comes out NaN (q or r non-finite). Every entry lies in
/// `[-1, 1]`.
#[allow(clippy::float_cmp)]
pub fn trans_matrix(q: &[f64], r: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(q.len(), r.len(), |i, j| {
        let u = q[i] * r[j];
        if u == 0.0 {
            return 1.0;
        }
        let v = u.sin() / u;
        if v.is_nan() {
            1.0
        } else {
            v
        }
    })
}
