// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Prior distribution
//!
//! The inner solver starts from, and regularizes towards, a prior P(r). The
//! built-in prior is the pair-distance distribution of a homogeneous sphere
//! of diameter `dmax`, floored so that no bin is zero: a zero bin could
//! never recover during the multiplicative parts of the iteration.

use crate::core::math::linspace;
use nalgebra::DVector;

/// Fraction of the largest bin used as the floor for every bin.
pub const PMIN: f64 = 0.005;

/// P(r) of a homogeneous sphere with diameter `dmax` on `n` equally spaced
/// points of `[0, dmax]`.
///
/// `scale_factor` is the first windowed intensity I(q_min); the result is
/// scaled so a solve seeded with it starts near the measured magnitude.
/// Every bin is at least [`PMIN`] times the largest bin, and the flooring
/// preserves the total sum.
pub fn sphere_prior(n: usize, scale_factor: f64, dmax: f64) -> DVector<f64> {
    let r = linspace(0.0, dmax, n);
    let delta_r = r[1];
    let psum = dmax.powi(3) / 24.0;
    let norm = scale_factor / psum * delta_r;

    let mut p = DVector::from_fn(n, |k, _| {
        let x = r[k] / dmax;
        r[k] * r[k] * (1.0 - 1.5 * x + 0.5 * x.powi(3)) * norm
    });

    let s1 = p.sum();
    let avm = PMIN * p.max();
    for v in p.iter_mut() {
        if *v <= avm {
            *v = avm;
        }
    }
    let s2 = p.sum();
    p * (s1 / s2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_prior_shape() {
        let p = sphere_prior(50, 1.0, 200.0);
        assert_eq!(p.len(), 50);
        assert!(p.iter().all(|&v| v > 0.0));

        // the sphere P(r) peaks near r = 2·dmax/3
        let peak = p.argmax().0;
        let r_peak = 200.0 * peak as f64 / 49.0;
        assert!((r_peak - 2.0 * 200.0 / 3.0).abs() < 10.0);

        // the first bin sits on the floor
        assert_relative_eq!(p[0], PMIN * p.max(), max_relative = 1e-12);
    }

    #[test]
    fn test_floor_and_sum_preserved() {
        let n = 50;
        let dmax = 200.0;
        let p = sphere_prior(n, 3.7, dmax);
        assert!(p.min() >= PMIN * p.max() * (1.0 - 1e-12));

        // flooring rescales back to the unfloored sum
        let r = linspace(0.0, dmax, n);
        let norm = 3.7 / (dmax.powi(3) / 24.0) * r[1];
        let raw = DVector::from_fn(n, |k, _| {
            let x = r[k] / dmax;
            r[k] * r[k] * (1.0 - 1.5 * x + 0.5 * x.powi(3)) * norm
        });
        assert_relative_eq!(p.sum(), raw.sum(), max_relative = 1e-12);
    }
}
