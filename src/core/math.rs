// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Shared numeric helpers

use nalgebra::DVector;

/// `n` evenly spaced values over `[start, end]`, endpoints included.
///
/// `n = 1` yields `[start]`, matching NumPy's `linspace`.
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> DVector<f64> {
    if n == 1 {
        return DVector::from_element(1, start);
    }
    let step = (end - start) / (n as f64 - 1.0);
    DVector::from_fn(n, |k, _| start + step * k as f64)
}

/// Trapezoidal integral of `y` sampled at `x`.
pub(crate) fn trapz(y: &DVector<f64>, x: &DVector<f64>) -> f64 {
    let mut area = 0.0;
    for k in 0..y.len() - 1 {
        area += (x[k + 1] - x[k]) * (y[k + 1] + y[k]) / 2.0;
    }
    area
}
