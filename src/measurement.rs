// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Measurement container
//!
//! The engine reads a measured scattering curve through the narrow
//! [`Measurement`] interface: the q/I/σ triple, a selected q-window and a
//! free-form parameter bag. Acquisition and preprocessing (parsing, binning,
//! zinger removal, calibration, averaging) belong to the surrounding suite
//! and stay outside this crate; [`ScatterCurve`] is the minimal concrete
//! container satisfying the read contract.

use crate::core::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Read contract for a measured scattering curve.
///
/// The measurement is read-only for the duration of a search. All indices in
/// `q_range` address the full `q`/`intensity`/`err` sequences; the window is
/// half-open.
pub trait Measurement {
    /// Scattering vector magnitudes, ascending.
    fn q(&self) -> &[f64];

    /// Measured intensity at each `q[k]`.
    fn intensity(&self) -> &[f64];

    /// Standard deviation of each `intensity[k]`, strictly positive.
    fn err(&self) -> &[f64];

    /// The selected half-open index window `[start, end)`.
    fn q_range(&self) -> (usize, usize);

    /// Look up an entry of the parameter bag. At least `"filename"` must be
    /// present, holding a string.
    fn parameter(&self, key: &str) -> Option<&Value>;
}

/// A q/I/σ triple with a selected q-window and a parameter bag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScatterCurve {
    q: Vec<f64>,
    i: Vec<f64>,
    err: Vec<f64>,
    q_range: (usize, usize),
    parameters: HashMap<String, Value>,
}

impl ScatterCurve {
    /// Construct a curve from its three columns and a parameter bag.
    ///
    /// The q-window initially spans the whole curve. Fails if the columns
    /// differ in length or are empty.
    ///
    /// # Example
    ///
    /// ```
    /// use bift::measurement::ScatterCurve;
    /// use std::collections::HashMap;
    ///
    /// let params = HashMap::from([("filename".to_string(), "lys.dat".into())]);
    /// let curve = ScatterCurve::new(
    ///     vec![0.01, 0.02, 0.03],
    ///     vec![100.0, 90.0, 75.0],
    ///     vec![1.0, 1.0, 1.0],
    ///     params,
    /// )?;
    /// # Ok::<(), bift::core::Error>(())
    /// ```
    pub fn new(
        q: Vec<f64>,
        i: Vec<f64>,
        err: Vec<f64>,
        parameters: HashMap<String, Value>,
    ) -> Result<Self, Error> {
        if q.is_empty() {
            return Err(bift_error!(InvalidParameter, "`ScatterCurve`: empty curve."));
        }
        if q.len() != i.len() || q.len() != err.len() {
            return Err(bift_error!(
                InvalidParameter,
                "`ScatterCurve`: q, i and err must have identical lengths."
            ));
        }
        let q_range = (0, q.len());
        Ok(ScatterCurve {
            q,
            i,
            err,
            q_range,
            parameters,
        })
    }

    /// Select the half-open q-window `[start, end)` used by the engine.
    pub fn set_q_range(&mut self, start: usize, end: usize) -> Result<(), Error> {
        if start >= end || end > self.q.len() {
            return Err(bift_error!(
                InvalidParameter,
                format!(
                    "`ScatterCurve`: ({}, {}) is not a valid q-range for a q-vector of length {}.",
                    start,
                    end,
                    self.q.len()
                )
            ));
        }
        self.q_range = (start, end);
        Ok(())
    }

    /// Insert a key/value pair into the parameter bag.
    pub fn set_parameter(&mut self, key: &str, value: Value) {
        self.parameters.insert(key.to_string(), value);
    }
}

impl Measurement for ScatterCurve {
    fn q(&self) -> &[f64] {
        &self.q
    }

    fn intensity(&self) -> &[f64] {
        &self.i
    }

    fn err(&self) -> &[f64] {
        &self.err
    }

    fn q_range(&self) -> (usize, usize) {
        self.q_range
    }

    fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BiftError;
    use crate::test_trait_impl;

    test_trait_impl!(scatter_curve, ScatterCurve);

    fn curve() -> ScatterCurve {
        let params = HashMap::from([("filename".to_string(), "lys.dat".into())]);
        ScatterCurve::new(
            vec![0.0, 0.01, 0.02, 0.03],
            vec![100.0, 98.0, 92.0, 83.0],
            vec![1.0, 1.0, 1.0, 1.0],
            params,
        )
        .unwrap()
    }

    #[test]
    fn test_default_window_spans_curve() {
        let c = curve();
        assert_eq!(c.q_range(), (0, 4));
    }

    #[test]
    fn test_set_q_range() {
        let mut c = curve();
        c.set_q_range(1, 4).unwrap();
        assert_eq!(c.q_range(), (1, 4));

        assert!(c.set_q_range(2, 2).is_err());
        assert!(c.set_q_range(3, 1).is_err());
        assert_error!(
            c.set_q_range(0, 5),
            BiftError,
            concat!(
                "Invalid parameter: \"`ScatterCurve`: (0, 5) is not a valid ",
                "q-range for a q-vector of length 4.\""
            )
        );
        // failed calls leave the previous window in place
        assert_eq!(c.q_range(), (1, 4));
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let r = ScatterCurve::new(vec![0.1], vec![1.0, 2.0], vec![1.0], HashMap::new());
        assert!(r.is_err());
        let r = ScatterCurve::new(vec![], vec![], vec![], HashMap::new());
        assert!(r.is_err());
    }

    #[test]
    fn test_parameter_bag() {
        let mut c = curve();
        assert_eq!(
            c.parameter("filename").and_then(Value::as_str),
            Some("lys.dat")
        );
        assert!(c.parameter("counters").is_none());
        c.set_parameter("counters", Value::from(3));
        assert_eq!(c.parameter("counters").and_then(Value::as_i64), Some(3));
    }
}
