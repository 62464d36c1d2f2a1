// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! End-to-end searches over synthetic sphere data.

use bift::core::{CancelToken, CollectingSink, Error, ProgressSink, SearchRecord};
use bift::measurement::ScatterCurve;
use bift::search::{do_bift, single_solve, SearchConfig};
use bift::transform::trans_matrix;
use nalgebra::DVector;
use std::collections::HashMap;
use std::f64::consts::PI;

const RADIUS: f64 = 60.0;

/// I(q) of a homogeneous sphere of radius `radius`.
fn sphere_intensity(radius: f64, q: f64) -> f64 {
    let x = q * radius;
    let amp = 4.0 / 3.0 * PI * radius.powi(3) * 3.0 * (x.sin() - x * x.cos()) / x.powi(3);
    amp * amp
}

/// Synthetic sphere measurement: q on [0.01, 0.2], constant absolute errors
/// of 0.1% of the forward intensity.
fn sphere_curve(points: usize) -> ScatterCurve {
    let q: Vec<f64> = (0..points)
        .map(|k| 0.01 + (0.2 - 0.01) * k as f64 / (points as f64 - 1.0))
        .collect();
    let i: Vec<f64> = q.iter().map(|&qv| sphere_intensity(RADIUS, qv)).collect();
    let err: Vec<f64> = i.iter().map(|_| 0.001 * i[0]).collect();
    let params = HashMap::from([("filename".to_string(), "sphere.dat".into())]);
    ScatterCurve::new(q, i, err, params).unwrap()
}

/// A sink that trips a cancellation token once it has seen a given spoint.
struct CancelAfter {
    token: CancelToken,
    after_spoint: usize,
    records: Vec<SearchRecord>,
}

impl ProgressSink for CancelAfter {
    fn notify(&mut self, record: SearchRecord) -> Result<(), Error> {
        if let Some(update) = record.as_update() {
            if update.spoint == self.after_spoint {
                self.token.cancel();
            }
        }
        self.records.push(record);
        Ok(())
    }
}

#[test]
fn full_search_recovers_sphere() {
    let curve = sphere_curve(400);
    let config = SearchConfig::new(50)
        .with_alpha_bounds(1e10, 16.0, 10)
        .unwrap()
        .with_dmax_bounds(400.0, 10.0, 20)
        .unwrap();

    let mut sink = CollectingSink::new();
    let cancel = CancelToken::new();
    let artifact = do_bift(&curve, &mut sink, &cancel, &config)
        .unwrap()
        .expect("search completed");

    // one update per grid cell, in traversal order, then the fine-search
    // milestone, then the final record
    assert_eq!(sink.records.len(), 202);
    let updates: Vec<_> = sink
        .records
        .iter()
        .map(|r| r.as_update().expect("only update records"))
        .collect();
    for (k, update) in updates.iter().take(200).enumerate() {
        assert_eq!(update.spoint, k);
        assert_eq!(update.tpoint, 200);
        assert!(update.status.is_none());
    }
    assert_eq!(
        updates[200].status.as_deref(),
        Some("Running a fine search")
    );
    assert_eq!(updates[200].spoint, 200);
    assert!(updates[201].status.is_none());

    // grid updates carry ln(alpha), bounded by the configured log range
    let log_lo = 16.0f64.ln();
    let log_hi = 1e10f64.ln();
    for update in updates.iter().take(200) {
        assert!(update.alpha >= log_lo - 1e-9 && update.alpha <= log_hi + 1e-9);
    }
    // the milestone reports the winning alpha linearly: its log matches one
    // of the grid points exactly
    assert!(updates
        .iter()
        .take(200)
        .any(|u| (updates[200].alpha.ln() - u.alpha).abs() < 1e-9));
    assert!(updates[201].alpha > 0.0);

    // the winning hyperparameters describe the sphere
    let dmax = artifact.info.dmax;
    assert!(
        (dmax - 2.0 * RADIUS).abs() <= 0.1 * 2.0 * RADIUS,
        "dmax {} not within 10% of {}",
        dmax,
        2.0 * RADIUS
    );
    let expected_rg = (3.0f64 / 5.0).sqrt() * RADIUS;
    assert!(
        (artifact.info.rg - expected_rg).abs() <= 0.05 * expected_rg,
        "Rg {} not within 5% of {}",
        artifact.info.rg,
        expected_rg
    );

    // grid metadata survives in the artifact
    let grid = artifact.info.grid.as_ref().expect("grid metadata");
    assert_eq!(grid.all_posteriors.shape(), (20, 10));
    assert_eq!(grid.dmax_points.len(), 20);
    assert!((grid.dmax_points[0] - 10.0).abs() < 1e-12);
    assert!((grid.alpha_points[0] - 16.0f64.ln()).abs() < 1e-12);
    assert_eq!(artifact.info.algorithm, "BIFT");
    assert_eq!(artifact.info.filename, "sphere.ift");

    // a single solve near the optimum lands within a factor of two of the
    // best grid chi-squared
    let single = single_solve(1e4, 120.0, &curve, 50).unwrap();
    assert_eq!(single.p.len(), 52);
    assert_eq!(single.p[0].to_bits(), 0.0f64.to_bits());
    assert_eq!(single.p[51].to_bits(), 0.0f64.to_bits());
    assert!(single.info.chi_squared <= 2.0 * updates[200].chi);
}

#[test]
fn small_grid_record_stream_and_artifact() {
    let curve = sphere_curve(60);
    let config = SearchConfig::new(10)
        .with_alpha_bounds(1e8, 100.0, 3)
        .unwrap()
        .with_dmax_bounds(150.0, 50.0, 2)
        .unwrap();

    let mut sink = CollectingSink::new();
    let cancel = CancelToken::new();
    let artifact = do_bift(&curve, &mut sink, &cancel, &config)
        .unwrap()
        .expect("search completed");

    assert_eq!(sink.records.len(), 8);
    for (k, record) in sink.records.iter().take(6).enumerate() {
        let update = record.as_update().unwrap();
        assert_eq!(update.spoint, k);
        assert_eq!(update.tpoint, 6);
    }

    assert_eq!(artifact.p.len(), 12);
    assert_eq!(artifact.p[0].to_bits(), 0.0f64.to_bits());
    assert_eq!(artifact.p[11].to_bits(), 0.0f64.to_bits());
    assert_eq!(artifact.fit.len(), 60);
    assert!(artifact.r.as_slice().windows(2).all(|w| w[1] > w[0]));
    let grid = artifact.info.grid.as_ref().unwrap();
    assert_eq!(grid.all_posteriors.shape(), (2, 3));
    assert!((grid.alpha_points[0] - 100.0f64.ln()).abs() < 1e-12);
    assert!((grid.alpha_points[2] - 1e8f64.ln()).abs() < 1e-12);
}

#[test]
fn cancellation_before_start_yields_single_canceled_record() {
    let curve = sphere_curve(60);
    let mut sink = CollectingSink::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let outcome = do_bift(&curve, &mut sink, &cancel, &SearchConfig::new(10)).unwrap();
    assert!(outcome.is_none());
    assert_eq!(sink.records, vec![SearchRecord::Canceled]);
}

#[test]
fn cancellation_mid_grid_stops_the_stream() {
    let curve = sphere_curve(60);
    let config = SearchConfig::new(10)
        .with_alpha_bounds(1e8, 100.0, 4)
        .unwrap()
        .with_dmax_bounds(200.0, 50.0, 3)
        .unwrap();

    let cancel = CancelToken::new();
    let mut sink = CancelAfter {
        token: cancel.clone(),
        after_spoint: 7,
        records: vec![],
    };
    let outcome = do_bift(&curve, &mut sink, &cancel, &config).unwrap();
    assert!(outcome.is_none());

    // spoints 0..=7 were published, then exactly one cancellation record
    assert_eq!(sink.records.len(), 9);
    for (k, record) in sink.records.iter().take(8).enumerate() {
        assert_eq!(record.as_update().unwrap().spoint, k);
    }
    assert_eq!(sink.records[8], SearchRecord::Canceled);
}

#[test]
fn all_cells_non_finite_yields_failed_record() {
    // a poisoned intensity column propagates NaN through every solve
    let q: Vec<f64> = (0..10).map(|k| 0.01 + 0.01 * k as f64).collect();
    let i = vec![f64::NAN; 10];
    let err = vec![1.0; 10];
    let params = HashMap::from([("filename".to_string(), "junk.dat".into())]);
    let curve = ScatterCurve::new(q, i, err, params).unwrap();

    let config = SearchConfig::new(8)
        .with_alpha_bounds(1e6, 10.0, 2)
        .unwrap()
        .with_dmax_bounds(120.0, 40.0, 2)
        .unwrap();
    let mut sink = CollectingSink::new();
    let cancel = CancelToken::new();

    let outcome = do_bift(&curve, &mut sink, &cancel, &config).unwrap();
    assert!(outcome.is_none());

    // every cell is still reported before the failure is announced
    assert_eq!(sink.records.len(), 5);
    for record in &sink.records[..4] {
        assert!(!record.as_update().unwrap().evidence.is_finite());
    }
    assert_eq!(sink.records[4], SearchRecord::Failed);
}

#[test]
fn artifact_filename_drops_directory_components() {
    let mut curve = sphere_curve(60);
    curve.set_parameter(
        "filename",
        serde_json::Value::from("data/run1/sphere.dat"),
    );
    let ift = single_solve(1e4, 120.0, &curve, 10).unwrap();
    assert_eq!(ift.info.filename, "sphere.ift");
}

#[test]
fn single_solve_is_deterministic() {
    let curve = sphere_curve(120);
    let a = single_solve(1e4, 120.0, &curve, 30).unwrap();
    let b = single_solve(1e4, 120.0, &curve, 30).unwrap();

    let bits = |v: &DVector<f64>| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a.p), bits(&b.p));
    assert_eq!(bits(&a.fit), bits(&b.fit));
    assert_eq!(a.info.rg.to_bits(), b.info.rg.to_bits());
    assert_eq!(a.info.i0.to_bits(), b.info.i0.to_bits());
    assert_eq!(a.info.chi_squared.to_bits(), b.info.chi_squared.to_bits());
    assert_eq!(
        a.info.evidence.unwrap().to_bits(),
        b.info.evidence.unwrap().to_bits()
    );
}

#[test]
fn artifact_fit_matches_recomputed_model() {
    let curve = sphere_curve(90);
    let n = 25;
    let dmax = 120.0;
    let ift = single_solve(1e5, dmax, &curve, n).unwrap();

    // undo the assembler's 4π·Δr division and push the solver-scale P back
    // through the transform
    let dr = ift.r[2] - ift.r[1];
    let p_solver = DVector::from_fn(n, |k, _| ift.p[k + 1] * 4.0 * PI * dr);
    let r_solver = DVector::from_fn(n, |k, _| dmax * k as f64 / (n as f64 - 1.0));
    let t = trans_matrix(ift.q_orig.as_slice(), &r_solver);
    let recomputed = &t * &p_solver;

    for (a, b) in recomputed.iter().zip(ift.fit.iter()) {
        let scale = b.abs().max(1.0);
        assert!(
            (a - b).abs() / scale < 1e-12,
            "fit mismatch: {} vs {}",
            a,
            b
        );
    }
}

#[test]
fn worker_thread_streams_records_through_a_channel() {
    let curve = sphere_curve(60);
    let config = SearchConfig::new(10)
        .with_alpha_bounds(1e8, 100.0, 3)
        .unwrap()
        .with_dmax_bounds(150.0, 50.0, 2)
        .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let cancel = CancelToken::new();
    let worker = std::thread::spawn(move || {
        let mut sink = tx;
        do_bift(&curve, &mut sink, &cancel, &config).unwrap()
    });

    // the sender is dropped when the worker returns, closing the stream
    let records: Vec<SearchRecord> = rx.iter().collect();
    let artifact = worker.join().unwrap().expect("search completed");

    assert_eq!(records.len(), 8);
    assert!(records.iter().all(|r| r.as_update().is_some()));
    assert_eq!(artifact.fit.len(), 60);
}

#[test]
fn evidence_is_unimodal_over_log_alpha_at_true_dmax() {
    let curve = sphere_curve(200);
    let samples = 13;
    let mut neg_evidence = Vec::with_capacity(samples);
    for k in 0..samples {
        let log_alpha = 1e8f64.ln() * k as f64 / (samples as f64 - 1.0);
        let ift = single_solve(log_alpha.exp(), 120.0, &curve, 50).unwrap();
        neg_evidence.push(-ift.info.evidence.unwrap());
    }

    let spread = neg_evidence
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max)
        - neg_evidence.iter().cloned().fold(f64::INFINITY, f64::min);
    let tol = 1e-6 * spread.abs();
    let best = neg_evidence
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .unwrap()
        .0;
    for k in 0..best {
        assert!(
            neg_evidence[k] >= neg_evidence[k + 1] - tol,
            "not descending before the minimum: {:?}",
            neg_evidence
        );
    }
    for k in best..samples - 1 {
        assert!(
            neg_evidence[k + 1] >= neg_evidence[k] - tol,
            "not ascending after the minimum: {:?}",
            neg_evidence
        );
    }
}
