//! End-to-end scenarios pinned to a specific zone

mod common;

use boostkern::{Backend, Compute, Config, Link};
use common::{apply_update, bin_sums_boosting, BinCase, Indexes, Targets, UpdateCase};

#[test]
fn test_avx2_rmse_zero_update_sixteen_samples() {
    if !Backend::Avx2.is_available() {
        eprintln!("Skipping AVX2 test: CPU does not support AVX2+FMA");
        return;
    }

    let compute = Compute::with_backend(Backend::Avx2, &Config::regression(), "rmse").unwrap();
    assert_eq!(compute.lanes(), 8);
    assert_eq!(compute.float_bytes(), 4);
    assert_eq!(compute.link(), Link::Identity);

    let scores: Vec<f64> = (0..16).map(|i| i as f64 * 0.5 - 2.0).collect();
    let targets = vec![1.0; 16];
    let tensor = [0.0];
    let case = UpdateCase {
        c_scores: 1,
        tensor: &tensor,
        indexes: None,
        scores: &scores,
        targets: Targets::Regression(&targets),
        weights: None,
        gradients: true,
        hessian: false,
        metric: true,
    };
    let outcome = apply_update(&compute, &case).unwrap();

    assert_eq!(outcome.scores, scores);
    let expected_gradients: Vec<f64> = scores.iter().map(|s| s - 1.0).collect();
    assert_eq!(outcome.gradients, expected_gradients);
    let expected_metric: f64 = scores.iter().map(|s| (s - 1.0) * (s - 1.0)).sum();
    assert_eq!(outcome.metric, expected_metric);
    assert_eq!(
        compute.finish_metric(outcome.metric / 16.0),
        (expected_metric / 16.0).sqrt()
    );
}

#[test]
fn test_avx512_bin_sums_sixteen_lanes_collide() {
    if !Backend::Avx512f.is_available() {
        eprintln!("Skipping AVX-512 test: CPU does not support AVX-512F");
        return;
    }

    let compute = Compute::with_backend(Backend::Avx512f, &Config::regression(), "rmse").unwrap();
    // every lane of both groups lands in bin 1
    let indexes = vec![1usize; 32];
    let gradients: Vec<f64> = (0..32).map(|i| i as f64).collect();
    let case = BinCase {
        c_scores: 1,
        hessian: false,
        c_bins: 2,
        indexes: Some(Indexes {
            values: &indexes,
            items_per_pack: 16,
        }),
        gradients: &gradients,
        hessians: &[],
        weights: None,
        counts: None,
    };
    let totals = bin_sums_boosting(&compute, &case).unwrap();

    assert_eq!(totals[0].count, 0);
    assert_eq!(totals[1].count, 32);
    assert_eq!(totals[1].weight, 32.0);
    assert_eq!(totals[1].gradients, vec![(0..32).sum::<i32>() as f64]);
}

#[test]
fn test_sse2_multiclass_scores_follow_tensor_rows() {
    if !Backend::Sse2.is_available() {
        eprintln!("Skipping SSE2 test: CPU does not support SSE2");
        return;
    }

    let compute = Compute::with_backend(Backend::Sse2, &Config::classification(3), "log_loss").unwrap();
    let tensor = [0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
    let indexes = [0usize, 1, 1, 0];
    let scores = vec![0.0; 12];
    let targets = [0u64, 1, 2, 0];
    let case = UpdateCase {
        c_scores: 3,
        tensor: &tensor,
        indexes: Some(Indexes {
            values: &indexes,
            items_per_pack: 32,
        }),
        scores: &scores,
        targets: Targets::Classes(&targets),
        weights: None,
        gradients: true,
        hessian: true,
        metric: false,
    };
    let outcome = apply_update(&compute, &case).unwrap();

    assert_eq!(
        outcome.scores,
        vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 0.0, 0.0, 0.0]
    );
    // uniform scores: p = 1/3, gradient p - y
    let third = 1.0f64 / 3.0;
    assert!((outcome.gradients[0] - (third - 1.0)).abs() < 1e-6);
    assert!((outcome.gradients[1] - third).abs() < 1e-6);
    assert!((outcome.hessians[0] - third * (1.0 - third)).abs() < 1e-6);
}
