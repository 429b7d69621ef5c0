//! Quantified invariants of the rebinning kernel, checked on seeded
//! random pixel sets.

mod common;

use approx::assert_relative_eq;
use azimint::{integrate_1d, integrate_1d_parallel, integrate_2d, integrate_2d_parallel};
use azimint::IntegrationConfig;
use common::{pixel_grid, random_pixels, rotated_pixel};
use ndarray::{Array1, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_conservation_under_full_coverage_1d() {
    // Every quadrilateral lies strictly inside the output range, so both
    // the pixel count and the intensity sum must be conserved.
    let mut rng = StdRng::seed_from_u64(42);
    let n = 500;
    let pos = random_pixels(&mut rng, n, (1.0, 9.0), (-0.5, 0.5));
    let weights = Array1::from_shape_fn(n, |_| rng.gen_range(-2.0..50.0));
    let config = IntegrationConfig {
        pos0_range: Some((0.0, 10.0)),
        ..Default::default()
    };

    let result = integrate_1d(pos.view(), weights.view(), 16, &config).unwrap();

    assert_relative_eq!(result.sum_count.sum(), n as f64, epsilon = 1e-9 * n as f64);
    let total_intensity: f64 = weights.sum();
    let tolerance = 1e-9 * weights.iter().map(|w| w.abs()).sum::<f64>();
    assert_relative_eq!(result.sum_data.sum(), total_intensity, epsilon = tolerance);
}

#[test]
fn test_conservation_under_full_coverage_2d() {
    // Axis-aligned pixels strictly inside the 2D output box.
    let mut rng = StdRng::seed_from_u64(7);
    let n = 300;
    let mut pos = Array3::zeros((n, 4, 2));
    for idx in 0..n {
        let cx = rng.gen_range(1.0..9.0);
        let cy = rng.gen_range(-1.0..1.0);
        let w = rng.gen_range(0.05..0.8);
        let h = rng.gen_range(0.05..0.8);
        rotated_pixel(&mut pos, idx, cx, cy, w, h, 0.0);
    }
    let weights = Array1::from_shape_fn(n, |_| rng.gen_range(0.0..10.0));
    let config = IntegrationConfig {
        pos0_range: Some((0.0, 10.0)),
        pos1_range: Some((-2.0, 2.0)),
        ..Default::default()
    };

    let result = integrate_2d(pos.view(), weights.view(), (12, 6), &config).unwrap();

    assert_relative_eq!(result.sum_count.sum(), n as f64, epsilon = 1e-9 * n as f64);
    assert_relative_eq!(
        result.sum_data.sum(),
        weights.sum(),
        epsilon = 1e-9 * weights.sum()
    );
}

#[test]
fn test_partition_of_unity_per_pixel() {
    // A single pixel never deposits more than its own weight, and exactly
    // its own weight when fully inside the range.
    let mut rng = StdRng::seed_from_u64(1234);
    for trial in 0..50 {
        let mut pos = Array3::zeros((1, 4, 2));
        let cx = rng.gen_range(-1.0..11.0);
        let cy = rng.gen_range(-1.0..1.0);
        let w = rng.gen_range(0.05..1.5);
        let h = rng.gen_range(0.05..1.5);
        let theta = rng.gen_range(0.0..std::f64::consts::PI);
        rotated_pixel(&mut pos, 0, cx, cy, w, h, theta);
        let weights = Array1::from(vec![1.0]);
        let config = IntegrationConfig {
            pos0_range: Some((0.0, 10.0)),
            ..Default::default()
        };

        let result = integrate_1d(pos.view(), weights.view(), 16, &config).unwrap();
        let total = result.sum_count.sum();
        assert!(
            total <= 1.0 + 1e-12,
            "trial {trial}: pixel deposited {total} > 1"
        );
        assert!(total >= 0.0);

        let fully_inside = pos
            .slice(ndarray::s![0, .., 0])
            .iter()
            .all(|&x| x > 0.0 && x < 10.0);
        if fully_inside {
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_linearity_in_intensity() {
    let mut rng = StdRng::seed_from_u64(99);
    let n = 200;
    let pos = random_pixels(&mut rng, n, (1.0, 9.0), (-0.5, 0.5));
    let a = Array1::from_shape_fn(n, |_| rng.gen_range(-5.0..5.0));
    let b = Array1::from_shape_fn(n, |_| rng.gen_range(-5.0..5.0));
    let (alpha, beta) = (2.5, -0.75);
    let combined = alpha * &a + beta * &b;
    let config = IntegrationConfig {
        pos0_range: Some((0.0, 10.0)),
        ..Default::default()
    };

    let run_a = integrate_1d(pos.view(), a.view(), 16, &config).unwrap();
    let run_b = integrate_1d(pos.view(), b.view(), 16, &config).unwrap();
    let run_c = integrate_1d(pos.view(), combined.view(), 16, &config).unwrap();

    for k in 0..16 {
        assert_relative_eq!(
            run_c.sum_data[k],
            alpha * run_a.sum_data[k] + beta * run_b.sum_data[k],
            epsilon = 1e-9,
            max_relative = 1e-9
        );
        assert_relative_eq!(run_c.sum_count[k], run_a.sum_count[k]);
    }
}

#[test]
fn test_mask_equivalent_to_zero_weights_in_data() {
    let mut rng = StdRng::seed_from_u64(5);
    let n = 100;
    let pos = random_pixels(&mut rng, n, (1.0, 9.0), (-0.5, 0.5));
    let weights = Array1::from_shape_fn(n, |_| rng.gen_range(1.0..10.0));
    let mask = Array1::from_shape_fn(n, |i| if i % 3 == 0 { 1i8 } else { 0 });
    let mut zeroed = weights.clone();
    for i in 0..n {
        if mask[i] != 0 {
            zeroed[i] = 0.0;
        }
    }
    let base = IntegrationConfig {
        pos0_range: Some((0.0, 10.0)),
        ..Default::default()
    };
    let masked_config = IntegrationConfig {
        mask: Some(mask.view()),
        ..base
    };

    let masked = integrate_1d(pos.view(), weights.view(), 16, &masked_config).unwrap();
    let zeroed = integrate_1d(pos.view(), zeroed.view(), 16, &base).unwrap();

    // Weighted sums agree; the weight sums do not, because masking skips
    // the pixel while a zero weight still counts its area.
    for k in 0..16 {
        assert_relative_eq!(masked.sum_data[k], zeroed.sum_data[k], epsilon = 1e-9);
    }
    assert!(masked.sum_count.sum() < zeroed.sum_count.sum());
}

#[test]
fn test_corrections_match_precorrected_weights() {
    let mut rng = StdRng::seed_from_u64(17);
    let n = 120;
    let pos = random_pixels(&mut rng, n, (1.0, 9.0), (-0.5, 0.5));
    let weights = Array1::from_shape_fn(n, |_| rng.gen_range(5.0..50.0));
    let dark = Array1::from_shape_fn(n, |_| rng.gen_range(0.0..2.0));
    let flat = Array1::from_shape_fn(n, |_| rng.gen_range(0.8..1.2));
    let polarization = Array1::from_shape_fn(n, |_| rng.gen_range(0.9..1.1));
    let solid_angle = Array1::from_shape_fn(n, |_| rng.gen_range(0.5..1.0));

    let corrected = Array1::from_shape_fn(n, |i| {
        (weights[i] - dark[i]) / (flat[i] * polarization[i] * solid_angle[i])
    });

    let base = IntegrationConfig {
        pos0_range: Some((0.0, 10.0)),
        ..Default::default()
    };
    let with_corrections = IntegrationConfig {
        dark: Some(dark.view()),
        flat: Some(flat.view()),
        polarization: Some(polarization.view()),
        solid_angle: Some(solid_angle.view()),
        ..base
    };

    let run_corr = integrate_1d(pos.view(), weights.view(), 16, &with_corrections).unwrap();
    let run_pre = integrate_1d(pos.view(), corrected.view(), 16, &base).unwrap();

    for k in 0..16 {
        assert_relative_eq!(
            run_corr.sum_data[k],
            run_pre.sum_data[k],
            epsilon = 1e-9,
            max_relative = 1e-9
        );
        assert_relative_eq!(run_corr.sum_count[k], run_pre.sum_count[k]);
    }
}

#[test]
fn test_1d_matches_2d_summed_over_azimuth() {
    // Rebinning in 2D and collapsing the azimuthal axis is the same as
    // rebinning in 1D directly.
    let pos = pixel_grid(20, 10, 0.3, 0.1, 0.37, 0.17);
    let n = 200;
    let mut rng = StdRng::seed_from_u64(3);
    let weights = Array1::from_shape_fn(n, |_| rng.gen_range(0.0..100.0));
    let config = IntegrationConfig {
        pos0_range: Some((0.0, 8.0)),
        pos1_range: Some((0.0, 2.0)),
        ..Default::default()
    };

    let run_1d = integrate_1d(pos.view(), weights.view(), 10, &config).unwrap();
    let run_2d = integrate_2d(pos.view(), weights.view(), (10, 4), &config).unwrap();

    for i in 0..10 {
        let col_data: f64 = (0..4).map(|j| run_2d.sum_data[[i, j]]).sum();
        let col_count: f64 = (0..4).map(|j| run_2d.sum_count[[i, j]]).sum();
        assert_relative_eq!(run_1d.sum_data[i], col_data, epsilon = 1e-9, max_relative = 1e-9);
        assert_relative_eq!(run_1d.sum_count[i], col_count, epsilon = 1e-9, max_relative = 1e-9);
    }
}

#[test]
fn test_parallel_matches_serial_within_ulps() {
    // More pixels than one parallel chunk, so the merge path is exercised.
    let pos = pixel_grid(120, 60, 0.2, -1.0, 0.07, 0.03);
    let n = 120 * 60;
    let mut rng = StdRng::seed_from_u64(11);
    let weights = Array1::from_shape_fn(n, |_| rng.gen_range(0.0..1000.0));
    let config = IntegrationConfig {
        pos0_range: Some((0.0, 9.0)),
        pos1_range: Some((-1.5, 1.5)),
        ..Default::default()
    };

    let serial_1d = integrate_1d(pos.view(), weights.view(), 32, &config).unwrap();
    let parallel_1d = integrate_1d_parallel(pos.view(), weights.view(), 32, &config).unwrap();
    for k in 0..32 {
        assert_relative_eq!(
            serial_1d.sum_data[k],
            parallel_1d.sum_data[k],
            max_relative = 1e-12
        );
        assert_relative_eq!(
            serial_1d.sum_count[k],
            parallel_1d.sum_count[k],
            max_relative = 1e-12
        );
    }

    let serial_2d = integrate_2d(pos.view(), weights.view(), (16, 8), &config).unwrap();
    let parallel_2d = integrate_2d_parallel(pos.view(), weights.view(), (16, 8), &config).unwrap();
    for i in 0..16 {
        for j in 0..8 {
            assert_relative_eq!(
                serial_2d.sum_data[[i, j]],
                parallel_2d.sum_data[[i, j]],
                max_relative = 1e-12
            );
        }
    }

    // Deterministic merge order: parallel runs agree with each other
    // exactly.
    let again = integrate_1d_parallel(pos.view(), weights.view(), 32, &config).unwrap();
    assert_eq!(parallel_1d.sum_data, again.sum_data);
    assert_eq!(parallel_1d.sum_count, again.sum_count);
}
