//! Shared pixel builders for the integration tests.

#![allow(dead_code)]

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::Rng;

/// Route kernel log output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write an axis-aligned rectangular pixel covering [x0, x1] x [y0, y1].
pub fn rect_pixel(pos: &mut Array3<f64>, idx: usize, x0: f64, x1: f64, y0: f64, y1: f64) {
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
    for (c, (x, y)) in corners.iter().enumerate() {
        pos[[idx, c, 0]] = *x;
        pos[[idx, c, 1]] = *y;
    }
}

/// Write a rectangle of size (w, h) centered at (cx, cy), rotated by
/// `theta`, corner ring order preserved.
pub fn rotated_pixel(
    pos: &mut Array3<f64>,
    idx: usize,
    cx: f64,
    cy: f64,
    w: f64,
    h: f64,
    theta: f64,
) {
    let (sin, cos) = theta.sin_cos();
    let offsets = [
        (-0.5 * w, -0.5 * h),
        (0.5 * w, -0.5 * h),
        (0.5 * w, 0.5 * h),
        (-0.5 * w, 0.5 * h),
    ];
    for (c, (dx, dy)) in offsets.iter().enumerate() {
        pos[[idx, c, 0]] = cx + dx * cos - dy * sin;
        pos[[idx, c, 1]] = cy + dx * sin + dy * cos;
    }
}

/// Regular nx x ny grid of touching unit-fraction rectangles covering
/// [x0, x0 + nx * w] x [y0, y0 + ny * h].
pub fn pixel_grid(nx: usize, ny: usize, x0: f64, y0: f64, w: f64, h: f64) -> Array3<f64> {
    let mut pos = Array3::zeros((nx * ny, 4, 2));
    for i in 0..nx {
        for j in 0..ny {
            let idx = i * ny + j;
            let px0 = x0 + i as f64 * w;
            let py0 = y0 + j as f64 * h;
            rect_pixel(&mut pos, idx, px0, px0 + w, py0, py0 + h);
        }
    }
    pos
}

/// Random rotated rectangles with centers inside the given box.
pub fn random_pixels(
    rng: &mut StdRng,
    n: usize,
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> Array3<f64> {
    let mut pos = Array3::zeros((n, 4, 2));
    for idx in 0..n {
        let cx = rng.gen_range(x_range.0..x_range.1);
        let cy = rng.gen_range(y_range.0..y_range.1);
        let w = rng.gen_range(0.05..0.8);
        let h = rng.gen_range(0.05..0.8);
        let theta = rng.gen_range(0.0..std::f64::consts::PI);
        rotated_pixel(&mut pos, idx, cx, cy, w, h, theta);
    }
    pos
}
