//! Multilateration
//!
//! Turns per-node distance estimates into a 2-D position.
//!
//! ## Full solve (3 or more samples)
//!
//! Subtracting the circle equation of a reference node `(x1, y1, d1)` from
//! that of every other node `i` cancels the quadratic terms:
//!
//! ```text
//! 2(xi - x1)·x + 2(yi - y1)·y = (xi² - x1²) + (yi² - y1²) + (di² - d1²)
//! ```
//!
//! The rows are stacked into `A·[x, y]ᵀ = b` and solved once, in closed
//! form, by SVD least squares. The first sample is the reference. There is no
//! iterative refinement and no outlier rejection. Collinear or coincident
//! nodes make `A` rank-deficient; the minimum-norm solution is returned, which
//! shows up as an inaccurate estimate rather than an error.
//!
//! ## Sparse fallback (1 or 2 samples)
//!
//! A centroid of the node locations weighted by `1 / distance`, with weight 1
//! for a zero distance.

use nalgebra::{DMatrix, DVector};

use crate::errors::SolverError;
use crate::types::{DistanceSample, Point};

/// Minimum number of samples for the least-squares solve
pub const MIN_SAMPLES_FOR_LEAST_SQUARES: usize = 3;

/// Estimate a position from distance samples, rounded to one decimal
pub fn multilaterate(samples: &[DistanceSample]) -> Result<Point, SolverError> {
    if samples.len() < MIN_SAMPLES_FOR_LEAST_SQUARES {
        weighted_centroid(samples)
    } else {
        least_squares(samples)
    }
}

/// Distance-weighted centroid of the sample locations, rounded to one decimal
pub fn weighted_centroid(samples: &[DistanceSample]) -> Result<Point, SolverError> {
    if samples.is_empty() {
        return Err(SolverError::NoSamples);
    }

    let (mut total_weight, mut x_sum, mut y_sum) = (0.0, 0.0, 0.0);
    for sample in samples {
        let weight = if sample.distance == 0.0 { 1.0 } else { 1.0 / sample.distance };
        total_weight += weight;
        x_sum += sample.location.x * weight;
        y_sum += sample.location.y * weight;
    }

    // Negative distances can cancel positive ones
    if total_weight == 0.0 {
        return Err(SolverError::DegenerateWeights);
    }

    Ok(Point::new(x_sum / total_weight, y_sum / total_weight).rounded())
}

/// Linearized least-squares multilateration, rounded to one decimal
pub fn least_squares(samples: &[DistanceSample]) -> Result<Point, SolverError> {
    let (reference, others) = samples.split_first().ok_or(SolverError::NoSamples)?;
    if others.is_empty() {
        return weighted_centroid(samples);
    }

    let Point { x: x1, y: y1 } = reference.location;
    let d1 = reference.distance;

    let mut a = DMatrix::<f64>::zeros(others.len(), 2);
    let mut b = DVector::<f64>::zeros(others.len());
    for (row, sample) in others.iter().enumerate() {
        let Point { x: xi, y: yi } = sample.location;
        let di = sample.distance;

        a[(row, 0)] = 2.0 * (xi - x1);
        a[(row, 1)] = 2.0 * (yi - y1);
        b[row] = (xi * xi - x1 * x1) + (yi * yi - y1 * y1) + (di * di - d1 * d1);
    }

    let solution = solve_min_norm(a, &b);
    Ok(Point::new(solution[0], solution[1]).rounded())
}

/// Minimum-norm least-squares solution of `A·v = b`
///
/// Singular values below `eps · max(m, n) · σ_max` are treated as zero.
fn solve_min_norm(a: DMatrix<f64>, b: &DVector<f64>) -> DVector<f64> {
    let cols = a.ncols();
    let rows = a.nrows();
    let svd = a.svd(true, true);

    let sigma_max = svd.singular_values.max();
    if sigma_max <= 0.0 || !sigma_max.is_finite() {
        // A is all zeros (every node at the reference location)
        return DVector::zeros(cols);
    }

    let cutoff = f64::EPSILON * rows.max(cols) as f64 * sigma_max;
    svd.solve(b, cutoff)
        .unwrap_or_else(|_| DVector::zeros(cols))
}
