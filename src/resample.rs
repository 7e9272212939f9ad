//! Resampling of volumes to a different voxel spacing.
//!
//! Interpolation is done with B-splines of degree 0 (nearest neighbour) up to
//! 5, applied separably along the three spatial axes. Samples beyond the
//! boundaries are mirrored. The output extent of each axis is the input
//! extent scaled by the zoom factor and rounded to the nearest integer, and
//! the first and last output samples are aligned with the first and last
//! input samples.

use crate::error::{GeometryError, Result};
use ndarray::{Array3, ArrayD, ArrayView1, ArrayView3, ArrayViewMut1, Axis, IxDyn, Zip};
use num_traits::{FromPrimitive, ToPrimitive, Zero};

/// Degree of the interpolating spline.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum SplineOrder {
    /// Nearest neighbour
    Nearest = 0,
    /// Linear interpolation
    Linear = 1,
    /// Quadratic B-spline
    Quadratic = 2,
    /// Cubic B-spline
    Cubic = 3,
    /// Quartic B-spline
    Quartic = 4,
    /// Quintic B-spline
    Quintic = 5,
}

impl Default for SplineOrder {
    fn default() -> Self {
        SplineOrder::Cubic
    }
}

impl SplineOrder {
    /// Get the spline order from its integer degree.
    pub fn from_order(order: u8) -> Result<SplineOrder> {
        FromPrimitive::from_u8(order).ok_or(GeometryError::InvalidInterpolationOrder(order))
    }

    /// The polynomial degree of the spline.
    pub fn degree(self) -> usize {
        self as usize
    }

    /// Poles of the recursive filter turning samples into B-spline
    /// coefficients.
    fn poles(self) -> Vec<f64> {
        match self {
            SplineOrder::Nearest | SplineOrder::Linear => vec![],
            SplineOrder::Quadratic => vec![8f64.sqrt() - 3.],
            SplineOrder::Cubic => vec![3f64.sqrt() - 2.],
            SplineOrder::Quartic => vec![
                (664. - 438976f64.sqrt()).sqrt() + 304f64.sqrt() - 19.,
                (664. + 438976f64.sqrt()).sqrt() - 304f64.sqrt() - 19.,
            ],
            SplineOrder::Quintic => vec![
                (135. / 2. - (17745. / 4f64).sqrt()).sqrt() + (105. / 4f64).sqrt() - 13. / 2.,
                (135. / 2. + (17745. / 4f64).sqrt()).sqrt() - (105. / 4f64).sqrt() - 13. / 2.,
            ],
        }
    }
}

/// Per-axis zoom factors taking spacing `from` to spacing `to`,
/// restricted to the three spatial axes.
///
/// A smaller target spacing gives a factor above 1 (upsampling).
pub fn zoom_factors(from: &[f64], to: &[f64]) -> Result<[f64; 3]> {
    validate_spacing(from)?;
    validate_spacing(to)?;
    Ok([from[0] / to[0], from[1] / to[1], from[2] / to[2]])
}

fn validate_spacing(spacing: &[f64]) -> Result<()> {
    if spacing.len() < 3 || spacing[..3].iter().any(|s| !(*s > 0.)) {
        return Err(GeometryError::InvalidSpacing(spacing.to_vec()));
    }
    Ok(())
}

/// Number of samples along an axis of `len` samples after zooming by `factor`.
///
/// Halfway cases round to the nearest even length, so that `5` samples
/// zoomed by `0.5` give `2`.
pub fn zoomed_len(len: usize, factor: f64) -> usize {
    let out = (len as f64 * factor).round_ties_even();
    if out < 1. {
        1
    } else {
        out as usize
    }
}

/// Resample `array` from spacing `from` to spacing `to`.
///
/// The array must have five axes `[x, y, z, t, c]`. Each spatial slab
/// `[.., .., .., t, c]` is resampled independently with the same spline
/// order, and the slabs are put back in their original `(t, c)` positions.
/// Empty arrays and matching spacings return the input untouched.
///
/// # Errors
///
/// - `GeometryError::ShapeViolation` if the array is not 5-dimensional.
/// - `GeometryError::InvalidSpacing` if either spacing has fewer than
///   three entries or a spatial entry that is not strictly positive.
pub fn resample<A>(array: ArrayD<A>, from: &[f64], to: &[f64], order: SplineOrder) -> Result<ArrayD<A>>
where
    A: Copy + Zero + ToPrimitive + FromPrimitive,
{
    if array.is_empty() || from == to {
        return Ok(array);
    }
    if array.ndim() != 5 {
        return Err(GeometryError::ShapeViolation(5, array.shape().to_vec()));
    }
    let factors = zoom_factors(from, to)?;

    let shape = array.shape();
    let (n_t, n_c) = (shape[3], shape[4]);
    let out_shape = [
        zoomed_len(shape[0], factors[0]),
        zoomed_len(shape[1], factors[1]),
        zoomed_len(shape[2], factors[2]),
        n_t,
        n_c,
    ];
    tracing::debug!(
        "resampling {:?} -> {:?} with {:?} interpolation",
        shape,
        out_shape,
        order
    );

    let mut out = ArrayD::<A>::zeros(IxDyn(&out_shape));
    for t in 0..n_t {
        for c in 0..n_c {
            let slab = array
                .index_axis(Axis(4), c)
                .index_axis_move(Axis(3), t)
                .into_dimensionality()
                .map_err(|_| GeometryError::ShapeViolation(5, array.shape().to_vec()))?;
            let zoomed = zoom_to(slab, [out_shape[0], out_shape[1], out_shape[2]], order);
            out.index_axis_mut(Axis(4), c)
                .index_axis_move(Axis(3), t)
                .assign(&zoomed);
        }
    }
    Ok(out)
}

/// Zoom a 3-dimensional slab by the given per-axis factors.
pub fn zoom<A>(slab: ArrayView3<A>, factors: [f64; 3], order: SplineOrder) -> Array3<A>
where
    A: Copy + Zero + ToPrimitive + FromPrimitive,
{
    let (x, y, z) = slab.dim();
    let out_len = [
        zoomed_len(x, factors[0]),
        zoomed_len(y, factors[1]),
        zoomed_len(z, factors[2]),
    ];
    zoom_to(slab, out_len, order)
}

fn zoom_to<A>(slab: ArrayView3<A>, out_len: [usize; 3], order: SplineOrder) -> Array3<A>
where
    A: Copy + Zero + ToPrimitive + FromPrimitive,
{
    let mut data: Array3<f64> = slab.mapv(|v| v.to_f64().unwrap_or(0.));
    for (ax, &len) in out_len.iter().enumerate() {
        if data.len_of(Axis(ax)) == len {
            continue;
        }
        let mut shape = data.raw_dim();
        shape[ax] = len;
        let mut next = Array3::<f64>::zeros(shape);
        Zip::from(data.lanes(Axis(ax)))
            .and(next.lanes_mut(Axis(ax)))
            .for_each(|input, output| resample_lane(input, output, order));
        data = next;
    }
    data.mapv(|v| A::from_f64(v).unwrap_or_else(A::zero))
}

/// Resample a single line of samples onto the output line, aligning both
/// end points.
fn resample_lane(input: ArrayView1<f64>, mut output: ArrayViewMut1<f64>, order: SplineOrder) {
    let n_in = input.len();
    let n_out = output.len();
    let step = if n_out > 1 {
        (n_in as f64 - 1.) / (n_out as f64 - 1.)
    } else {
        0.
    };

    if order == SplineOrder::Nearest {
        for (i, o) in output.iter_mut().enumerate() {
            let x = (i as f64 * step + 0.5).floor() as isize;
            *o = input[mirror(x, n_in)];
        }
        return;
    }

    let coefficients = spline_coefficients(input.to_vec(), order);
    let degree = order.degree();
    for (i, o) in output.iter_mut().enumerate() {
        let x = i as f64 * step;
        let base = x.floor() as isize;
        *o = (base - 3..=base + 3)
            .map(|k| bspline(degree, x - k as f64) * coefficients[mirror(k, n_in)])
            .sum();
    }
}

/// Fold an index into `0..len` by mirroring about the end samples
/// (`.. 2 1 | 0 1 2 .. n-1 | n-2 n-3 ..`).
fn mirror(k: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let k = k.rem_euclid(period);
    if k >= len as isize {
        (period - k) as usize
    } else {
        k as usize
    }
}

/// Centered B-spline of the given degree evaluated at `x`.
fn bspline(degree: usize, x: f64) -> f64 {
    let half = (degree as f64 + 1.) / 2.;
    if x.abs() >= half {
        return 0.;
    }
    // sum of truncated powers
    let n = degree as i32;
    let mut sum = 0.;
    let mut binomial = 1.;
    for k in 0..=degree + 1 {
        let t = x + half - k as f64;
        if t > 0. {
            let sign = if k % 2 == 0 { 1. } else { -1. };
            sum += sign * binomial * t.powi(n);
        }
        binomial = binomial * (degree + 1 - k) as f64 / (k + 1) as f64;
    }
    let factorial: f64 = (1..=degree).map(|i| i as f64).product();
    sum / factorial
}

/// Turn samples into interpolating B-spline coefficients with the causal and
/// anti-causal recursive filters, assuming mirror boundaries.
fn spline_coefficients(mut c: Vec<f64>, order: SplineOrder) -> Vec<f64> {
    let n = c.len();
    let poles = order.poles();
    if n < 2 || poles.is_empty() {
        return c;
    }

    let gain: f64 = poles.iter().map(|z| (1. - z) * (1. - 1. / z)).product();
    for v in c.iter_mut() {
        *v *= gain;
    }

    for &z in &poles {
        c[0] = initial_causal_coefficient(&c, z);
        for k in 1..n {
            c[k] += z * c[k - 1];
        }
        c[n - 1] = initial_anticausal_coefficient(&c, z);
        for k in (0..n - 1).rev() {
            c[k] = z * (c[k + 1] - c[k]);
        }
    }
    c
}

fn initial_causal_coefficient(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    let horizon = (::std::f64::EPSILON.ln() / z.abs().ln()).ceil() as usize;
    if horizon < n {
        // truncated sum is accurate enough
        let mut zn = z;
        let mut sum = c[0];
        for v in &c[1..horizon] {
            sum += zn * v;
            zn *= z;
        }
        sum
    } else {
        let mut zn = z;
        let iz = 1. / z;
        let mut z2n = z.powi(n as i32 - 1);
        let mut sum = c[0] + z2n * c[n - 1];
        z2n *= z2n * iz;
        for v in &c[1..n - 1] {
            sum += (zn + z2n) * v;
            zn *= z;
            z2n *= iz;
        }
        sum / (1. - zn * zn)
    }
}

fn initial_anticausal_coefficient(c: &[f64], z: f64) -> f64 {
    let n = c.len();
    (z / (z * z - 1.)) * (z * c[n - 2] + c[n - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array3};

    fn zoom_line(values: &[f64], out_len: usize, order: SplineOrder) -> Vec<f64> {
        let input = Array1::from(values.to_vec());
        let mut output = Array1::zeros(out_len);
        resample_lane(input.view(), output.view_mut(), order);
        output.to_vec()
    }

    #[test]
    fn order_from_integer() {
        assert_eq!(SplineOrder::from_order(0).unwrap(), SplineOrder::Nearest);
        assert_eq!(SplineOrder::from_order(3).unwrap(), SplineOrder::Cubic);
        assert!(matches!(
            SplineOrder::from_order(6),
            Err(GeometryError::InvalidInterpolationOrder(6))
        ));
        assert_eq!(SplineOrder::default().degree(), 3);
    }

    #[test]
    fn zoomed_lengths() {
        assert_eq!(zoomed_len(10, 0.5), 5);
        assert_eq!(zoomed_len(5, 2.0), 10);
        assert_eq!(zoomed_len(3, 0.1), 1);
        assert_eq!(zoomed_len(7, 1.0), 7);
        assert_eq!(zoomed_len(5, 0.5), 2);
        assert_eq!(zoomed_len(7, 0.5), 4);
        assert_eq!(zoomed_len(3, 0.5), 2);
    }

    #[test]
    fn mirrored_indices() {
        let folded: Vec<usize> = (-3..8).map(|k| mirror(k, 4)).collect();
        assert_eq!(folded, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0, 1]);
        assert_eq!(mirror(-5, 1), 0);
    }

    #[test]
    fn bspline_partition_of_unity() {
        for degree in 1..=5 {
            for &x in &[0.0, 0.25, 0.5, 0.8] {
                let total: f64 = (-4..=4).map(|k| bspline(degree, x - k as f64)).sum();
                assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(bspline(3, 0.0), 2. / 3., epsilon = 1e-12);
        assert_abs_diff_eq!(bspline(1, 0.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn nearest_picks_samples() {
        let out = zoom_line(&[1., 2., 3.], 5, SplineOrder::Nearest);
        assert_eq!(out, vec![1., 2., 2., 3., 3.]);
    }

    #[test]
    fn linear_interpolates_ramp() {
        let out = zoom_line(&[0., 2., 4., 6.], 7, SplineOrder::Linear);
        assert_eq!(out, vec![0., 1., 2., 3., 4., 5., 6.]);
    }

    #[test]
    fn splines_interpolate_at_knots() {
        let values = [3., -1., 4., 1., 5., 9., 2., 6.];
        for order in 2..=5 {
            let order = SplineOrder::from_order(order).unwrap();
            let out = zoom_line(&values, 2 * values.len() - 1, order);
            for (i, v) in values.iter().enumerate() {
                assert_abs_diff_eq!(out[2 * i], *v, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn constant_stays_constant() {
        let slab = Array3::<f32>::from_elem((4, 6, 5), 7.5);
        for order in 0..=5 {
            let order = SplineOrder::from_order(order).unwrap();
            let out = zoom(slab.view(), [1.5, 0.5, 2.0], order);
            assert_eq!(out.dim(), (6, 3, 10));
            for v in out.iter() {
                assert_abs_diff_eq!(*v, 7.5, epsilon = 1e-4);
            }
        }
    }
}
