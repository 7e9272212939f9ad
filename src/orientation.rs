//! Anatomical orientation codes and axis reorientation of volumes.
//!
//! An orientation code such as `RAS` says, for each array axis, which
//! anatomical direction increasing indices move towards. Converting an array
//! from one code to another is a pure permutation and flip of its leading
//! axes: no values are interpolated, and the transform is exactly invertible.
//!
//! # Example
//!
//! ```
//! use ndarray::{ArrayD, IxDyn};
//! use nifti_geometry::orientation::{reorient, OrientationCode};
//! # use nifti_geometry::Result;
//!
//! # fn run() -> Result<()> {
//! let ras: OrientationCode = "RAS".parse()?;
//! let lpi: OrientationCode = "LPI".parse()?;
//! let data = ArrayD::from_shape_fn(IxDyn(&[2, 3, 4]), |idx| idx[0] + idx[1] + idx[2]);
//! let flipped = reorient(data.clone(), &ras, &lpi)?;
//! assert_eq!(reorient(flipped, &lpi, &ras)?, data);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

use crate::affine::{get_affine_and_translation, nearest_orthonormal, Affine4};
use crate::error::{GeometryError, Result};
use approx::abs_diff_eq;
use ndarray::{ArrayD, Axis};
use std::fmt;
use std::str::FromStr;

/// An anatomical direction.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Direction {
    /// `L`
    Left,
    /// `R`
    Right,
    /// `P`
    Posterior,
    /// `A`
    Anterior,
    /// `I`
    Inferior,
    /// `S`
    Superior,
}

impl Direction {
    /// Parse a single axis label, ignoring case.
    pub fn from_char(c: char) -> Result<Direction> {
        match c.to_ascii_uppercase() {
            'L' => Ok(Direction::Left),
            'R' => Ok(Direction::Right),
            'P' => Ok(Direction::Posterior),
            'A' => Ok(Direction::Anterior),
            'I' => Ok(Direction::Inferior),
            'S' => Ok(Direction::Superior),
            _ => Err(GeometryError::InvalidAxisCode(c)),
        }
    }

    /// The single letter label of this direction.
    pub fn to_char(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Posterior => 'P',
            Direction::Anterior => 'A',
            Direction::Inferior => 'I',
            Direction::Superior => 'S',
        }
    }

    /// Index of the world axis this direction runs along
    /// (0 for left/right, 1 for posterior/anterior, 2 for inferior/superior).
    pub fn world_axis(self) -> usize {
        match self {
            Direction::Left | Direction::Right => 0,
            Direction::Posterior | Direction::Anterior => 1,
            Direction::Inferior | Direction::Superior => 2,
        }
    }

    /// Whether this direction points towards increasing world coordinates
    /// (R, A and S in the RAS+ world space).
    pub fn is_positive(self) -> bool {
        matches!(
            self,
            Direction::Right | Direction::Anterior | Direction::Superior
        )
    }

    fn from_world_axis(axis: usize, positive: bool) -> Option<Direction> {
        let d = match (axis, positive) {
            (0, true) => Direction::Right,
            (0, false) => Direction::Left,
            (1, true) => Direction::Anterior,
            (1, false) => Direction::Posterior,
            (2, true) => Direction::Superior,
            (2, false) => Direction::Inferior,
            _ => return None,
        };
        Some(d)
    }
}

/// Per-axis anatomical orientation of an array, such as `RAS` or `LPI`.
///
/// Each world axis appears at most once. The empty code is used to signal
/// that no orientation information is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct OrientationCode(Vec<Direction>);

impl OrientationCode {
    /// Validate and create an orientation code from its directions.
    pub fn new(directions: Vec<Direction>) -> Result<Self> {
        let mut seen = [false; 3];
        for d in &directions {
            let axis = d.world_axis();
            if seen[axis] {
                let code: String = directions.iter().map(|d| d.to_char()).collect();
                return Err(GeometryError::InvalidOrientation(code));
            }
            seen[axis] = true;
        }
        Ok(OrientationCode(directions))
    }

    /// Derive the orientation of the voxel axes of `affine`.
    ///
    /// The spatial block is normalized by its column norms and replaced by the
    /// nearest orthonormal matrix. Voxel axes are then visited in decreasing
    /// order of their largest absolute component. Each one takes the world
    /// axis of its largest remaining component, which is excluded from
    /// subsequent choices; the sign of that component gives the direction.
    ///
    /// # Errors
    ///
    /// - `GeometryError::DegenerateAffine` if a voxel axis cannot be mapped
    ///   to any world axis.
    pub fn from_affine(affine: &Affine4) -> Result<Self> {
        let (mut rzs, _) = get_affine_and_translation(affine);
        for mut column in rzs.column_iter_mut() {
            let norm = column.norm();
            if norm != 0. {
                column /= norm;
            }
        }
        let mut r = nearest_orthonormal(&rzs).ok_or(GeometryError::DegenerateAffine)?;

        // columns with the most dominant component pick their world axis first
        let peaks: Vec<f64> = r.column_iter().map(|c| c.amax()).collect();
        let mut in_axes = [0, 1, 2];
        in_axes.sort_by(|&a, &b| peaks[b].total_cmp(&peaks[a]));

        let mut directions = [None; 3];
        for &in_ax in &in_axes {
            let col = r.column(in_ax).into_owned();
            if col.iter().all(|v| abs_diff_eq!(*v, 0., epsilon = 1e-8)) {
                return Err(GeometryError::DegenerateAffine);
            }
            let out_ax = col.iamax();
            let positive = col[out_ax] >= 0.;
            directions[in_ax] = Direction::from_world_axis(out_ax, positive);
            r.row_mut(out_ax).fill(0.);
        }
        directions
            .iter()
            .map(|d| d.ok_or(GeometryError::DegenerateAffine))
            .collect::<Result<Vec<_>>>()
            .map(OrientationCode)
    }

    /// The directions of this code, one per array axis.
    pub fn directions(&self) -> &[Direction] {
        &self.0
    }

    /// Number of axes described by this code.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no orientation is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for OrientationCode {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        let directions = s
            .trim()
            .chars()
            .map(Direction::from_char)
            .collect::<Result<Vec<_>>>()?;
        OrientationCode::new(directions)
    }
}

impl fmt::Display for OrientationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.0 {
            write!(f, "{}", d.to_char())?;
        }
        Ok(())
    }
}

/// Where a source axis goes when reorienting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisMapping {
    /// Index of the axis in the reoriented array.
    pub axis: usize,
    /// Whether the axis is reversed.
    pub flip: bool,
}

/// Permutation and flips turning an array laid out in one orientation
/// into another, indexed by source axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrientationTransform(Vec<AxisMapping>);

impl OrientationTransform {
    /// Compute the transform from orientation `from` to orientation `to`.
    ///
    /// # Errors
    ///
    /// - `GeometryError::IncompatibleOrientation` if the codes have
    ///   different lengths or do not cover the same world axes.
    pub fn between(from: &OrientationCode, to: &OrientationCode) -> Result<Self> {
        let incompatible =
            || GeometryError::IncompatibleOrientation(from.to_string(), to.to_string());
        if from.len() != to.len() {
            return Err(incompatible());
        }
        let mappings = from
            .directions()
            .iter()
            .map(|src| {
                to.directions()
                    .iter()
                    .position(|dst| dst.world_axis() == src.world_axis())
                    .map(|axis| AxisMapping {
                        axis,
                        flip: src.is_positive() != to.directions()[axis].is_positive(),
                    })
                    .ok_or_else(incompatible)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(OrientationTransform(mappings))
    }

    /// The mapping of each source axis.
    pub fn mappings(&self) -> &[AxisMapping] {
        &self.0
    }

    /// Whether applying this transform leaves arrays untouched.
    pub fn is_identity(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, m)| m.axis == i && !m.flip)
    }

    /// Apply the transform to the leading axes of `array`. Any trailing axes
    /// (time, channels) are left in place.
    ///
    /// # Errors
    ///
    /// - `GeometryError::RankTooLow` if the array has fewer axes than the
    ///   transform.
    pub fn apply<A>(&self, mut array: ArrayD<A>) -> Result<ArrayD<A>> {
        let n = self.0.len();
        if array.ndim() < n {
            return Err(GeometryError::RankTooLow(n, array.shape().to_vec()));
        }
        for (ax, m) in self.0.iter().enumerate() {
            if m.flip {
                array.invert_axis(Axis(ax));
            }
        }
        // the reoriented axis `m.axis` takes source axis `ax`
        let mut order: Vec<usize> = (0..array.ndim()).collect();
        for (ax, m) in self.0.iter().enumerate() {
            order[m.axis] = ax;
        }
        Ok(array.permuted_axes(order))
    }
}

/// Reorient `array` from the orientation `from` into the orientation `to`.
///
/// Identical codes return the array untouched.
pub fn reorient<A>(
    array: ArrayD<A>,
    from: &OrientationCode,
    to: &OrientationCode,
) -> Result<ArrayD<A>> {
    if from == to {
        return Ok(array);
    }
    OrientationTransform::between(from, to)?.apply(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    #[test]
    fn parse_and_display() {
        let code: OrientationCode = "ras".parse().unwrap();
        assert_eq!(
            code.directions(),
            &[Direction::Right, Direction::Anterior, Direction::Superior]
        );
        assert_eq!(code.to_string(), "RAS");
        assert!(matches!(
            "RAX".parse::<OrientationCode>(),
            Err(GeometryError::InvalidAxisCode('X'))
        ));
        assert!(matches!(
            "RLS".parse::<OrientationCode>(),
            Err(GeometryError::InvalidOrientation(_))
        ));
    }

    #[test]
    fn axcodes_of_base_affine() {
        let affine = crate::affine::shape_zoom_affine(&[10, 10, 10], &[2., 2., 2.]);
        let code = OrientationCode::from_affine(&affine).unwrap();
        assert_eq!(code.to_string(), "LAS");
    }

    #[test]
    #[rustfmt::skip]
    fn axcodes_of_permuted_affine() {
        let affine = Affine4::new(
            0.0, 0.0, -1.5, 0.0,
            2.0, 0.0,  0.0, 0.0,
            0.0, 1.0,  0.0, 0.0,
            0.0, 0.0,  0.0, 1.0,
        );
        let code = OrientationCode::from_affine(&affine).unwrap();
        assert_eq!(code.to_string(), "ASL");
    }

    #[test]
    #[rustfmt::skip]
    fn axcodes_of_oblique_affine() {
        // third column is the cross product of the first two
        let affine = Affine4::new(
             0.598, 0.80, -0.05244, 10.0,
            -0.548, 0.36, -0.75504, 20.0,
            -0.585, 0.48,  0.65368, 30.0,
             0.0,   0.0,   0.0,      1.0,
        );
        let code = OrientationCode::from_affine(&affine).unwrap();
        // the second axis is the most aligned one and claims R first
        assert_eq!(code.to_string(), "IRP");
    }

    #[test]
    fn degenerate_affine() {
        let affine = Affine4::from_diagonal(&Vector4::new(1., 0., 1., 1.));
        assert!(matches!(
            OrientationCode::from_affine(&affine),
            Err(GeometryError::DegenerateAffine)
        ));
    }

    #[test]
    fn transform_between_codes() {
        let ras: OrientationCode = "RAS".parse().unwrap();
        let pls: OrientationCode = "PLS".parse().unwrap();
        let t = OrientationTransform::between(&ras, &pls).unwrap();
        assert_eq!(
            t.mappings(),
            &[
                AxisMapping { axis: 1, flip: true },
                AxisMapping { axis: 0, flip: true },
                AxisMapping { axis: 2, flip: false },
            ]
        );
        assert!(!t.is_identity());
        assert!(OrientationTransform::between(&ras, &ras).unwrap().is_identity());

        let ra: OrientationCode = "RA".parse().unwrap();
        assert!(matches!(
            OrientationTransform::between(&ras, &ra),
            Err(GeometryError::IncompatibleOrientation(..))
        ));
    }
}
