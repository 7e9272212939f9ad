//! Affine transform utilities.
//!
//! All affines in this crate are 4x4 homogeneous matrices in double
//! precision, mapping voxel index coordinates to world coordinates.

use nalgebra::{Matrix3, Matrix4, Quaternion, Rotation3, UnitQuaternion, Vector3, Vector4};

/// 3x3 spatial block of an affine (rotations, zooms and shears).
pub type Affine3 = Matrix3<f64>;
/// Full 4x4 homogeneous affine.
pub type Affine4 = Matrix4<f64>;

const QUATERNION_THRESHOLD: f64 = -(::std::f32::EPSILON as f64) * 3.0;

/// Split a homogeneous affine into its spatial block and its offsets.
pub fn get_affine_and_translation(affine: &Affine4) -> (Affine3, Vector3<f64>) {
    let translation = Vector3::new(affine[(0, 3)], affine[(1, 3)], affine[(2, 3)]);
    let affine = affine.fixed_view::<3, 3>(0, 0).into_owned();
    (affine, translation)
}

/// Assemble a 4x4 affine from a 3x3 block and a translation.
pub fn from_affine_and_translation(affine: &Affine3, translation: &Vector3<f64>) -> Affine4 {
    let mut out = Affine4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(affine);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    out
}

/// Voxel spacing implied by an affine: the Euclidean norm of each of the
/// first three columns of its spatial block.
pub fn column_norms(affine: &Affine4) -> [f64; 3] {
    let mut norms = [0.; 3];
    for (i, n) in norms.iter_mut().enumerate() {
        *n = affine.fixed_view::<3, 1>(0, i).norm();
    }
    norms
}

/// Build an affine that keeps the directions and translation of `affine`
/// but whose column norms are the given pixel dimensions.
///
/// Every column is divided by its current norm (1 for the translation
/// column) and multiplied by the target scale (`pixdim` with 1 appended).
/// Missing spatial entries in `pixdim` are taken as 1. A column of norm
/// zero is left untouched.
pub fn create_affine_pixdim(affine: &Affine4, pixdim: &[f64]) -> Affine4 {
    let norms = column_norms(affine);
    let to_divide = Vector4::new(norms[0], norms[1], norms[2], 1.);
    let scale = |i: usize| pixdim.get(i).copied().unwrap_or(1.);
    let to_multiply = Vector4::new(scale(0), scale(1), scale(2), 1.);

    let mut out = *affine;
    for (j, mut column) in out.column_iter_mut().enumerate() {
        if to_divide[j] == 0. {
            continue;
        }
        for v in column.iter_mut() {
            *v = *v / to_divide[j] * to_multiply[j];
        }
    }
    out
}

/// Default affine of a grid without usable forms: axes scaled by the
/// spacings, the first one reversed (`LAS`), and the world origin at the
/// center of the grid.
///
/// Missing entries are taken as a single voxel of unit spacing.
pub fn shape_zoom_affine(shape: &[usize], spacing: &[f64]) -> Affine4 {
    let dim = |i: usize| shape.get(i).copied().unwrap_or(1) as f64;
    let zoom = |i: usize| spacing.get(i).copied().unwrap_or(1.);

    let mut affine = Affine4::identity();
    for i in 0..3 {
        let scale = if i == 0 { -zoom(i) } else { zoom(i) };
        affine[(i, i)] = scale;
        affine[(i, 3)] = -scale * (dim(i) - 1.0) / 2.0;
    }
    affine
}

/// Complete the `(b, c, d)` components of a NIfTI quaternion with a
/// non-negative `a`.
///
/// Headers store single precision values, so `b² + c² + d²` may slightly
/// exceed 1; `a` is then taken as 0.
pub fn fill_positive(xyz: Vector3<f64>) -> Quaternion<f64> {
    let w2 = 1.0 - xyz.norm_squared();
    if w2 < QUATERNION_THRESHOLD {
        tracing::debug!("quaternion is not unit length (1 - |bcd|^2 = {})", w2);
    }
    Quaternion::new(w2.max(0.0).sqrt(), xyz.x, xyz.y, xyz.z)
}

/// Quaternion of a proper rotation matrix, with a non-negative real part.
///
/// `rotation` is expected to be orthonormal with a positive determinant,
/// such as the output of [`nearest_orthonormal`] once any reflection has
/// been taken out.
pub fn affine_to_quaternion(rotation: &Affine3) -> Quaternion<f64> {
    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation))
        .into_inner();
    if q.w < 0.0 {
        Quaternion::new(-q.w, -q.i, -q.j, -q.k)
    } else {
        q
    }
}

/// Rotation matrix of a quaternion. The quaternion does not need to be
/// normalized; a null quaternion gives the identity.
pub fn quaternion_to_affine(q: Quaternion<f64>) -> Affine3 {
    if q.norm_squared() < ::std::f64::EPSILON {
        return Affine3::identity();
    }
    UnitQuaternion::new_normalize(q)
        .to_rotation_matrix()
        .into_inner()
}

/// Nearest orthonormal matrix to `m` (in the Frobenius sense), through its
/// singular value decomposition. Singular directions below a relative
/// tolerance are dropped, so the result of a rank deficient input is not
/// orthonormal.
pub(crate) fn nearest_orthonormal(m: &Affine3) -> Option<Affine3> {
    let svd = m.svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let s = svd.singular_values;
    let tol = s.max() * 3.0 * ::std::f64::EPSILON;
    let mut out = Affine3::zeros();
    for i in 0..3 {
        if s[i] > tol {
            out += u.column(i) * v_t.row(i);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn norms_of_diagonal_affine() {
        let affine = Affine4::from_diagonal(&Vector4::new(-2.0, 3.0, 0.5, 1.0));
        assert_eq!(column_norms(&affine), [2.0, 3.0, 0.5]);
    }

    #[test]
    #[rustfmt::skip]
    fn create_affine_pixdim_keeps_directions() {
        let affine = Affine4::new(
            0.0, -2.0, 0.0, 10.0,
            3.0,  0.0, 0.0, -4.0,
            0.0,  0.0, 4.0,  7.5,
            0.0,  0.0, 0.0,  1.0,
        );
        let expected = Affine4::new(
            0.0, -1.0, 0.0, 10.0,
            1.0,  0.0, 0.0, -4.0,
            0.0,  0.0, 2.0,  7.5,
            0.0,  0.0, 0.0,  1.0,
        );
        assert_eq!(create_affine_pixdim(&affine, &[1.0, 1.0, 2.0]), expected);
    }

    #[test]
    fn quaternion_round_trip() {
        let q = fill_positive(Vector3::new(0.0, 1.0, 0.0));
        let r = quaternion_to_affine(q);
        assert_abs_diff_eq!(
            r,
            Affine3::from_diagonal(&Vector3::new(-1.0, 1.0, -1.0)),
            epsilon = 1e-12
        );
        let back = affine_to_quaternion(&r);
        assert_abs_diff_eq!(back.w, q.w, epsilon = 1e-9);
        assert_abs_diff_eq!(back.j.abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn orthonormal_of_scaled_rotation() {
        let m = Affine3::new(0.0, 2.0, 0.0, -3.0, 0.0, 0.0, 0.0, 0.0, 0.5);
        let r = nearest_orthonormal(&m).unwrap();
        assert_abs_diff_eq!(
            r,
            Affine3::new(0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0),
            epsilon = 1e-12
        );
    }
}
