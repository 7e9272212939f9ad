#![allow(dead_code)]

use nalgebra::Vector4;
use ndarray::{ArrayD, IxDyn};
use nifti_geometry::affine::Affine4;
use nifti_geometry::{CodedAffine, ImageHeader};

/// Diagonal affine with the given column scales and a fixed offset.
#[rustfmt::skip]
pub fn scaled_affine(sx: f64, sy: f64, sz: f64) -> Affine4 {
    Affine4::new(
        sx, 0.0, 0.0, -90.0,
        0.0, sy, 0.0, 126.0,
        0.0, 0.0, sz, -72.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

pub fn unit_affine() -> Affine4 {
    Affine4::from_diagonal(&Vector4::new(1., 1., 1., 1.))
}

/// Header with both forms, the sform active and current.
pub fn header_with_forms(
    shape: &[usize],
    pixdim: &[f64],
    sform: CodedAffine,
    qform: CodedAffine,
) -> ImageHeader {
    let mut header = ImageHeader::new(shape.to_vec(), pixdim.to_vec(), sform.affine);
    header.sform = Some(sform);
    header.qform = Some(qform);
    header.affine = header.best_affine();
    header
}

/// A 5-dimensional volume whose values encode their spatial position.
pub fn ramp_volume(shape: [usize; 5]) -> ArrayD<f32> {
    ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
        (idx[0] * 100 + idx[1] * 10 + idx[2]) as f32 + 1000. * idx[4] as f32
    })
}
