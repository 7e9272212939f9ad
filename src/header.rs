//! This module defines the `ImageHeader` struct, which holds the spatial
//! meta-data of a loaded volume: its shape, voxel spacing and the affine
//! transforms declared for it.

use crate::affine::{
    fill_positive, from_affine_and_translation, quaternion_to_affine, shape_zoom_affine, Affine4,
};
use crate::error::Result;
use crate::orientation::OrientationCode;
use nalgebra::{Matrix3, Vector3};
use nifti::NiftiHeader;

/// NIFTI_XFORM_ALIGNED_ANAT, assigned to a form whose code was unknown
/// when its affine is replaced.
pub const XFORM_ALIGNED_ANAT: i16 = 2;

/// One of the two affine encodings of a NIfTI header.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Form {
    /// Arbitrary affine stored as three rows.
    Sform,
    /// Rigid rotation stored as a quaternion, plus zooms and offsets.
    Qform,
}

/// An affine transform along with its NIFTI_XFORM_* code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodedAffine {
    /// NIFTI_XFORM_* code. Values above 0 mark the form as usable.
    pub code: i16,
    /// The affine transform.
    pub affine: Affine4,
}

impl CodedAffine {
    /// Create a new coded affine.
    pub fn new(code: i16, affine: Affine4) -> Self {
        CodedAffine { code, affine }
    }

    /// Whether the form is flagged as usable.
    pub fn is_active(&self) -> bool {
        self.code > 0
    }
}

/// Spatial meta-data of an image, independent of the file format
/// it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    /// Array dimensions, as declared in the file.
    pub shape: Vec<usize>,
    /// Grid spacings, one per array dimension.
    pub pixdim: Vec<f64>,
    /// The affine currently used to map voxels to world coordinates.
    pub affine: Affine4,
    /// The sform, if the format has one.
    pub sform: Option<CodedAffine>,
    /// The qform, if the format has one.
    pub qform: Option<CodedAffine>,
}

impl ImageHeader {
    /// Create a header without sform or qform, for formats which only carry
    /// a single affine.
    pub fn new(shape: Vec<usize>, pixdim: Vec<f64>, affine: Affine4) -> Self {
        ImageHeader {
            shape,
            pixdim,
            affine,
            sform: None,
            qform: None,
        }
    }

    /// Collect the spatial fields of a NIfTI-1 header.
    ///
    /// The current affine is picked the same way NIfTI readers do: the sform
    /// if its code is positive, otherwise the qform if its code is positive,
    /// otherwise an affine built from the shape and grid spacings.
    pub fn from_nifti(header: &NiftiHeader) -> Self {
        let ndim = usize::from(header.dim[0]).clamp(1, 7);
        let shape: Vec<usize> = header.dim[1..=ndim].iter().map(|d| usize::from(*d)).collect();
        let pixdim: Vec<f64> = header.pixdim[1..=ndim].iter().map(|p| f64::from(*p)).collect();

        let sform = CodedAffine::new(header.sform_code, sform_affine(header));
        let qform = CodedAffine::new(header.qform_code, qform_affine(header));
        let mut out = ImageHeader {
            affine: shape_zoom_affine(&shape, &pixdim),
            shape,
            pixdim,
            sform: Some(sform),
            qform: Some(qform),
        };
        out.affine = out.best_affine();
        out
    }

    /// Number of array dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// The first three grid spacings. Axes not present in the header count
    /// as unit spacing.
    pub fn spatial_pixdim(&self) -> [f64; 3] {
        let p = |i: usize| self.pixdim.get(i).copied().unwrap_or(1.);
        [p(0), p(1), p(2)]
    }

    /// Anatomical orientation of the voxel axes.
    pub fn axcodes(&self) -> Result<OrientationCode> {
        OrientationCode::from_affine(&self.affine)
    }

    /// Retrieve one of the two forms.
    pub fn form(&self, form: Form) -> Option<&CodedAffine> {
        match form {
            Form::Sform => self.sform.as_ref(),
            Form::Qform => self.qform.as_ref(),
        }
    }

    /// Replace the affine of a form. The code is kept if it is already
    /// positive, and becomes `XFORM_ALIGNED_ANAT` otherwise.
    pub fn set_form(&mut self, form: Form, affine: Affine4) {
        let slot = match form {
            Form::Sform => &mut self.sform,
            Form::Qform => &mut self.qform,
        };
        let code = match slot {
            Some(f) if f.is_active() => f.code,
            _ => XFORM_ALIGNED_ANAT,
        };
        *slot = Some(CodedAffine::new(code, affine));
    }

    /// The affine of the first active form (sform, then qform), or the
    /// current affine if neither is active.
    pub fn best_affine(&self) -> Affine4 {
        self.sform
            .iter()
            .chain(self.qform.iter())
            .find(|f| f.is_active())
            .map(|f| f.affine)
            .unwrap_or(self.affine)
    }
}

/// Affine encoded in the `srow_*` fields of a NIfTI-1 header.
pub fn sform_affine(header: &NiftiHeader) -> Affine4 {
    let mut affine = Affine4::identity();
    for (i, row) in [header.srow_x, header.srow_y, header.srow_z].iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            affine[(i, j)] = f64::from(*v);
        }
    }
    affine
}

/// Affine encoded in the quaternion fields of a NIfTI-1 header.
///
/// `pixdim[0]` is the qfac: -1 flips the third axis, anything else is
/// taken as 1.
pub fn qform_affine(header: &NiftiHeader) -> Affine4 {
    let quaternion = fill_positive(Vector3::new(
        f64::from(header.quatern_b),
        f64::from(header.quatern_c),
        f64::from(header.quatern_d),
    ));
    let rotation = quaternion_to_affine(quaternion);
    let qfac = if header.pixdim[0] == -1. { -1. } else { 1. };
    let zooms = Matrix3::from_diagonal(&Vector3::new(
        f64::from(header.pixdim[1]).abs(),
        f64::from(header.pixdim[2]).abs(),
        f64::from(header.pixdim[3]).abs() * qfac,
    ));
    let translation = Vector3::new(
        f64::from(header.quatern_x),
        f64::from(header.quatern_y),
        f64::from(header.quatern_z),
    );
    from_affine_and_translation(&(rotation * zooms), &translation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn nifti_header() -> NiftiHeader {
        NiftiHeader {
            dim: [3, 64, 64, 10, 1, 1, 1, 1],
            pixdim: [1., 3., 3., 3., 0., 0., 0., 0.],
            sform_code: 0,
            qform_code: 0,
            ..NiftiHeader::default()
        }
    }

    #[test]
    fn no_forms_uses_shape_and_zooms() {
        let header = ImageHeader::from_nifti(&nifti_header());
        assert_eq!(header.shape, vec![64, 64, 10]);
        assert_eq!(header.pixdim, vec![3., 3., 3.]);
        assert_eq!(header.affine, shape_zoom_affine(&[64, 64, 10], &[3., 3., 3.]));
        assert_eq!(header.axcodes().unwrap().to_string(), "LAS");
    }

    #[test]
    fn sform_takes_precedence() {
        let header = NiftiHeader {
            sform_code: 1,
            qform_code: 1,
            srow_x: [2., 0., 0., -10.],
            srow_y: [0., 2., 0., -20.],
            srow_z: [0., 0., 2., -30.],
            ..nifti_header()
        };
        let header = ImageHeader::from_nifti(&header);
        let mut expected = Affine4::from_diagonal(&Vector4::new(2., 2., 2., 1.));
        expected[(0, 3)] = -10.;
        expected[(1, 3)] = -20.;
        expected[(2, 3)] = -30.;
        assert_eq!(header.affine, expected);
    }

    #[test]
    fn qform_with_flipped_third_axis() {
        let header = NiftiHeader {
            qform_code: 1,
            pixdim: [-1., 0.5, 0.5, 2., 0., 0., 0., 0.],
            quatern_x: 1.,
            quatern_y: 2.,
            quatern_z: 3.,
            ..nifti_header()
        };
        let header = ImageHeader::from_nifti(&header);
        let mut expected = Affine4::from_diagonal(&Vector4::new(0.5, 0.5, -2., 1.));
        expected[(0, 3)] = 1.;
        expected[(1, 3)] = 2.;
        expected[(2, 3)] = 3.;
        assert_eq!(header.affine, expected);
        assert_eq!(header.axcodes().unwrap().to_string(), "RAI");
    }

    #[test]
    fn setting_a_form_activates_it() {
        let mut header = ImageHeader::from_nifti(&nifti_header());
        let affine = Affine4::from_diagonal(&Vector4::new(3., 3., 3., 1.));
        header.set_form(Form::Qform, affine);
        assert_eq!(header.qform, Some(CodedAffine::new(XFORM_ALIGNED_ANAT, affine)));
        assert_eq!(header.best_affine(), affine);
    }
}
