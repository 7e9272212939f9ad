//! Writing processed volumes back in the geometry of their source image.

use crate::affine::{
    affine_to_quaternion, column_norms, get_affine_and_translation, nearest_orthonormal, Affine4,
};
use crate::error::{GeometryError, Result};
use crate::orientation::reorient;
use crate::provenance::Provenance;
use crate::resample::{resample, SplineOrder};
use ndarray::{ArrayD, Axis};
use nifti::header::MAGIC_CODE_NIP1;
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A file format back-end for writing volumes.
pub trait ImageSaver: fmt::Debug {
    /// Write `data` with the given affine to `path`.
    fn save(&self, data: &ArrayD<f32>, affine: &Affine4, path: &Path) -> Result<()>;
}

/// Saver for NIfTI-1 files. Names ending in `.gz` are compressed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NiftiSaver;

impl ImageSaver for NiftiSaver {
    fn save(&self, data: &ArrayD<f32>, affine: &Affine4, path: &Path) -> Result<()> {
        let header = nifti_header_for_affine(affine);
        WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(data)
            .map_err(|e| GeometryError::WriteVolume(path.to_path_buf(), e))
    }
}

/// Build a NIfTI-1 header describing `affine`.
///
/// The affine is stored verbatim in the sform (code 2, aligned). The qform
/// fields hold the nearest rigid rotation, zooms and offsets, with code 0.
/// `pixdim` holds the column norms of the affine, and 1 for the remaining
/// dimensions. The `dim`, `datatype` and `bitpix` fields are left for the
/// writer to fill from the data.
pub fn nifti_header_for_affine(affine: &Affine4) -> NiftiHeader {
    let (rzs, translation) = get_affine_and_translation(affine);
    let mut zooms = column_norms(affine);
    let mut rotation = rzs;
    for (j, zoom) in zooms.iter().enumerate() {
        if *zoom != 0. {
            rotation.column_mut(j).unscale_mut(*zoom);
        }
    }
    let mut qfac = 1.;
    if rotation.determinant() < 0. {
        qfac = -1.;
        zooms[2] = -zooms[2];
        rotation.column_mut(2).neg_mut();
    }
    let quaternion = nearest_orthonormal(&rotation)
        .map(|r| affine_to_quaternion(&r))
        .unwrap_or_else(nalgebra::Quaternion::identity);

    let row = |i: usize| {
        [
            affine[(i, 0)] as f32,
            affine[(i, 1)] as f32,
            affine[(i, 2)] as f32,
            affine[(i, 3)] as f32,
        ]
    };
    NiftiHeader {
        pixdim: [
            qfac as f32,
            zooms[0].abs() as f32,
            zooms[1].abs() as f32,
            zooms[2].abs() as f32,
            1.,
            1.,
            1.,
            1.,
        ],
        sform_code: 2,
        qform_code: 0,
        srow_x: row(0),
        srow_y: row(1),
        srow_z: row(2),
        quatern_b: quaternion.i as f32,
        quatern_c: quaternion.j as f32,
        quatern_d: quaternion.k as f32,
        quatern_x: translation[0] as f32,
        quatern_y: translation[1] as f32,
        quatern_z: translation[2] as f32,
        vox_offset: 352.,
        scl_slope: 1.,
        magic: *MAGIC_CODE_NIP1,
        ..NiftiHeader::default()
    }
}

/// Options for writing processed volumes back in their original geometry.
///
/// # Example
///
/// ```no_run
/// use nifti_geometry::{Provenance, SplineOrder, VolumeReader, VolumeWriter};
/// # use nifti_geometry::Result;
///
/// # fn run() -> Result<()> {
/// let image = VolumeReader::new().read_file("T1.nii.gz")?;
/// let provenance = Provenance::from_header(&image.header)?
///     .with_output_pixdim(vec![1., 1., 1.])
///     .with_output_axcodes("RAS".parse()?);
/// let processed = provenance.to_output(image.data, SplineOrder::Cubic)?;
/// // ... run the processing ...
/// VolumeWriter::new()
///     .interp_order(SplineOrder::Nearest)
///     .write(Some(processed), "T1_seg.nii.gz", "output", Some(&provenance))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VolumeWriter<S = NiftiSaver> {
    saver: S,
    interp_order: SplineOrder,
}

impl VolumeWriter<NiftiSaver> {
    /// Writer of NIfTI-1 files, restoring the spacing with cubic splines.
    pub fn new() -> Self {
        VolumeWriter::with_saver(NiftiSaver)
    }
}

impl Default for VolumeWriter<NiftiSaver> {
    fn default() -> Self {
        VolumeWriter::new()
    }
}

impl<S> VolumeWriter<S>
where
    S: ImageSaver,
{
    /// Writer with a custom back-end.
    pub fn with_saver(saver: S) -> Self {
        VolumeWriter {
            saver,
            interp_order: SplineOrder::default(),
        }
    }

    /// Set the spline order used to restore the original spacing.
    pub fn interp_order(mut self, order: SplineOrder) -> Self {
        self.interp_order = order;
        self
    }

    /// Retrieve the back-end.
    pub fn saver(&self) -> &S {
        &self.saver
    }

    /// Write `array` to `directory/filename`, first putting it back in the
    /// geometry described by `provenance`.
    ///
    /// - Without an array nothing is written and `Ok(None)` is returned.
    /// - Without provenance the array is written as is, with an identity
    ///   affine.
    /// - A 4-dimensional array `[x, y, z, c]` gets a time axis inserted
    ///   before the channels.
    /// - The array is resampled from the output spacing to the original
    ///   spacing, then reoriented from the output orientation to the
    ///   original one. Steps whose output field is empty are skipped.
    ///
    /// Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// - `GeometryError::ShapeViolation` if resampling is needed and the
    ///   array is not 5-dimensional after the time axis is inserted.
    /// - `GeometryError::CreateDirectory` or `GeometryError::WriteVolume`
    ///   on I/O failure.
    pub fn write<P: AsRef<Path>>(
        &self,
        array: Option<ArrayD<f32>>,
        filename: &str,
        directory: P,
        provenance: Option<&Provenance>,
    ) -> Result<Option<PathBuf>> {
        let mut array = match array {
            Some(array) => array,
            None => return Ok(None),
        };
        if array.ndim() == 4 {
            // recover a time dimension for NIfTI output
            array.insert_axis_inplace(Axis(3));
        }

        let affine = match provenance {
            Some(p) => {
                if !p.output_pixdim.is_empty() {
                    array = resample(array, &p.output_pixdim, &p.original_pixdim, self.interp_order)?;
                }
                if !p.output_axcodes.is_empty() {
                    array = reorient(array, &p.output_axcodes, &p.original_axcodes)?;
                }
                p.original_affine
            }
            None => Affine4::identity(),
        };
        self.save_volume_5d(&array, filename, directory, &affine)
            .map(Some)
    }

    /// Write `data` to `directory/filename` with the given affine, creating
    /// the directory if needed.
    pub fn save_volume_5d<P: AsRef<Path>>(
        &self,
        data: &ArrayD<f32>,
        filename: &str,
        directory: P,
        affine: &Affine4,
    ) -> Result<PathBuf> {
        let directory = directory.as_ref();
        if let Err(e) = fs::create_dir_all(directory) {
            tracing::error!("writing output images failed: {}", e);
            return Err(GeometryError::CreateDirectory(directory.to_path_buf(), e));
        }

        let output = directory.join(filename);
        if let Err(e) = self.saver.save(data, affine, &output) {
            tracing::error!("writing failed {}: {}", output.display(), e);
            return Err(e);
        }
        tracing::info!("Saved {}", output.display());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector4;

    #[test]
    #[rustfmt::skip]
    fn header_of_flipped_affine() {
        let affine = Affine4::new(
            -2.0, 0.0, 0.0, 90.0,
             0.0, 2.0, 0.0, -126.0,
             0.0, 0.0, 2.0, -72.0,
             0.0, 0.0, 0.0, 1.0,
        );
        let header = nifti_header_for_affine(&affine);
        assert_eq!(header.sform_code, 2);
        assert_eq!(header.srow_x, [-2.0, 0.0, 0.0, 90.0]);
        assert_eq!(&header.pixdim[..4], &[-1.0, 2.0, 2.0, 2.0]);
        assert_eq!([header.quatern_x, header.quatern_y, header.quatern_z], [90.0, -126.0, -72.0]);
        // with qfac = -1, the rotation left is 180 degrees about y
        assert_abs_diff_eq!(header.quatern_b, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(header.quatern_c.abs(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(header.quatern_d, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn header_of_identity() {
        let header = nifti_header_for_affine(&Affine4::from_diagonal(&Vector4::new(1., 1., 1., 1.)));
        assert_eq!(&header.pixdim[..4], &[1.0, 1.0, 1.0, 1.0]);
        assert_abs_diff_eq!(header.quatern_b, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(header.quatern_c, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(header.quatern_d, 0.0, epsilon = 1e-6);
    }
}
