//! Record of the geometry an image had before processing.
//!
//! A processing pipeline typically reorients its inputs to a common axis
//! convention and resamples them to a common spacing. The [`Provenance`]
//! record keeps both the original and the processing-time geometry, so that
//! results can be put back in the space of the source image with
//! [`VolumeWriter`](../writer/struct.VolumeWriter.html).

use crate::affine::Affine4;
use crate::error::Result;
use crate::header::ImageHeader;
use crate::orientation::{reorient, OrientationCode};
use crate::resample::{resample, SplineOrder};
use ndarray::ArrayD;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

/// Original and processing-time geometry of an image.
///
/// Empty output fields mean that the corresponding step did not happen.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// Affine of the source image.
    pub original_affine: Affine4,
    /// Grid spacings of the source image.
    pub original_pixdim: Vec<f64>,
    /// Orientation of the source image.
    pub original_axcodes: OrientationCode,
    /// Grid spacings used during processing.
    pub output_pixdim: Vec<f64>,
    /// Orientation used during processing.
    pub output_axcodes: OrientationCode,
}

impl Provenance {
    /// Record the geometry of a loaded image, with no processing-time
    /// geometry yet.
    pub fn from_header(header: &ImageHeader) -> Result<Self> {
        Ok(Provenance {
            original_affine: header.affine,
            original_pixdim: header.pixdim.clone(),
            original_axcodes: header.axcodes()?,
            output_pixdim: Vec::new(),
            output_axcodes: OrientationCode::default(),
        })
    }

    /// Set the grid spacings used during processing.
    pub fn with_output_pixdim(mut self, pixdim: Vec<f64>) -> Self {
        self.output_pixdim = pixdim;
        self
    }

    /// Set the orientation used during processing.
    pub fn with_output_axcodes(mut self, axcodes: OrientationCode) -> Self {
        self.output_axcodes = axcodes;
        self
    }

    /// Bring a 5-dimensional source array into the processing-time
    /// geometry: reorient it first, then resample it from the original to
    /// the output spacings.
    ///
    /// This is the counterpart of the restoration done by
    /// [`VolumeWriter::write`](../writer/struct.VolumeWriter.html#method.write),
    /// which resamples first and reorients last.
    pub fn to_output<A>(&self, array: ArrayD<A>, order: SplineOrder) -> Result<ArrayD<A>>
    where
        A: Copy + Zero + ToPrimitive + FromPrimitive,
    {
        let array = if self.output_axcodes.is_empty() {
            array
        } else {
            reorient(array, &self.original_axcodes, &self.output_axcodes)?
        };
        if self.output_pixdim.is_empty() {
            Ok(array)
        } else {
            resample(array, &self.original_pixdim, &self.output_pixdim, order)
        }
    }
}
