//! Geometry handling for NIfTI-1 volumes.
//!
//! This crate keeps the spatial meta-data of medical image volumes
//! consistent through a processing pipeline:
//!
//! - [`rectify`] repairs headers whose affine disagrees with their grid
//!   spacings, picking between the sform, the qform or a rebuilt affine;
//! - [`orientation`] converts arrays between anatomical axis conventions
//!   (`RAS`, `LPI`, ...) by permuting and flipping axes;
//! - [`resample`] changes the voxel spacing of 5-dimensional volumes
//!   (`[x, y, z, t, c]`) with B-spline interpolation;
//! - [`VolumeReader`] loads volumes through an ordered list of format
//!   back-ends, and [`VolumeWriter`] writes processed volumes back in the
//!   geometry of their source image.
//!
//! # Example
//!
//! ```no_run
//! use nifti_geometry::{Provenance, SplineOrder, VolumeReader, VolumeWriter};
//! # use nifti_geometry::Result;
//!
//! # fn run() -> Result<()> {
//! let image = VolumeReader::new().read_file("sub-01_T1w.nii.gz")?;
//! let provenance = Provenance::from_header(&image.header)?
//!     .with_output_pixdim(vec![1., 1., 1.])
//!     .with_output_axcodes("RAS".parse()?);
//! let input = provenance.to_output(image.data, SplineOrder::Cubic)?;
//!
//! let output = input.mapv(|v| if v > 100. { 1. } else { 0. });
//!
//! VolumeWriter::new()
//!     .interp_order(SplineOrder::Nearest)
//!     .write(Some(output), "sub-01_mask.nii.gz", "derivatives", Some(&provenance))?;
//! # Ok(())
//! # }
//! ```
//!
//! [`rectify`]: ./rectify/index.html
//! [`orientation`]: ./orientation/index.html
//! [`resample`]: ./resample/index.html
//! [`VolumeReader`]: ./reader/struct.VolumeReader.html
//! [`VolumeWriter`]: ./writer/struct.VolumeWriter.html
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use]
extern crate num_derive;

pub mod affine;
pub mod error;
pub mod header;
pub mod orientation;
pub mod provenance;
pub mod reader;
pub mod rectify;
pub mod resample;
pub mod util;
pub mod volume;
pub mod writer;

pub use crate::affine::Affine4;
pub use crate::error::{GeometryError, Result};
pub use crate::header::{CodedAffine, Form, ImageHeader};
pub use crate::orientation::{reorient, Direction, OrientationCode, OrientationTransform};
pub use crate::provenance::Provenance;
pub use crate::reader::{Image, ImageLoader, NiftiLoader, VolumeReader};
pub use crate::rectify::{rectify, Rectification};
pub use crate::resample::{resample, SplineOrder};
pub use crate::util::split_filename;
pub use crate::volume::{expand_to_5d, squeeze_spatial_temporal_dim};
pub use crate::writer::{ImageSaver, NiftiSaver, VolumeWriter};
