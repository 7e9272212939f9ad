//! Loading of volumes through an ordered list of format back-ends.

use crate::error::{GeometryError, Result};
use crate::header::ImageHeader;
use crate::rectify::rectify;
use crate::util::has_extension;
use crate::volume::expand_to_5d;
use ndarray::ArrayD;
use nifti::{IntoNdArray, NiftiError, NiftiObject, ReaderOptions};
use std::fmt;
use std::path::Path;

/// A loaded volume: its spatial header and its voxel data.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Spatial meta-data.
    pub header: ImageHeader,
    /// Voxel data with the dimensionality declared by the file.
    pub data: ArrayD<f32>,
}

/// A file format back-end.
///
/// Implementations must return `GeometryError::UnreadableFormat` for files
/// they do not understand, so that the next loader can be tried. Any other
/// error stops the search.
pub trait ImageLoader: fmt::Debug {
    /// Short name of the back-end, for diagnostics.
    fn name(&self) -> &str;

    /// Read the image at `path`.
    fn load(&self, path: &Path) -> Result<Image>;
}

/// File extensions accepted by [`NiftiLoader`].
pub const NIFTI_EXTENSIONS: [&str; 4] = [".nii", ".nii.gz", ".hdr", ".hdr.gz"];

/// Loader for NIfTI-1 files (single `.nii` files and `.hdr`/`.img` pairs
/// opened through their header, optionally gzipped).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NiftiLoader;

impl ImageLoader for NiftiLoader {
    fn name(&self) -> &str {
        "nifti"
    }

    fn load(&self, path: &Path) -> Result<Image> {
        if !has_extension(path, &NIFTI_EXTENSIONS) {
            return Err(GeometryError::UnreadableFormat(
                path.to_path_buf(),
                "not a NIfTI-1 file name".to_string(),
            ));
        }
        let object = ReaderOptions::new().read_file(path).map_err(|e| match e {
            NiftiError::InvalidFormat => {
                GeometryError::UnreadableFormat(path.to_path_buf(), e.to_string())
            }
            e => GeometryError::Nifti(e),
        })?;
        let header = ImageHeader::from_nifti(object.header());
        let data = object.into_volume().into_ndarray::<f32>()?;
        Ok(Image { header, data })
    }
}

/// Options and loader list for reading volumes.
///
/// # Example
///
/// ```no_run
/// use nifti_geometry::VolumeReader;
/// # use nifti_geometry::Result;
///
/// # fn run() -> Result<()> {
/// let image = VolumeReader::new().read_file("T1.nii.gz")?;
/// assert_eq!(image.data.ndim(), 5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct VolumeReader {
    loaders: Vec<Box<dyn ImageLoader>>,
    rectify: bool,
}

impl Default for VolumeReader {
    fn default() -> Self {
        VolumeReader::new()
    }
}

impl VolumeReader {
    /// Reader with the NIfTI-1 loader, rectifying headers.
    pub fn new() -> Self {
        VolumeReader::empty().with_loader(NiftiLoader)
    }

    /// Reader without any loader. Loaders are tried in the order they are
    /// added with [`with_loader`](#method.with_loader).
    pub fn empty() -> Self {
        VolumeReader {
            loaders: Vec::new(),
            rectify: true,
        }
    }

    /// Append a loader to the list.
    pub fn with_loader<L>(mut self, loader: L) -> Self
    where
        L: ImageLoader + 'static,
    {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Whether to repair headers whose affine disagrees with their spacings
    /// (enabled by default).
    pub fn rectify(mut self, rectify: bool) -> Self {
        self.rectify = rectify;
        self
    }

    /// Load an image with the first loader able to read it, without
    /// changing its header or data.
    ///
    /// # Errors
    ///
    /// - `GeometryError::UnreadableFormat` with the last loader's reason if
    ///   no loader could read the file.
    /// - Any other error raised by a loader.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Image> {
        let path = path.as_ref();
        let mut last_error = None;
        for loader in &self.loaders {
            match loader.load(path) {
                Ok(image) => {
                    tracing::debug!("loaded {} with {} loader", path.display(), loader.name());
                    return Ok(image);
                }
                Err(e @ GeometryError::UnreadableFormat(..)) => {
                    tracing::debug!("{} loader cannot read {}: {}", loader.name(), path.display(), e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            GeometryError::UnreadableFormat(path.to_path_buf(), "no loader could load the file".to_string())
        }))
    }

    /// Load an image, rectify its header (unless disabled) and expand its
    /// data to five dimensions.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<Image> {
        let Image { header, data } = self.load(path)?;
        let header = if self.rectify {
            rectify(header).0
        } else {
            header
        };
        Ok(Image {
            header,
            data: expand_to_5d(data),
        })
    }

    /// Number of dimensions declared by the file at `path`.
    pub fn infer_ndims<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        Ok(self.load(path)?.header.ndim())
    }
}
