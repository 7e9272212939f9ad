//! Types for error handling go here.

use nifti::NiftiError;
use quick_error::quick_error;
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum GeometryError {
        /// No registered loader was able to parse the file.
        UnreadableFormat(path: PathBuf, reason: String) {
            display("Unreadable image file {}: {}", path.display(), reason)
        }
        /// The array does not have the exact number of dimensions required.
        ShapeViolation(expected: usize, shape: Vec<usize>) {
            display("Only {}D arrays are supported, got array of shape {:?}", expected, shape)
        }
        /// The array has fewer dimensions than the operation needs.
        RankTooLow(min: usize, shape: Vec<usize>) {
            display("Expected at least {} dimensions, got array of shape {:?}", min, shape)
        }
        /// Spacing vector too short or not strictly positive.
        InvalidSpacing(spacing: Vec<f64>) {
            display("Invalid pixel dimensions {:?}", spacing)
        }
        /// Spline order outside of the supported range.
        InvalidInterpolationOrder(order: u8) {
            display("Unsupported interpolation order {} (expected 0 to 5)", order)
        }
        /// Unknown anatomical axis label.
        InvalidAxisCode(code: char) {
            display("Invalid axis code `{}` (expected one of R, L, A, P, S, I)", code)
        }
        /// Orientation code naming the same world axis more than once.
        InvalidOrientation(code: String) {
            display("Invalid orientation code `{}`", code)
        }
        /// The two orientation codes cannot be mapped onto each other.
        IncompatibleOrientation(from: String, to: String) {
            display("Cannot transform orientation {} into {}", from, to)
        }
        /// The affine's spatial block is singular.
        DegenerateAffine {
            display("Affine transform is degenerate")
        }
        /// A time axis longer than one where none is supported.
        UnsupportedTimeSeries(shape: Vec<usize>) {
            display("Time sequences are not supported, got array of shape {:?}", shape)
        }
        /// Output directory could not be created.
        CreateDirectory(path: PathBuf, err: IOError) {
            display("Writing output images failed, could not create {}: {}", path.display(), err)
            source(err)
        }
        /// Output volume could not be written.
        WriteVolume(path: PathBuf, err: NiftiError) {
            display("Writing failed {}: {}", path.display(), err)
            source(err)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            display("I/O error: {}", err)
            source(err)
        }
        /// Error from the NIfTI-1 codec
        Nifti(err: NiftiError) {
            from()
            display("NIfTI error: {}", err)
            source(err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, GeometryError>;
