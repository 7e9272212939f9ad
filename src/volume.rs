//! Shape adjustments of volume arrays.
//!
//! Volumes in this crate are laid out as `[x, y, z, t, c]`. Files with fewer
//! dimensions are padded with trailing singleton axes when loaded.

use crate::error::{GeometryError, Result};
use ndarray::{ArrayD, Axis};

/// Number of axes of a volume: three spatial axes, time and channels.
pub const VOLUME_NDIM: usize = 5;

/// Append singleton axes to `array` until it has five dimensions.
/// Arrays with five or more dimensions are returned as is.
pub fn expand_to_5d<A>(mut array: ArrayD<A>) -> ArrayD<A> {
    while array.ndim() < VOLUME_NDIM {
        let last = array.ndim();
        array.insert_axis_inplace(Axis(last));
    }
    array
}

/// Drop the singleton spatial and time axes of a batch laid out as
/// `[batch, x, y, z, t, c]`. Batch and channel axes are always kept.
/// Arrays of any other rank are returned as is.
///
/// # Errors
///
/// - `GeometryError::UnsupportedTimeSeries` if the time axis is longer
///   than one.
pub fn squeeze_spatial_temporal_dim<A>(array: ArrayD<A>) -> Result<ArrayD<A>> {
    if array.ndim() != 6 {
        return Ok(array);
    }
    if array.len_of(Axis(4)) != 1 {
        return Err(GeometryError::UnsupportedTimeSeries(array.shape().to_vec()));
    }
    let squeezed: Vec<usize> = (1..5).filter(|&ax| array.len_of(Axis(ax)) == 1).collect();
    // remove from the back so the remaining indices stay valid
    Ok(squeezed
        .into_iter()
        .rev()
        .fold(array, |a, ax| a.index_axis_move(Axis(ax), 0)))
}
