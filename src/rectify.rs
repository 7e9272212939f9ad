//! Repair of headers whose affine disagrees with their grid spacings.
//!
//! Some files declare voxel spacings (`pixdim`) that do not match the column
//! norms of their sform or qform. The repair picks which piece of meta-data
//! to trust, in this order:
//!
//! 1. the active form, if it already agrees with the spacings;
//! 2. the other form, copied over the active one, if it agrees;
//! 3. otherwise a new affine, rescaled from the current one so that its
//!    column norms are the spacings, written into both forms.
//!
//! This is a best effort heuristic and never fails.

use crate::affine::{column_norms, create_affine_pixdim, Affine4};
use crate::header::{CodedAffine, Form, ImageHeader};

/// Outcome of the header repair.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Rectification {
    /// Arrays of five dimensions are not checked.
    Skipped,
    /// The current affine already agrees with the grid spacings, or the
    /// header has no forms to repair.
    Unchanged,
    /// The active form agrees with the grid spacings and is kept.
    Keep(Form),
    /// The active form was replaced with the other one.
    Recover {
        /// The form that agrees with the spacings.
        from: Form,
        /// The active form, overwritten.
        into: Form,
    },
    /// A new affine was built from the spacings and set on both forms.
    Synthesize,
}

/// Whether the column norms of `affine` are exactly the first three
/// grid spacings. Missing spacings count as 1.
///
/// Spacings past the third (time, channels) are ignored, so a 4-D file
/// whose time step is not 1 is not flagged for that reason alone.
pub fn is_consistent(affine: &Affine4, pixdim: &[f64]) -> bool {
    let p = |i: usize| pixdim.get(i).copied().unwrap_or(1.);
    column_norms(affine) == [p(0), p(1), p(2)]
}

/// Decide how to repair a pair of forms given the declared spacings.
/// An absent form is neither active nor consistent.
pub fn decide(
    pixdim: &[f64],
    sform: Option<&CodedAffine>,
    qform: Option<&CodedAffine>,
) -> Rectification {
    let active = |f: Option<&CodedAffine>| f.map_or(false, CodedAffine::is_active);
    let consistent = |f: Option<&CodedAffine>| f.map_or(false, |f| is_consistent(&f.affine, pixdim));

    if active(sform) {
        if consistent(sform) {
            return Rectification::Keep(Form::Sform);
        } else if consistent(qform) {
            return Rectification::Recover {
                from: Form::Qform,
                into: Form::Sform,
            };
        }
    } else if active(qform) {
        if consistent(qform) {
            return Rectification::Keep(Form::Qform);
        } else if consistent(sform) {
            return Rectification::Recover {
                from: Form::Sform,
                into: Form::Qform,
            };
        }
    }
    Rectification::Synthesize
}

/// Make the header's affine agree with its grid spacings.
///
/// Returns the repaired header, whose `affine` is the corrected transform,
/// along with the action taken.
pub fn rectify(mut header: ImageHeader) -> (ImageHeader, Rectification) {
    if header.ndim() == 5 {
        return (header, Rectification::Skipped);
    }
    let pixdim = header.spatial_pixdim();
    if is_consistent(&header.affine, &pixdim)
        || (header.sform.is_none() && header.qform.is_none())
    {
        return (header, Rectification::Unchanged);
    }

    let action = decide(&pixdim, header.sform.as_ref(), header.qform.as_ref());
    match action {
        Rectification::Recover { from, into } => {
            if let Some(source) = header.form(from).map(|f| f.affine) {
                tracing::warn!("affine does not match pixdim, copying {:?} into {:?}", from, into);
                header.set_form(into, source);
            }
        }
        Rectification::Synthesize => {
            tracing::warn!(
                "neither sform nor qform match pixdim {:?}, rebuilding affine",
                pixdim
            );
            let affine = create_affine_pixdim(&header.affine, &pixdim);
            header.set_form(Form::Sform, affine);
            header.set_form(Form::Qform, affine);
        }
        _ => {
            tracing::debug!("keeping header as is ({:?})", action);
            return (header, action);
        }
    }
    header.affine = header.best_affine();
    (header, action)
}
