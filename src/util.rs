//! File name utilities.
use std::path::{Path, PathBuf};

/// Extensions made of more than one suffix, kept whole when splitting a
/// file name.
pub const FILE_EXTENSIONS: [&str; 2] = [".nii.gz", ".tar.gz"];

/// Split a path into its parent directory, the base name without extension
/// and the extension (including the leading dot).
///
/// The compound extensions in [`FILE_EXTENSIONS`] are recognized first, in a
/// case insensitive manner; the returned extension keeps its original case.
/// Other names are split at their last dot, unless the only dots lead the
/// name (as in `.bashrc`), in which case the extension is empty.
///
/// ```
/// # use std::path::PathBuf;
/// use nifti_geometry::util::split_filename;
///
/// let (dir, name, ext) = split_filename("data/T1.NII.GZ");
/// assert_eq!(dir, PathBuf::from("data"));
/// assert_eq!(name, "T1");
/// assert_eq!(ext, ".NII.GZ");
/// ```
pub fn split_filename<P: AsRef<Path>>(path: P) -> (PathBuf, String, String) {
    let path = path.as_ref();
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let fname = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    for special in FILE_EXTENSIONS.iter() {
        let ext_len = special.len();
        if fname.len() < ext_len {
            continue;
        }
        let split = fname.len() - ext_len;
        if !fname.is_char_boundary(split) {
            continue;
        }
        if fname[split..].to_lowercase() == *special {
            return (dir, fname[..split].to_string(), fname[split..].to_string());
        }
    }

    let (name, ext) = split_extension(&fname);
    (dir, name.to_string(), ext.to_string())
}

/// Split at the last dot, if any non-dot character comes before it.
fn split_extension(fname: &str) -> (&str, &str) {
    match fname.rfind('.') {
        Some(dot) if fname[..dot].chars().any(|c| c != '.') => (&fname[..dot], &fname[dot..]),
        _ => (fname, ""),
    }
}

/// Whether the file name ends with one of the given extensions,
/// ignoring case.
pub fn has_extension<P: AsRef<Path>>(path: P, extensions: &[&str]) -> bool {
    let fname = path
        .as_ref()
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    extensions.iter().any(|ext| fname.ends_with(ext))
}
