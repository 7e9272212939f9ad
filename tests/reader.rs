mod util;

use ndarray::{ArrayD, IxDyn};
use nifti_geometry::{
    CodedAffine, GeometryError, Image, ImageLoader, Rectification, Result,
    VolumeReader,
};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::io;
use std::path::Path;
use std::rc::Rc;
use util::{header_with_forms, scaled_affine};

/// Loader which refuses every file.
#[derive(Debug, Default)]
struct Refusing {
    calls: Rc<Cell<usize>>,
}

impl ImageLoader for Refusing {
    fn name(&self) -> &str {
        "refusing"
    }

    fn load(&self, path: &Path) -> Result<Image> {
        self.calls.set(self.calls.get() + 1);
        Err(GeometryError::UnreadableFormat(
            path.to_path_buf(),
            "refused".to_string(),
        ))
    }
}

/// Loader which fails with an I/O error.
#[derive(Debug)]
struct Broken;

impl ImageLoader for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn load(&self, _path: &Path) -> Result<Image> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into())
    }
}

/// Loader returning a 3-dimensional image with a stretched sform.
#[derive(Debug)]
struct Fixed;

impl ImageLoader for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn load(&self, _path: &Path) -> Result<Image> {
        Ok(Image {
            header: header_with_forms(
                &[4, 4, 2],
                &[1., 1., 2.],
                CodedAffine::new(1, scaled_affine(1., 1., 1.)),
                CodedAffine::new(0, scaled_affine(1., 1., 1.)),
            ),
            data: ArrayD::from_elem(IxDyn(&[4, 4, 2]), 1.),
        })
    }
}

#[test]
fn loaders_are_tried_in_order() {
    let calls = Rc::new(Cell::new(0));
    let reader = VolumeReader::empty()
        .with_loader(Refusing {
            calls: Rc::clone(&calls),
        })
        .with_loader(Fixed)
        .with_loader(Broken);
    let image = reader.load("anything.mgz").unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(image.header.shape, vec![4, 4, 2]);
    assert_eq!(image.data.ndim(), 3);
}

#[test]
fn last_refusal_is_reported() {
    let reader = VolumeReader::new().with_loader(Refusing::default());
    match reader.load("image.png") {
        Err(GeometryError::UnreadableFormat(path, reason)) => {
            assert_eq!(path, Path::new("image.png"));
            assert_eq!(reason, "refused");
        }
        other => panic!("unexpected outcome: {:?}", other.map(|i| i.header)),
    }
}

#[test]
fn other_errors_stop_the_search() {
    let calls = Rc::new(Cell::new(0));
    let reader = VolumeReader::empty().with_loader(Broken).with_loader(Refusing {
        calls: Rc::clone(&calls),
    });
    assert!(matches!(reader.load("x.nii"), Err(GeometryError::Io(_))));
    assert_eq!(calls.get(), 0);
}

#[test]
fn no_loader_means_unreadable() {
    assert!(matches!(
        VolumeReader::empty().load("x.nii"),
        Err(GeometryError::UnreadableFormat(..))
    ));
    assert!(matches!(
        VolumeReader::new().load("x.png"),
        Err(GeometryError::UnreadableFormat(..))
    ));
}

#[test]
fn read_file_rectifies_and_expands() {
    let image = VolumeReader::empty().with_loader(Fixed).read_file("x").unwrap();
    assert_eq!(image.data.shape(), &[4, 4, 2, 1, 1]);
    assert_eq!(image.header.affine, scaled_affine(1., 1., 2.));

    let raw = VolumeReader::empty()
        .with_loader(Fixed)
        .rectify(false)
        .read_file("x")
        .unwrap();
    assert_eq!(raw.data.shape(), &[4, 4, 2, 1, 1]);
    assert_eq!(raw.header.affine, scaled_affine(1., 1., 1.));
    assert_eq!(
        nifti_geometry::rectify(raw.header).1,
        Rectification::Synthesize
    );
}

#[test]
fn infer_ndims_reports_declared_rank() {
    let reader = VolumeReader::empty().with_loader(Fixed);
    assert_eq!(reader.infer_ndims("x").unwrap(), 3);
}
