// This file is part of an eigenface-based face recognition engine for
// depth-camera pipelines, implementing the recognition method described in
// the following paper:
//
//      Eigenfaces for Recognition,
//      Matthew Turk and Alex Pentland.
//      In Journal of Cognitive Neuroscience, 3(1), 1991.
//
// As an open-source face recognition engine: you can redistribute the source codes
// and/or modify it under the terms of the BSD 2-Clause License.
//
// You should have received a copy of the BSD 2-Clause License along with the software.
// If not, see < https://opensource.org/licenses/BSD-2-Clause>.

//! Face recognition against a small enrolled gallery, for pipelines that
//! have already detected and cropped a face.
//!
//! A [`FaceRecognizer`] is built once from [`TargetFace`] enrollment records
//! and then answers two kinds of queries against immutable derived state:
//!
//! - **image queries** — the grayscale crop is decomposed in an eigenface
//!   basis built over the gallery and matched to the nearest enrollee,
//!   subject to an eigen-distance rejection threshold;
//! - **landmark queries** — a set of 3D facial feature points is classified
//!   by a decision-forest ensemble keyed on shortened numeric IDs.
//!
//! # Examples
//!
//! ```rust
//! use eigenmatch::{FaceRecognizer, FloatImage, TargetFace};
//!
//! let faces = vec![
//!     TargetFace {
//!         key: "alice".to_string(),
//!         image: FloatImage::from_vec(2, 2, vec![10.0, 20.0, 30.0, 40.0]).unwrap(),
//!         points: None,
//!         id: 100,
//!     },
//!     TargetFace {
//!         key: "bob".to_string(),
//!         image: FloatImage::from_vec(2, 2, vec![200.0, 180.0, 160.0, 140.0]).unwrap(),
//!         points: None,
//!         id: 200,
//!     },
//! ];
//!
//! let recognizer = FaceRecognizer::new(&faces).unwrap();
//! let hit = recognizer.recognize_image(&faces[1].image).unwrap();
//! assert_eq!(Some("bob"), hit.label.as_deref());
//! assert!(hit.eigen_distance < 1e-3);
//! ```

mod common;
mod error;
mod recognizer;

pub mod eigen;
pub mod forest;
pub mod identity;
pub mod math;
pub mod model;

pub use common::{FloatImage, Point3, TargetFace};
pub use error::{Error, Result};
pub use model::{load_model, read_model, save_model, write_model};
pub use recognizer::{
    FaceRecognizer, ImageMatch, DEFAULT_EIGEN_DISTANCE_THRESHOLD, DEFAULT_EPS,
};
