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

use std::collections::HashMap;

use log::{debug, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::common::{FloatImage, Point3, TargetFace};
use crate::eigen;
use crate::error::{Error, Result};
use crate::forest::PointsClassifier;
use crate::identity;
use crate::math;

/// Default eigen-distance threshold. The smaller the number, the more likely
/// an examined image will be treated as unrecognized; a huge value (or any
/// value <= 0) makes the recognizer always accept the nearest match.
pub const DEFAULT_EIGEN_DISTANCE_THRESHOLD: f64 = 2000.0;

/// Default convergence tolerance for the eigenspace computation.
pub const DEFAULT_EPS: f64 = 0.001;

/// Result of an image query. The nearest eigen distance is always reported;
/// the label is absent when the match was rejected by the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMatch {
    pub label: Option<String>,
    pub eigen_distance: f32,
}

/// Recognizes enrolled faces from grayscale images or 3D feature points.
///
/// All derived state (the eigenspace, per-enrollee coefficients, labels, the
/// shortened-ID name table and the optional landmark classifier) is built
/// once at construction and never mutated afterwards, so a recognizer can be
/// shared freely across threads. Re-enrollment means building a new instance.
pub struct FaceRecognizer {
    eigen_images: Vec<FloatImage>,
    average_image: FloatImage,
    eigen_values: Vec<Vec<f32>>,
    labels: Vec<String>,
    eigen_distance_threshold: f64,
    name_lookup: HashMap<i32, String>,
    forest: Option<PointsClassifier>,
}

impl FaceRecognizer {
    /// Enrolls a gallery with the default eigen-distance threshold.
    pub fn new(faces: &[TargetFace]) -> Result<Self> {
        Self::with_threshold(faces, DEFAULT_EIGEN_DISTANCE_THRESHOLD)
    }

    /// Enrolls a gallery with an explicit threshold; the basis size defaults
    /// to the gallery size.
    pub fn with_threshold(faces: &[TargetFace], eigen_distance_threshold: f64) -> Result<Self> {
        Self::with_options(
            faces,
            eigen_distance_threshold,
            faces.len() as i32,
            DEFAULT_EPS,
        )
    }

    /// Enrolls a gallery with full control over the eigenspace parameters.
    ///
    /// Eigenspace and shape failures abort construction; a failure to train
    /// the landmark classifier does not. A gallery without feature points
    /// stays fully usable for image queries and reports
    /// [`Error::UntrainedModel`] only if a landmark query is made later.
    pub fn with_options(
        faces: &[TargetFace],
        eigen_distance_threshold: f64,
        max_iter: i32,
        eps: f64,
    ) -> Result<Self> {
        let images: Vec<FloatImage> = faces.iter().map(|f| f.image.clone()).collect();
        let (eigen_images, average_image) = eigen::compute_basis(&images, max_iter, eps)?;

        let eigen_values = decompose_gallery(faces, &eigen_images, &average_image)?;
        let labels: Vec<String> = faces.iter().map(|f| f.key.clone()).collect();

        let mut name_lookup = HashMap::new();
        for face in faces {
            // Last write wins when two IDs share a hundred-bucket.
            name_lookup.insert(identity::shorten(face.id), face.key.clone());
        }

        let forest = match PointsClassifier::train(faces) {
            Ok(classifier) => Some(classifier),
            Err(err) => {
                warn!("landmark classifier not trained: {}", err);
                None
            }
        };

        Ok(FaceRecognizer {
            eigen_images,
            average_image,
            eigen_values,
            labels,
            eigen_distance_threshold,
            name_lookup,
            forest,
        })
    }

    /// Rebuilds a recognizer from previously saved state without re-running
    /// enrollment. The result answers image queries only: the name table and
    /// the landmark classifier are not part of the recoverable state.
    pub fn from_parts(
        eigen_images: Vec<FloatImage>,
        average_image: FloatImage,
        eigen_values: Vec<Vec<f32>>,
        labels: Vec<String>,
        eigen_distance_threshold: f64,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::InvalidModel("empty gallery".to_string()));
        }
        if eigen_values.len() != labels.len() {
            return Err(Error::InvalidModel(format!(
                "{} coefficient vectors for {} labels",
                eigen_values.len(),
                labels.len()
            )));
        }
        for values in &eigen_values {
            if values.len() != eigen_images.len() {
                return Err(Error::InvalidModel(format!(
                    "coefficient vector of length {} for a basis of {} eigen images",
                    values.len(),
                    eigen_images.len()
                )));
            }
        }
        for image in &eigen_images {
            if !image.same_size(&average_image) {
                return Err(Error::InvalidModel(
                    "eigen image dimensions do not match the average image".to_string(),
                ));
            }
        }

        Ok(FaceRecognizer {
            eigen_images,
            average_image,
            eigen_values,
            labels,
            eigen_distance_threshold,
            name_lookup: HashMap::new(),
            forest: None,
        })
    }

    /// Euclidean eigen distance between `image` and every enrolled face, in
    /// gallery order.
    pub fn eigen_distances(&self, image: &FloatImage) -> Result<Vec<f32>> {
        let decomp = eigen::project(image, &self.eigen_images, &self.average_image)?;
        Ok(self
            .eigen_values
            .iter()
            .map(|values| math::euclidean_distance(&decomp, values))
            .collect())
    }

    /// Finds the enrolled face most similar to `image`: its gallery index,
    /// eigen distance and label. Exact ties go to the lowest index.
    pub fn find_most_similar(&self, image: &FloatImage) -> Result<(usize, f32, &str)> {
        let distances = self.eigen_distances(image)?;

        let mut index = 0;
        let mut eigen_distance = distances[0];
        for (i, d) in distances.iter().enumerate().skip(1) {
            if *d < eigen_distance {
                index = i;
                eigen_distance = *d;
            }
        }
        Ok((index, eigen_distance, &self.labels[index]))
    }

    /// Tries to recognize the image. The nearest label is accepted when the
    /// threshold is disabled (<= 0) or the distance beats it; otherwise the
    /// label is `None` and the distance is still reported. Rejection is a
    /// normal outcome, not an error.
    pub fn recognize_image(&self, image: &FloatImage) -> Result<ImageMatch> {
        let (index, eigen_distance, _) = self.find_most_similar(image)?;
        let accepted = self.eigen_distance_threshold <= 0.0
            || f64::from(eigen_distance) < self.eigen_distance_threshold;
        Ok(ImageMatch {
            label: accepted.then(|| self.labels[index].clone()),
            eigen_distance,
        })
    }

    /// Tries to recognize a face from its 3D feature points.
    ///
    /// Fails with [`Error::UntrainedModel`] when the gallery had no landmark
    /// classifier and with [`Error::UnknownIdentity`] when the predicted
    /// class key has no enrolled name; an unknown key is never mapped to a
    /// default label.
    pub fn recognize_points(&self, points: &[Point3]) -> Result<&str> {
        let classifier = self.forest.as_ref().ok_or(Error::UntrainedModel)?;
        let id = classifier.predict(points)?;
        debug!("recognized class key = {}", id);
        match self.name_lookup.get(&id) {
            Some(key) => Ok(key),
            None => Err(Error::UnknownIdentity(id)),
        }
    }

    /// Whether a landmark classifier was trained for this gallery.
    pub fn has_landmark_classifier(&self) -> bool {
        self.forest.is_some()
    }

    /// The eigen vectors that form the eigen space.
    pub fn eigen_images(&self) -> &[FloatImage] {
        &self.eigen_images
    }

    /// The pixel-wise average of the training gallery.
    pub fn average_image(&self) -> &FloatImage {
        &self.average_image
    }

    /// The eigen coefficients of each training image, in gallery order.
    pub fn eigen_values(&self) -> &[Vec<f32>] {
        &self.eigen_values
    }

    /// The labels of the training images, in gallery order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn eigen_distance_threshold(&self) -> f64 {
        self.eigen_distance_threshold
    }
}

fn decompose_gallery(
    faces: &[TargetFace],
    eigen_images: &[FloatImage],
    average_image: &FloatImage,
) -> Result<Vec<Vec<f32>>> {
    #[cfg(feature = "rayon")]
    {
        faces
            .par_iter()
            .map(|face| eigen::project(&face.image, eigen_images, average_image))
            .collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        faces
            .iter()
            .map(|face| eigen::project(&face.image, eigen_images, average_image))
            .collect()
    }
}
