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

//! Eigenspace builder: the PCA primitive over a gallery of grayscale faces.
//!
//! Uses the snapshot method: eigenvectors of the small N x N Gram matrix of
//! centered gallery images map back to pixel space as linear combinations of
//! those images, which keeps the decomposition independent of image size.
//! Basis images come out ordered by decreasing explained variance.
//!
//! This module is the numerical seam of the engine: callers only depend on
//! [`compute_basis`] and [`project`], so a different dense linear-algebra
//! backend can replace the internals without touching the recognizer.

use crate::common::FloatImage;
use crate::error::{Error, Result};
use crate::math;

/// Hard cap on power-iteration sweeps per component.
const MAX_POWER_SWEEPS: usize = 1000;

/// Eigenvalues below this fraction of the total variance mark the numerical
/// rank of the centered gallery.
const RANK_EPS: f64 = 1e-10;

/// Number of basis images for a gallery: `max_iter` when it is positive and
/// no larger than the gallery, otherwise the gallery size.
pub fn basis_size(max_iter: i32, gallery: usize) -> usize {
    if max_iter <= 0 || max_iter as usize > gallery {
        gallery
    } else {
        max_iter as usize
    }
}

/// Computes the orthonormal eigenimage basis and the pixel-wise average of a
/// training gallery.
///
/// Exactly [`basis_size`] basis images are returned. Components beyond the
/// numerical rank of the centered gallery are zero images: their projection
/// coefficients are identically zero for every input, so they never affect
/// eigen distances. `eps` is the relative convergence tolerance of the
/// per-component eigenvalue iteration.
pub fn compute_basis(
    images: &[FloatImage],
    max_iter: i32,
    eps: f64,
) -> Result<(Vec<FloatImage>, FloatImage)> {
    validate_gallery(images)?;

    let width = images[0].width();
    let height = images[0].height();
    let n = images.len();
    let k = basis_size(max_iter, n);

    let avg = mean_image(images);
    let centered: Vec<Vec<f64>> = images
        .iter()
        .map(|image| {
            image
                .data()
                .iter()
                .zip(&avg)
                .map(|(p, a)| f64::from(*p) - a)
                .collect()
        })
        .collect();

    let mut gram = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in i..n {
            let dot = math::vector_inner_product(&centered[i], &centered[j]);
            gram[i][j] = dot;
            gram[j][i] = dot;
        }
    }
    let trace: f64 = (0..n).map(|i| gram[i][i]).sum();

    let mut eigen_images: Vec<FloatImage> = Vec::with_capacity(k);

    for _ in 0..k {
        let pair = dominant_eigenpair(&gram, eps);
        let (lambda, v) = match pair {
            Some(pair) if pair.0 > RANK_EPS * trace => pair,
            // Rank exhausted: the remaining components carry no variance.
            _ => break,
        };

        // Map the Gram-space eigenvector back to pixel space and normalize.
        let mut basis = vec![0.0f64; (width * height) as usize];
        for (weight, image) in v.iter().zip(&centered) {
            for (b, p) in basis.iter_mut().zip(image) {
                *b += weight * p;
            }
        }
        let norm = math::vector_norm(&basis);
        if norm <= f64::MIN_POSITIVE {
            break;
        }
        math::vector_scale(&mut basis, 1.0 / norm);

        let pixels = basis.iter().map(|b| *b as f32).collect();
        eigen_images.push(FloatImage::from_vec(width, height, pixels)?);

        // Deflate so the next sweep finds the next-largest component.
        for i in 0..n {
            for j in 0..n {
                gram[i][j] -= lambda * v[i] * v[j];
            }
        }
    }

    // Keep the promised basis size even past the gallery's rank.
    while eigen_images.len() < k {
        eigen_images.push(FloatImage::new(width, height));
    }

    let avg_pixels = avg.iter().map(|a| *a as f32).collect();
    let average_image = FloatImage::from_vec(width, height, avg_pixels)?;
    Ok((eigen_images, average_image))
}

/// Decomposes an image into coefficients over the given eigenimage basis by
/// projecting (image - avg) onto each basis image.
pub fn project(
    image: &FloatImage,
    eigen_images: &[FloatImage],
    avg: &FloatImage,
) -> Result<Vec<f32>> {
    if !image.same_size(avg) {
        return Err(Error::InputShape(format!(
            "query image is {}x{} but the eigenspace was built over {}x{} images",
            image.width(),
            image.height(),
            avg.width(),
            avg.height()
        )));
    }

    let mut centered = vec![0.0f32; image.len()];
    math::vector_sub(image.data(), avg.data(), &mut centered);

    let mut coefficients = Vec::with_capacity(eigen_images.len());
    for basis in eigen_images {
        if !basis.same_size(image) {
            return Err(Error::InputShape(format!(
                "eigen image is {}x{}, expected {}x{}",
                basis.width(),
                basis.height(),
                image.width(),
                image.height()
            )));
        }
        coefficients.push(math::vector_inner_product(&centered, basis.data()));
    }
    Ok(coefficients)
}

fn validate_gallery(images: &[FloatImage]) -> Result<()> {
    let first = match images.first() {
        Some(first) => first,
        None => return Err(Error::InputShape("empty training gallery".to_string())),
    };
    if first.is_empty() {
        return Err(Error::InputShape("zero-sized training images".to_string()));
    }
    for (i, image) in images.iter().enumerate() {
        if !image.same_size(first) {
            return Err(Error::InputShape(format!(
                "training image {} is {}x{}, expected {}x{}",
                i,
                image.width(),
                image.height(),
                first.width(),
                first.height()
            )));
        }
    }
    Ok(())
}

fn mean_image(images: &[FloatImage]) -> Vec<f64> {
    let mut avg = vec![0.0f64; images[0].len()];
    for image in images {
        for (a, p) in avg.iter_mut().zip(image.data()) {
            *a += f64::from(*p);
        }
    }
    math::vector_scale(&mut avg, 1.0 / images.len() as f64);
    avg
}

/// Largest eigenpair of a symmetric matrix by power iteration. Returns `None`
/// when the iteration collapses, which happens once the matrix is numerically
/// zero after deflation.
fn dominant_eigenpair(matrix: &[Vec<f64>], eps: f64) -> Option<(f64, Vec<f64>)> {
    let n = matrix.len();
    // Uneven start vector, so it is not orthogonal to a coordinate-aligned
    // dominant eigenvector.
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 * 0.25).collect();
    let norm = math::vector_norm(&v);
    math::vector_scale(&mut v, 1.0 / norm);

    let mut lambda = 0.0f64;
    for _ in 0..MAX_POWER_SWEEPS {
        let mut next: Vec<f64> = matrix
            .iter()
            .map(|row| math::vector_inner_product(row, &v))
            .collect();
        let norm = math::vector_norm(&next);
        if norm <= f64::MIN_POSITIVE {
            return None;
        }
        math::vector_scale(&mut next, 1.0 / norm);

        let image: Vec<f64> = matrix
            .iter()
            .map(|row| math::vector_inner_product(row, &next))
            .collect();
        let new_lambda = math::vector_inner_product(&next, &image);

        let converged = (new_lambda - lambda).abs() <= eps * new_lambda.abs().max(1.0);
        v = next;
        lambda = new_lambda;
        if converged {
            break;
        }
    }
    Some((lambda, v))
}

#[cfg(test)]
mod tests {

    use super::*;

    fn gallery() -> Vec<FloatImage> {
        vec![
            FloatImage::from_vec(2, 2, vec![10.0, 20.0, 30.0, 40.0]).unwrap(),
            FloatImage::from_vec(2, 2, vec![40.0, 30.0, 20.0, 10.0]).unwrap(),
            FloatImage::from_vec(2, 2, vec![0.0, 50.0, 0.0, 50.0]).unwrap(),
        ]
    }

    #[test]
    fn test_basis_size_clamp() {
        assert_eq!(5, basis_size(0, 5));
        assert_eq!(5, basis_size(-3, 5));
        assert_eq!(5, basis_size(10, 5));
        assert_eq!(3, basis_size(3, 5));
        assert_eq!(1, basis_size(1, 5));
    }

    #[test]
    fn test_compute_basis_counts_and_mean() {
        let (eigen_images, avg) = compute_basis(&gallery(), 0, 0.001).unwrap();
        assert_eq!(3, eigen_images.len());
        let expected = [50.0 / 3.0, 100.0 / 3.0, 50.0 / 3.0, 100.0 / 3.0];
        for (a, e) in avg.data().iter().zip(&expected) {
            assert!((a - e).abs() < 1e-4);
        }
    }

    #[test]
    fn test_compute_basis_respects_max_iter() {
        let (eigen_images, _) = compute_basis(&gallery(), 2, 0.001).unwrap();
        assert_eq!(2, eigen_images.len());
    }

    #[test]
    fn test_basis_is_orthonormal_within_rank() {
        // Three images center to a rank-2 set: two unit components, one zero.
        let (eigen_images, _) = compute_basis(&gallery(), 0, 1e-9).unwrap();
        let norm0 = math::vector_norm(eigen_images[0].data());
        let norm1 = math::vector_norm(eigen_images[1].data());
        let cross =
            math::vector_inner_product(eigen_images[0].data(), eigen_images[1].data());
        assert!((norm0 - 1.0).abs() < 1e-4);
        assert!((norm1 - 1.0).abs() < 1e-4);
        assert!(cross.abs() < 1e-3);
        assert!(eigen_images[2].data().iter().all(|p| *p == 0.0));
    }

    #[test]
    fn test_project_of_average_is_zero() {
        let (eigen_images, avg) = compute_basis(&gallery(), 0, 0.001).unwrap();
        let coefficients = project(&avg, &eigen_images, &avg).unwrap();
        assert!(coefficients.iter().all(|c| *c == 0.0));
    }

    #[test]
    fn test_empty_gallery_is_rejected() {
        assert!(matches!(
            compute_basis(&[], 0, 0.001),
            Err(Error::InputShape(_))
        ));
    }

    #[test]
    fn test_mismatched_dimensions_are_rejected() {
        let images = vec![FloatImage::new(2, 2), FloatImage::new(3, 2)];
        assert!(matches!(
            compute_basis(&images, 0, 0.001),
            Err(Error::InputShape(_))
        ));
    }

    #[test]
    fn test_project_checks_query_shape() {
        let (eigen_images, avg) = compute_basis(&gallery(), 0, 0.001).unwrap();
        let query = FloatImage::new(3, 3);
        assert!(matches!(
            project(&query, &eigen_images, &avg),
            Err(Error::InputShape(_))
        ));
    }

    #[test]
    fn test_single_image_gallery_projects_to_zero() {
        let images = vec![FloatImage::from_vec(2, 1, vec![7.0, 9.0]).unwrap()];
        let (eigen_images, avg) = compute_basis(&images, 0, 0.001).unwrap();
        assert_eq!(1, eigen_images.len());
        let coefficients = project(&images[0], &eigen_images, &avg).unwrap();
        assert_eq!(vec![0.0], coefficients);
    }
}
