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

use num::Float;

pub fn vector_sub<T: Float>(left: &[T], right: &[T], dest: &mut [T]) {
    debug_assert_eq!(left.len(), right.len());
    debug_assert_eq!(left.len(), dest.len());
    for ((d, l), r) in dest.iter_mut().zip(left).zip(right) {
        *d = *l - *r;
    }
}

pub fn vector_scale<T: Float>(vector: &mut [T], factor: T) {
    for v in vector.iter_mut() {
        *v = *v * factor;
    }
}

pub fn vector_inner_product<T: Float>(left: &[T], right: &[T]) -> T {
    debug_assert_eq!(left.len(), right.len());
    let mut product = T::zero();
    for (l, r) in left.iter().zip(right) {
        product = product + *l * *r;
    }
    product
}

pub fn vector_norm<T: Float>(vector: &[T]) -> T {
    vector_inner_product(vector, vector).sqrt()
}

/// L2 distance between two coefficient vectors:
/// norm = ||arr1-arr2||_L2 = sqrt( sum_I (arr1(I)-arr2(I))^2 )
pub fn euclidean_distance<T: Float>(left: &[T], right: &[T]) -> T {
    debug_assert_eq!(left.len(), right.len());
    let mut sum = T::zero();
    for (l, r) in left.iter().zip(right) {
        let d = *l - *r;
        sum = sum + d * d;
    }
    sum.sqrt()
}
