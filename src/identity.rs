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

//! Identity codec: numeric face IDs, their shortened bucket keys, and name
//! hashes.
//!
//! IDs within the same hundred-bucket collapse to a single identity. That is
//! a deliberate, lossy bucketing scheme: the shortened ID is both the
//! classifier class key and the name-lookup key, and callers rely on the
//! collapsing behaviour.

/// Removes the two least significant decimal digits of an ID, truncating
/// toward zero.
pub fn shorten(id: i32) -> i32 {
    id / 100
}

/// Polynomial rolling hash of `text` using wrapping 32-bit arithmetic.
///
/// The wrap-around on overflow is part of the contract: IDs cached by other
/// implementations of the same formula must match bit for bit.
pub fn generate_hash(text: &str) -> i32 {
    let mut h: i32 = 0;
    for c in text.chars() {
        h = h.wrapping_mul(31).wrapping_add(c as i32);
    }
    h
}
