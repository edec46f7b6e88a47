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

use crate::error::{Error, Result};

/// An owned grayscale bitmap with f32 pixels, stored row-major.
///
/// Enrollment and query images are expected to be already cropped and
/// normalized by the upstream pipeline; every image fed to one recognizer
/// must share the same dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatImage {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl FloatImage {
    /// Creates a zero-filled image.
    pub fn new(width: u32, height: u32) -> Self {
        FloatImage {
            width,
            height,
            data: vec![0.0; (width * height) as usize],
        }
    }

    /// Wraps an existing pixel buffer. The buffer length must equal
    /// `width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        if data.len() != (width * height) as usize {
            return Err(Error::InputShape(format!(
                "pixel buffer of length {} does not match {}x{} image",
                data.len(),
                width,
                height
            )));
        }
        Ok(FloatImage {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn same_size(&self, other: &FloatImage) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// A 3D facial feature point, one of a fixed-size ordered set per face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Point3 { x, y, z }
    }
}

/// Describes a target face for enrollment.
#[derive(Debug, Clone)]
pub struct TargetFace {
    /// The key returned when this face is found.
    pub key: String,
    /// The grayscale target image; all faces enrolled together must share
    /// identical dimensions.
    pub image: FloatImage,
    /// The face 3D feature points, when the tracking pipeline supplied them.
    pub points: Option<Vec<Point3>>,
    /// Caller-assigned numeric ID. Does not have to be unique: IDs that share
    /// a shortened form are treated as the same identity.
    pub id: i32,
}
