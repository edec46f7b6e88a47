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

//! Landmark classifier: an ensemble of extremely-randomized decision trees
//! over flattened 3D facial feature points.
//!
//! [`ErtForest`] is the forest primitive (continuous features in, a class
//! value out); [`PointsClassifier`] is the thin layer around it that flattens
//! landmark sets and maps shortened numeric IDs to classes. Training is
//! seeded, so a given gallery always produces the same forest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::common::{Point3, TargetFace};
use crate::error::{Error, Result};
use crate::identity;

const NUM_TREES: usize = 32;
const MAX_DEPTH: usize = 12;
const MIN_SAMPLES_SPLIT: usize = 2;
const SPLIT_CANDIDATES_FLOOR: usize = 1;
const TRAIN_SEED: u64 = 0x5EED_FACE;

/// Flattens an ordered landmark set into one feature row, x,y,z interleaved
/// in point order. Training and prediction must use the same layout.
pub fn flatten(points: &[Point3]) -> Vec<f32> {
    let mut row = Vec::with_capacity(points.len() * 3);
    for point in points {
        row.push(point.x);
        row.push(point.y);
        row.push(point.z);
    }
    row
}

enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: u32,
        right: u32,
    },
    Leaf {
        class: usize,
    },
}

struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walks from the root to a leaf; left on `feature < threshold`.
    fn predict(&self, row: &[f32]) -> usize {
        let mut index = 0usize;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { class } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] < *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }
}

/// A trained ensemble of extremely-randomized classification trees.
pub struct ErtForest {
    trees: Vec<DecisionTree>,
    /// Class index -> class response value.
    classes: Vec<i32>,
}

impl ErtForest {
    /// Trains a forest over `data` rows labeled by `responses`. `num_classes`
    /// must equal the number of distinct response values present.
    pub fn fit(data: &[Vec<f32>], responses: &[i32], num_classes: usize) -> Result<ErtForest> {
        let first = match data.first() {
            Some(first) => first,
            None => return Err(Error::InputShape("empty training data".to_string())),
        };
        if first.is_empty() {
            return Err(Error::InputShape("zero-length feature rows".to_string()));
        }
        if data.len() != responses.len() {
            return Err(Error::InputShape(format!(
                "{} feature rows but {} responses",
                data.len(),
                responses.len()
            )));
        }
        for (i, row) in data.iter().enumerate() {
            if row.len() != first.len() {
                return Err(Error::InputShape(format!(
                    "feature row {} has length {}, expected {}",
                    i,
                    row.len(),
                    first.len()
                )));
            }
        }

        let mut classes = responses.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() != num_classes {
            return Err(Error::InputShape(format!(
                "{} distinct responses but num_classes = {}",
                classes.len(),
                num_classes
            )));
        }

        let targets: Vec<usize> = responses
            .iter()
            .map(|r| classes.binary_search(r).unwrap_or(0))
            .collect();

        let mut rng = StdRng::seed_from_u64(TRAIN_SEED);
        let trees = (0..NUM_TREES)
            .map(|_| grow_tree(data, &targets, classes.len(), &mut rng))
            .collect();

        Ok(ErtForest { trees, classes })
    }

    /// Predicts the class value of a single feature row by majority vote.
    /// The value is returned as a float; callers cast it back to the integer
    /// class key.
    pub fn predict_one(&self, row: &[f32]) -> f32 {
        let mut votes = vec![0usize; self.classes.len()];
        for tree in &self.trees {
            votes[tree.predict(row)] += 1;
        }

        let mut best = 0;
        for (class, count) in votes.iter().enumerate() {
            if *count > votes[best] {
                best = class;
            }
        }
        self.classes[best] as f32
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

fn grow_tree(
    data: &[Vec<f32>],
    targets: &[usize],
    num_classes: usize,
    rng: &mut StdRng,
) -> DecisionTree {
    let samples: Vec<usize> = (0..data.len()).collect();
    let mut nodes = Vec::new();
    grow_node(data, targets, num_classes, samples, 0, &mut nodes, rng);
    DecisionTree { nodes }
}

fn grow_node(
    data: &[Vec<f32>],
    targets: &[usize],
    num_classes: usize,
    samples: Vec<usize>,
    depth: usize,
    nodes: &mut Vec<TreeNode>,
    rng: &mut StdRng,
) -> u32 {
    let counts = class_counts(targets, &samples, num_classes);
    let pure = counts.iter().filter(|c| **c > 0).count() <= 1;
    if pure || depth >= MAX_DEPTH || samples.len() < MIN_SAMPLES_SPLIT {
        nodes.push(TreeNode::Leaf {
            class: majority(&counts),
        });
        return (nodes.len() - 1) as u32;
    }

    let split = match best_random_split(data, targets, num_classes, &samples, rng) {
        Some(split) => split,
        None => {
            // No candidate separated the node, e.g. duplicated rows.
            nodes.push(TreeNode::Leaf {
                class: majority(&counts),
            });
            return (nodes.len() - 1) as u32;
        }
    };

    // Reserve the slot before recursing so child indices stay stable.
    let index = nodes.len();
    nodes.push(TreeNode::Leaf { class: 0 });

    let left = grow_node(data, targets, num_classes, split.left, depth + 1, nodes, rng);
    let right = grow_node(data, targets, num_classes, split.right, depth + 1, nodes, rng);
    nodes[index] = TreeNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    index as u32
}

struct Split {
    feature: usize,
    threshold: f32,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Extremely-randomized split selection: sqrt(F) random features, one
/// uniform-random threshold each, keep the lowest weighted Gini impurity.
fn best_random_split(
    data: &[Vec<f32>],
    targets: &[usize],
    num_classes: usize,
    samples: &[usize],
    rng: &mut StdRng,
) -> Option<Split> {
    let num_features = data[0].len();
    let num_candidates =
        ((num_features as f64).sqrt().ceil() as usize).max(SPLIT_CANDIDATES_FLOOR);

    let mut best: Option<(f64, Split)> = None;

    for _ in 0..num_candidates {
        let feature = rng.gen_range(0..num_features);

        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for s in samples {
            let value = data[*s][feature];
            lo = lo.min(value);
            hi = hi.max(value);
        }
        if !(lo < hi) {
            continue;
        }
        let threshold = rng.gen_range(lo..hi);

        let mut left = Vec::new();
        let mut right = Vec::new();
        for s in samples {
            if data[*s][feature] < threshold {
                left.push(*s);
            } else {
                right.push(*s);
            }
        }
        if left.is_empty() || right.is_empty() {
            continue;
        }

        let impurity = weighted_gini(targets, &left, num_classes)
            + weighted_gini(targets, &right, num_classes);
        let candidate = Split {
            feature,
            threshold,
            left,
            right,
        };
        match &best {
            Some((best_impurity, _)) if *best_impurity <= impurity => {}
            _ => best = Some((impurity, candidate)),
        }
    }

    best.map(|(_, split)| split)
}

fn class_counts(targets: &[usize], samples: &[usize], num_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; num_classes];
    for s in samples {
        counts[targets[*s]] += 1;
    }
    counts
}

fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, count) in counts.iter().enumerate() {
        if *count > counts[best] {
            best = class;
        }
    }
    best
}

/// Gini impurity of a child node, weighted by its sample count.
fn weighted_gini(targets: &[usize], samples: &[usize], num_classes: usize) -> f64 {
    let counts = class_counts(targets, samples, num_classes);
    let total = samples.len() as f64;
    let mut gini = 1.0;
    for count in counts {
        let p = count as f64 / total;
        gini -= p * p;
    }
    gini * total
}

/// Flattening and label-mapping layer around [`ErtForest`]: trains on a
/// gallery of enrolled faces, classifying by shortened numeric ID.
pub struct PointsClassifier {
    forest: ErtForest,
    /// Landmark points per face seen at training time.
    var_count: usize,
}

impl PointsClassifier {
    /// Trains the landmark classifier. Every face must carry the same number
    /// of 3D points; galleries without landmarks cannot be trained.
    pub fn train(faces: &[TargetFace]) -> Result<PointsClassifier> {
        if faces.is_empty() {
            return Err(Error::InputShape("empty enrollment set".to_string()));
        }

        let mut data = Vec::with_capacity(faces.len());
        let mut responses = Vec::with_capacity(faces.len());
        let mut var_count: Option<usize> = None;

        for face in faces {
            let points = face.points.as_ref().ok_or_else(|| {
                Error::InputShape(format!("face '{}' carries no 3d points", face.key))
            })?;
            match var_count {
                None => var_count = Some(points.len()),
                Some(expected) if expected != points.len() => {
                    return Err(Error::InputShape(format!(
                        "face '{}' has {} points, expected {}",
                        face.key,
                        points.len(),
                        expected
                    )));
                }
                Some(_) => {}
            }
            data.push(flatten(points));
            responses.push(identity::shorten(face.id));
        }

        let var_count = var_count.unwrap_or(0);
        if var_count == 0 {
            return Err(Error::InputShape("empty landmark sets".to_string()));
        }

        let mut distinct = responses.clone();
        distinct.sort_unstable();
        distinct.dedup();

        let forest = ErtForest::fit(&data, &responses, distinct.len())?;
        Ok(PointsClassifier { forest, var_count })
    }

    /// Predicts the shortened class key for a landmark set.
    pub fn predict(&self, points: &[Point3]) -> Result<i32> {
        if points.len() != self.var_count {
            return Err(Error::InputShape(format!(
                "query has {} landmark points, classifier was trained on {}",
                points.len(),
                self.var_count
            )));
        }
        let row = flatten(points);
        Ok(self.forest.predict_one(&row) as i32)
    }

    pub fn var_count(&self) -> usize {
        self.var_count
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::common::FloatImage;

    fn cluster(center: [f32; 3], variant: f32) -> Vec<Point3> {
        (0..5)
            .map(|i| {
                let t = i as f32 * 0.05 + variant * 0.01;
                Point3::new(center[0] + t, center[1] - t, center[2] + t * 0.5)
            })
            .collect()
    }

    fn face(key: &str, id: i32, points: Option<Vec<Point3>>) -> TargetFace {
        TargetFace {
            key: key.to_string(),
            image: FloatImage::new(2, 2),
            points,
            id,
        }
    }

    #[test]
    fn test_flatten_interleaves_in_point_order() {
        let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)];
        assert_eq!(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], flatten(&points));
    }

    #[test]
    fn test_forest_separates_two_clusters() {
        let mut data = Vec::new();
        let mut responses = Vec::new();
        for variant in 0..4 {
            data.push(flatten(&cluster([0.0, 0.0, 0.0], variant as f32)));
            responses.push(7);
            data.push(flatten(&cluster([10.0, 10.0, 10.0], variant as f32)));
            responses.push(9);
        }

        let forest = ErtForest::fit(&data, &responses, 2).unwrap();
        assert_eq!(2, forest.num_classes());
        let near_a = flatten(&cluster([0.0, 0.0, 0.0], 8.0));
        let near_b = flatten(&cluster([10.0, 10.0, 10.0], 8.0));
        assert_eq!(7.0, forest.predict_one(&near_a));
        assert_eq!(9.0, forest.predict_one(&near_b));
    }

    #[test]
    fn test_fit_rejects_wrong_class_count() {
        let data = vec![vec![0.0, 1.0], vec![2.0, 3.0]];
        let responses = vec![1, 2];
        assert!(matches!(
            ErtForest::fit(&data, &responses, 3),
            Err(Error::InputShape(_))
        ));
    }

    #[test]
    fn test_classifier_predicts_shortened_ids() {
        let faces = vec![
            face("alice", 100, Some(cluster([0.0, 0.0, 0.0], 0.0))),
            face("alice", 101, Some(cluster([0.0, 0.0, 0.0], 1.0))),
            face("alice", 102, Some(cluster([0.0, 0.0, 0.0], 2.0))),
            face("bob", 200, Some(cluster([10.0, 10.0, 10.0], 0.0))),
            face("bob", 201, Some(cluster([10.0, 10.0, 10.0], 1.0))),
            face("bob", 202, Some(cluster([10.0, 10.0, 10.0], 2.0))),
        ];

        let classifier = PointsClassifier::train(&faces).unwrap();
        assert_eq!(5, classifier.var_count());
        assert_eq!(1, classifier.predict(&cluster([0.0, 0.0, 0.0], 5.0)).unwrap());
        assert_eq!(
            2,
            classifier.predict(&cluster([10.0, 10.0, 10.0], 5.0)).unwrap()
        );
    }

    #[test]
    fn test_single_class_gallery() {
        let faces = vec![
            face("carol", 300, Some(cluster([5.0, 5.0, 5.0], 0.0))),
            face("carol", 310, Some(cluster([5.0, 5.0, 5.0], 1.0))),
        ];
        let classifier = PointsClassifier::train(&faces).unwrap();
        assert_eq!(3, classifier.predict(&cluster([5.0, 5.0, 5.0], 2.0)).unwrap());
    }

    #[test]
    fn test_train_requires_points_everywhere() {
        let faces = vec![
            face("alice", 100, Some(cluster([0.0, 0.0, 0.0], 0.0))),
            face("bob", 200, None),
        ];
        assert!(matches!(
            PointsClassifier::train(&faces),
            Err(Error::InputShape(_))
        ));
    }

    #[test]
    fn test_train_requires_uniform_point_counts() {
        let mut short = cluster([0.0, 0.0, 0.0], 0.0);
        short.pop();
        let faces = vec![
            face("alice", 100, Some(cluster([0.0, 0.0, 0.0], 0.0))),
            face("bob", 200, Some(short)),
        ];
        assert!(matches!(
            PointsClassifier::train(&faces),
            Err(Error::InputShape(_))
        ));
    }

    #[test]
    fn test_predict_checks_point_count() {
        let faces = vec![
            face("alice", 100, Some(cluster([0.0, 0.0, 0.0], 0.0))),
            face("bob", 200, Some(cluster([10.0, 10.0, 10.0], 0.0))),
        ];
        let classifier = PointsClassifier::train(&faces).unwrap();
        assert!(matches!(
            classifier.predict(&[Point3::new(0.0, 0.0, 0.0)]),
            Err(Error::InputShape(_))
        ));
    }
}
