//! 2D k-d tree for nearest-neighbour queries over mask foreground pixels.
//!
//! Median-split construction on alternating axes. Queries are read-only and
//! deterministic: only the distance is returned, so ties between equally
//! near points cannot change the result.

use std::cmp::Ordering;

use crate::data::model::Point;

#[derive(Debug)]
struct KdNode {
    point: Point,
    /// 0 = x, 1 = y
    axis: usize,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

/// Nearest-neighbour index over a fixed set of 2D points.
///
/// Construction: O(n log² n)
/// Nearest neighbour: O(log n) average
#[derive(Debug)]
pub struct KdTree {
    root: Option<Box<KdNode>>,
    size: usize,
}

impl KdTree {
    pub fn build(points: &[Point]) -> Self {
        let mut points = points.to_vec();
        let size = points.len();
        let root = Self::build_recursive(&mut points, 0);
        KdTree { root, size }
    }

    fn build_recursive(points: &mut [Point], depth: usize) -> Option<Box<KdNode>> {
        if points.is_empty() {
            return None;
        }

        let axis = depth % 2;
        points.sort_by(|a, b| a.get(axis).partial_cmp(&b.get(axis)).unwrap_or(Ordering::Equal));

        let mid = points.len() / 2;
        let (left, rest) = points.split_at_mut(mid);
        let (pivot, right) = rest.split_first_mut()?;

        Some(Box::new(KdNode {
            point: *pivot,
            axis,
            left: Self::build_recursive(left, depth + 1),
            right: Self::build_recursive(right, depth + 1),
        }))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Squared distance from `query` to its nearest indexed point, or `None`
    /// for an empty tree.
    pub fn nearest_distance_sq(&self, query: &Point) -> Option<f64> {
        let root = self.root.as_ref()?;
        let mut best = f64::INFINITY;
        Self::nearest_recursive(root, query, &mut best);
        Some(best)
    }

    /// Euclidean distance from `query` to its nearest indexed point.
    pub fn nearest_distance(&self, query: &Point) -> Option<f64> {
        self.nearest_distance_sq(query).map(f64::sqrt)
    }

    fn nearest_recursive(node: &KdNode, query: &Point, best: &mut f64) {
        let dist_sq = query.distance_sq(&node.point);
        if dist_sq < *best {
            *best = dist_sq;
        }
        if *best == 0.0 {
            return;
        }

        let diff = query.get(node.axis) - node.point.get(node.axis);
        let (near, far) = if diff < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };

        if let Some(child) = near {
            Self::nearest_recursive(child, query, best);
        }
        if diff * diff < *best {
            if let Some(child) = far {
                Self::nearest_recursive(child, query, best);
            }
        }
    }

    /// Smallest nearest-neighbour distance over all `queries`: the closest
    /// approach between the query set and the indexed set.
    pub fn min_distance<'a, I>(&self, queries: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut best: Option<f64> = None;
        for q in queries {
            let d = self.nearest_distance_sq(q)?;
            best = Some(best.map_or(d, |b| b.min(d)));
            if best == Some(0.0) {
                break;
            }
        }
        best.map(f64::sqrt)
    }
}
