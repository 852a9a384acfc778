use std::cmp::Ordering;

use crate::error::Error;

/// A single neighbor pair: query point, found point, separation distance,
/// and a caller-adjustable weight (1 for all bonds produced by queries).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborBond {
    pub query_idx: usize,
    pub point_idx: usize,
    pub distance: f64,
    pub weight: f64,
}

impl NeighborBond {
    pub fn new(query_idx: usize, point_idx: usize, distance: f64) -> Self {
        Self {
            query_idx,
            point_idx,
            distance,
            weight: 1.0,
        }
    }

    /// Lexicographic comparison by (query_idx, distance, point_idx), the
    /// canonical order of materialized neighbor lists. Distances produced by
    /// queries are finite, so the partial float comparison cannot fail.
    pub fn cmp_as_tuple(&self, other: &Self) -> Ordering {
        self.query_idx
            .cmp(&other.query_idx)
            .then(
                self.distance
                    .partial_cmp(&other.distance)
                    .unwrap_or(Ordering::Equal),
            )
            .then(self.point_idx.cmp(&other.point_idx))
    }
}

/// A compact list of neighbor bonds, sorted by query index, with per-query
/// segment offsets and counts.
///
/// The list stores parallel arrays: `neighbors[b]` is the
/// `(query_idx, point_idx)` pair of bond `b`, with `distances[b]` and
/// `weights[b]` alongside. `segments[q]` is the index of the first bond of
/// query `q` and `counts[q]` the number of its bonds; both are recomputed
/// after every mutating operation.
#[derive(Clone, Debug, Default)]
pub struct NeighborList {
    neighbors: Vec<[usize; 2]>,
    distances: Vec<f64>,
    weights: Vec<f64>,
    segments: Vec<usize>,
    counts: Vec<usize>,
    num_query_points: usize,
    num_points: usize,
}

impl NeighborList {
    /// Builds a list from external parallel arrays.
    ///
    /// `query_point_index` must be sorted in non-decreasing order and all
    /// indices must lie below the declared sizes. When `weights` is `None`
    /// every bond gets weight 1.
    pub fn from_arrays(
        query_point_index: &[usize],
        point_index: &[usize],
        distances: &[f64],
        weights: Option<&[f64]>,
        num_query_points: usize,
        num_points: usize,
    ) -> Result<Self, Error> {
        let num_bonds = query_point_index.len();
        if point_index.len() != num_bonds
            || distances.len() != num_bonds
            || weights.map_or(false, |w| w.len() != num_bonds)
        {
            return Err(Error::MismatchedArrayLengths);
        }

        let mut last = 0;
        for (&q, &p) in query_point_index.iter().zip(point_index) {
            if q < last {
                return Err(Error::Unsorted);
            }
            if q >= num_query_points {
                return Err(Error::IndexOutOfRange {
                    index: q,
                    size: num_query_points,
                });
            }
            if p >= num_points {
                return Err(Error::IndexOutOfRange {
                    index: p,
                    size: num_points,
                });
            }
            last = q;
        }

        let mut list = NeighborList {
            neighbors: query_point_index
                .iter()
                .zip(point_index)
                .map(|(&q, &p)| [q, p])
                .collect(),
            distances: distances.to_vec(),
            weights: weights.map_or_else(|| vec![1.0; num_bonds], <[f64]>::to_vec),
            segments: Vec::new(),
            counts: Vec::new(),
            num_query_points,
            num_points,
        };
        list.update_segment_counts();
        Ok(list)
    }

    /// Builds a list from bonds already sorted by (query_idx, distance,
    /// point_idx). Used by query materialization.
    pub(crate) fn from_sorted_bonds(
        bonds: &[NeighborBond],
        num_query_points: usize,
        num_points: usize,
    ) -> Self {
        let mut list = NeighborList {
            neighbors: bonds.iter().map(|b| [b.query_idx, b.point_idx]).collect(),
            distances: bonds.iter().map(|b| b.distance).collect(),
            weights: bonds.iter().map(|b| b.weight).collect(),
            segments: Vec::new(),
            counts: Vec::new(),
            num_query_points,
            num_points,
        };
        list.update_segment_counts();
        list
    }

    /// Number of bonds.
    pub fn num_bonds(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Declared number of query points.
    pub fn num_query_points(&self) -> usize {
        self.num_query_points
    }

    /// Declared number of points.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// The (query_idx, point_idx) pairs, sorted by query index.
    pub fn neighbors(&self) -> &[[usize; 2]] {
        &self.neighbors
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Bond weights are the one column callers may rewrite in place.
    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    /// Index of the first bond of each query point.
    pub fn segments(&self) -> &[usize] {
        &self.segments
    }

    /// Number of bonds of each query point.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// The bond at index `b`.
    pub fn bond(&self, b: usize) -> NeighborBond {
        NeighborBond {
            query_idx: self.neighbors[b][0],
            point_idx: self.neighbors[b][1],
            distance: self.distances[b],
            weight: self.weights[b],
        }
    }

    /// Index of the first bond whose query index is `query_idx`, found by
    /// bisection on the query-index column. When the query has no bonds this
    /// is the index at which its bonds would be inserted.
    pub fn find_first_index(&self, query_idx: usize) -> usize {
        self.neighbors.partition_point(|n| n[0] < query_idx)
    }

    /// Keeps only the bonds whose mask entry is true, preserving order.
    /// Returns the change in bond count (never positive).
    pub fn filter(&mut self, mask: &[bool]) -> Result<isize, Error> {
        if mask.len() != self.num_bonds() {
            return Err(Error::MismatchedArrayLengths);
        }
        let old = self.num_bonds();
        let mut good = 0;
        for b in 0..old {
            if mask[b] {
                self.neighbors[good] = self.neighbors[b];
                self.distances[good] = self.distances[b];
                self.weights[good] = self.weights[b];
                good += 1;
            }
        }
        self.truncate(good);
        Ok(good as isize - old as isize)
    }

    /// Keeps only the bonds with `r_min < distance < r_max`, preserving
    /// order. Returns the change in bond count (never positive).
    pub fn filter_r(&mut self, r_min: f64, r_max: f64) -> isize {
        let old = self.num_bonds();
        let mut good = 0;
        for b in 0..old {
            if self.distances[b] > r_min && self.distances[b] < r_max {
                self.neighbors[good] = self.neighbors[b];
                self.distances[good] = self.distances[b];
                self.weights[good] = self.weights[b];
                good += 1;
            }
        }
        self.truncate(good);
        good as isize - old as isize
    }

    /// Adjusts the list to hold `num_bonds` bonds. New slots are zeroed;
    /// with `reset` the surviving prefix is zeroed as well.
    pub fn resize(&mut self, num_bonds: usize, reset: bool) {
        if reset {
            self.neighbors.clear();
            self.distances.clear();
            self.weights.clear();
        }
        self.neighbors.resize(num_bonds, [0, 0]);
        self.distances.resize(num_bonds, 0.0);
        self.weights.resize(num_bonds, 0.0);
        self.update_segment_counts();
    }

    /// Checks the declared sizes against externally expected ones.
    pub fn validate(&self, num_query_points: usize, num_points: usize) -> Result<(), Error> {
        if self.num_query_points != num_query_points {
            return Err(Error::Inconsistent {
                what: "query points",
                expected: num_query_points,
                found: self.num_query_points,
            });
        }
        if self.num_points != num_points {
            return Err(Error::Inconsistent {
                what: "points",
                expected: num_points,
                found: self.num_points,
            });
        }
        Ok(())
    }

    fn truncate(&mut self, num_bonds: usize) {
        self.neighbors.truncate(num_bonds);
        self.distances.truncate(num_bonds);
        self.weights.truncate(num_bonds);
        self.update_segment_counts();
    }

    /// Recomputes `segments` and `counts` from the neighbor column.
    fn update_segment_counts(&mut self) {
        self.counts.clear();
        self.counts.resize(self.num_query_points, 0);
        for n in &self.neighbors {
            // Zero-filled slots from resize() may precede a later declared
            // size; ignore anything outside the declared range.
            if let Some(count) = self.counts.get_mut(n[0]) {
                *count += 1;
            }
        }
        self.segments.clear();
        self.segments.resize(self.num_query_points, 0);
        let mut offset = 0;
        for q in 0..self.num_query_points {
            self.segments[q] = offset;
            offset += self.counts[q];
        }
    }
}
