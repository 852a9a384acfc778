use std::cmp::Ordering;
use std::f64::consts::PI;

use rayon::prelude::*;
use tracing::info_span;

use crate::aabb::AabbSphere;
use crate::bounds::PeriodicBox;
use crate::compute::PerQueryNeighbors;
use crate::error::Error;
use crate::neighbor_list::{NeighborBond, NeighborList};
use crate::query::{AabbQuery, QueryArgs, ResolvedQuery};

fn dist_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// Initial search radius for a nearest query when the caller gave none: the
/// radius of a sphere (disk in 2D) expected to hold k points at the average
/// point density of the box.
fn initial_radius_guess(sim_box: &PeriodicBox, n_points: usize, k: usize) -> f64 {
    let n = n_points.max(1) as f64;
    let k = k as f64;
    let v = sim_box.volume();
    if sim_box.is_2d() {
        (k * v / (PI * n)).sqrt()
    } else {
        (3.0 * k * v / (4.0 * PI * n)).cbrt()
    }
}

/// Streaming iterator over all points within a cutoff of one query point.
///
/// The iterator walks one periodic image at a time; within an image it
/// performs a stackless traversal of the AABB tree, remembering the node and
/// intra-leaf cursors so that every call to [`Iterator::next`] resumes where
/// the previous one left off. Output order therefore follows (image, tree
/// pre-order, bucket position), not distance.
pub struct BallIter<'a> {
    query: &'a AabbQuery<'a>,
    query_idx: usize,
    pos: [f64; 3],
    r: f64,
    r_sq: f64,
    images: Vec<[f64; 3]>,
    cur_image: usize,
    cur_node: usize,
    cur_p: usize,
    finished: bool,
}

impl<'a> BallIter<'a> {
    pub(crate) fn with_images(
        query: &'a AabbQuery<'a>,
        query_idx: usize,
        pos: [f64; 3],
        r: f64,
        images: Vec<[f64; 3]>,
    ) -> Self {
        Self {
            query,
            query_idx,
            pos,
            r,
            r_sq: r * r,
            images,
            cur_image: 0,
            cur_node: 0,
            cur_p: 0,
            finished: false,
        }
    }

    /// True once `next` has reported exhaustion.
    pub fn end(&self) -> bool {
        self.finished
    }
}

impl<'a> Iterator for BallIter<'a> {
    type Item = NeighborBond;

    fn next(&mut self) -> Option<NeighborBond> {
        if self.finished {
            return None;
        }
        let tree = self.query.tree();
        while self.cur_image < self.images.len() {
            let shift = self.images[self.cur_image];
            let pos_image = [
                self.pos[0] + shift[0],
                self.pos[1] + shift[1],
                self.pos[2] + shift[2],
            ];
            let sphere = AabbSphere::new(pos_image, self.r);

            // Stackless traversal: advance by one on overlap, jump the whole
            // subtree otherwise.
            while self.cur_node < tree.len() {
                if tree.node_overlaps(self.cur_node, &sphere) {
                    if tree.is_leaf(self.cur_node) {
                        while self.cur_p < tree.leaf_len(self.cur_node) {
                            let j = tree.leaf_tag(self.cur_node, self.cur_p);
                            self.cur_p += 1;
                            let d_sq = dist_sq(self.query.point(j), pos_image);
                            if d_sq < self.r_sq {
                                return Some(NeighborBond::new(self.query_idx, j, d_sq.sqrt()));
                            }
                        }
                    }
                    self.cur_node += 1;
                } else {
                    self.cur_node += tree.skip(self.cur_node) + 1;
                }
                self.cur_p = 0;
            }
            self.cur_image += 1;
            self.cur_node = 0;
        }
        self.finished = true;
        None
    }
}

/// Streaming iterator over the k nearest points to one query point.
///
/// Neighbors are gathered by repeated ball sweeps with geometrically growing
/// radius, then drained in ascending (distance, point index) order. The
/// radius never grows beyond half the minimum plane distance of the box;
/// when that cap is reached a final sweep runs at the cap and the iterator
/// drains whatever was found, so under-populated systems terminate instead
/// of looping.
pub struct NearestIter<'a> {
    query: &'a AabbQuery<'a>,
    query_idx: usize,
    pos: [f64; 3],
    k: usize,
    r: f64,
    scale: f64,
    r_cap: f64,
    images: Vec<[f64; 3]>,
    current_neighbors: Vec<NeighborBond>,
    built: bool,
    finished: bool,
}

impl<'a> NearestIter<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn with_images(
        query: &'a AabbQuery<'a>,
        query_idx: usize,
        pos: [f64; 3],
        k: usize,
        r0: f64,
        scale: f64,
        r_cap: f64,
        images: Vec<[f64; 3]>,
    ) -> Self {
        Self {
            query,
            query_idx,
            pos,
            k,
            r: r0,
            scale,
            r_cap,
            images,
            current_neighbors: Vec::new(),
            built: false,
            finished: false,
        }
    }

    /// True once `next` has reported exhaustion.
    pub fn end(&self) -> bool {
        self.finished
    }

    fn gather(&mut self) {
        loop {
            self.current_neighbors.clear();
            let mut ball = BallIter::with_images(
                self.query,
                self.query_idx,
                self.pos,
                self.r,
                self.images.clone(),
            );
            while let Some(nb) = ball.next() {
                self.current_neighbors.push(nb);
            }
            if self.current_neighbors.len() >= self.k {
                break;
            }
            if self.r >= self.r_cap {
                break;
            }
            self.r = (self.r * self.scale).min(self.r_cap);
        }
        self.current_neighbors.sort_unstable_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then(a.point_idx.cmp(&b.point_idx))
        });
        self.current_neighbors.truncate(self.k);
        // Drain from the back.
        self.current_neighbors.reverse();
        self.built = true;
    }
}

impl<'a> Iterator for NearestIter<'a> {
    type Item = NeighborBond;

    fn next(&mut self) -> Option<NeighborBond> {
        if self.finished {
            return None;
        }
        if !self.built {
            self.gather();
        }
        match self.current_neighbors.pop() {
            Some(nb) => Some(nb),
            None => {
                self.finished = true;
                None
            }
        }
    }
}

/// A live per-query iterator of either kind.
pub enum PerQueryIter<'a> {
    Ball(BallIter<'a>),
    Nearest(NearestIter<'a>),
}

impl<'a> PerQueryIter<'a> {
    /// True once `next` has reported exhaustion.
    pub fn end(&self) -> bool {
        match self {
            Self::Ball(it) => it.end(),
            Self::Nearest(it) => it.end(),
        }
    }
}

impl<'a> Iterator for PerQueryIter<'a> {
    type Item = NeighborBond;

    fn next(&mut self) -> Option<NeighborBond> {
        match self {
            Self::Ball(it) => it.next(),
            Self::Nearest(it) => it.next(),
        }
    }
}

/// Validated query parameters, with the nearest-query radius schedule
/// pinned down.
#[derive(Clone, Copy, Debug)]
pub(crate) enum IterSpec {
    Ball {
        r_max: f64,
    },
    Nearest {
        k: usize,
        r0: f64,
        scale: f64,
        r_cap: f64,
    },
}

/// Iterator over the bonds of a whole query-point set.
///
/// Yields the bonds of query point 0, then 1, and so on; within one query
/// point the order is that of the underlying per-query iterator. Self pairs
/// are dropped here when `exclude_ii` is set, and nearest queries then run
/// with one extra neighbor internally so the requested count is still
/// honored.
pub struct NeighborIter<'a> {
    query: &'a AabbQuery<'a>,
    query_points: &'a [[f64; 3]],
    spec: IterSpec,
    exclude_ii: bool,
    images: Vec<[f64; 3]>,
    cur_query: usize,
    inner: Option<PerQueryNeighbors<'a>>,
    finished: bool,
}

impl<'a> NeighborIter<'a> {
    pub(crate) fn new(
        query: &'a AabbQuery<'a>,
        query_points: &'a [[f64; 3]],
        args: QueryArgs,
    ) -> Result<Self, Error> {
        let sim_box = query.sim_box();
        let (spec, images) = match args.resolve()? {
            ResolvedQuery::Ball { r_max } => {
                (IterSpec::Ball { r_max }, sim_box.image_vectors(r_max)?)
            }
            ResolvedQuery::Nearest { k, r_guess, scale } => {
                let r_cap = 0.5 * sim_box.min_plane_distance();
                let guess =
                    r_guess.unwrap_or_else(|| initial_radius_guess(sim_box, query.num_points(), k));
                let r0 = if guess > 0.0 { guess.min(r_cap) } else { r_cap };
                (
                    IterSpec::Nearest {
                        k,
                        r0,
                        scale,
                        r_cap,
                    },
                    sim_box.unchecked_image_vectors(),
                )
            }
        };
        Ok(Self {
            query,
            query_points,
            spec,
            exclude_ii: args.exclude_ii,
            images,
            cur_query: 0,
            inner: None,
            finished: false,
        })
    }

    /// Number of query points.
    pub fn num_query_points(&self) -> usize {
        self.query_points.len()
    }

    /// True once `next` has reported exhaustion.
    pub fn end(&self) -> bool {
        self.finished
    }

    pub(crate) fn exclude_ii(&self) -> bool {
        self.exclude_ii
    }

    /// The requested neighbor count for nearest queries.
    pub(crate) fn requested_k(&self) -> Option<usize> {
        match self.spec {
            IterSpec::Nearest { k, .. } => Some(k),
            IterSpec::Ball { .. } => None,
        }
    }

    /// Builds the live iterator for one query point. With `extend_k`, a
    /// nearest query searches for one extra neighbor when self pairs are
    /// excluded, leaving room for the dropped pair.
    pub(crate) fn make_per_query(&self, i: usize, extend_k: bool) -> PerQueryIter<'a> {
        let mut pos = self.query_points[i];
        if self.query.sim_box().is_2d() {
            pos[2] = 0.0;
        }
        match self.spec {
            IterSpec::Ball { r_max } => PerQueryIter::Ball(BallIter::with_images(
                self.query,
                i,
                pos,
                r_max,
                self.images.clone(),
            )),
            IterSpec::Nearest {
                k,
                r0,
                scale,
                r_cap,
            } => {
                let k = if extend_k && self.exclude_ii { k + 1 } else { k };
                PerQueryIter::Nearest(NearestIter::with_images(
                    self.query,
                    i,
                    pos,
                    k,
                    r0,
                    scale,
                    r_cap,
                    self.images.clone(),
                ))
            }
        }
    }

    /// Materializes the query into a sorted neighbor list.
    ///
    /// Each query point is searched independently (in parallel), the
    /// per-thread results are flattened and sorted by
    /// (query index, distance, point index).
    pub fn to_neighbor_list(&self) -> NeighborList {
        let span = info_span!(
            "to_neighbor_list",
            n_query_points = self.query_points.len()
        );
        let _entered = span.enter();

        let mut bonds: Vec<NeighborBond> = (0..self.query_points.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let mut it = self.filtered_per_query(i);
                let mut local = Vec::new();
                while let Some(nb) = it.next() {
                    local.push(nb);
                }
                local
            })
            .collect();
        bonds.par_sort_unstable_by(NeighborBond::cmp_as_tuple);
        NeighborList::from_sorted_bonds(&bonds, self.query_points.len(), self.query.num_points())
    }
}

impl<'a> Iterator for NeighborIter<'a> {
    type Item = NeighborBond;

    fn next(&mut self) -> Option<NeighborBond> {
        if self.finished {
            return None;
        }
        loop {
            if self.inner.is_none() {
                if self.cur_query >= self.query_points.len() {
                    self.finished = true;
                    return None;
                }
                self.inner = Some(self.filtered_per_query(self.cur_query));
            }
            match self.inner.as_mut().and_then(Iterator::next) {
                Some(nb) => return Some(nb),
                None => {
                    self.inner = None;
                    self.cur_query += 1;
                }
            }
        }
    }
}
