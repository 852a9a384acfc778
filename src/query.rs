use crate::aabb::Aabb;
use crate::aabb_tree::AabbTree;
use crate::bounds::PeriodicBox;
use crate::error::Error;
use crate::query_iter::NeighborIter;

/// Default radius growth factor for nearest-neighbor queries.
pub const DEFAULT_SCALE: f64 = 1.1;

/// The kind of query to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryMode {
    /// All points within a cutoff distance.
    Ball,
    /// The k closest points.
    Nearest,
}

/// A plain record describing a query.
///
/// Rather than calling a mode-specific entry point, callers can fill in the
/// fields that matter and pass the record to the generic [`query`]
/// entry points; an unset `mode` is inferred from the other fields
/// (`num_neighbors` set implies [`QueryMode::Nearest`], otherwise a set
/// `r_max` implies [`QueryMode::Ball`]).
///
/// [`query`]: AabbQuery::query
#[derive(Clone, Copy, Debug)]
pub struct QueryArgs {
    /// Query kind; `None` triggers inference.
    pub mode: Option<QueryMode>,
    /// Number of neighbors for nearest queries.
    pub num_neighbors: Option<usize>,
    /// Cutoff for ball queries; initial search radius for nearest queries.
    pub r_max: Option<f64>,
    /// Radius growth factor for nearest queries; must exceed 1.
    pub scale: f64,
    /// Drop pairs with equal query and point index when the query points are
    /// the reference set itself.
    pub exclude_ii: bool,
}

impl Default for QueryArgs {
    fn default() -> Self {
        Self {
            mode: None,
            num_neighbors: None,
            r_max: None,
            scale: DEFAULT_SCALE,
            exclude_ii: false,
        }
    }
}

impl QueryArgs {
    /// Arguments for a ball query with cutoff `r_max`.
    pub fn ball(r_max: f64) -> Self {
        Self {
            mode: Some(QueryMode::Ball),
            r_max: Some(r_max),
            ..Self::default()
        }
    }

    /// Arguments for a nearest-neighbor query with `k` neighbors.
    pub fn nearest(k: usize) -> Self {
        Self {
            mode: Some(QueryMode::Nearest),
            num_neighbors: Some(k),
            ..Self::default()
        }
    }

    /// Sets self-pair exclusion.
    pub fn with_exclude_ii(mut self, exclude_ii: bool) -> Self {
        self.exclude_ii = exclude_ii;
        self
    }

    /// Infers the mode when unset and checks the remaining parameters.
    pub(crate) fn resolve(&self) -> Result<ResolvedQuery, Error> {
        let mode = match self.mode {
            Some(mode) => mode,
            None if self.num_neighbors.is_some() => QueryMode::Nearest,
            None if self.r_max.is_some() => QueryMode::Ball,
            None => {
                return Err(Error::InvalidQueryArgs(
                    "no mode set and neither num_neighbors nor r_max given",
                ))
            }
        };
        match mode {
            QueryMode::Ball => {
                let r_max = self
                    .r_max
                    .ok_or(Error::InvalidQueryArgs("ball queries require r_max"))?;
                if r_max < 0.0 {
                    return Err(Error::InvalidQueryArgs("r_max must be non-negative"));
                }
                Ok(ResolvedQuery::Ball { r_max })
            }
            QueryMode::Nearest => {
                let k = self.num_neighbors.ok_or(Error::InvalidQueryArgs(
                    "nearest queries require num_neighbors",
                ))?;
                if k == 0 {
                    return Err(Error::InvalidQueryArgs("num_neighbors must be at least 1"));
                }
                if self.scale <= 1.0 {
                    return Err(Error::InvalidQueryArgs("scale must be greater than 1"));
                }
                if let Some(r) = self.r_max {
                    if r <= 0.0 {
                        return Err(Error::InvalidQueryArgs(
                            "the initial radius of a nearest query must be positive",
                        ));
                    }
                }
                Ok(ResolvedQuery::Nearest {
                    k,
                    r_guess: self.r_max,
                    scale: self.scale,
                })
            }
        }
    }
}

/// A validated query specification.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ResolvedQuery {
    Ball {
        r_max: f64,
    },
    Nearest {
        k: usize,
        /// Caller-provided initial radius; derived from point density when
        /// absent.
        r_guess: Option<f64>,
        scale: f64,
    },
}

/// An AABB-tree-backed collection of points that can be queried for
/// neighbors.
///
/// The point slice is borrowed, not copied; the tree holds the point
/// coordinates it needs (with z zeroed for 2D boxes) in its node boxes.
pub struct AabbQuery<'a> {
    sim_box: PeriodicBox,
    points: &'a [[f64; 3]],
    tree: AabbTree,
}

impl<'a> AabbQuery<'a> {
    /// Builds the tree over `points`.
    pub fn new(sim_box: PeriodicBox, points: &'a [[f64; 3]]) -> Self {
        let aabbs: Vec<Aabb> = points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let mut p = p;
                if sim_box.is_2d() {
                    p[2] = 0.0;
                }
                Aabb::point(p, i)
            })
            .collect();
        Self {
            sim_box,
            points,
            tree: AabbTree::build(&aabbs),
        }
    }

    /// The simulation box the points live in.
    pub fn sim_box(&self) -> &PeriodicBox {
        &self.sim_box
    }

    /// The reference points.
    pub fn points(&self) -> &'a [[f64; 3]] {
        self.points
    }

    /// Number of reference points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn tree(&self) -> &AabbTree {
        &self.tree
    }

    /// The point at `idx`, with z zeroed for 2D boxes.
    pub(crate) fn point(&self, idx: usize) -> [f64; 3] {
        let mut p = self.points[idx];
        if self.sim_box.is_2d() {
            p[2] = 0.0;
        }
        p
    }

    /// Starts a query described by `args` over `query_points`.
    pub fn query<'b>(
        &'b self,
        query_points: &'b [[f64; 3]],
        args: QueryArgs,
    ) -> Result<NeighborIter<'b>, Error> {
        NeighborIter::new(self, query_points, args)
    }

    /// All points within `r_max` of each query point.
    pub fn query_ball<'b>(
        &'b self,
        query_points: &'b [[f64; 3]],
        r_max: f64,
        exclude_ii: bool,
    ) -> Result<NeighborIter<'b>, Error> {
        self.query(query_points, QueryArgs::ball(r_max).with_exclude_ii(exclude_ii))
    }

    /// The `k` nearest points to each query point.
    pub fn query_nearest<'b>(
        &'b self,
        query_points: &'b [[f64; 3]],
        k: usize,
        exclude_ii: bool,
    ) -> Result<NeighborIter<'b>, Error> {
        self.query(query_points, QueryArgs::nearest(k).with_exclude_ii(exclude_ii))
    }
}

/// A box plus points without an acceleration structure.
///
/// This backend exists so that bond-list-only workflows can carry the system
/// description without paying for a tree build; live queries against it are
/// unsupported.
pub struct RawPoints<'a> {
    sim_box: PeriodicBox,
    points: &'a [[f64; 3]],
}

impl<'a> RawPoints<'a> {
    pub fn new(sim_box: PeriodicBox, points: &'a [[f64; 3]]) -> Self {
        Self { sim_box, points }
    }

    pub fn sim_box(&self) -> &PeriodicBox {
        &self.sim_box
    }

    pub fn points(&self) -> &'a [[f64; 3]] {
        self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}

/// The closed set of query backends.
///
/// Dispatch is explicit: the tree-backed variant answers live queries, the
/// raw variant only carries data for precomputed bond lists and reports
/// [`Error::Unsupported`] for anything else.
pub enum NeighborQuery<'a> {
    Aabb(AabbQuery<'a>),
    Raw(RawPoints<'a>),
}

impl<'a> NeighborQuery<'a> {
    /// Builds a tree-backed query structure.
    pub fn with_tree(sim_box: PeriodicBox, points: &'a [[f64; 3]]) -> Self {
        Self::Aabb(AabbQuery::new(sim_box, points))
    }

    /// Wraps box and points without building a tree.
    pub fn raw(sim_box: PeriodicBox, points: &'a [[f64; 3]]) -> Self {
        Self::Raw(RawPoints::new(sim_box, points))
    }

    pub fn sim_box(&self) -> &PeriodicBox {
        match self {
            Self::Aabb(q) => q.sim_box(),
            Self::Raw(q) => q.sim_box(),
        }
    }

    pub fn points(&self) -> &'a [[f64; 3]] {
        match self {
            Self::Aabb(q) => q.points(),
            Self::Raw(q) => q.points(),
        }
    }

    pub fn num_points(&self) -> usize {
        self.points().len()
    }

    /// Starts a query described by `args` over `query_points`.
    pub fn query<'b>(
        &'b self,
        query_points: &'b [[f64; 3]],
        args: QueryArgs,
    ) -> Result<NeighborIter<'b>, Error> {
        match self {
            Self::Aabb(q) => q.query(query_points, args),
            Self::Raw(_) => Err(Error::Unsupported("querying")),
        }
    }

    /// All points within `r_max` of each query point.
    pub fn query_ball<'b>(
        &'b self,
        query_points: &'b [[f64; 3]],
        r_max: f64,
        exclude_ii: bool,
    ) -> Result<NeighborIter<'b>, Error> {
        self.query(query_points, QueryArgs::ball(r_max).with_exclude_ii(exclude_ii))
    }

    /// The `k` nearest points to each query point.
    pub fn query_nearest<'b>(
        &'b self,
        query_points: &'b [[f64; 3]],
        k: usize,
        exclude_ii: bool,
    ) -> Result<NeighborIter<'b>, Error> {
        self.query(query_points, QueryArgs::nearest(k).with_exclude_ii(exclude_ii))
    }
}
