//! # vicinity
//!
//! `vicinity` is a Rust library for neighbor queries over points in periodic
//! simulation boxes. It provides the spatial core of particle-analysis
//! pipelines: finding all points within a cutoff of a query location (ball
//! queries) or the k closest points (nearest queries), in orthorhombic or
//! triclinic boxes with any combination of periodic axes, in 2D or 3D.
//!
//! ## Features
//!
//! - **Periodic geometry**: minimum-image wrapping and single-layer image
//!   enumeration for triclinic cells via [`PeriodicBox`].
//! - **Static AABB tree**: a flat, pre-order tree with skip offsets,
//!   traversed without a stack ([`AabbQuery`]).
//! - **Streaming or materialized results**: per-bond iterators, per-query
//!   iterators, or a compact sorted [`NeighborList`] with per-query segment
//!   indices, filtering, and binary search.
//! - **Parallel driving**: [`loop_over_neighbors`] and
//!   [`loop_over_neighbors_per_query`] run a caller-supplied function over a
//!   precomputed bond list or a live query, serially or with rayon.
//!
//! ## Example
//!
//! ```
//! use vicinity::{AabbQuery, PeriodicBox};
//!
//! let sim_box = PeriodicBox::cube(10.0);
//! let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [9.5, 0.0, 0.0]];
//! let query = AabbQuery::new(sim_box, &points);
//!
//! // All points within 1.5 of the origin; the point at x = 9.5 is found
//! // through the periodic boundary at distance 0.5.
//! let nlist = query
//!     .query_ball(&[[0.0, 0.0, 0.0]], 1.5, false)
//!     .unwrap()
//!     .to_neighbor_list();
//! assert_eq!(nlist.num_bonds(), 3);
//! ```
//!
//! ## Main Interface
//!
//! The primary entry point is [`AabbQuery`], which borrows a point set and
//! builds the tree. [`NeighborQuery`] wraps the closed set of backends
//! (tree-backed or raw points) for code that dispatches at runtime.

mod aabb;
mod aabb_tree;
mod bounds;
mod compute;
mod error;
mod neighbor_list;
mod query;
mod query_iter;

pub use aabb::{overlap, Aabb, AabbSphere};
pub use aabb_tree::AabbTree;
pub use bounds::PeriodicBox;
pub use compute::{loop_over_neighbors, loop_over_neighbors_per_query, PerQueryNeighbors};
pub use error::Error;
pub use neighbor_list::{NeighborBond, NeighborList};
pub use query::{AabbQuery, NeighborQuery, QueryArgs, QueryMode, RawPoints, DEFAULT_SCALE};
pub use query_iter::{BallIter, NearestIter, NeighborIter, PerQueryIter};
