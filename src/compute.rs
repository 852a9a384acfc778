use rayon::prelude::*;

use crate::error::Error;
use crate::neighbor_list::{NeighborBond, NeighborList};
use crate::query::{NeighborQuery, QueryArgs};
use crate::query_iter::{NeighborIter, PerQueryIter};

/// Runs `body` once per index, either as a rayon parallel-for or as a plain
/// loop on the calling thread.
fn for_loop_wrapper<F>(parallel: bool, n: usize, body: F)
where
    F: Fn(usize) + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().for_each(body);
    } else {
        for i in 0..n {
            body(i);
        }
    }
}

enum Source<'a> {
    /// Cursor over one query's segment of a precomputed list.
    List {
        nlist: &'a NeighborList,
        query_idx: usize,
        cur: usize,
    },
    /// A live tree query.
    Live(PerQueryIter<'a>),
}

/// The neighbors of a single query point, drawn either from a precomputed
/// bond list or from a live tree query.
///
/// This is the iterator handed to per-query reducers; both sources share the
/// `next`/`end` contract of the streaming iterators.
pub struct PerQueryNeighbors<'a> {
    source: Source<'a>,
    exclude_idx: Option<usize>,
    limit: Option<usize>,
    emitted: usize,
    finished: bool,
}

impl<'a> PerQueryNeighbors<'a> {
    fn from_list(nlist: &'a NeighborList, query_idx: usize) -> Self {
        Self {
            source: Source::List {
                nlist,
                query_idx,
                cur: nlist.find_first_index(query_idx),
            },
            exclude_idx: None,
            limit: None,
            emitted: 0,
            finished: false,
        }
    }

    /// True once `next` has reported exhaustion.
    pub fn end(&self) -> bool {
        self.finished
    }
}

impl<'a> Iterator for PerQueryNeighbors<'a> {
    type Item = NeighborBond;

    fn next(&mut self) -> Option<NeighborBond> {
        if self.finished {
            return None;
        }
        loop {
            let nb = match &mut self.source {
                Source::List {
                    nlist,
                    query_idx,
                    cur,
                } => {
                    if *cur >= nlist.num_bonds() || nlist.neighbors()[*cur][0] != *query_idx {
                        None
                    } else {
                        let nb = nlist.bond(*cur);
                        *cur += 1;
                        Some(nb)
                    }
                }
                Source::Live(it) => it.next(),
            };
            match nb {
                Some(nb) => {
                    if self.exclude_idx == Some(nb.point_idx) {
                        continue;
                    }
                    if let Some(limit) = self.limit {
                        if self.emitted >= limit {
                            continue;
                        }
                    }
                    self.emitted += 1;
                    return Some(nb);
                }
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

impl NeighborList {
    /// Iterates the bonds of one query point, starting at
    /// [`find_first_index`](NeighborList::find_first_index).
    pub fn per_query(&self, query_idx: usize) -> PerQueryNeighbors<'_> {
        PerQueryNeighbors::from_list(self, query_idx)
    }
}

impl<'a> NeighborIter<'a> {
    /// Replicates this query for a single query point. Self-pair exclusion
    /// is not applied on the per-query level; use the whole-set iterator or
    /// the driver for that.
    pub fn per_query(&self, i: usize) -> PerQueryNeighbors<'a> {
        PerQueryNeighbors {
            source: Source::Live(self.make_per_query(i, false)),
            exclude_idx: None,
            limit: None,
            emitted: 0,
            finished: false,
        }
    }

    /// Per-query iteration with the query-level exclusion rules applied:
    /// self pairs dropped and nearest queries trimmed back to the requested
    /// count after searching for one extra neighbor.
    pub(crate) fn filtered_per_query(&self, i: usize) -> PerQueryNeighbors<'a> {
        let (exclude_idx, limit) = if self.exclude_ii() {
            (Some(i), self.requested_k())
        } else {
            (None, None)
        };
        PerQueryNeighbors {
            source: Source::Live(self.make_per_query(i, true)),
            exclude_idx,
            limit,
            emitted: 0,
            finished: false,
        }
    }
}

/// Applies `op` to every neighbor bond.
///
/// When `nlist` is given its bonds are used directly (the query arguments
/// are ignored); otherwise a live query runs over `query_points`. With
/// `parallel`, bonds of different queries may be visited concurrently, so
/// `op` must tolerate concurrent invocation; within one query the iterator
/// order is preserved.
pub fn loop_over_neighbors<F>(
    neighbor_query: &NeighborQuery<'_>,
    query_points: &[[f64; 3]],
    args: QueryArgs,
    nlist: Option<&NeighborList>,
    parallel: bool,
    op: F,
) -> Result<(), Error>
where
    F: Fn(NeighborBond) + Sync,
{
    if let Some(nlist) = nlist {
        for_loop_wrapper(parallel, nlist.num_bonds(), |b| op(nlist.bond(b)));
        return Ok(());
    }
    let iter = neighbor_query.query(query_points, args)?;
    for_loop_wrapper(parallel, query_points.len(), |i| {
        let mut it = iter.filtered_per_query(i);
        while let Some(nb) = it.next() {
            op(nb);
        }
    });
    Ok(())
}

/// Invokes `op` once per query point with an iterator over that query's
/// neighbors, allowing per-query pre- and post-processing (counting,
/// normalization). One query per task under `parallel`.
pub fn loop_over_neighbors_per_query<G>(
    neighbor_query: &NeighborQuery<'_>,
    query_points: &[[f64; 3]],
    args: QueryArgs,
    nlist: Option<&NeighborList>,
    parallel: bool,
    op: G,
) -> Result<(), Error>
where
    G: Fn(usize, &mut PerQueryNeighbors<'_>) + Sync,
{
    let n = query_points.len();
    if let Some(nlist) = nlist {
        for_loop_wrapper(parallel, n, |i| {
            let mut it = nlist.per_query(i);
            op(i, &mut it);
        });
        return Ok(());
    }
    let iter = neighbor_query.query(query_points, args)?;
    for_loop_wrapper(parallel, n, |i| {
        let mut it = iter.filtered_per_query(i);
        op(i, &mut it);
    });
    Ok(())
}
