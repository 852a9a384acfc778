use thiserror::Error;

/// Error type for all fallible operations in the crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The requested cutoff does not fit in the box: a single layer of
    /// periodic images is only guaranteed to be sufficient when every
    /// periodic plane distance exceeds twice the cutoff.
    #[error(
        "cutoff {r_max} is too large for this box: nearest plane distance \
         along axis {axis} is {plane_distance}"
    )]
    BoxTooSmall {
        r_max: f64,
        plane_distance: f64,
        axis: usize,
    },

    /// The query mode could not be inferred, or a required parameter is
    /// missing or out of its valid range.
    #[error("invalid query arguments: {0}")]
    InvalidQueryArgs(&'static str),

    /// A point or query index exceeds the declared bounds.
    #[error("index {index} is out of range for size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// Neighbor list construction received query indices that are not in
    /// non-decreasing order.
    #[error("query point indices must be sorted in non-decreasing order")]
    Unsorted,

    /// The operation is not implemented for this backend.
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),

    /// Parallel input arrays have different lengths.
    #[error("input arrays must all have the same length")]
    MismatchedArrayLengths,

    /// Stored bookkeeping does not match externally declared sizes.
    #[error("neighbor list declares {found} {what}, expected {expected}")]
    Inconsistent {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}
