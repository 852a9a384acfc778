use vicinity::{Error, NeighborList};

fn ten_bond_list() -> NeighborList {
    // Two bonds for each of five queries, distances 0.1 .. 1.0.
    let query_point_index = [0, 0, 1, 1, 2, 2, 3, 3, 4, 4];
    let point_index = [1, 2, 0, 3, 4, 0, 1, 2, 3, 0];
    let distances: Vec<f64> = (1..=10).map(|i| i as f64 / 10.0).collect();
    NeighborList::from_arrays(&query_point_index, &point_index, &distances, None, 5, 5).unwrap()
}

#[test]
fn test_from_arrays() {
    let nlist = ten_bond_list();
    assert_eq!(nlist.num_bonds(), 10);
    assert_eq!(nlist.num_query_points(), 5);
    assert_eq!(nlist.num_points(), 5);
    assert_eq!(nlist.counts(), &[2, 2, 2, 2, 2]);
    assert_eq!(nlist.segments(), &[0, 2, 4, 6, 8]);
    assert!(nlist.weights().iter().all(|&w| w == 1.0), "implicit weights");

    let weights = vec![4.0; 5];
    let nlist = NeighborList::from_arrays(
        &[0, 0, 1, 2, 3],
        &[1, 2, 3, 0, 0],
        &[1.0; 5],
        Some(&weights),
        4,
        4,
    )
    .unwrap();
    assert!(nlist.weights().iter().all(|&w| w == 4.0));
}

#[test]
fn test_from_arrays_validation() {
    let query_point_index = [0, 0, 1, 2, 3];
    let point_index = [1, 2, 3, 0, 0];
    let distances = [1.0; 5];

    // Too few query points declared.
    assert!(matches!(
        NeighborList::from_arrays(&query_point_index, &point_index, &distances, None, 3, 4),
        Err(Error::IndexOutOfRange { index: 3, size: 3 })
    ));

    // Too few points declared.
    assert!(matches!(
        NeighborList::from_arrays(&query_point_index, &point_index, &distances, None, 4, 3),
        Err(Error::IndexOutOfRange { index: 3, size: 3 })
    ));

    // Query indices out of order.
    assert!(matches!(
        NeighborList::from_arrays(&point_index, &query_point_index, &distances, None, 4, 4),
        Err(Error::Unsorted)
    ));

    // Mismatched array lengths.
    assert!(matches!(
        NeighborList::from_arrays(&query_point_index[..4], &point_index, &distances, None, 4, 4),
        Err(Error::MismatchedArrayLengths)
    ));
    let short_weights = [1.0; 4];
    assert!(matches!(
        NeighborList::from_arrays(
            &query_point_index,
            &point_index,
            &distances,
            Some(&short_weights),
            4,
            4
        ),
        Err(Error::MismatchedArrayLengths)
    ));
}

#[test]
fn test_find_first_index() {
    let nlist = NeighborList::from_arrays(
        &[0, 0, 2, 2, 2, 4],
        &[1, 2, 0, 1, 3, 0],
        &[1.0; 6],
        None,
        5,
        5,
    )
    .unwrap();

    assert_eq!(nlist.find_first_index(0), 0);
    assert_eq!(nlist.find_first_index(2), 2);
    assert_eq!(nlist.find_first_index(4), 5);
    // Queries without bonds get their insertion point.
    assert_eq!(nlist.find_first_index(1), 2);
    assert_eq!(nlist.find_first_index(3), 5);

    // Every bond index is at or after the first index of its query.
    for (b, n) in nlist.neighbors().iter().enumerate() {
        assert!(nlist.find_first_index(n[0]) <= b);
    }
}

#[test]
fn test_filter() {
    let mut nlist = ten_bond_list();
    // Keep bonds with an even point index.
    let mask: Vec<bool> = nlist.neighbors().iter().map(|n| n[1] % 2 == 0).collect();
    let kept = mask.iter().filter(|&&m| m).count();

    let delta = nlist.filter(&mask).unwrap();
    assert_eq!(delta, kept as isize - 10);
    assert_eq!(nlist.num_bonds(), kept);
    assert!(nlist.neighbors().iter().all(|n| n[1] % 2 == 0));

    // Query indices stay sorted and the bookkeeping follows.
    for b in 1..nlist.num_bonds() {
        assert!(nlist.neighbors()[b - 1][0] <= nlist.neighbors()[b][0]);
    }
    let total: usize = nlist.counts().iter().sum();
    assert_eq!(total, nlist.num_bonds());

    // A wrong-sized mask is rejected.
    assert!(matches!(
        nlist.filter(&[true]),
        Err(Error::MismatchedArrayLengths)
    ));
}

#[test]
fn test_filter_r() {
    let mut nlist = ten_bond_list();
    let delta = nlist.filter_r(0.25, 0.75);

    // Distances 0.3, 0.4, 0.5, 0.6, 0.7 survive; the bounds are strict.
    assert_eq!(delta, -5);
    assert_eq!(nlist.num_bonds(), 5);
    for &d in nlist.distances() {
        assert!(d > 0.25 && d < 0.75, "distance {d} escaped the filter");
    }
    for b in 1..nlist.num_bonds() {
        assert!(nlist.neighbors()[b - 1][0] <= nlist.neighbors()[b][0]);
    }

    // Filters compose.
    let delta = nlist.filter_r(0.0, 0.45);
    assert_eq!(delta, -3);
    assert_eq!(nlist.num_bonds(), 2);
}

#[test]
fn test_resize() {
    let mut nlist = ten_bond_list();
    nlist.resize(3, false);
    assert_eq!(nlist.num_bonds(), 3);
    // The surviving prefix is intact.
    assert_eq!(nlist.neighbors()[0], [0, 1]);
    assert!((nlist.distances()[2] - 0.3).abs() < 1e-12);

    nlist.resize(5, true);
    assert_eq!(nlist.num_bonds(), 5);
    assert!(nlist.distances().iter().all(|&d| d == 0.0));
    assert!(nlist.neighbors().iter().all(|&n| n == [0, 0]));
}

#[test]
fn test_validate() {
    let nlist = ten_bond_list();
    assert!(nlist.validate(5, 5).is_ok());
    assert!(matches!(
        nlist.validate(6, 5),
        Err(Error::Inconsistent { .. })
    ));
    assert!(matches!(
        nlist.validate(5, 4),
        Err(Error::Inconsistent { .. })
    ));
}

#[test]
fn test_weights_are_writable() {
    let mut nlist = ten_bond_list();
    nlist.weights_mut()[3] = 3.0;
    assert_eq!(nlist.weights()[3], 3.0);
    assert_eq!(nlist.weights()[2], 1.0);
}

#[test]
fn test_per_query_cursor() {
    let nlist = NeighborList::from_arrays(
        &[0, 0, 2, 2, 2],
        &[1, 2, 0, 1, 3],
        &[0.5, 1.0, 0.25, 0.5, 0.75],
        None,
        4,
        4,
    )
    .unwrap();

    let bonds: Vec<_> = nlist.per_query(2).collect();
    assert_eq!(bonds.len(), 3);
    assert!(bonds.iter().all(|nb| nb.query_idx == 2));
    assert_eq!(bonds[0].point_idx, 0);
    assert!((bonds[0].distance - 0.25).abs() < 1e-12);

    // A query without bonds is exhausted immediately.
    let mut empty = nlist.per_query(1);
    assert!(!empty.end());
    assert!(empty.next().is_none());
    assert!(empty.end());

    // So is a query past the last stored index.
    assert_eq!(nlist.per_query(3).count(), 0);
}
