use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vicinity::{Error, PeriodicBox};

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[test]
fn test_wrap_orthorhombic() {
    let sim_box = PeriodicBox::cube(10.0);

    let w = sim_box.wrap([6.0, 0.0, 0.0]);
    assert!((w[0] - (-4.0)).abs() < 1e-12, "Expected -4, got {}", w[0]);
    assert!(w[1].abs() < 1e-12);
    assert!(w[2].abs() < 1e-12);

    // Already-minimal displacements are untouched.
    let w = sim_box.wrap([3.0, -2.0, 4.9]);
    assert!((w[0] - 3.0).abs() < 1e-12);
    assert!((w[1] + 2.0).abs() < 1e-12);
    assert!((w[2] - 4.9).abs() < 1e-12);
}

#[test]
fn test_wrap_non_periodic() {
    let sim_box = PeriodicBox::cube(10.0).with_periodic([false, false, false]);
    let w = sim_box.wrap([6.0, -7.0, 8.0]);
    assert!((w[0] - 6.0).abs() < 1e-12);
    assert!((w[1] + 7.0).abs() < 1e-12);
    assert!((w[2] - 8.0).abs() < 1e-12);
}

#[test]
fn test_wrap_mixed_periodicity() {
    let sim_box = PeriodicBox::cube(10.0).with_periodic([true, false, true]);
    let w = sim_box.wrap([6.0, 6.0, 6.0]);
    assert!((w[0] + 4.0).abs() < 1e-12);
    assert!((w[1] - 6.0).abs() < 1e-12, "y is not periodic");
    assert!((w[2] + 4.0).abs() < 1e-12);
}

#[test]
fn test_wrap_triclinic() {
    // b = (5, 10, 0): a displacement of b plus a small remainder must wrap
    // back to the remainder.
    let sim_box = PeriodicBox::new(10.0, 10.0, 10.0, 0.5, 0.0, 0.0);
    let w = sim_box.wrap([5.2, 10.1, 0.0]);
    assert!((w[0] - 0.2).abs() < 1e-9, "got {:?}", w);
    assert!((w[1] - 0.1).abs() < 1e-9, "got {:?}", w);
    assert!(w[2].abs() < 1e-12);
}

#[test]
fn test_wrap_is_idempotent() {
    let boxes = [
        PeriodicBox::cube(10.0),
        PeriodicBox::new(8.0, 12.0, 5.0, 0.3, -0.2, 0.1),
        PeriodicBox::cube(10.0).with_periodic([true, false, true]),
    ];
    let mut rng = StdRng::seed_from_u64(7);
    for sim_box in boxes {
        for _ in 0..100 {
            let v = [
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-12.0..12.0),
                rng.gen_range(-5.0..5.0),
            ];
            let w = sim_box.wrap(v);
            let ww = sim_box.wrap(w);
            assert!(norm([w[0] - ww[0], w[1] - ww[1], w[2] - ww[2]]) < 1e-9);
            // The wrapped displacement differs from the input by a lattice
            // vector combination, so its fractional coordinates on periodic
            // axes lie in [-1/2, 1/2].
            let f = sim_box.make_fractional(w);
            for axis in 0..3 {
                if sim_box.periodic()[axis] {
                    assert!(f[axis].abs() <= 0.5 + 1e-9);
                }
            }
        }
    }
}

#[test]
fn test_2d_box() {
    let sim_box = PeriodicBox::square(10.0);
    assert!(sim_box.is_2d());
    assert_eq!(sim_box.periodic(), [true, true, false]);
    assert_eq!(sim_box.lattice_vector(2), [0.0, 0.0, 1.0]);

    // z components are zeroed on wrap.
    let w = sim_box.wrap([6.0, 0.0, 3.0]);
    assert!((w[0] + 4.0).abs() < 1e-12);
    assert!(w[2].abs() < 1e-12);

    // Area, not volume.
    assert!((sim_box.volume() - 100.0).abs() < 1e-12);
}

#[test]
fn test_nearest_plane_distance() {
    let sim_box = PeriodicBox::from_lengths(4.0, 5.0, 6.0);
    let d = sim_box.nearest_plane_distance();
    assert!((d[0] - 4.0).abs() < 1e-12);
    assert!((d[1] - 5.0).abs() < 1e-12);
    assert!((d[2] - 6.0).abs() < 1e-12);

    // Tilting shrinks the x plane distance: 10 / sqrt(1 + 0.25).
    let tilted = PeriodicBox::new(10.0, 10.0, 10.0, 0.5, 0.0, 0.0);
    let d = tilted.nearest_plane_distance();
    assert!((d[0] - 10.0 / 1.25f64.sqrt()).abs() < 1e-12);
    assert!((d[1] - 10.0).abs() < 1e-12);
    assert!((d[2] - 10.0).abs() < 1e-12);
}

#[test]
fn test_lattice_vectors() {
    let sim_box = PeriodicBox::new(10.0, 8.0, 6.0, 0.5, 0.25, -0.5);
    assert_eq!(sim_box.lattice_vector(0), [10.0, 0.0, 0.0]);
    assert_eq!(sim_box.lattice_vector(1), [4.0, 8.0, 0.0]);
    assert_eq!(sim_box.lattice_vector(2), [1.5, -3.0, 6.0]);
}

#[test]
fn test_fractional_round_trip() {
    let sim_box = PeriodicBox::new(8.0, 12.0, 5.0, 0.3, -0.2, 0.1);
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let v = [
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        ];
        let back = sim_box.make_absolute(sim_box.make_fractional(v));
        assert!(norm([v[0] - back[0], v[1] - back[1], v[2] - back[2]]) < 1e-9);
    }
}

#[test]
fn test_image_vectors_counts() {
    let sim_box = PeriodicBox::cube(10.0);
    let images = sim_box.image_vectors(1.0).unwrap();
    assert_eq!(images.len(), 27);
    assert_eq!(images[0], [0.0, 0.0, 0.0], "zero shift comes first");

    let partial = PeriodicBox::cube(10.0).with_periodic([true, false, false]);
    assert_eq!(partial.image_vectors(1.0).unwrap().len(), 3);

    let open = PeriodicBox::cube(10.0).with_periodic([false, false, false]);
    assert_eq!(open.image_vectors(1.0).unwrap().len(), 1);

    let flat = PeriodicBox::square(10.0);
    assert_eq!(flat.image_vectors(1.0).unwrap().len(), 9);
}

#[test]
fn test_image_vectors_box_too_small() {
    let sim_box = PeriodicBox::cube(1.0);
    match sim_box.image_vectors(0.6) {
        Err(Error::BoxTooSmall { r_max, .. }) => assert!((r_max - 0.6).abs() < 1e-12),
        other => panic!("Expected BoxTooSmall, got {:?}", other.map(|v| v.len())),
    }

    // A non-periodic axis never triggers the check.
    let open = PeriodicBox::cube(1.0).with_periodic([false, false, false]);
    assert!(open.image_vectors(0.6).is_ok());
}

#[test]
fn test_image_vectors_are_lattice_combinations() {
    let sim_box = PeriodicBox::new(10.0, 10.0, 10.0, 0.5, 0.0, 0.0);
    let images = sim_box.image_vectors(2.0).unwrap();
    assert_eq!(images.len(), 27);
    // Every shift must map to integer fractional coordinates.
    for shift in images {
        let f = sim_box.make_fractional(shift);
        for axis in 0..3 {
            assert!(
                (f[axis] - f[axis].round()).abs() < 1e-9,
                "shift {:?} has fractional coordinate {}",
                shift,
                f[axis]
            );
        }
    }
}
