use crate::error::Error;

/// A parallelepipedal simulation box with optional periodicity along each axis.
///
/// The box is described by three lengths (`lx`, `ly`, `lz`) and three tilt
/// factors (`xy`, `xz`, `yz`) so that triclinic cells are supported. The
/// lattice vectors are
///
/// - a = (lx, 0, 0)
/// - b = (xy * ly, ly, 0)
/// - c = (xz * lz, yz * lz, lz)
///
/// A 2D box treats all z coordinates as zero and reports (0, 0, 1) as its
/// third lattice vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicBox {
    lx: f64,
    ly: f64,
    lz: f64,
    xy: f64,
    xz: f64,
    yz: f64,
    periodic: [bool; 3],
    is_2d: bool,
}

impl PeriodicBox {
    /// Creates a triclinic 3D box, periodic along every axis.
    pub fn new(lx: f64, ly: f64, lz: f64, xy: f64, xz: f64, yz: f64) -> Self {
        Self {
            lx,
            ly,
            lz,
            xy,
            xz,
            yz,
            periodic: [true, true, true],
            is_2d: false,
        }
    }

    /// Creates an orthorhombic 3D box, periodic along every axis.
    pub fn from_lengths(lx: f64, ly: f64, lz: f64) -> Self {
        Self::new(lx, ly, lz, 0.0, 0.0, 0.0)
    }

    /// Creates a cubic box with side length `l`, periodic along every axis.
    pub fn cube(l: f64) -> Self {
        Self::from_lengths(l, l, l)
    }

    /// Creates a 2D box with side lengths `lx` and `ly`, periodic in the
    /// plane. The z axis is never periodic in 2D.
    pub fn rect(lx: f64, ly: f64) -> Self {
        Self {
            lx,
            ly,
            lz: 0.0,
            xy: 0.0,
            xz: 0.0,
            yz: 0.0,
            periodic: [true, true, false],
            is_2d: true,
        }
    }

    /// Creates a square 2D box with side length `l`.
    pub fn square(l: f64) -> Self {
        Self::rect(l, l)
    }

    /// Returns the same box with the given periodicity flags. The z flag is
    /// forced to `false` for 2D boxes.
    pub fn with_periodic(mut self, periodic: [bool; 3]) -> Self {
        self.periodic = periodic;
        if self.is_2d {
            self.periodic[2] = false;
        }
        self
    }

    /// Periodicity flags, one per axis.
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Whether this box is two-dimensional.
    pub fn is_2d(&self) -> bool {
        self.is_2d
    }

    /// Box side lengths.
    pub fn lengths(&self) -> [f64; 3] {
        [self.lx, self.ly, self.lz]
    }

    /// Tilt factors (xy, xz, yz).
    pub fn tilts(&self) -> [f64; 3] {
        [self.xy, self.xz, self.yz]
    }

    /// The i-th lattice vector, i in {0, 1, 2}. For a 2D box the third
    /// lattice vector is reported as (0, 0, 1).
    pub fn lattice_vector(&self, i: usize) -> [f64; 3] {
        match i {
            0 => [self.lx, 0.0, 0.0],
            1 => [self.xy * self.ly, self.ly, 0.0],
            2 => {
                if self.is_2d {
                    [0.0, 0.0, 1.0]
                } else {
                    [self.xz * self.lz, self.yz * self.lz, self.lz]
                }
            }
            _ => panic!("lattice vector index must be 0, 1, or 2"),
        }
    }

    /// Box volume (area for 2D boxes).
    pub fn volume(&self) -> f64 {
        if self.is_2d {
            self.lx * self.ly
        } else {
            self.lx * self.ly * self.lz
        }
    }

    /// Distance between the two opposing faces of the box along each axis.
    pub fn nearest_plane_distance(&self) -> [f64; 3] {
        let t = self.xy * self.yz - self.xz;
        [
            self.lx / (1.0 + self.xy * self.xy + t * t).sqrt(),
            self.ly / (1.0 + self.yz * self.yz).sqrt(),
            self.lz,
        ]
    }

    /// The smallest plane distance, ignoring z for 2D boxes.
    pub fn min_plane_distance(&self) -> f64 {
        let d = self.nearest_plane_distance();
        if self.is_2d {
            d[0].min(d[1])
        } else {
            d[0].min(d[1]).min(d[2])
        }
    }

    /// Converts a displacement to fractional lattice coordinates.
    pub fn make_fractional(&self, v: [f64; 3]) -> [f64; 3] {
        let fz = if self.is_2d { 0.0 } else { v[2] / self.lz };
        let fy = (v[1] - self.yz * v[2]) / self.ly;
        let fx = (v[0] - self.xy * (v[1] - self.yz * v[2]) - self.xz * v[2]) / self.lx;
        [fx, fy, fz]
    }

    /// Converts fractional lattice coordinates back to a displacement.
    pub fn make_absolute(&self, f: [f64; 3]) -> [f64; 3] {
        let x = f[0] * self.lx + f[1] * self.xy * self.ly + f[2] * self.xz * self.lz;
        let y = f[1] * self.ly + f[2] * self.yz * self.lz;
        let z = if self.is_2d { 0.0 } else { f[2] * self.lz };
        [x, y, z]
    }

    /// Applies the minimum image convention to a displacement: subtracts the
    /// integer combination of lattice vectors that minimizes its length,
    /// considering only periodic axes. In 2D the z component is zeroed.
    pub fn wrap(&self, v: [f64; 3]) -> [f64; 3] {
        let mut v = v;
        if self.is_2d {
            v[2] = 0.0;
        }
        let mut f = self.make_fractional(v);
        for axis in 0..3 {
            if self.periodic[axis] {
                f[axis] -= f[axis].round();
            }
        }
        self.make_absolute(f)
    }

    /// Enumerates the periodic shift vectors that a query with cutoff
    /// `r_max` has to examine: one shift per combination of {-1, 0, +1}
    /// along each periodic axis, 3^d in total, the zero shift first.
    ///
    /// Fails with [`Error::BoxTooSmall`] when some periodic plane distance
    /// is at most `2 * r_max`, since a single layer of images no longer
    /// guarantees minimum-image correctness at that cutoff.
    pub fn image_vectors(&self, r_max: f64) -> Result<Vec<[f64; 3]>, Error> {
        let plane = self.nearest_plane_distance();
        for axis in 0..3 {
            if axis == 2 && self.is_2d {
                continue;
            }
            if self.periodic[axis] && plane[axis] <= 2.0 * r_max {
                return Err(Error::BoxTooSmall {
                    r_max,
                    plane_distance: plane[axis],
                    axis,
                });
            }
        }
        Ok(self.unchecked_image_vectors())
    }

    /// Image enumeration without the cutoff check. Used internally by the
    /// nearest-neighbor iterator, whose radius growth is already capped at
    /// half the minimum plane distance.
    pub(crate) fn unchecked_image_vectors(&self) -> Vec<[f64; 3]> {
        let [px, py, pz] = self.periodic;
        let pz = pz && !self.is_2d;

        let n_dim_periodic = px as usize + py as usize + pz as usize;
        let n_images = 3usize.pow(n_dim_periodic as u32);

        let a = self.lattice_vector(0);
        let b = self.lattice_vector(1);
        let c = if self.is_2d {
            [0.0, 0.0, 0.0]
        } else {
            self.lattice_vector(2)
        };

        let mut images = Vec::with_capacity(n_images);
        images.push([0.0, 0.0, 0.0]);
        for i in -1i32..=1 {
            if i != 0 && !px {
                continue;
            }
            for j in -1i32..=1 {
                if j != 0 && !py {
                    continue;
                }
                for k in -1i32..=1 {
                    if k != 0 && !pz {
                        continue;
                    }
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    let (fi, fj, fk) = (f64::from(i), f64::from(j), f64::from(k));
                    images.push([
                        fi * a[0] + fj * b[0] + fk * c[0],
                        fi * a[1] + fj * b[1] + fk * c[1],
                        fi * a[2] + fj * b[2] + fk * c[2],
                    ]);
                }
            }
        }
        debug_assert_eq!(images.len(), n_images);
        images
    }
}
