//! Almost all nontrivial graphics programs are built on a foundation
//! of geometric classes. These classes represent mathematical
//! constructs like points, vectors, and rays.
//!
//! # Points, Vectors and Normals
//!
//! A **point** is a zero-dimensional location in 3D space, a
//! **vector** represents a direction. Although the same x, y, z
//! representation is used for both, subtracting two points gives a
//! vector, adding a vector to a point gives a point, and so on.
//! Surface **normals** are kept as a separate type because they are
//! defined in terms of their relationship to a surface.
//!
//! ```rust
//! use rs_octree::core::geometry::{Point3f, Vector3f};
//!
//!     let origin = Point3f {
//!         x: 0.0,
//!         y: 0.0,
//!         z: 0.0,
//!     };
//!     let up = Vector3f {
//!         x: 0.0,
//!         y: 1.0,
//!         z: 0.0,
//!     };
//!
//!     println!("{:?}", origin + up);
//! ```
//!
//! # Rays
//!
//! A **ray** is a semi-infinite line specified by its origin and
//! direction. The parametric end point *t_max* lives in a **Cell**,
//! so intersection routines can shorten the ray without needing a
//! mutable borrow of everything else.
//!
//! ```rust
//! use rs_octree::core::geometry::{Point3f, Ray, Vector3f};
//!
//!     let ray = Ray::new(
//!         Point3f {
//!             x: -5.5,
//!             y: 2.75,
//!             z: 0.0,
//!         },
//!         Vector3f {
//!             x: 1.0,
//!             y: -8.75,
//!             z: 2.25,
//!         },
//!     );
//!     assert!(ray.t_max.get().is_infinite());
//! ```
//!
//! # Bounding Boxes
//!
//! The octree is built from axis-aligned **Bounds3f** regions. Eight
//! child regions of a node are spanned by the center of the parent
//! and one of its eight corners.
//!
//! ```rust
//! use rs_octree::core::geometry::{Bounds3f, Point3f};
//!
//!     let unit_cube = Bounds3f::new(
//!         Point3f {
//!             x: 0.0,
//!             y: 0.0,
//!             z: 0.0,
//!         },
//!         Point3f {
//!             x: 1.0,
//!             y: 1.0,
//!             z: 1.0,
//!         },
//!     );
//!
//!     assert_eq!(unit_cube.volume(), 1.0);
//!     println!("{:?}", unit_cube.center());
//! ```

// std
use std::cell::Cell;
use std::ops;
use std::ops::Index;
// others
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
// octree
use crate::core::pbrt::gamma;
use crate::core::pbrt::Float;

// see geometry.h

#[derive(EnumIter, Debug, Copy, Clone)]
#[repr(u8)]
pub enum MinMaxEnum {
    Min = 0,
    Max = 1,
}

#[derive(EnumIter, Debug, Copy, Clone)]
#[repr(u8)]
pub enum XYZEnum {
    X = 0,
    Y = 1,
    Z = 2,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vector3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Vector3f {
    pub fn abs(&self) -> Vector3f {
        Vector3f {
            x: self.x.abs(),
            y: self.y.abs(),
            z: self.z.abs(),
        }
    }
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    /// Compute a new vector pointing in the same direction but with unit
    /// length.
    pub fn normalize(&self) -> Vector3f {
        *self / self.length()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point2f {
    pub x: Float,
    pub y: Float,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Point3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Normal3f {
    pub x: Float,
    pub y: Float,
    pub z: Float,
}

impl Normal3f {
    pub fn length_squared(&self) -> Float {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
    pub fn length(&self) -> Float {
        self.length_squared().sqrt()
    }
    /// Compute a new normal pointing in the same direction but with unit
    /// length.
    pub fn normalize(&self) -> Normal3f {
        *self / self.length()
    }
}

impl_op!(-|a: Vector3f| -> Vector3f {
    Vector3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op!(-|a: Normal3f| -> Normal3f {
    Normal3f {
        x: -a.x,
        y: -a.y,
        z: -a.z,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Point3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(+|a: &Point2f, b: &Point2f| -> Point2f {
    Point2f {
        x: a.x + b.x,
        y: a.y + b.y,
    }
});

impl_op_ex!(+|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(+|a: &Normal3f, b: &Normal3f| -> Normal3f {
    Normal3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Vector3f, b: &Vector3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(+|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x + b.x,
        y: a.y + b.y,
        z: a.z + b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Point3f| -> Vector3f {
    Vector3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(-|a: &Point3f, b: &Vector3f| -> Point3f {
    Point3f {
        x: a.x - b.x,
        y: a.y - b.y,
        z: a.z - b.z,
    }
});

impl_op_ex!(*|a: &Point2f, b: Float| -> Point2f {
    Point2f {
        x: a.x * b,
        y: a.y * b,
    }
});

impl_op_ex!(*|a: &Point3f, b: Float| -> Point3f {
    Point3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(*|a: &Normal3f, b: Float| -> Normal3f {
    Normal3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(*|a: &Vector3f, b: Float| -> Vector3f {
    Vector3f {
        x: a.x * b,
        y: a.y * b,
        z: a.z * b,
    }
});

impl_op_ex!(/|a: &Point3f, b: Float| -> Point3f {
    assert_ne!(b, 0.0 as Float);
    let inv: Float = 1.0 as Float / b;
    Point3f {
        x: a.x * inv,
        y: a.y * inv,
        z: a.z * inv,
    }
});

impl_op_ex!(/|a: &Vector3f, b: Float| -> Vector3f {
    let inv: Float = 1.0 as Float / b;
    Vector3f {
        x: a.x * inv,
        y: a.y * inv,
        z: a.z * inv,
    }
});

impl_op_ex!(/|a: &Normal3f, b: Float| -> Normal3f {
    let inv: Float = 1.0 as Float / b;
    Normal3f {
        x: a.x * inv,
        y: a.y * inv,
        z: a.z * inv,
    }
});

impl Index<XYZEnum> for Vector3f {
    type Output = Float;
    fn index(&self, index: XYZEnum) -> &Float {
        match index {
            XYZEnum::X => &self.x,
            XYZEnum::Y => &self.y,
            _ => &self.z,
        }
    }
}

impl Index<XYZEnum> for Point3f {
    type Output = Float;
    fn index(&self, index: XYZEnum) -> &Float {
        match index {
            XYZEnum::X => &self.x,
            XYZEnum::Y => &self.y,
            _ => &self.z,
        }
    }
}

impl From<Point3f> for Vector3f {
    fn from(p: Point3f) -> Self {
        Vector3f {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

impl From<Normal3f> for Vector3f {
    fn from(n: Normal3f) -> Self {
        Vector3f {
            x: n.x,
            y: n.y,
            z: n.z,
        }
    }
}

impl From<Vector3f> for Normal3f {
    fn from(v: Vector3f) -> Self {
        Normal3f {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Given two vectors in 3D, the cross product is a vector that is
/// perpendicular to both of them.
pub fn vec3_cross_vec3(v1: &Vector3f, v2: &Vector3f) -> Vector3f {
    let v1x: f64 = v1.x as f64;
    let v1y: f64 = v1.y as f64;
    let v1z: f64 = v1.z as f64;
    let v2x: f64 = v2.x as f64;
    let v2y: f64 = v2.y as f64;
    let v2z: f64 = v2.z as f64;
    Vector3f {
        x: ((v1y * v2z) - (v1z * v2y)) as Float,
        y: ((v1z * v2x) - (v1x * v2z)) as Float,
        z: ((v1x * v2y) - (v1y * v2x)) as Float,
    }
}

/// Return the largest coordinate value.
pub fn vec3_max_componentf(v: &Vector3f) -> Float {
    v.x.max(v.y.max(v.z))
}

/// Return the index of the component with the largest value.
pub fn vec3_max_dimensionf(v: &Vector3f) -> usize {
    if v.x > v.y {
        if v.x > v.z {
            0_usize
        } else {
            2_usize
        }
    } else if v.y > v.z {
        1_usize
    } else {
        2_usize
    }
}

/// Permute the coordinate values according to the povided
/// permutation.
pub fn vec3_permutef(v: &Vector3f, x: usize, y: usize, z: usize) -> Vector3f {
    let v3: Vec<Float> = vec![v.x, v.y, v.z];
    let xp: Float = v3[x];
    let yp: Float = v3[y];
    let zp: Float = v3[z];
    Vector3f {
        x: xp,
        y: yp,
        z: zp,
    }
}

/// Permute the coordinate values according to the povided
/// permutation.
pub fn pnt3_permutef(v: &Point3f, x: usize, y: usize, z: usize) -> Point3f {
    let v3: Vec<Float> = vec![v.x, v.y, v.z];
    let xp: Float = v3[x];
    let yp: Float = v3[y];
    let zp: Float = v3[z];
    Point3f {
        x: xp,
        y: yp,
        z: zp,
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f,
}

// work around bug
// https://github.com/rust-lang/rust/issues/40395
impl Default for Bounds3f {
    fn default() -> Bounds3f {
        let min_num: Float = std::f32::MIN;
        let max_num: Float = std::f32::MAX;
        // Bounds3f
        Bounds3f {
            p_min: Point3f {
                x: max_num,
                y: max_num,
                z: max_num,
            },
            p_max: Point3f {
                x: min_num,
                y: min_num,
                z: min_num,
            },
        }
    }
}

impl Bounds3f {
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        let p_min: Point3f = Point3f {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            z: p1.z.min(p2.z),
        };
        let p_max: Point3f = Point3f {
            x: p1.x.max(p2.x),
            y: p1.y.max(p2.y),
            z: p1.z.max(p2.z),
        };
        Bounds3f { p_min, p_max }
    }
    /// Bit 0 of *corner* selects x, bit 1 selects y, bit 2 selects
    /// z; a cleared bit picks the minimum, a set bit the maximum.
    pub fn corner(&self, corner: u8) -> Point3f {
        assert!(corner < 8_u8);
        let x: Float = if corner & 1 == 0 {
            self.p_min.x
        } else {
            self.p_max.x
        };
        let y: Float = if corner & 2 == 0 {
            self.p_min.y
        } else {
            self.p_max.y
        };
        let z: Float = if corner & 4 == 0 {
            self.p_min.z
        } else {
            self.p_max.z
        };
        Point3f { x, y, z }
    }
    pub fn center(&self) -> Point3f {
        (self.p_min + self.p_max) * 0.5 as Float
    }
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }
    /// False for the empty default box, for boxes with NaN
    /// coordinates, and whenever *p_min* exceeds *p_max* on any axis.
    pub fn is_valid(&self) -> bool {
        self.p_min.x <= self.p_max.x && self.p_min.y <= self.p_max.y && self.p_min.z <= self.p_max.z
    }
    pub fn volume(&self) -> Float {
        if !self.is_valid() {
            return 0.0 as Float;
        }
        let d: Vector3f = self.diagonal();
        d.x * d.y * d.z
    }
    /// Two boxes overlap if their extents overlap on all three axes.
    /// With *inclusive* set, touching faces count as overlap. Invalid
    /// boxes never overlap anything.
    pub fn overlaps(&self, other: &Bounds3f, inclusive: bool) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        for i in XYZEnum::iter() {
            if inclusive {
                if other.p_min[i] > self.p_max[i] || other.p_max[i] < self.p_min[i] {
                    return false;
                }
            } else if other.p_min[i] >= self.p_max[i] || other.p_max[i] <= self.p_min[i] {
                return false;
            }
        }
        true
    }
    /// Minimum distance from *p* to the box; zero if *p* is inside.
    pub fn distance_to(&self, p: &Point3f) -> Float {
        pnt3_distance_squared_bnd3(p, self).sqrt()
    }
    pub fn inside(&self, p: &Point3f) -> bool {
        pnt3_inside_bnd3(p, self)
    }
    /// Slab test against the ray segment `[0, t_max]`. Axes along
    /// which the ray does not move only check that the origin lies
    /// within the slab, so rays running inside a face are kept.
    pub fn intersect_p(&self, ray: &Ray, inv_dir: &Vector3f, dir_is_neg: &[u8; 3]) -> bool {
        let mut t_min: Float = std::f32::NEG_INFINITY;
        let mut t_max: Float = std::f32::INFINITY;
        for (axis, i) in XYZEnum::iter().enumerate() {
            if ray.d[i] == 0.0 as Float {
                if ray.o[i] < self.p_min[i] || ray.o[i] > self.p_max[i] {
                    return false;
                }
                continue;
            }
            let (near, far) = match dir_is_neg[axis] {
                0 => (MinMaxEnum::Min, MinMaxEnum::Max),
                _ => (MinMaxEnum::Max, MinMaxEnum::Min),
            };
            let t_near: Float = (self[near][i] - ray.o[i]) * inv_dir[i];
            let mut t_far: Float = (self[far][i] - ray.o[i]) * inv_dir[i];
            // update _t_far_ to ensure robust bounds intersection
            t_far *= 1.0 + 2.0 * gamma(3_i32);
            if t_min > t_far || t_near > t_max {
                return false;
            }
            if t_near > t_min {
                t_min = t_near;
            }
            if t_far < t_max {
                t_max = t_far;
            }
        }
        (t_min < ray.t_max.get()) && (t_max > 0.0)
    }
}

impl Index<MinMaxEnum> for Bounds3f {
    type Output = Point3f;
    fn index(&self, i: MinMaxEnum) -> &Point3f {
        match i {
            MinMaxEnum::Min => &self.p_min,
            _ => &self.p_max,
        }
    }
}

/// Minimum squared distance from point to box; returns zero if point
/// is inside.
pub fn pnt3_distance_squared_bnd3(p: &Point3f, b: &Bounds3f) -> Float {
    let dx: Float = (b.p_min.x - p.x).max(0.0 as Float).max(p.x - b.p_max.x);
    let dy: Float = (b.p_min.y - p.y).max(0.0 as Float).max(p.y - b.p_max.y);
    let dz: Float = (b.p_min.z - p.z).max(0.0 as Float).max(p.z - b.p_max.z);
    dx * dx + dy * dy + dz * dz
}

/// Given a bounding box and a point, the **bnd3_union_pnt3()**
/// function returns a new bounding box that encompasses that point as
/// well as the original box.
pub fn bnd3_union_pnt3f(b: &Bounds3f, p: &Point3f) -> Bounds3f {
    let p_min: Point3f = Point3f {
        x: b.p_min.x.min(p.x),
        y: b.p_min.y.min(p.y),
        z: b.p_min.z.min(p.z),
    };
    let p_max: Point3f = Point3f {
        x: b.p_max.x.max(p.x),
        y: b.p_max.y.max(p.y),
        z: b.p_max.z.max(p.z),
    };
    Bounds3f { p_min, p_max }
}

/// Construct a new box that bounds the space encompassed by two other
/// bounding boxes.
pub fn bnd3_union_bnd3f(b1: &Bounds3f, b2: &Bounds3f) -> Bounds3f {
    let p_min: Point3f = Point3f {
        x: b1.p_min.x.min(b2.p_min.x),
        y: b1.p_min.y.min(b2.p_min.y),
        z: b1.p_min.z.min(b2.p_min.z),
    };
    let p_max: Point3f = Point3f {
        x: b1.p_max.x.max(b2.p_max.x),
        y: b1.p_max.y.max(b2.p_max.y),
        z: b1.p_max.z.max(b2.p_max.z),
    };
    Bounds3f { p_min, p_max }
}

/// Determine if a given point is inside the bounding box.
pub fn pnt3_inside_bnd3(p: &Point3f, b: &Bounds3f) -> bool {
    p.x >= b.p_min.x
        && p.x <= b.p_max.x
        && p.y >= b.p_min.y
        && p.y <= b.p_max.y
        && p.z >= b.p_min.z
        && p.z <= b.p_max.z
}

/// Returns true if *inner* lies completely within *outer*.
pub fn bnd3_inside_bnd3(inner: &Bounds3f, outer: &Bounds3f) -> bool {
    pnt3_inside_bnd3(&inner.p_min, outer) && pnt3_inside_bnd3(&inner.p_max, outer)
}

#[derive(Debug, Default, Clone)]
pub struct Ray {
    /// origin
    pub o: Point3f,
    /// direction
    pub d: Vector3f,
    /// limits the ray to a segment along its infinite extent
    pub t_max: Cell<Float>,
}

impl Ray {
    pub fn new(o: Point3f, d: Vector3f) -> Self {
        Ray {
            o,
            d,
            t_max: Cell::new(std::f32::INFINITY),
        }
    }
    /// Reciprocal direction and per axis sign, as used by
    /// **Bounds3f::intersect_p()**.
    pub fn inv_dir(&self) -> (Vector3f, [u8; 3]) {
        let inv_dir: Vector3f = Vector3f {
            x: 1.0 / self.d.x,
            y: 1.0 / self.d.y,
            z: 1.0 / self.d.z,
        };
        let dir_is_neg: [u8; 3] = [
            (inv_dir.x < 0.0) as u8,
            (inv_dir.y < 0.0) as u8,
            (inv_dir.z < 0.0) as u8,
        ];
        (inv_dir, dir_is_neg)
    }
}
