//! A **TriangleMesh** stores vertex positions, optional per-vertex
//! normals and texture coordinates, and an index buffer with three
//! vertex indices per triangle. The accelerator only ever refers to
//! triangles by their index into that buffer.

// std
use std::mem;
// others
use thiserror::Error;
// octree
use crate::core::geometry::{bnd3_union_bnd3f, bnd3_union_pnt3f};
use crate::core::geometry::{pnt3_permutef, vec3_max_componentf, vec3_max_dimensionf, vec3_permutef};
use crate::core::geometry::{Bounds3f, Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::pbrt::gamma;
use crate::core::pbrt::Float;

// see triangle.h

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("index buffer length {0} is not a multiple of 3")]
    IndexCount(usize),
    #[error("vertex index {index} out of range ({n_vertices} vertices)")]
    VertexIndex { index: usize, n_vertices: usize },
    #[error("{what} buffer has {found} entries, expected {expected}")]
    BufferLength {
        what: &'static str,
        found: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    /// the total number of triangles in the mesh
    pub n_triangles: usize,
    /// vector of vertex indices
    pub vertex_indices: Vec<usize>,
    /// the total number of vertices in the mesh
    pub n_vertices: usize,
    /// vector of *n_vertices* vertex positions
    pub p: Vec<Point3f>,
    /// an optional vector of normal vectors (can be empty)
    pub n: Vec<Normal3f>,
    /// an optional vector of paramtric (u, v) values (texture coordinates)
    pub uv: Vec<Point2f>,
    bounds: Bounds3f,
}

impl TriangleMesh {
    pub fn new(
        vertex_indices: Vec<usize>,
        p: Vec<Point3f>,
        n: Vec<Normal3f>,
        uv: Vec<Point2f>,
    ) -> Result<Self, MeshError> {
        if vertex_indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(vertex_indices.len()));
        }
        let n_vertices: usize = p.len();
        if let Some(&index) = vertex_indices.iter().find(|&&i| i >= n_vertices) {
            return Err(MeshError::VertexIndex { index, n_vertices });
        }
        if !n.is_empty() && n.len() != n_vertices {
            return Err(MeshError::BufferLength {
                what: "normal",
                found: n.len(),
                expected: n_vertices,
            });
        }
        if !uv.is_empty() && uv.len() != n_vertices {
            return Err(MeshError::BufferLength {
                what: "uv",
                found: uv.len(),
                expected: n_vertices,
            });
        }
        let mut mesh = TriangleMesh {
            n_triangles: vertex_indices.len() / 3,
            vertex_indices,
            n_vertices,
            p,
            n,
            uv,
            bounds: Bounds3f::default(),
        };
        // only referenced vertices contribute to the world bound
        let mut bounds: Bounds3f = Bounds3f::default();
        for i in 0..mesh.n_triangles {
            bounds = bnd3_union_bnd3f(&bounds, &mesh.triangle_bound(i));
        }
        mesh.bounds = bounds;
        Ok(mesh)
    }
    pub fn triangle_count(&self) -> usize {
        self.n_triangles
    }
    /// Bounds of all triangles; the (invalid) empty box for a mesh
    /// without triangles.
    pub fn world_bound(&self) -> Bounds3f {
        self.bounds
    }
    pub fn has_normals(&self) -> bool {
        !self.n.is_empty()
    }
    pub fn has_uvs(&self) -> bool {
        !self.uv.is_empty()
    }
    pub fn vertices(&self, triangle: usize) -> [usize; 3] {
        [
            self.vertex_indices[triangle * 3],
            self.vertex_indices[triangle * 3 + 1],
            self.vertex_indices[triangle * 3 + 2],
        ]
    }
    pub fn triangle_bound(&self, triangle: usize) -> Bounds3f {
        let [i0, i1, i2] = self.vertices(triangle);
        bnd3_union_pnt3f(&Bounds3f::new(self.p[i0], self.p[i1]), &self.p[i2])
    }
    /// Watertight ray/triangle test. Returns the hit parameters
    /// *(u, v)* (the barycentric weights of the second and third
    /// vertex) and the ray parameter *t*. The ray is not modified;
    /// hits beyond *ray.t_max* are rejected.
    pub fn intersect_triangle(&self, triangle: usize, ray: &Ray) -> Option<(Float, Float, Float)> {
        // get triangle vertices in _p0_, _p1_, and _p2_
        let [i0, i1, i2] = self.vertices(triangle);
        let p0: Point3f = self.p[i0];
        let p1: Point3f = self.p[i1];
        let p2: Point3f = self.p[i2];
        // translate vertices based on ray origin
        let o: Vector3f = Vector3f::from(ray.o);
        let mut p0t: Point3f = p0 - o;
        let mut p1t: Point3f = p1 - o;
        let mut p2t: Point3f = p2 - o;
        // permute components of triangle vertices and ray direction
        let kz: usize = vec3_max_dimensionf(&ray.d.abs());
        let mut kx: usize = kz + 1;
        if kx == 3 {
            kx = 0;
        }
        let mut ky: usize = kx + 1;
        if ky == 3 {
            ky = 0;
        }
        let d: Vector3f = vec3_permutef(&ray.d, kx, ky, kz);
        p0t = pnt3_permutef(&p0t, kx, ky, kz);
        p1t = pnt3_permutef(&p1t, kx, ky, kz);
        p2t = pnt3_permutef(&p2t, kx, ky, kz);
        // apply shear transformation to translated vertex positions
        let sx: Float = -d.x / d.z;
        let sy: Float = -d.y / d.z;
        let sz: Float = 1.0 / d.z;
        p0t.x += sx * p0t.z;
        p0t.y += sy * p0t.z;
        p1t.x += sx * p1t.z;
        p1t.y += sy * p1t.z;
        p2t.x += sx * p2t.z;
        p2t.y += sy * p2t.z;
        // compute edge function coefficients _e0_, _e1_, and _e2_
        let mut e0: Float = p1t.x * p2t.y - p1t.y * p2t.x;
        let mut e1: Float = p2t.x * p0t.y - p2t.y * p0t.x;
        let mut e2: Float = p0t.x * p1t.y - p0t.y * p1t.x;
        // fall back to double precision test at triangle edges
        if mem::size_of::<Float>() == mem::size_of::<f32>() && (e0 == 0.0 || e1 == 0.0 || e2 == 0.0)
        {
            let p2txp1ty: f64 = p2t.x as f64 * p1t.y as f64;
            let p2typ1tx: f64 = p2t.y as f64 * p1t.x as f64;
            e0 = (p2typ1tx - p2txp1ty) as Float;
            let p0txp2ty = p0t.x as f64 * p2t.y as f64;
            let p0typ2tx = p0t.y as f64 * p2t.x as f64;
            e1 = (p0typ2tx - p0txp2ty) as Float;
            let p1txp0ty = p1t.x as f64 * p0t.y as f64;
            let p1typ0tx = p1t.y as f64 * p0t.x as f64;
            e2 = (p1typ0tx - p1txp0ty) as Float;
        }
        // perform triangle edge and determinant tests
        if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
            return None;
        }
        let det: Float = e0 + e1 + e2;
        if det == 0.0 {
            return None;
        }
        // compute scaled hit distance to triangle and test against ray $t$ range
        p0t.z *= sz;
        p1t.z *= sz;
        p2t.z *= sz;
        let t_scaled: Float = e0 * p0t.z + e1 * p1t.z + e2 * p2t.z;
        let t_max: Float = ray.t_max.get();
        if det < 0.0 && (t_scaled >= 0.0 || t_scaled < t_max * det) {
            return None;
        } else if det > 0.0 && (t_scaled <= 0.0 || t_scaled > t_max * det) {
            return None;
        }
        // compute barycentric coordinates and $t$ value for triangle intersection
        let inv_det: Float = 1.0 / det;
        let b1: Float = e1 * inv_det;
        let b2: Float = e2 * inv_det;
        let t: Float = t_scaled * inv_det;

        // ensure that computed triangle $t$ is conservatively greater than zero

        // compute $\delta_z$ term for triangle $t$ error bounds
        let max_zt: Float = vec3_max_componentf(
            &Vector3f {
                x: p0t.z,
                y: p1t.z,
                z: p2t.z,
            }
            .abs(),
        );
        let delta_z: Float = gamma(3_i32) * max_zt;
        // compute $\delta_x$ and $\delta_y$ terms for triangle $t$ error bounds
        let max_xt: Float = vec3_max_componentf(
            &Vector3f {
                x: p0t.x,
                y: p1t.x,
                z: p2t.x,
            }
            .abs(),
        );
        let max_yt: Float = vec3_max_componentf(
            &Vector3f {
                x: p0t.y,
                y: p1t.y,
                z: p2t.y,
            }
            .abs(),
        );
        let delta_x: Float = gamma(5) * (max_xt + max_zt);
        let delta_y: Float = gamma(5) * (max_yt + max_zt);
        // compute $\delta_e$ term for triangle $t$ error bounds
        let delta_e: Float =
            2.0 * (gamma(2) * max_xt * max_yt + delta_y * max_xt + delta_x * max_yt);
        // compute $\delta_t$ term for triangle $t$ error bounds and check _t_
        let max_e: Float = vec3_max_componentf(
            &Vector3f {
                x: e0,
                y: e1,
                z: e2,
            }
            .abs(),
        );
        let delta_t: Float =
            3.0 * (gamma(3) * max_e * max_zt + delta_e * max_zt + delta_z * max_e) * inv_det.abs();
        if t <= delta_t {
            return None;
        }
        Some((b1, b2, t))
    }
}
