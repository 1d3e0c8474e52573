//! The geometry of a particular point on a surface is represented by
//! a **HitRecord**. It is filled in by the accelerator once the
//! closest triangle along a ray is known, so the rest of a renderer
//! can shade the point without knowing anything about the mesh
//! layout.

// std
use std::fmt;
use std::sync::Arc;
// octree
use crate::core::geometry::{Normal3f, Point2f, Point3f};
use crate::core::mesh::TriangleMesh;
use crate::core::pbrt::Float;

// see interaction.h

#[derive(Clone)]
pub struct HitRecord {
    /// hit position
    pub p: Point3f,
    /// normalized geometric normal
    pub n_geom: Normal3f,
    /// normalized (interpolated) shading normal
    pub n_shading: Normal3f,
    /// texture coordinates
    pub uv: Point2f,
    /// parametric distance of the hit, i.e. the shortened *t_max*
    pub t_max: Float,
    /// index of the triangle that was hit
    pub triangle: usize,
    pub mesh: Arc<TriangleMesh>,
}

impl HitRecord {
    /// A record for shadow queries: only *t_max*, the triangle and
    /// the mesh are meaningful, surface attributes stay at their
    /// defaults.
    pub fn occluded(t_max: Float, triangle: usize, mesh: Arc<TriangleMesh>) -> Self {
        HitRecord {
            p: Point3f::default(),
            n_geom: Normal3f::default(),
            n_shading: Normal3f::default(),
            uv: Point2f::default(),
            t_max,
            triangle,
            mesh,
        }
    }
}

impl fmt::Debug for HitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitRecord")
            .field("p", &self.p)
            .field("n_geom", &self.n_geom)
            .field("n_shading", &self.n_shading)
            .field("uv", &self.uv)
            .field("t_max", &self.t_max)
            .field("triangle", &self.triangle)
            .finish()
    }
}
