//! The building blocks the accelerator consumes: geometric classes
//! (points, vectors, normals, rays, bounding boxes), the triangle
//! mesh, the hit record filled in after a successful ray query, and
//! parameter sets used for configuration.

pub mod geometry;
pub mod interaction;
pub mod mesh;
pub mod paramset;
pub mod pbrt;
