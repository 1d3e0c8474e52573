//! # rs_octree
//!
//! [Rust][rust] crate implementing an octree acceleration structure
//! for ray queries against a static triangle mesh, the part of an
//! offline renderer every camera and shadow ray goes through.
//!
//! The accelerator itself can be found [here], the vector, ray and
//! bounding box classes it is built on live in [core].
//!
//! [rust]: https://www.rust-lang.org
//! [here]: accelerators/octree/struct.OctreeAccel.html
//! [core]: core/index.html

#[macro_use]
extern crate impl_ops;

pub mod accelerators;
pub mod core;
