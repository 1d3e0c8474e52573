//! An octree over the triangles of a single mesh.
//!
//! Starting with the world bound of the mesh, a region is split into
//! the eight octants spanned by its center and its corners. Each
//! triangle is routed into every octant its bounding box touches, so
//! triangles straddling a splitting plane end up in several subtrees.
//! Subdivision stops once a region holds few triangles, or once the
//! region became too small compared to the root (which bounds the
//! depth even if many triangles are clustered in one spot).
//!
//! The eight subtrees of a node are built in parallel with
//! [rayon](https://docs.rs/rayon); finished children are attached to
//! their parent under a lock that is only held for the attach.
//!
//! Traversal visits the children of a node nearest first (by the
//! distance between the ray origin and the child region). The order
//! is computed on the stack for every query, so a built tree can be
//! shared between render threads.

// std
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
// others
use log::{debug, info, warn};
use rayon::prelude::*;
use smallvec::SmallVec;
use thiserror::Error;
// octree
use crate::core::geometry::vec3_cross_vec3;
use crate::core::geometry::{Bounds3f, Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::interaction::HitRecord;
use crate::core::mesh::TriangleMesh;
use crate::core::paramset::ParamSet;
use crate::core::pbrt::Float;

/// Number of children of an interior node.
pub const OCTREE_NUM: usize = 8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccelError {
    #[error("only a single mesh is supported")]
    MultipleMeshes,
    #[error("no mesh bound to the accelerator")]
    NoMeshBound,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OctreeConfig {
    /// regions with at most this many triangles become leaves
    pub max_leaf_triangles: usize,
    /// regions whose volume is smaller than the root volume by more
    /// than this factor become leaves; 8^10 caps the depth near 10
    pub max_volume_ratio: Float,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        OctreeConfig {
            max_leaf_triangles: 15_usize,
            max_volume_ratio: (OCTREE_NUM as Float).powi(10),
        }
    }
}

/// Octant *child* of *bounds*: the box spanned by the center and the
/// *child*-th corner.
pub fn octree_child_bounds(bounds: &Bounds3f, child: usize) -> Bounds3f {
    assert!(child < OCTREE_NUM);
    Bounds3f::new(bounds.center(), bounds.corner(child as u8))
}

/// A closest (or, for shadow rays, any) hit found by traversal. The
/// hit distance is stored in the ray's *t_max*.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriangleHit {
    pub triangle: usize,
    pub u: Float,
    pub v: Float,
}

#[derive(Debug)]
pub struct OctreeChild {
    /// which of the eight octants of the parent this child covers
    pub index: u8,
    pub node: Box<OctreeNode>,
}

#[derive(Debug)]
pub enum OctreeNode {
    Leaf {
        bounds: Bounds3f,
        indices: Vec<usize>,
    },
    Interior {
        bounds: Bounds3f,
        children: SmallVec<[OctreeChild; OCTREE_NUM]>,
    },
}

impl OctreeNode {
    pub fn leaf(bounds: Bounds3f, indices: Vec<usize>) -> Self {
        OctreeNode::Leaf { bounds, indices }
    }
    pub fn interior(bounds: Bounds3f) -> Self {
        OctreeNode::Interior {
            bounds,
            children: SmallVec::new(),
        }
    }
    pub fn bounds(&self) -> &Bounds3f {
        match self {
            OctreeNode::Leaf { bounds, .. } => bounds,
            OctreeNode::Interior { bounds, .. } => bounds,
        }
    }
    pub fn is_leaf(&self) -> bool {
        matches!(self, OctreeNode::Leaf { .. })
    }
    /// Child subtrees in attach order; empty for leaves.
    pub fn children(&self) -> &[OctreeChild] {
        match self {
            OctreeNode::Leaf { .. } => &[],
            OctreeNode::Interior { children, .. } => &children[..],
        }
    }
    /// Triangle indices of a leaf; empty for interior nodes.
    pub fn indices(&self) -> &[usize] {
        match self {
            OctreeNode::Leaf { indices, .. } => &indices[..],
            OctreeNode::Interior { .. } => &[],
        }
    }
    pub fn child_region(&self, child: usize) -> Bounds3f {
        octree_child_bounds(self.bounds(), child)
    }
    /// Does octant *child* of this node touch *bbox*? Shared faces
    /// count as overlap.
    pub fn overlap(&self, child: usize, bbox: &Bounds3f) -> bool {
        self.child_region(child).overlaps(bbox, true)
    }
    /// Leaves have no children, the call is ignored for them.
    pub fn attach_child(&mut self, index: usize, node: OctreeNode) {
        if let OctreeNode::Interior { children, .. } = self {
            children.push(OctreeChild {
                index: index as u8,
                node: Box::new(node),
            });
        }
    }
    /// Find the closest triangle along *ray* (or any triangle if
    /// *shadow_only* is set). On a hit, *ray.t_max* holds the hit
    /// distance.
    pub fn intersect(
        &self,
        ray: &Ray,
        shadow_only: bool,
        mesh: &TriangleMesh,
    ) -> Option<TriangleHit> {
        let (inv_dir, dir_is_neg) = ray.inv_dir();
        self.intersect_node(ray, &inv_dir, &dir_is_neg, shadow_only, mesh)
    }
    fn intersect_node(
        &self,
        ray: &Ray,
        inv_dir: &Vector3f,
        dir_is_neg: &[u8; 3],
        shadow_only: bool,
        mesh: &TriangleMesh,
    ) -> Option<TriangleHit> {
        if !self.bounds().intersect_p(ray, inv_dir, dir_is_neg) {
            return None;
        }
        match self {
            OctreeNode::Leaf { indices, .. } => {
                let mut hit: Option<TriangleHit> = None;
                for &triangle in indices {
                    if let Some((u, v, t)) = mesh.intersect_triangle(triangle, ray) {
                        if shadow_only {
                            ray.t_max.set(t);
                            return Some(TriangleHit { triangle, u, v });
                        }
                        if t < ray.t_max.get() {
                            ray.t_max.set(t);
                            hit = Some(TriangleHit { triangle, u, v });
                        }
                    }
                }
                hit
            }
            OctreeNode::Interior { children, .. } => {
                // nearest child first
                let mut order: SmallVec<[(Float, &OctreeNode); OCTREE_NUM]> = children
                    .iter()
                    .map(|child| (child.node.bounds().distance_to(&ray.o), &*child.node))
                    .collect();
                order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
                // every later hit is closer, t_max shrinks with each one
                let mut hit: Option<TriangleHit> = None;
                for (_distance, node) in order {
                    if let Some(child_hit) =
                        node.intersect_node(ray, inv_dir, dir_is_neg, shadow_only, mesh)
                    {
                        if shadow_only {
                            return Some(child_hit);
                        }
                        hit = Some(child_hit);
                    }
                }
                hit
            }
        }
    }
    /// Collect the triangle indices of all leaves *ray* passes
    /// through, without testing the triangles themselves. Triangles
    /// stored in several leaves show up several times.
    pub fn candidates(&self, ray: &Ray, result: &mut Vec<usize>) {
        let (inv_dir, dir_is_neg) = ray.inv_dir();
        self.collect_candidates(ray, &inv_dir, &dir_is_neg, result);
    }
    fn collect_candidates(
        &self,
        ray: &Ray,
        inv_dir: &Vector3f,
        dir_is_neg: &[u8; 3],
        result: &mut Vec<usize>,
    ) {
        if !self.bounds().intersect_p(ray, inv_dir, dir_is_neg) {
            return;
        }
        match self {
            OctreeNode::Leaf { indices, .. } => result.extend_from_slice(indices),
            OctreeNode::Interior { children, .. } => {
                for child in children {
                    child
                        .node
                        .collect_candidates(ray, inv_dir, dir_is_neg, result);
                }
            }
        }
    }
    fn accumulate_stats(&self, depth: usize, stats: &mut OctreeStats) {
        stats.node_count += 1;
        stats.max_depth = stats.max_depth.max(depth);
        match self {
            OctreeNode::Leaf { indices, .. } => {
                stats.leaf_count += 1;
                stats.triangle_refs += indices.len();
            }
            OctreeNode::Interior { children, .. } => {
                for child in children {
                    child.node.accumulate_stats(depth + 1, stats);
                }
            }
        }
    }
}

/// Size of a built tree, reported after each build.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct OctreeStats {
    pub node_count: usize,
    pub leaf_count: usize,
    /// sum of the leaf list lengths (duplicates included)
    pub triangle_refs: usize,
    /// the root has depth zero
    pub max_depth: usize,
}

impl OctreeStats {
    pub fn from_root(root: &OctreeNode) -> Self {
        let mut stats: OctreeStats = OctreeStats::default();
        root.accumulate_stats(0_usize, &mut stats);
        stats
    }
    pub fn average_leaf_size(&self) -> Float {
        if self.leaf_count == 0 {
            0.0 as Float
        } else {
            self.triangle_refs as Float / self.leaf_count as Float
        }
    }
}

pub struct OctreeBuilder<'a> {
    mesh: &'a TriangleMesh,
    config: OctreeConfig,
    root_volume: Float,
}

impl<'a> OctreeBuilder<'a> {
    pub fn new(mesh: &'a TriangleMesh, root_bounds: &Bounds3f, config: OctreeConfig) -> Self {
        OctreeBuilder {
            mesh,
            config,
            root_volume: root_bounds.volume(),
        }
    }
    /// Build the (sub)tree for *bounds*, which has to be the root
    /// region passed to **new()**. No node is created for an empty
    /// index list.
    pub fn build(&self, bounds: &Bounds3f, indices: Vec<usize>) -> Option<OctreeNode> {
        self.recursive_build(bounds, indices, 0_u32)
    }
    /// Volume of the root divided by the volume of *bounds*. For
    /// flat regions (a planar mesh) both volumes are zero, then the
    /// ratio a non-degenerate region would have at that depth is
    /// used instead.
    fn volume_ratio(&self, bounds: &Bounds3f, depth: u32) -> Float {
        let volume: Float = bounds.volume();
        if self.root_volume > 0.0 as Float && volume > 0.0 as Float {
            self.root_volume / volume
        } else {
            (OCTREE_NUM as Float).powi(depth as i32)
        }
    }
    fn is_leaf(&self, bounds: &Bounds3f, n_triangles: usize, depth: u32) -> bool {
        n_triangles <= self.config.max_leaf_triangles
            || self.volume_ratio(bounds, depth) > self.config.max_volume_ratio
    }
    fn recursive_build(
        &self,
        bounds: &Bounds3f,
        indices: Vec<usize>,
        depth: u32,
    ) -> Option<OctreeNode> {
        if indices.is_empty() {
            return None;
        }
        if self.is_leaf(bounds, indices.len(), depth) {
            return Some(OctreeNode::leaf(*bounds, indices));
        }
        let node: OctreeNode = OctreeNode::interior(*bounds);
        // route triangles into every octant their bounds touch
        let triangle_bounds: Vec<Bounds3f> = indices
            .iter()
            .map(|&index| self.mesh.triangle_bound(index))
            .collect();
        let mut regions: SmallVec<[Bounds3f; OCTREE_NUM]> = SmallVec::new();
        let mut buckets: Vec<Vec<usize>> = Vec::with_capacity(OCTREE_NUM);
        for child in 0..OCTREE_NUM {
            let region: Bounds3f = node.child_region(child);
            // a flat region repeats its octants along the flat axis
            let repeated: bool = regions.contains(&region);
            regions.push(region);
            if repeated {
                buckets.push(Vec::new());
                continue;
            }
            buckets.push(
                indices
                    .iter()
                    .zip(triangle_bounds.iter())
                    .filter(|(_, b)| node.overlap(child, b))
                    .map(|(&index, _)| index)
                    .collect(),
            );
        }
        let node: Mutex<OctreeNode> = Mutex::new(node);
        buckets
            .into_par_iter()
            .enumerate()
            .for_each(|(child, bucket)| {
                if let Some(child_node) = self.recursive_build(&regions[child], bucket, depth + 1) {
                    node.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .attach_child(child, child_node);
                }
            });
        let node: OctreeNode = node.into_inner().unwrap_or_else(PoisonError::into_inner);
        if node.children().is_empty() {
            // can't happen for valid regions, every bound touches an octant
            return None;
        }
        Some(node)
    }
}

/// Accelerator for a single **TriangleMesh**. Bind the mesh with
/// **set_mesh()**, call **build()**, then query with **intersect()**.
pub struct OctreeAccel {
    config: OctreeConfig,
    mesh: Option<Arc<TriangleMesh>>,
    bounds: Bounds3f,
    root: Option<OctreeNode>,
    stats: Option<OctreeStats>,
}

impl Default for OctreeAccel {
    fn default() -> Self {
        OctreeAccel::new(OctreeConfig::default())
    }
}

impl OctreeAccel {
    pub fn new(config: OctreeConfig) -> Self {
        OctreeAccel {
            config,
            mesh: None,
            bounds: Bounds3f::default(),
            root: None,
            stats: None,
        }
    }
    pub fn create(mesh: Arc<TriangleMesh>, ps: &ParamSet) -> Result<Arc<OctreeAccel>, AccelError> {
        let defaults: OctreeConfig = OctreeConfig::default();
        let max_leaf_prims: i32 =
            ps.find_one_int("maxleafprims", defaults.max_leaf_triangles as i32);
        let max_leaf_triangles: usize = if max_leaf_prims < 1 {
            warn!(
                "Octree \"maxleafprims\" {} out of range. Using {}.",
                max_leaf_prims, defaults.max_leaf_triangles
            );
            defaults.max_leaf_triangles
        } else {
            max_leaf_prims as usize
        };
        let ratio: Float = ps.find_one_float("maxvolumeratio", defaults.max_volume_ratio);
        let max_volume_ratio: Float = if ratio >= 1.0 as Float {
            ratio
        } else {
            warn!(
                "Octree \"maxvolumeratio\" {} out of range. Using {}.",
                ratio, defaults.max_volume_ratio
            );
            defaults.max_volume_ratio
        };
        let mut accel: OctreeAccel = OctreeAccel::new(OctreeConfig {
            max_leaf_triangles,
            max_volume_ratio,
        });
        accel.set_mesh(mesh)?;
        accel.build()?;
        Ok(Arc::new(accel))
    }
    pub fn set_mesh(&mut self, mesh: Arc<TriangleMesh>) -> Result<(), AccelError> {
        if self.mesh.is_some() {
            return Err(AccelError::MultipleMeshes);
        }
        self.bounds = mesh.world_bound();
        self.mesh = Some(mesh);
        Ok(())
    }
    /// (Re)build the tree for the bound mesh. A mesh without
    /// triangles leaves the accelerator without a tree.
    pub fn build(&mut self) -> Result<(), AccelError> {
        let mesh: Arc<TriangleMesh> = self.mesh.clone().ok_or(AccelError::NoMeshBound)?;
        debug!(
            "Octree build: {} triangles, max {} per leaf, max volume ratio {}",
            mesh.triangle_count(),
            self.config.max_leaf_triangles,
            self.config.max_volume_ratio
        );
        let start = Instant::now();
        let indices: Vec<usize> = (0..mesh.triangle_count()).collect();
        let builder: OctreeBuilder = OctreeBuilder::new(&mesh, &self.bounds, self.config);
        self.root = builder.build(&self.bounds, indices);
        self.stats = self.root.as_ref().map(OctreeStats::from_root);
        match self.stats {
            Some(stats) => info!(
                "Octree built in {:?}: {} nodes, {} leaves, {} triangle references, \
                 {:.2} per leaf, depth {}",
                start.elapsed(),
                stats.node_count,
                stats.leaf_count,
                stats.triangle_refs,
                stats.average_leaf_size(),
                stats.max_depth
            ),
            None => info!("Octree built in {:?}: empty mesh", start.elapsed()),
        }
        Ok(())
    }
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }
    pub fn mesh(&self) -> Option<&Arc<TriangleMesh>> {
        self.mesh.as_ref()
    }
    pub fn root(&self) -> Option<&OctreeNode> {
        self.root.as_ref()
    }
    pub fn stats(&self) -> Option<OctreeStats> {
        self.stats
    }
    pub fn world_bound(&self) -> Bounds3f {
        self.bounds
    }
    /// Find the closest hit along *ray*. With *shadow_only* set the
    /// search stops at the first hit and the record only carries
    /// *t_max*, the triangle and the mesh. The passed ray is left
    /// untouched.
    pub fn intersect(&self, ray: &Ray, shadow_only: bool) -> Option<HitRecord> {
        let (root, mesh) = match (&self.root, &self.mesh) {
            (Some(root), Some(mesh)) => (root, mesh),
            _ => return None,
        };
        let ray: Ray = ray.clone();
        let hit: TriangleHit = root.intersect(&ray, shadow_only, mesh)?;
        if shadow_only {
            return Some(HitRecord::occluded(
                ray.t_max.get(),
                hit.triangle,
                mesh.clone(),
            ));
        }
        Some(surface_hit(mesh, &hit, ray.t_max.get()))
    }
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        self.intersect(ray, true).is_some()
    }
}

/// Interpolate position, texture coordinates and normals of the hit
/// triangle from the barycentric weights (1 - u - v, u, v).
fn surface_hit(mesh: &Arc<TriangleMesh>, hit: &TriangleHit, t_max: Float) -> HitRecord {
    let b0: Float = 1.0 as Float - hit.u - hit.v;
    let b1: Float = hit.u;
    let b2: Float = hit.v;
    let [i0, i1, i2] = mesh.vertices(hit.triangle);
    let p0: Point3f = mesh.p[i0];
    let p1: Point3f = mesh.p[i1];
    let p2: Point3f = mesh.p[i2];
    let p: Point3f = p0 * b0 + p1 * b1 + p2 * b2;
    let uv: Point2f = if mesh.has_uvs() {
        mesh.uv[i0] * b0 + mesh.uv[i1] * b1 + mesh.uv[i2] * b2
    } else {
        Point2f {
            x: hit.u,
            y: hit.v,
        }
    };
    let n_geom: Normal3f = Normal3f::from(vec3_cross_vec3(&(p1 - p0), &(p2 - p0)).normalize());
    let n_shading: Normal3f = if mesh.has_normals() {
        (mesh.n[i0] * b0 + mesh.n[i1] * b1 + mesh.n[i2] * b2).normalize()
    } else {
        n_geom
    };
    HitRecord {
        p,
        n_geom,
        n_shading,
        uv,
        t_max,
        triangle: hit.triangle,
        mesh: mesh.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::geometry::bnd3_inside_bnd3;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rayon::prelude::*;

    fn pnt(x: Float, y: Float, z: Float) -> Point3f {
        Point3f { x, y, z }
    }

    fn vec(x: Float, y: Float, z: Float) -> Vector3f {
        Vector3f { x, y, z }
    }

    fn mesh_from(triangles: &[[Point3f; 3]]) -> Arc<TriangleMesh> {
        let mut p: Vec<Point3f> = Vec::new();
        let mut vertex_indices: Vec<usize> = Vec::new();
        for triangle in triangles {
            for vertex in triangle {
                vertex_indices.push(p.len());
                p.push(*vertex);
            }
        }
        Arc::new(TriangleMesh::new(vertex_indices, p, Vec::new(), Vec::new()).unwrap())
    }

    /// small triangle facing +z around *c*
    fn small_triangle(c: Point3f, size: Float) -> [Point3f; 3] {
        [
            c + vec(-size, -size, 0.0),
            c + vec(size, -size, 0.0),
            c + vec(0.0, size, 0.0),
        ]
    }

    /// triangles scattered (with a fixed seed) inside [-10, 10]^3
    fn random_mesh(n: usize, seed: u64) -> Arc<TriangleMesh> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut triangles: Vec<[Point3f; 3]> = Vec::with_capacity(n);
        for _ in 0..n {
            let c = pnt(
                rng.random_range(-9.0..9.0),
                rng.random_range(-9.0..9.0),
                rng.random_range(-9.0..9.0),
            );
            let mut triangle = [c; 3];
            for vertex in triangle.iter_mut() {
                *vertex = c + vec(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                );
            }
            triangles.push(triangle);
        }
        mesh_from(&triangles)
    }

    fn random_rays(n: usize, seed: u64) -> Vec<Ray> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let o = pnt(
                    rng.random_range(-20.0..20.0),
                    rng.random_range(-20.0..20.0),
                    rng.random_range(-20.0..20.0),
                );
                let target = pnt(
                    rng.random_range(-8.0..8.0),
                    rng.random_range(-8.0..8.0),
                    rng.random_range(-8.0..8.0),
                );
                Ray::new(o, (target - o).normalize())
            })
            .collect()
    }

    fn built(mesh: Arc<TriangleMesh>, config: OctreeConfig) -> OctreeAccel {
        let mut accel = OctreeAccel::new(config);
        accel.set_mesh(mesh).unwrap();
        accel.build().unwrap();
        accel
    }

    /// closest hit by testing every triangle
    fn brute_force(mesh: &TriangleMesh, ray: &Ray) -> Option<Float> {
        (0..mesh.triangle_count())
            .filter_map(|i| mesh.intersect_triangle(i, ray).map(|(_, _, t)| t))
            .fold(None, |best: Option<Float>, t| match best {
                Some(b) if b <= t => Some(b),
                _ => Some(t),
            })
    }

    #[test]
    fn child_regions_are_contained_and_cover_parent() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let parent = Bounds3f::new(
                pnt(
                    rng.random_range(-100.0..100.0),
                    rng.random_range(-100.0..100.0),
                    rng.random_range(-100.0..100.0),
                ),
                pnt(
                    rng.random_range(-100.0..100.0),
                    rng.random_range(-100.0..100.0),
                    rng.random_range(-100.0..100.0),
                ),
            );
            let node = OctreeNode::interior(parent);
            for child in 0..OCTREE_NUM {
                let region = node.child_region(child);
                assert!(region.is_valid());
                assert!(bnd3_inside_bnd3(&region, &parent));
                assert_eq!(region, octree_child_bounds(&parent, child));
            }
            for _ in 0..100 {
                let p = pnt(
                    rng.random_range(parent.p_min.x..=parent.p_max.x),
                    rng.random_range(parent.p_min.y..=parent.p_max.y),
                    rng.random_range(parent.p_min.z..=parent.p_max.z),
                );
                assert!((0..OCTREE_NUM).any(|child| node.child_region(child).inside(&p)));
            }
        }
    }

    #[test]
    fn overlap_is_pure_and_inclusive() {
        let node = OctreeNode::interior(Bounds3f::new(pnt(0.0, 0.0, 0.0), pnt(2.0, 2.0, 2.0)));
        // touches the center plane x = 1 only
        let on_plane = Bounds3f::new(pnt(1.0, 0.2, 0.2), pnt(1.0, 0.4, 0.4));
        let first: Vec<bool> = (0..OCTREE_NUM).map(|i| node.overlap(i, &on_plane)).collect();
        let second: Vec<bool> = (0..OCTREE_NUM).map(|i| node.overlap(i, &on_plane)).collect();
        assert_eq!(first, second);
        // octant 0 (all min) and octant 1 (max x) both touch it
        assert!(first[0] && first[1]);
        assert!(!first[2] && !first[4]);
        assert!(!node.overlap(0, &Bounds3f::default()));
    }

    #[test]
    fn leaf_threshold_boundary() {
        // a 2 x 2 x 4 lattice of small, separable triangles
        let mut triangles: Vec<[Point3f; 3]> = Vec::new();
        for i in 0..16 {
            let c = pnt(
                (i % 2) as Float * 4.0,
                ((i / 2) % 2) as Float * 4.0,
                (i / 4) as Float * 4.0,
            );
            triangles.push(small_triangle(c, 0.1));
        }
        let fifteen = built(mesh_from(&triangles[..15]), OctreeConfig::default());
        let root = fifteen.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.indices().len(), 15);
        let sixteen = built(mesh_from(&triangles), OctreeConfig::default());
        let root = sixteen.root().unwrap();
        assert!(!root.is_leaf());
        assert!(sixteen.stats().unwrap().max_depth >= 1);
    }

    fn check_children(node: &OctreeNode) {
        for child in node.children() {
            assert_eq!(
                *child.node.bounds(),
                node.child_region(child.index as usize)
            );
            assert!(!child.node.indices().is_empty() || !child.node.children().is_empty());
            check_children(&child.node);
        }
    }

    #[test]
    fn children_know_their_octant() {
        let accel = built(random_mesh(400, 5), OctreeConfig::default());
        let root = accel.root().unwrap();
        assert_eq!(*root.bounds(), accel.world_bound());
        check_children(root);
    }

    #[test]
    fn clustered_triangles_have_bounded_depth() {
        let mut triangles: Vec<[Point3f; 3]> = vec![
            small_triangle(pnt(0.0, 0.0, 0.0), 0.01),
            small_triangle(pnt(10.0, 10.0, 10.0), 0.01),
        ];
        for _ in 0..40 {
            triangles.push(small_triangle(pnt(3.1, 7.3, 4.6), 1.0e-6));
        }
        let accel = built(mesh_from(&triangles), OctreeConfig::default());
        let stats = accel.stats().unwrap();
        assert!(stats.max_depth <= 11, "depth {}", stats.max_depth);
        assert!(stats.max_depth >= 9, "depth {}", stats.max_depth);
        let shallow = built(
            mesh_from(&triangles),
            OctreeConfig {
                max_leaf_triangles: 15,
                max_volume_ratio: (OCTREE_NUM as Float).powi(3),
            },
        );
        assert!(shallow.stats().unwrap().max_depth <= 4);
    }

    #[test]
    fn flat_mesh_terminates() {
        // everything in the plane z = 0, the root has no volume
        let mut triangles: Vec<[Point3f; 3]> = Vec::new();
        for _ in 0..30 {
            triangles.push(small_triangle(pnt(1.3, 2.7, 0.0), 0.001));
        }
        triangles.push(small_triangle(pnt(-5.0, -5.0, 0.0), 0.1));
        triangles.push(small_triangle(pnt(5.0, 5.0, 0.0), 0.1));
        let accel = built(mesh_from(&triangles), OctreeConfig::default());
        assert!(accel.stats().unwrap().max_depth <= 11);
        let ray = Ray::new(pnt(1.3, 2.7, 5.0), vec(0.0, 0.0, -1.0));
        let hit = accel.intersect(&ray, false).unwrap();
        assert_relative_eq!(hit.t_max, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn nearest_hit_wins() {
        // two stacked triangles plus filler to force subdivision
        let mut triangles: Vec<[Point3f; 3]> = vec![
            small_triangle(pnt(0.5, 0.5, 1.0), 0.25),
            small_triangle(pnt(0.5, 0.5, 3.0), 0.25),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..60 {
            triangles.push(small_triangle(
                pnt(
                    rng.random_range(2.0..8.0),
                    rng.random_range(2.0..8.0),
                    rng.random_range(-4.0..8.0),
                ),
                0.2,
            ));
        }
        let accel = built(mesh_from(&triangles), OctreeConfig::default());
        assert!(!accel.root().unwrap().is_leaf());
        let up = Ray::new(pnt(0.5, 0.5, -1.0), vec(0.0, 0.0, 1.0));
        let hit = accel.intersect(&up, false).unwrap();
        assert_eq!(hit.triangle, 0);
        assert_relative_eq!(hit.t_max, 2.0, epsilon = 1e-4);
        let down = Ray::new(pnt(0.5, 0.5, 5.0), vec(0.0, 0.0, -1.0));
        let hit = accel.intersect(&down, false).unwrap();
        assert_eq!(hit.triangle, 1);
        assert_relative_eq!(hit.t_max, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn matches_brute_force() {
        let mesh = random_mesh(500, 11);
        let accel = built(mesh.clone(), OctreeConfig::default());
        for ray in random_rays(400, 12) {
            let expected = brute_force(&mesh, &ray);
            let found = accel.intersect(&ray, false).map(|hit| hit.t_max);
            match (expected, found) {
                (Some(e), Some(f)) => assert_relative_eq!(e, f, max_relative = 1e-5),
                (None, None) => {}
                other => panic!("octree and brute force disagree: {:?}", other),
            }
        }
    }

    #[test]
    fn shadow_and_closest_queries_agree() {
        let accel = built(random_mesh(300, 21), OctreeConfig::default());
        let mut hits: usize = 0;
        for ray in random_rays(300, 22) {
            let closest = accel.intersect(&ray, false);
            assert_eq!(accel.intersect(&ray, true).is_some(), closest.is_some());
            assert_eq!(accel.intersect_p(&ray), closest.is_some());
            if closest.is_some() {
                hits += 1;
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn every_triangle_is_reachable() {
        let mesh = random_mesh(200, 31);
        let accel = built(mesh.clone(), OctreeConfig::default());
        let root = accel.root().unwrap();
        for triangle in 0..mesh.triangle_count() {
            let [i0, i1, i2] = mesh.vertices(triangle);
            let centroid = (mesh.p[i0] + mesh.p[i1] + mesh.p[i2]) / 3.0;
            let normal = vec3_cross_vec3(&(mesh.p[i1] - mesh.p[i0]), &(mesh.p[i2] - mesh.p[i0]))
                .normalize();
            // shoot at the centroid from just in front of the triangle
            let ray = Ray::new(centroid + normal * 1.0e-2, -normal);
            let mut candidates: Vec<usize> = Vec::new();
            root.candidates(&ray, &mut candidates);
            assert!(candidates.contains(&triangle), "triangle {} dropped", triangle);
            let hit = root.intersect(&ray, false, &mesh);
            assert!(hit.is_some(), "triangle {} not hit", triangle);
        }
    }

    #[test]
    fn rebuild_answers_identically() {
        let mesh = random_mesh(250, 41);
        let mut accel = built(mesh, OctreeConfig::default());
        let rays = random_rays(200, 42);
        let first: Vec<Option<(usize, Float)>> = rays
            .iter()
            .map(|ray| accel.intersect(ray, false).map(|h| (h.triangle, h.t_max)))
            .collect();
        let stats = accel.stats();
        accel.build().unwrap();
        let second: Vec<Option<(usize, Float)>> = rays
            .iter()
            .map(|ray| accel.intersect(ray, false).map(|h| (h.triangle, h.t_max)))
            .collect();
        assert_eq!(first, second);
        assert_eq!(stats, accel.stats());
    }

    #[test]
    fn empty_mesh_never_hits() {
        let mesh = Arc::new(TriangleMesh::new(Vec::new(), Vec::new(), Vec::new(), Vec::new()).unwrap());
        let accel = built(mesh, OctreeConfig::default());
        assert!(accel.root().is_none());
        assert!(accel.stats().is_none());
        let ray = Ray::new(pnt(0.0, 0.0, -1.0), vec(0.0, 0.0, 1.0));
        assert!(accel.intersect(&ray, false).is_none());
        assert!(!accel.intersect_p(&ray));
    }

    #[test]
    fn unbuilt_accelerator_never_hits() {
        let mut accel = OctreeAccel::default();
        accel
            .set_mesh(mesh_from(&[small_triangle(pnt(0.0, 0.0, 0.0), 1.0)]))
            .unwrap();
        let ray = Ray::new(pnt(0.0, 0.0, 1.0), vec(0.0, 0.0, -1.0));
        assert!(accel.intersect(&ray, false).is_none());
    }

    #[test]
    fn configuration_errors() {
        let mut accel = OctreeAccel::default();
        assert_eq!(accel.build(), Err(AccelError::NoMeshBound));
        let mesh = mesh_from(&[small_triangle(pnt(0.0, 0.0, 0.0), 1.0)]);
        accel.set_mesh(mesh.clone()).unwrap();
        assert_eq!(accel.set_mesh(mesh), Err(AccelError::MultipleMeshes));
        assert!(accel.build().is_ok());
    }

    #[test]
    fn surface_attributes_are_interpolated() {
        let p = vec![pnt(0.0, 0.0, 0.0), pnt(2.0, 0.0, 0.0), pnt(0.0, 2.0, 0.0)];
        let n = vec![
            Normal3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
            Normal3f {
                x: 1.0,
                y: 0.0,
                z: 1.0,
            },
            Normal3f {
                x: 0.0,
                y: 0.0,
                z: 1.0,
            },
        ];
        let uv = vec![
            Point2f { x: 0.0, y: 0.0 },
            Point2f { x: 1.0, y: 0.0 },
            Point2f { x: 0.0, y: 1.0 },
        ];
        let mesh = Arc::new(TriangleMesh::new(vec![0, 1, 2], p, n, uv).unwrap());
        let accel = built(mesh.clone(), OctreeConfig::default());
        let ray = Ray::new(pnt(0.5, 1.0, 3.0), vec(0.0, 0.0, -1.0));
        let hit = accel.intersect(&ray, false).unwrap();
        assert!(Arc::ptr_eq(&hit.mesh, &mesh));
        assert_eq!(hit.triangle, 0);
        assert_relative_eq!(hit.t_max, 3.0, epsilon = 1e-5);
        assert_relative_eq!(hit.p.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(hit.p.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.p.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(hit.uv.x, 0.25, epsilon = 1e-5);
        assert_relative_eq!(hit.uv.y, 0.5, epsilon = 1e-5);
        assert_relative_eq!(hit.n_geom.z, 1.0, epsilon = 1e-5);
        // shading normal leans towards +x with weight 0.25
        let expected = Normal3f {
            x: 0.25,
            y: 0.0,
            z: 1.0,
        }
        .normalize();
        assert_relative_eq!(hit.n_shading.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(hit.n_shading.z, expected.z, epsilon = 1e-5);
        // the caller's ray keeps its extent
        assert!(ray.t_max.get().is_infinite());
    }

    #[test]
    fn missing_normals_fall_back_to_geometric_normal() {
        let accel = built(
            mesh_from(&[[pnt(0.0, 0.0, 0.0), pnt(1.0, 0.0, 0.0), pnt(0.0, 1.0, 0.0)]]),
            OctreeConfig::default(),
        );
        let ray = Ray::new(pnt(0.2, 0.3, 1.0), vec(0.0, 0.0, -1.0));
        let hit = accel.intersect(&ray, false).unwrap();
        assert_eq!(hit.n_shading, hit.n_geom);
        // without texture coordinates the raw hit parameters are kept
        assert_relative_eq!(hit.uv.x, 0.2, epsilon = 1e-5);
        assert_relative_eq!(hit.uv.y, 0.3, epsilon = 1e-5);
    }

    #[test]
    fn create_reads_parameters() {
        let mut ps = ParamSet::default();
        ps.add_int(String::from("maxleafprims"), 4);
        ps.add_float(String::from("maxvolumeratio"), 0.5);
        let accel = OctreeAccel::create(random_mesh(100, 51), &ps).unwrap();
        assert_eq!(accel.config().max_leaf_triangles, 4);
        // out of range, falls back to the default
        assert_eq!(
            accel.config().max_volume_ratio,
            OctreeConfig::default().max_volume_ratio
        );
        assert!(accel.stats().unwrap().leaf_count > 1);
    }

    #[test]
    fn axis_aligned_ray_in_split_plane_hits() {
        // the root is centered on the origin, x = 0 and y = 0 are split planes
        let mut triangles: Vec<[Point3f; 3]> = vec![small_triangle(pnt(0.0, 0.0, 0.5), 1.0)];
        for i in 0..24 {
            let corner = |bit: usize| if i & bit == 0 { -3.0 } else { 3.0 };
            triangles.push(small_triangle(pnt(corner(1), corner(2), corner(4)), 0.1));
        }
        let mesh = mesh_from(&triangles);
        let accel = built(mesh.clone(), OctreeConfig::default());
        assert!(!accel.root().unwrap().is_leaf());
        let ray = Ray::new(pnt(0.0, 0.0, -5.0), vec(0.0, 0.0, 1.0));
        let hit = accel.intersect(&ray, false).unwrap();
        assert_eq!(hit.triangle, 0);
        assert_relative_eq!(hit.t_max, 5.5, epsilon = 1e-4);
        assert_eq!(brute_force(&mesh, &ray), Some(hit.t_max));
        assert!(accel.intersect_p(&ray));
    }

    fn collect_regions(node: &OctreeNode, depth: usize, regions: &mut Vec<Bounds3f>) {
        regions.push(*node.bounds());
        if depth > 0 {
            for child in node.children() {
                collect_regions(&child.node, depth - 1, regions);
            }
        }
    }

    /// one of the two faces or the center plane of a slab
    fn snapped(rng: &mut StdRng, lo: Float, mid: Float, hi: Float) -> Float {
        match rng.random_range(0..3) {
            0 => lo,
            1 => mid,
            _ => hi,
        }
    }

    #[test]
    fn rays_along_split_planes_match_brute_force() {
        let mesh = random_mesh(500, 71);
        let accel = built(mesh.clone(), OctreeConfig::default());
        let mut regions: Vec<Bounds3f> = Vec::new();
        collect_regions(accel.root().unwrap(), 2, &mut regions);
        let mut rng = StdRng::seed_from_u64(72);
        let mut hits: usize = 0;
        for region in &regions {
            let c = region.center();
            let lo = [region.p_min.x, region.p_min.y, region.p_min.z];
            let mid = [c.x, c.y, c.z];
            let hi = [region.p_max.x, region.p_max.y, region.p_max.z];
            for axis in 0..3 {
                for _ in 0..8 {
                    let mut o: [Float; 3] = [0.0; 3];
                    for k in 0..3 {
                        o[k] = snapped(&mut rng, lo[k], mid[k], hi[k]);
                    }
                    let sign: Float = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                    o[axis] = -20.0 * sign;
                    let mut d: [Float; 3] = [0.0; 3];
                    d[axis] = sign;
                    let ray = Ray::new(pnt(o[0], o[1], o[2]), vec(d[0], d[1], d[2]));
                    let expected = brute_force(&mesh, &ray);
                    let found = accel.intersect(&ray, false).map(|hit| hit.t_max);
                    match (expected, found) {
                        (Some(e), Some(f)) => {
                            assert_relative_eq!(e, f, max_relative = 1e-5);
                            hits += 1;
                        }
                        (None, None) => {}
                        other => panic!("octree and brute force disagree: {:?} {:?}", ray, other),
                    }
                    assert_eq!(accel.intersect_p(&ray), expected.is_some());
                }
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn shared_tree_is_queried_in_parallel() {
        let mesh = random_mesh(300, 61);
        let accel = built(mesh.clone(), OctreeConfig::default());
        let origins: Vec<Point3f> = random_rays(200, 62).iter().map(|ray| ray.o).collect();
        let target = pnt(0.0, 0.0, 0.0);
        let parallel: Vec<Option<Float>> = origins
            .par_iter()
            .map(|&o| {
                let ray = Ray::new(o, (target - o).normalize());
                accel.intersect(&ray, false).map(|hit| hit.t_max)
            })
            .collect();
        for (o, result) in origins.iter().zip(parallel) {
            let ray = Ray::new(*o, (target - *o).normalize());
            assert_eq!(brute_force(&mesh, &ray), result);
        }
    }
}
