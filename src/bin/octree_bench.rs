// std
use std::f32::consts::PI;
use std::process;
use std::sync::Arc;
use std::time::Instant;
// others
use clap::Parser;
use log::{error, info, warn};
use rayon::prelude::*;
// octree
use rs_octree::accelerators::octree::OctreeAccel;
use rs_octree::core::geometry::{Normal3f, Point2f, Point3f, Ray, Vector3f};
use rs_octree::core::mesh::{MeshError, TriangleMesh};
use rs_octree::core::paramset::ParamSet;
use rs_octree::core::pbrt::{lerp, Float};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build an octree over a tessellated sphere and trace a grid of
/// camera rays (plus one shadow ray per hit) against it.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// use specified number of threads for building and tracing
    #[arg(short = 't', long = "nthreads", default_value_t = 0)]
    nthreads: u8,
    /// number of rings of the sphere (twice as many segments)
    #[arg(short = 'r', long = "rings", default_value_t = 256)]
    rings: usize,
    /// number of rays per image side
    #[arg(short = 'n', long = "resolution", default_value_t = 512)]
    resolution: usize,
    /// maximum number of triangles per leaf
    #[arg(long = "maxleafprims", default_value_t = 15)]
    max_leaf_prims: i32,
}

fn sphere_mesh(rings: usize, radius: Float) -> Result<TriangleMesh, MeshError> {
    let rings: usize = rings.max(2);
    let segments: usize = 2 * rings;
    let mut p: Vec<Point3f> = Vec::with_capacity((rings + 1) * (segments + 1));
    let mut n: Vec<Normal3f> = Vec::with_capacity(p.capacity());
    let mut uv: Vec<Point2f> = Vec::with_capacity(p.capacity());
    for i in 0..=rings {
        let theta: Float = PI * i as Float / rings as Float;
        for j in 0..=segments {
            let phi: Float = 2.0 as Float * PI * j as Float / segments as Float;
            let normal: Normal3f = Normal3f {
                x: theta.sin() * phi.cos(),
                y: theta.cos(),
                z: theta.sin() * phi.sin(),
            };
            p.push(Point3f {
                x: normal.x * radius,
                y: normal.y * radius,
                z: normal.z * radius,
            });
            n.push(normal);
            uv.push(Point2f {
                x: j as Float / segments as Float,
                y: i as Float / rings as Float,
            });
        }
    }
    let mut vertex_indices: Vec<usize> = Vec::with_capacity(rings * segments * 6);
    for i in 0..rings {
        for j in 0..segments {
            let a: usize = i * (segments + 1) + j;
            let b: usize = a + segments + 1;
            vertex_indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    TriangleMesh::new(vertex_indices, p, n, uv)
}

fn main() {
    env_logger::init();
    // handle command line options
    let args = Cli::parse();
    let num_cores: usize = if args.nthreads == 0_u8 {
        num_cpus::get()
    } else {
        args.nthreads as usize
    };
    info!(
        "octree_bench version {} [using {} thread(s)]",
        VERSION, num_cores
    );
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cores)
        .build_global()
    {
        warn!("Could not configure thread pool: {}", e);
    }
    let mesh: Arc<TriangleMesh> = match sphere_mesh(args.rings, 1.0 as Float) {
        Ok(mesh) => Arc::new(mesh),
        Err(e) => {
            error!("Could not create sphere mesh: {}", e);
            process::exit(1);
        }
    };
    info!("Sphere with {} triangles", mesh.triangle_count());
    let mut ps: ParamSet = ParamSet::default();
    ps.add_int(String::from("maxleafprims"), args.max_leaf_prims);
    let accel: Arc<OctreeAccel> = match OctreeAccel::create(mesh, &ps) {
        Ok(accel) => accel,
        Err(e) => {
            error!("Could not build octree: {}", e);
            process::exit(1);
        }
    };
    // orthographic camera looking down +z, light up and to the left
    let resolution: usize = args.resolution.max(1);
    let light: Point3f = Point3f {
        x: -5.0,
        y: 5.0,
        z: -5.0,
    };
    let start = Instant::now();
    let mut hits: usize = 0;
    let mut shadowed: usize = 0;
    for y in pbr::PbIter::new(0..resolution) {
        let (row_hits, row_shadowed) = (0..resolution)
            .into_par_iter()
            .map(|x| {
                let fx: Float = (x as Float + 0.5) / resolution as Float;
                let fy: Float = (y as Float + 0.5) / resolution as Float;
                let ray: Ray = Ray::new(
                    Point3f {
                        x: lerp(fx, -1.2, 1.2),
                        y: lerp(fy, 1.2, -1.2),
                        z: -3.0,
                    },
                    Vector3f {
                        x: 0.0,
                        y: 0.0,
                        z: 1.0,
                    },
                );
                match accel.intersect(&ray, false) {
                    Some(hit) => {
                        let n: Vector3f = Vector3f::from(hit.n_geom);
                        let o: Point3f = hit.p + n * 1.0e-3 as Float;
                        let shadow_ray: Ray = Ray::new(o, light - o);
                        shadow_ray.t_max.set(1.0 as Float - 1.0e-4 as Float);
                        (1_usize, accel.intersect_p(&shadow_ray) as usize)
                    }
                    None => (0_usize, 0_usize),
                }
            })
            .reduce(|| (0_usize, 0_usize), |a, b| (a.0 + b.0, a.1 + b.1));
        hits += row_hits;
        shadowed += row_shadowed;
    }
    let elapsed = start.elapsed();
    let n_rays: usize = resolution * resolution + hits;
    info!(
        "Traced {} rays in {:?} ({:.0} rays/s): {} hits, {} in shadow",
        n_rays,
        elapsed,
        n_rays as f64 / elapsed.as_secs_f64().max(1.0e-9),
        hits,
        shadowed
    );
}
