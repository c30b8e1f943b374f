//! Slice a cube with a spherical bite into layers and print per-layer stats.
//!
//! Usage:
//!   cargo run -p lamina --example slice_cube -- [layers]
//!
//! Prints one line per layer: z, area, path count, triangle count.

use lamina::geom::{Aff3w, Vec3};
use lamina::prelude::*;
use nalgebra::vector;

/// Unit sphere scaled to radius `r` and moved to `center`.
fn ball(r: f64, center: Vec3) -> Aff3w {
    Aff3w::xlat(center.x, center.y, center.z).mul(&Aff3w::scale(r, r, r))
}

fn main() -> Result<()> {
    let layers: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let eps = Eps::default();
    let opt = Opt::default();

    let cube = Csg3::Poly(lamina::topo::cuboid(
        &eps,
        vector![0.0, 0.0, 0.0],
        vector![2.0, 2.0, 2.0],
    )?);
    // a spherical bite at the cube's top corner
    let bite = Csg3::Sphere(Sphere3 {
        mat: ball(1.2, vector![2.0, 2.0, 2.0]),
        fn_: 32,
        loc: Loc::NONE,
        color: Color::default(),
    });
    let tree = Csg3::Sub {
        add: vec![cube],
        sub: vec![bite],
        loc: Loc::NONE,
    };

    let z: Vec<f64> = (0..layers)
        .map(|i| (i as f64 + 0.5) * 2.0 / layers as f64)
        .collect();
    let mut stack = Stack::new(z);
    stack.add_layers(&eps, &opt, &tree)?;
    stack.diff_layers(&eps)?;

    for (zi, slot) in stack.slots.iter().enumerate() {
        match slot {
            Some(s) => println!(
                "z={:6.3}  area={:8.4}  paths={}  tris={}",
                stack.z[zi],
                s.poly.area(),
                s.poly.paths.len(),
                s.poly.tris.len()
            ),
            None => println!("z={:6.3}  empty", stack.z[zi]),
        }
    }
    Ok(())
}
