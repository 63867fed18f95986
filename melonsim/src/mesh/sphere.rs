//! UV sphere mesh, the shape the melon starts from
//!
//! Vertices are laid out row by row from the north pole (`+y`) to the south
//! pole, `width_segments + 1` per row. The first and last vertex of a row
//! coincide, as do all vertices of the two pole rows. The simulator merges
//! those duplicates (see `simulation::topology`).

use std::f64::consts::PI;

use crate::simulation::states::NVec3;

/// Triangle by vertex index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

impl Face {
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self { a, b, c }
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }
}

#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub radius: f64,
    pub width_segments: usize,
    pub height_segments: usize,
    pub vertices: Vec<NVec3>,
    pub faces: Vec<Face>,
}

impl SphereMesh {
    /// Generate the sphere.
    ///
    /// Vertex `(row y, column x)` sits at `u = x / w`, `v = y / h`:
    /// `(-r cos(2πu) sin(πv), r cos(πv), r sin(2πu) sin(πv))`.
    ///
    /// Each quad `v1 = [y][x+1]`, `v2 = [y][x]`, `v3 = [y+1][x]`,
    /// `v4 = [y+1][x+1]` yields one triangle in the pole rows and two
    /// elsewhere. The bottom row's triangles come last.
    pub fn new(radius: f64, width_segments: usize, height_segments: usize) -> Self {
        let (w, h) = (width_segments, height_segments);

        let mut vertices = Vec::with_capacity((w + 1) * (h + 1));
        for y in 0..=h {
            let v = y as f64 / h as f64;
            for x in 0..=w {
                let u = x as f64 / w as f64;
                let phi = 2.0 * PI * u;
                let theta = PI * v;
                vertices.push(NVec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                ));
            }
        }

        let index = |y: usize, x: usize| y * (w + 1) + x;
        let mut faces = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let v1 = index(y, x + 1);
                let v2 = index(y, x);
                let v3 = index(y + 1, x);
                let v4 = index(y + 1, x + 1);

                if y == 0 {
                    faces.push(Face::new(v1, v3, v4));
                } else if y + 1 == h {
                    faces.push(Face::new(v1, v2, v3));
                } else {
                    faces.push(Face::new(v1, v2, v4));
                    faces.push(Face::new(v2, v3, v4));
                }
            }
        }

        Self {
            radius,
            width_segments,
            height_segments,
            vertices,
            faces,
        }
    }
}
