//! Build the point/link graph from a UV sphere mesh
//!
//! A UV sphere with `w` width and `h` height segments has `(w + 1)(h + 1)`
//! vertices laid out row by row, top pole first. Several of them coincide:
//! - the whole top row sits on the north pole,
//! - the whole bottom row sits on the south pole,
//! - the last column of every row repeats the first (texture seam).
//!
//! Coinciding vertices become slaves of one master so the seam never tears.

use thiserror::Error;

use crate::mesh::sphere::Face;
use crate::simulation::states::{Link, NVec3, Point, PointSet};

/// Structural problems that would make the index arithmetic go out of bounds
#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    #[error("sphere needs at least one width and one height segment, got {width}x{height}")]
    NoSegments { width: usize, height: usize },

    #[error("expected {expected} vertices for {width}x{height} segments, got {actual}")]
    VertexCount {
        expected: usize,
        actual: usize,
        width: usize,
        height: usize,
    },

    #[error("face {face} references vertex {vertex}, mesh has {count} vertices")]
    FaceIndex { face: usize, vertex: usize, count: usize },
}

/// Derive points and links from a sphere mesh.
///
/// - one point per vertex, id = vertex index
/// - pole rows and the seam column are merged into master/slave pairs
/// - every face links its `a` and `b` vertices, the last `width_segments`
///   faces additionally link `b` and `c` to close the bottom row
///
/// Link endpoints are resolved to masters before the rest length is measured.
///
/// # Parameters
/// - `vertices`        : vertex positions, row-major, top pole row first.
/// - `faces`           : triangles indexing into `vertices`.
/// - `width_segments`  : segments around the equator.
/// - `height_segments` : segments from pole to pole.
pub fn build_from_mesh(
    vertices: &[NVec3],
    faces: &[Face],
    width_segments: usize,
    height_segments: usize,
) -> Result<PointSet, TopologyError> {
    let (w, h) = (width_segments, height_segments);
    if w == 0 || h == 0 {
        return Err(TopologyError::NoSegments { width: w, height: h });
    }

    let expected = (w + 1) * (h + 1);
    if vertices.len() != expected {
        return Err(TopologyError::VertexCount {
            expected,
            actual: vertices.len(),
            width: w,
            height: h,
        });
    }

    for (k, face) in faces.iter().enumerate() {
        if let Some(&vertex) = face.indices().iter().find(|&&v| v >= vertices.len()) {
            return Err(TopologyError::FaceIndex {
                face: k,
                vertex,
                count: vertices.len(),
            });
        }
    }

    let mut points: Vec<Point> = vertices
        .iter()
        .enumerate()
        .map(|(i, &x)| Point::new(i, x))
        .collect();

    merge_seam_points(&mut points, w, h);

    let last_row_start = faces.len().saturating_sub(w);
    let mut links = Vec::with_capacity(faces.len() + w);
    for (k, face) in faces.iter().enumerate() {
        links.push(Link::new(face.a, face.b, &points));

        // close the last row
        if k >= last_row_start {
            links.push(Link::new(face.b, face.c, &points));
        }
    }

    Ok(PointSet::new(points, links))
}

/// Assign masters for pole rows and the seam column
fn merge_seam_points(points: &mut [Point], w: usize, h: usize) {
    let last = points.len() - 1;

    // north pole row
    for k in 1..=w {
        points[k].master = Some(0);
    }

    // seam: last column of row k repeats the first column of row k
    for k in 1..h {
        let slave = w + k * (w + 1);
        let master = k * (w + 1);
        points[slave].master = Some(master);
    }

    // south pole row
    for k in 1..=w {
        points[last - k].master = Some(last);
    }
}
