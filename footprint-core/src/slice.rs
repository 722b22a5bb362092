/// Planar cross-sections of triangle meshes.
///
/// Every triangle that straddles the cutting plane, or has an edge lying in
/// it, contributes one segment. Segment endpoints are keyed by the mesh edge
/// (or vertex) they lie on, so neighbouring triangles agree on shared points
/// exactly and the segments can be chained into loops without a distance
/// tolerance.
use std::collections::{HashMap, HashSet};

use log::debug;
use nalgebra::{Matrix4, Point2, Point3, Rotation3, Vector2, Vector3};

use crate::error::SliceError;
use crate::geometry::Mesh;

/// Relative tolerance for dropping collinear and repeated points
const SIMPLIFY_EPSILON: f64 = 1e-9;

/// A cutting plane given by a point on it and its normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { origin, normal }
    }

    /// The z = 0 plane
    pub fn xy() -> Self {
        Self::new(Point3::origin(), Vector3::z())
    }

    /// Rotation taking +Z onto the plane normal
    fn rotation(&self) -> Result<Rotation3<f64>, SliceError> {
        let norm = self.normal.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(SliceError::DegenerateNormal);
        }
        let normal = self.normal / norm;
        Ok(Rotation3::rotation_between(&Vector3::z(), &normal)
            // Only undefined when the normal is -Z
            .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI)))
    }

    /// Affine map from the plane's local frame (z = 0) into 3D
    pub fn to_3d(&self) -> Result<Matrix4<f64>, SliceError> {
        Ok(Matrix4::new_translation(&self.origin.coords) * self.rotation()?.to_homogeneous())
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::xy()
    }
}

/// Closed outlines of a cross-section in the plane's 2D frame
#[derive(Debug, Clone, PartialEq)]
pub struct SliceResult {
    /// Each polyline is closed implicitly; the first point is not repeated
    pub polylines: Vec<Vec<Point2<f64>>>,
    /// Maps plane-local (x, y, 0) back into the mesh's frame
    pub to_3d: Matrix4<f64>,
}

impl SliceResult {
    /// Total enclosed area, each loop counted positive
    pub fn area(&self) -> f64 {
        self.polylines.iter().map(|p| signed_area(p).abs()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.polylines.iter().map(Vec::len).sum()
    }

    /// Map a plane-local 2D point back into the mesh's 3D frame
    pub fn lift(&self, p: &Point2<f64>) -> Point3<f64> {
        self.to_3d.transform_point(&Point3::new(p.x, p.y, 0.0))
    }
}

/// Where a cross-section point sits on the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum PointKey {
    Vertex(usize),
    Edge(usize, usize),
}

/// Intersect `mesh` with `plane`.
///
/// Returns `Ok(None)` when the plane misses the mesh or no drawable outline
/// remains after discarding polylines with fewer than two points.
pub fn section(mesh: &Mesh, plane: &Plane) -> Result<Option<SliceResult>, SliceError> {
    let to_3d = plane.to_3d()?;
    let rotation = plane.rotation()?;

    // Plane-local coordinates; z is the signed distance to the plane
    let local: Vec<Point3<f64>> = mesh
        .vertices
        .iter()
        .map(|v| Point3::from(rotation.inverse_transform_vector(&(v - plane.origin))))
        .collect();

    let mut points: HashMap<PointKey, Point2<f64>> = HashMap::new();
    let mut segments: Vec<(PointKey, PointKey)> = Vec::new();
    let mut seen: HashSet<(PointKey, PointKey)> = HashSet::new();

    for face in &mesh.faces {
        let Some([start, end]) = face_segment(&local, face) else {
            continue;
        };
        if start.0 == end.0 {
            continue;
        }
        // An on-plane edge is reported by both faces sharing it
        let key = if start.0 < end.0 {
            (start.0, end.0)
        } else {
            (end.0, start.0)
        };
        if !seen.insert(key) {
            continue;
        }
        for (k, p) in [start, end] {
            points.entry(k).or_insert(p);
        }
        segments.push((start.0, end.0));
    }

    let polylines: Vec<Vec<Point2<f64>>> = chain(&segments)
        .into_iter()
        .map(|keys| simplify(keys.iter().map(|k| points[k]).collect()))
        .filter(|polyline| polyline.len() >= 2)
        .collect();

    debug!(
        "Sliced {} faces into {} segments, {} polylines",
        mesh.faces.len(),
        segments.len(),
        polylines.len()
    );

    if polylines.is_empty() {
        return Ok(None);
    }

    Ok(Some(SliceResult { polylines, to_3d }))
}

/// Segment where one face meets the plane, if it meets it along a line.
///
/// Faces lying in the plane and faces touching it at a single vertex give
/// nothing; a face with an edge in the plane gives that edge whichever side
/// its third vertex is on.
fn face_segment(local: &[Point3<f64>], face: &[usize; 3]) -> Option<[(PointKey, Point2<f64>); 2]> {
    let side = face.map(|i| side_of(local[i].z));
    let vertex = |i: usize| (PointKey::Vertex(i), local[i].xy());

    match side.iter().filter(|&&s| s == 0).count() {
        2 => {
            let k = side.iter().position(|&s| s != 0)?;
            Some([vertex(face[(k + 1) % 3]), vertex(face[(k + 2) % 3])])
        }
        1 => {
            let k = side.iter().position(|&s| s == 0)?;
            let (j, l) = ((k + 1) % 3, (k + 2) % 3);
            (side[j] != side[l]).then(|| [vertex(face[k]), crossing(local, face[j], face[l])])
        }
        0 => {
            let mut ends = (0..3)
                .filter(|&k| side[k] != side[(k + 1) % 3])
                .map(|k| crossing(local, face[k], face[(k + 1) % 3]));
            Some([ends.next()?, ends.next()?])
        }
        _ => None,
    }
}

fn side_of(z: f64) -> i8 {
    if z > 0.0 {
        1
    } else if z < 0.0 {
        -1
    } else {
        0
    }
}

/// Crossing point of an edge whose ends lie on opposite sides, computed
/// from the lower index so both faces sharing the edge produce identical
/// coordinates
fn crossing(local: &[Point3<f64>], a: usize, b: usize) -> (PointKey, Point2<f64>) {
    let (a, b) = if a < b { (a, b) } else { (b, a) };
    let (pa, pb) = (local[a], local[b]);
    let t = pa.z / (pa.z - pb.z);
    (PointKey::Edge(a, b), pa.xy() + (pb.xy() - pa.xy()) * t)
}

/// Join segments sharing endpoints into polylines
fn chain(segments: &[(PointKey, PointKey)]) -> Vec<Vec<PointKey>> {
    let mut incident: HashMap<PointKey, Vec<usize>> = HashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        incident.entry(*a).or_default().push(i);
        incident.entry(*b).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut polylines = Vec::new();

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        used[first] = true;
        let (start, next) = segments[first];

        let mut polyline = vec![start, next];
        extend(&mut polyline, Some(start), segments, &incident, &mut used);

        if polyline.last() == Some(&start) {
            polyline.pop();
        } else {
            // Open chain: grow the other way from the first point too
            let mut back = vec![start];
            extend(&mut back, None, segments, &incident, &mut used);
            back.reverse();
            back.pop();
            back.append(&mut polyline);
            polyline = back;
        }

        polylines.push(polyline);
    }

    polylines
}

/// Walk on from the last point along unused segments until the chain
/// reaches `stop` or dead-ends
fn extend(
    polyline: &mut Vec<PointKey>,
    stop: Option<PointKey>,
    segments: &[(PointKey, PointKey)],
    incident: &HashMap<PointKey, Vec<usize>>,
    used: &mut [bool],
) {
    while let Some(&current) = polyline.last() {
        if polyline.len() > 1 && Some(current) == stop {
            return;
        }
        let Some(&seg) = incident[&current].iter().find(|&&s| !used[s]) else {
            return;
        };
        used[seg] = true;
        let (a, b) = segments[seg];
        polyline.push(if a == current { b } else { a });
    }
}

/// Drop repeated points and points lying on the line through their neighbours
fn simplify(mut polyline: Vec<Point2<f64>>) -> Vec<Point2<f64>> {
    let scale = polyline
        .iter()
        .map(|p| p.coords.amax())
        .fold(1.0_f64, f64::max);
    let eps = SIMPLIFY_EPSILON * scale;

    polyline.dedup_by(|a, b| (*a - *b).norm() <= eps);
    while polyline.len() > 1 && (polyline[0] - polyline[polyline.len() - 1]).norm() <= eps {
        polyline.pop();
    }

    let mut i = 0;
    while polyline.len() > 3 && i < polyline.len() {
        let n = polyline.len();
        let prev = polyline[(i + n - 1) % n];
        let next = polyline[(i + 1) % n];
        let (d0, d1): (Vector2<f64>, Vector2<f64>) = (polyline[i] - prev, next - polyline[i]);
        let collinear = d0.perp(&d1).abs() <= SIMPLIFY_EPSILON * d0.norm() * d1.norm();
        if collinear && d0.dot(&d1) > 0.0 {
            polyline.remove(i);
        } else {
            i += 1;
        }
    }

    polyline
}

/// Shoelace area, positive for counter-clockwise loops
pub fn signed_area(polyline: &[Point2<f64>]) -> f64 {
    let n = polyline.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let (a, b) = (polyline[i], polyline[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn triangle_prism() -> Mesh {
        Mesh::extrude(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(30.0, 0.0),
                Point2::new(0.0, 40.0),
            ],
            10.0,
        )
    }

    #[test]
    fn test_cube_middle_is_square() {
        let cube = Mesh::cube(20.0);
        let slice = section(&cube, &Plane::xy()).unwrap().unwrap();

        assert_eq!(slice.polylines.len(), 1);
        assert_eq!(slice.polylines[0].len(), 4);
        assert_relative_eq!(slice.area(), 400.0, epsilon = 1e-9);
        for p in &slice.polylines[0] {
            assert_relative_eq!(p.x.abs(), 10.0, epsilon = 1e-9);
            assert_relative_eq!(p.y.abs(), 10.0, epsilon = 1e-9);
        }
        assert_eq!(slice.to_3d, Matrix4::identity());
    }

    #[test]
    fn test_prism_is_triangle() {
        let slice = section(&triangle_prism(), &Plane::xy()).unwrap().unwrap();
        assert_eq!(slice.vertex_count(), 3);
        assert_relative_eq!(slice.area(), 600.0, epsilon = 1e-9);
    }

    #[test]
    fn test_plane_misses_mesh() {
        let plane = Plane::new(Point3::new(0.0, 0.0, 50.0), Vector3::z());
        assert_eq!(section(&Mesh::cube(20.0), &plane).unwrap(), None);
    }

    #[test]
    fn test_face_on_plane_outlines_from_either_side() {
        for dz in [10.0, -10.0] {
            let mut cube = Mesh::cube(20.0);
            cube.translate(Vector3::new(0.0, 0.0, dz));
            let slice = section(&cube, &Plane::xy()).unwrap().unwrap();
            assert_eq!(slice.polylines.len(), 1);
            assert_eq!(slice.polylines[0].len(), 4);
            assert_relative_eq!(slice.area(), 400.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_touching_vertex_gives_no_section() {
        // Tetrahedron standing on its apex at the origin
        let mut mesh = Mesh::new();
        let apex = mesh.add_vertex(Point3::origin());
        let a = mesh.add_vertex(Point3::new(1.0, 0.0, 1.0));
        let b = mesh.add_vertex(Point3::new(-1.0, 1.0, 1.0));
        let c = mesh.add_vertex(Point3::new(-1.0, -1.0, 1.0));
        mesh.add_face(apex, b, a);
        mesh.add_face(apex, c, b);
        mesh.add_face(apex, a, c);
        mesh.add_face(a, b, c);
        assert_eq!(section(&mesh, &Plane::xy()).unwrap(), None);
    }

    #[test]
    fn test_plane_through_vertices() {
        // Diagonal plane through four cube corners
        let cube = Mesh::cube(2.0);
        let plane = Plane::new(Point3::origin(), Vector3::new(1.0, -1.0, 0.0));
        let slice = section(&cube, &plane).unwrap().unwrap();
        assert_eq!(slice.polylines.len(), 1);
        assert_eq!(slice.polylines[0].len(), 4);
        assert_relative_eq!(slice.area(), 2.0 * 2.0_f64.sqrt() * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_bodies_two_loops() {
        let mut a = Mesh::cube(10.0);
        let mut b = Mesh::cube(10.0);
        b.translate(Vector3::new(30.0, 0.0, 0.0));
        let offset = a.vertices.len();
        a.vertices.extend(b.vertices);
        a.faces
            .extend(b.faces.iter().map(|f| f.map(|i| i + offset)));

        let slice = section(&a, &Plane::xy()).unwrap().unwrap();
        assert_eq!(slice.polylines.len(), 2);
        assert_relative_eq!(slice.area(), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tilted_plane_embedding() {
        let plane = Plane::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(0.0, 0.0, -2.0));
        let to_3d = plane.to_3d().unwrap();
        let origin = to_3d.transform_point(&Point3::origin());
        assert_relative_eq!(origin, Point3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        let normal = to_3d.transform_vector(&Vector3::z());
        assert_relative_eq!(normal, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_lift_lands_on_mesh_plane() {
        let mut cube = Mesh::cube(20.0);
        cube.translate(Vector3::new(0.0, 0.0, 5.0));
        let plane = Plane::new(Point3::new(0.0, 0.0, 3.0), Vector3::z());
        let slice = section(&cube, &plane).unwrap().unwrap();
        for p in &slice.polylines[0] {
            assert_relative_eq!(slice.lift(p).z, 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_normal() {
        let plane = Plane::new(Point3::origin(), Vector3::zeros());
        assert_eq!(
            section(&Mesh::cube(1.0), &plane),
            Err(SliceError::DegenerateNormal)
        );
    }

    #[test]
    fn test_signed_area_orientation() {
        let ccw = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
        ];
        assert_relative_eq!(signed_area(&ccw), 1.0);
        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert_relative_eq!(signed_area(&cw), -1.0);
    }
}
