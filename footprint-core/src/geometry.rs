/// Indexed triangle mesh and analytic solids
use nalgebra::{Point2, Point3, Vector3};

/// A triangle face resolved to vertex positions
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub vertices: [Point3<f64>; 3],
    /// Indices of the vertices in the owning mesh
    pub indices: [usize; 3],
}

impl Triangle {
    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f64> {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(&(v2 - v0)).normalize()
    }
}

/// A 3D mesh of shared vertices and triangular faces
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            faces: Vec::with_capacity(faces),
        }
    }

    /// Append a vertex and return its index
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    pub fn add_face(&mut self, a: usize, b: usize, c: usize) {
        self.faces.push([a, b, c]);
    }

    /// Add a polygon face as a triangle fan around its first index
    pub fn add_polygon(&mut self, indices: &[usize]) {
        for i in 1..indices.len().saturating_sub(1) {
            self.add_face(indices[0], indices[i], indices[i + 1]);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(move |&[a, b, c]| Triangle {
            vertices: [self.vertices[a], self.vertices[b], self.vertices[c]],
            indices: [a, b, c],
        })
    }

    /// Axis-aligned bounds as (min, max), `None` for a mesh without vertices
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        }))
    }

    /// Move every vertex by `offset`
    pub fn translate(&mut self, offset: Vector3<f64>) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Create a box centered on the origin
    pub fn cuboid(size_x: f64, size_y: f64, size_z: f64) -> Self {
        let (hx, hy, hz) = (size_x / 2.0, size_y / 2.0, size_z / 2.0);
        let mut mesh = Self::with_capacity(8, 12);

        // Vertex index bits: 1 = +x, 2 = +y, 4 = +z
        for i in 0..8 {
            let x = if i & 1 == 0 { -hx } else { hx };
            let y = if i & 2 == 0 { -hy } else { hy };
            let z = if i & 4 == 0 { -hz } else { hz };
            mesh.add_vertex(Point3::new(x, y, z));
        }

        for face in [
            [0, 2, 3], [0, 3, 1], // -z
            [4, 5, 7], [4, 7, 6], // +z
            [0, 1, 5], [0, 5, 4], // -y
            [2, 6, 7], [2, 7, 3], // +y
            [0, 4, 6], [0, 6, 2], // -x
            [1, 3, 7], [1, 7, 5], // +x
        ] {
            mesh.faces.push(face);
        }

        mesh
    }

    /// Create a cube mesh for testing
    pub fn cube(size: f64) -> Self {
        Self::cuboid(size, size, size)
    }

    /// Extrude a convex, counter-clockwise outline along z, centered on z = 0
    pub fn extrude(outline: &[Point2<f64>], height: f64) -> Self {
        let n = outline.len();
        let half = height / 2.0;
        let mut mesh = Self::with_capacity(2 * n, 4 * n);

        for z in [-half, half] {
            for p in outline {
                mesh.add_vertex(Point3::new(p.x, p.y, z));
            }
        }

        for i in 0..n {
            let j = (i + 1) % n;
            mesh.add_face(i, j, n + j);
            mesh.add_face(i, n + j, n + i);
        }

        for k in 1..n.saturating_sub(1) {
            mesh.add_face(0, k + 1, k);
            mesh.add_face(n, n + k, n + k + 1);
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_faces_point_outward() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.faces.len(), 12);

        for triangle in cube.triangles() {
            let centroid = (triangle.vertices[0].coords
                + triangle.vertices[1].coords
                + triangle.vertices[2].coords)
                / 3.0;
            assert!(triangle.calculate_normal().dot(&centroid) > 0.0);
        }
    }

    #[test]
    fn test_extrude_counts_and_bounds() {
        let outline = [
            Point2::new(0.0, 0.0),
            Point2::new(30.0, 0.0),
            Point2::new(0.0, 40.0),
        ];
        let prism = Mesh::extrude(&outline, 10.0);
        assert_eq!(prism.vertices.len(), 6);
        assert_eq!(prism.faces.len(), 8);

        let (min, max) = prism.bounds().unwrap();
        assert_relative_eq!(min.z, -5.0);
        assert_relative_eq!(max.z, 5.0);
        assert_relative_eq!(max.y, 40.0);
    }

    #[test]
    fn test_add_polygon_fans() {
        let mut mesh = Mesh::new();
        for p in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            mesh.add_vertex(Point3::new(p.0, p.1, 0.0));
        }
        mesh.add_polygon(&[0, 1, 2, 3]);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(Mesh::new().bounds().is_none());
    }
}
