/// Conversions between slice, display and millimeter frames
use nalgebra::{Matrix3, Matrix4, Point2, Vector2, Vector3};

/// Default display units per millimeter
pub const DEFAULT_SCALE: f64 = 5.0;

/// Fixed uniform scale between millimeters and display units.
///
/// Three frames are involved:
/// - slice frame: millimeters, Y up (as produced by the slicer)
/// - display frame: display units, Y down (items are stored and moved here)
/// - export frame: millimeters, Y down (JSON and PDF)
///
/// The Y flip happens once in [`DisplayScale::slice_to_display`]; the
/// display and export frames differ only by the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    units_per_mm: f64,
}

impl DisplayScale {
    pub fn new(units_per_mm: f64) -> Self {
        Self { units_per_mm }
    }

    pub fn units_per_mm(&self) -> f64 {
        self.units_per_mm
    }

    /// Scale a slice-frame point into display units and mirror it vertically
    pub fn slice_to_display(&self, p: &Point2<f64>) -> Point2<f64> {
        self.flip_matrix().transform_point(p)
    }

    pub fn display_to_mm(&self, p: &Point2<f64>) -> Point2<f64> {
        *p / self.units_per_mm
    }

    pub fn mm_to_display(&self, p: &Point2<f64>) -> Point2<f64> {
        *p * self.units_per_mm
    }

    pub fn display_delta_to_mm(&self, v: &Vector2<f64>) -> Vector2<f64> {
        *v / self.units_per_mm
    }

    /// Homogeneous 2D matrix applied at ingestion: scale by S, then flip Y
    pub fn flip_matrix(&self) -> Matrix3<f64> {
        Matrix3::new_nonuniform_scaling(&Vector2::new(self.units_per_mm, -self.units_per_mm))
    }
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}

/// Transform builder for placement matrices
pub struct Transform;

impl Transform {
    /// Create a translation matrix
    pub fn translation_matrix(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Sheet placement of an item: translation by its position in
    /// millimeters, Z = 0, identity rotation and scale
    pub fn placement_matrix(position_mm: &Point2<f64>) -> Matrix4<f64> {
        Self::translation_matrix(position_mm.x, position_mm.y, 0.0)
    }

    /// Rows of a 4x4 matrix, as written to placement records
    pub fn rows(matrix: &Matrix4<f64>) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = matrix[(r, c)];
            }
        }
        rows
    }
}
