/// Placeable footprints of sliced meshes
use nalgebra::{Matrix4, Point2, Vector2};

use crate::slice::SliceResult;
use crate::transform::DisplayScale;

/// Axis-aligned rectangle in display units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Rect {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: &Point2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(&other.min) && self.contains(&other.max)
    }

    pub fn translate(&self, offset: &Vector2<f64>) -> Rect {
        Rect::new(self.min + *offset, self.max + *offset)
    }
}

/// A mesh footprint placed on the sheet.
///
/// `outline` is in display units relative to `position`, already mirrored
/// into the Y-down display frame. It is never transformed again.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceableItem {
    pub name: String,
    outline: Vec<Vec<Point2<f64>>>,
    /// Slice plane to mesh frame, kept for composing with the placement later
    reference_transform: Matrix4<f64>,
    pub position: Point2<f64>,
}

impl PlaceableItem {
    /// Scale and flip a slice into the display frame, placed at the origin
    pub fn from_slice(name: impl Into<String>, slice: &SliceResult, scale: &DisplayScale) -> Self {
        let outline: Vec<Vec<Point2<f64>>> = slice
            .polylines
            .iter()
            .map(|polyline| polyline.iter().map(|p| scale.slice_to_display(p)).collect())
            .collect();

        Self {
            name: name.into(),
            outline,
            reference_transform: slice.to_3d,
            position: Point2::origin(),
        }
    }

    pub fn outline(&self) -> &[Vec<Point2<f64>>] {
        &self.outline
    }

    pub fn reference_transform(&self) -> &Matrix4<f64> {
        &self.reference_transform
    }

    /// Outline polylines at the item's current position
    pub fn placed_outline(&self) -> impl Iterator<Item = Vec<Point2<f64>>> + '_ {
        self.outline
            .iter()
            .map(move |polyline| polyline.iter().map(|p| *p + self.position.coords).collect::<Vec<_>>())
    }

    /// Bounds of the outline relative to the item position
    pub fn local_bounds(&self) -> Rect {
        let mut points = self.outline.iter().flatten();
        let Some(first) = points.next() else {
            return Rect::new(Point2::origin(), Point2::origin());
        };
        points.fold(Rect::new(*first, *first), |r, p| {
            Rect::new(r.min.inf(p), r.max.sup(p))
        })
    }

    /// Bounds at the current position
    pub fn bounds(&self) -> Rect {
        self.local_bounds().translate(&self.position.coords)
    }

    /// Even-odd point-in-outline test, in sheet display units
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        let local = *p - self.position.coords;
        let mut inside = false;
        for polyline in &self.outline {
            let n = polyline.len();
            for i in 0..n {
                let (a, b) = (polyline[i], polyline[(i + n - 1) % n]);
                if (a.y > local.y) != (b.y > local.y)
                    && local.x < (b.x - a.x) * (local.y - a.y) / (b.y - a.y) + a.x
                {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub fn move_by(&mut self, delta: &Vector2<f64>) {
        self.position += *delta;
    }

    /// Position in the export frame (millimeters, Y down)
    pub fn position_mm(&self, scale: &DisplayScale) -> Point2<f64> {
        scale.display_to_mm(&self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_slice() -> SliceResult {
        SliceResult {
            polylines: vec![vec![
                Point2::new(-10.0, -5.0),
                Point2::new(10.0, -5.0),
                Point2::new(10.0, 15.0),
                Point2::new(-10.0, 15.0),
            ]],
            to_3d: Matrix4::new_translation(&nalgebra::Vector3::new(0.0, 0.0, 7.0)),
        }
    }

    #[test]
    fn test_flip_baked_once() {
        let scale = DisplayScale::new(5.0);
        let item = PlaceableItem::from_slice("part", &square_slice(), &scale);
        assert_relative_eq!(item.outline()[0][2], Point2::new(50.0, -75.0));

        let bounds = item.local_bounds();
        assert_relative_eq!(bounds.min, Point2::new(-50.0, -75.0));
        assert_relative_eq!(bounds.max, Point2::new(50.0, 25.0));
        assert_eq!(item.reference_transform()[(2, 3)], 7.0);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let scale = DisplayScale::default();
        let slice = square_slice();
        let a = PlaceableItem::from_slice("a", &slice, &scale);
        let b = PlaceableItem::from_slice("a", &slice, &scale);
        assert_eq!(a, b);
    }

    #[test]
    fn test_contains_follows_position() {
        let scale = DisplayScale::default();
        let mut item = PlaceableItem::from_slice("part", &square_slice(), &scale);
        assert!(item.contains(&Point2::new(0.0, 0.0)));
        assert!(!item.contains(&Point2::new(60.0, 0.0)));

        item.move_by(&Vector2::new(100.0, 0.0));
        assert!(item.contains(&Point2::new(100.0, 0.0)));
        assert!(!item.contains(&Point2::new(0.0, 0.0)));
        assert_relative_eq!(item.position_mm(&scale), Point2::new(20.0, 0.0));
    }

    #[test]
    fn test_rect_relations() {
        let sheet = Rect::new(Point2::new(0.0, 0.0), Point2::new(100.0, 50.0));
        let inside = Rect::new(Point2::new(10.0, 10.0), Point2::new(20.0, 20.0));
        let straddling = inside.translate(&Vector2::new(85.0, 0.0));
        let outside = inside.translate(&Vector2::new(200.0, 0.0));

        assert!(sheet.contains_rect(&inside));
        assert!(sheet.intersects(&straddling) && !sheet.contains_rect(&straddling));
        assert!(!sheet.intersects(&outside));
    }
}
