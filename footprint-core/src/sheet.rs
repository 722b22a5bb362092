/// The layout surface: a fixed-size page holding placeable items
use nalgebra::{Point2, Vector2};

use crate::config::PageSize;
use crate::item::{PlaceableItem, Rect};
use crate::transform::DisplayScale;

/// A page of fixed physical size, measured in display units.
///
/// Items keep their add order, which is also their draw order. Positions are
/// not clamped: anything outside [`Sheet::bounds`] is scratch space.
#[derive(Debug, Clone)]
pub struct Sheet {
    width_mm: f64,
    height_mm: f64,
    scale: DisplayScale,
    items: Vec<PlaceableItem>,
}

impl Sheet {
    pub fn new(page: PageSize, scale: DisplayScale) -> Self {
        let (width_mm, height_mm) = page.dimensions_mm();
        Self {
            width_mm,
            height_mm,
            scale,
            items: Vec::new(),
        }
    }

    pub fn scale(&self) -> &DisplayScale {
        &self.scale
    }

    /// Physical size (width, height) in millimeters
    pub fn size_mm(&self) -> (f64, f64) {
        (self.width_mm, self.height_mm)
    }

    /// Page rectangle in display units, origin top-left
    pub fn bounds(&self) -> Rect {
        let max = self
            .scale
            .mm_to_display(&Point2::new(self.width_mm, self.height_mm));
        Rect::new(Point2::origin(), max)
    }

    pub fn center(&self) -> Point2<f64> {
        let bounds = self.bounds();
        Point2::new(bounds.width() / 2.0, bounds.height() / 2.0)
    }

    /// Add an item at the sheet center; returns its index
    pub fn add(&mut self, mut item: PlaceableItem) -> usize {
        item.position = self.center();
        self.items.push(item);
        self.items.len() - 1
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[PlaceableItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut PlaceableItem> {
        self.items.get_mut(index)
    }

    pub fn move_by(&mut self, index: usize, delta: &Vector2<f64>) {
        if let Some(item) = self.items.get_mut(index) {
            item.move_by(delta);
        }
    }

    pub fn move_to(&mut self, index: usize, position: Point2<f64>) {
        if let Some(item) = self.items.get_mut(index) {
            item.position = position;
        }
    }

    /// Topmost item under `point`, preferring the most recently added.
    ///
    /// Outlines that are open or degenerate are picked by their bounds.
    pub fn item_at(&self, point: &Point2<f64>) -> Option<usize> {
        self.items.iter().rposition(|item| {
            item.contains(point) || (item.bounds().contains(point) && !has_area(item))
        })
    }

    /// True when some part of the item lies on the page
    pub fn is_visible(&self, item: &PlaceableItem) -> bool {
        self.bounds().intersects(&item.bounds())
    }

    /// True when the whole item lies on the page
    pub fn contains_item(&self, item: &PlaceableItem) -> bool {
        self.bounds().contains_rect(&item.bounds())
    }
}

fn has_area(item: &PlaceableItem) -> bool {
    item.outline().iter().any(|polyline| polyline.len() >= 3)
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new(PageSize::default(), DisplayScale::default())
    }
}
