/// Character-grid rasterizer for the layout sheet
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use footprint_core::{Rect, Sheet};
use nalgebra::{Point2, Vector2};
use std::io::Write;

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f64 = 2.0;

/// Scratch space shown around the page, as a fraction of its size
pub const SCRATCH_MARGIN: f64 = 0.1;

const ITEM_CHAR: char = '*';
const SELECTED_CHAR: char = '#';

/// Display area shown in the terminal: the page plus a scratch margin
pub fn view_area(sheet: &Sheet) -> Rect {
    let bounds = sheet.bounds();
    let margin = Vector2::new(bounds.width(), bounds.height()) * SCRATCH_MARGIN;
    Rect::new(bounds.min - margin, bounds.max + margin)
}

/// Maps sheet display units to terminal cells and back
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Display point at the top-left corner of cell (0, 0)
    origin: Point2<f64>,
    units_per_col: f64,
    units_per_row: f64,
}

impl Viewport {
    /// Fit `area` into a grid of `cols` x `rows` cells, centered, keeping
    /// its aspect ratio
    pub fn fit(area: &Rect, cols: u16, rows: u16) -> Self {
        let cols = f64::from(cols.max(1));
        let rows = f64::from(rows.max(1));
        let units_per_col = (area.width() / cols).max(area.height() / (rows * CELL_ASPECT));
        let units_per_row = units_per_col * CELL_ASPECT;

        let used = Vector2::new(cols * units_per_col, rows * units_per_row);
        let center = nalgebra::center(&area.min, &area.max);
        Self {
            origin: center - used / 2.0,
            units_per_col,
            units_per_row,
        }
    }

    /// Fractional cell coordinates of a display point
    pub fn to_cell(&self, p: &Point2<f64>) -> (f64, f64) {
        (
            (p.x - self.origin.x) / self.units_per_col,
            (p.y - self.origin.y) / self.units_per_row,
        )
    }

    /// Display point under the center of a cell
    pub fn cell_center(&self, col: u16, row: u16) -> Point2<f64> {
        Point2::new(
            self.origin.x + (f64::from(col) + 0.5) * self.units_per_col,
            self.origin.y + (f64::from(row) + 0.5) * self.units_per_row,
        )
    }

    /// Display distance covered by moving the pointer by whole cells
    pub fn cell_delta(&self, cols: i32, rows: i32) -> Vector2<f64> {
        Vector2::new(
            f64::from(cols) * self.units_per_col,
            f64::from(rows) * self.units_per_row,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    color: Color,
}

const BLANK: Cell = Cell {
    ch: ' ',
    color: Color::Reset,
};

/// Character buffer the sheet is drawn into before being flushed
pub struct SheetRenderer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl SheetRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![BLANK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = vec![BLANK; width * height];
    }

    pub fn clear(&mut self) {
        self.cells.fill(BLANK);
    }

    /// Draw the page border and every item outline; the selected item is
    /// drawn last so it stays on top
    pub fn render_sheet(&mut self, sheet: &Sheet, viewport: &Viewport, selected: Option<usize>) {
        let page = sheet.bounds();
        let (x0, y0) = viewport.to_cell(&page.min);
        let (x1, y1) = viewport.to_cell(&page.max);
        self.draw_rect(x0, y0, x1, y1, Color::DarkGrey);

        let items = sheet.items();
        let order = (0..items.len())
            .filter(|&i| Some(i) != selected)
            .chain(selected.filter(|&i| i < items.len()));

        for index in order {
            let (ch, color) = if Some(index) == selected {
                (SELECTED_CHAR, Color::Yellow)
            } else {
                (ITEM_CHAR, Color::Cyan)
            };
            for polyline in items[index].placed_outline() {
                let cells: Vec<_> = polyline.iter().map(|p| viewport.to_cell(p)).collect();
                for (i, &a) in cells.iter().enumerate() {
                    let b = cells[(i + 1) % cells.len()];
                    self.draw_line(a, b, ch, color);
                }
            }
        }
    }

    fn draw_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, color: Color) {
        self.draw_line((x0, y0), (x1, y0), '-', color);
        self.draw_line((x0, y1), (x1, y1), '-', color);
        self.draw_line((x0, y0), (x0, y1), '|', color);
        self.draw_line((x1, y0), (x1, y1), '|', color);
        for (x, y) in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
            self.plot(x.floor() as i64, y.floor() as i64, '+', color);
        }
    }

    /// Bresenham line between fractional cell coordinates
    fn draw_line(&mut self, a: (f64, f64), b: (f64, f64), ch: char, color: Color) {
        let (mut x, mut y) = (a.0.floor() as i64, a.1.floor() as i64);
        let (x1, y1) = (b.0.floor() as i64, b.1.floor() as i64);

        let (w, h) = (self.width as i64, self.height as i64);
        if (x < 0 && x1 < 0) || (y < 0 && y1 < 0) || (x >= w && x1 >= w) || (y >= h && y1 >= h) {
            return;
        }

        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.plot(x, y, ch, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn plot(&mut self, x: i64, y: i64, ch: char, color: Color) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.cells[y as usize * self.width + x as usize] = Cell { ch, color };
        }
    }

    /// Write text starting at a cell, clipped to the buffer
    pub fn print(&mut self, col: usize, row: usize, text: &str, color: Color) {
        if row >= self.height {
            return;
        }
        for (x, ch) in (col..self.width).zip(text.chars()) {
            self.cells[row * self.width + x] = Cell { ch, color };
        }
    }

    /// Centered message box with a title bar
    pub fn draw_notice(&mut self, title: &str, message: &str, color: Color) {
        if self.width < 8 || self.height < 5 {
            return;
        }
        let max_inner = (self.width - 4).min(60);
        let mut lines = wrap(message, max_inner);
        lines.push(String::new());
        lines.push("(press any key)".to_string());

        let inner = lines
            .iter()
            .map(|l| l.chars().count())
            .chain(std::iter::once(title.chars().count() + 2))
            .max()
            .unwrap_or(0)
            .min(max_inner);
        let (box_w, box_h) = (inner + 4, (lines.len() + 2).min(self.height));
        let left = (self.width - box_w) / 2;
        let top = (self.height - box_h) / 2;

        for row in top..top + box_h {
            let edge = row == top || row == top + box_h - 1;
            let line: String = (0..box_w)
                .map(|x| match (edge, x == 0 || x == box_w - 1) {
                    (true, true) => '+',
                    (true, false) => '-',
                    (false, true) => '|',
                    (false, false) => ' ',
                })
                .collect();
            self.print(left, row, &line, color);
        }
        self.print(left + 2, top, &format!(" {} ", title), color);
        for (i, line) in lines.iter().take(box_h.saturating_sub(2)).enumerate() {
            self.print(left + 2, top + 1 + i, line, Color::White);
        }
    }

    /// Characters of one row, for inspection
    pub fn row_text(&self, row: usize) -> String {
        self.cells[row * self.width..(row + 1) * self.width]
            .iter()
            .map(|c| c.ch)
            .collect()
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            // Raw mode does not return the carriage on newline
            writer.queue(cursor::MoveTo(0, y as u16))?;
            let mut color = None;
            for cell in &self.cells[y * self.width..(y + 1) * self.width] {
                if color != Some(cell.color) {
                    writer.queue(SetForegroundColor(cell.color))?;
                    color = Some(cell.color);
                }
                writer.queue(Print(cell.ch))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Greedy word wrap; words longer than `width` are split
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for chunk in chars.chunks(width) {
            let chunk: String = chunk.iter().collect();
            let needed = current.chars().count() + usize::from(!current.is_empty()) + chunk.chars().count();
            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&chunk);
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use footprint_core::{Mesh, Session};

    #[test]
    fn test_viewport_fit_and_mapping() {
        let area = Rect::new(Point2::new(0.0, 0.0), Point2::new(200.0, 100.0));
        let viewport = Viewport::fit(&area, 100, 25);

        let (col, row) = viewport.to_cell(&Point2::new(100.0, 50.0));
        assert_relative_eq!(col, 50.0);
        assert_relative_eq!(row, 12.5);
        assert_relative_eq!(viewport.cell_center(0, 0), Point2::new(1.0, 2.0));
        assert_relative_eq!(viewport.cell_delta(3, -1), Vector2::new(6.0, -4.0));
    }

    #[test]
    fn test_viewport_letterboxes_wide_terminal() {
        let area = Rect::new(Point2::new(0.0, 0.0), Point2::new(100.0, 100.0));
        let viewport = Viewport::fit(&area, 200, 25);

        // Height limits the scale; the area is centered horizontally
        assert_relative_eq!(viewport.cell_delta(1, 1), Vector2::new(2.0, 4.0));
        let (col, _) = viewport.to_cell(&Point2::new(50.0, 50.0));
        assert_relative_eq!(col, 100.0);
    }

    #[test]
    fn test_render_border_and_items() {
        let mut session = Session::default();
        session.add_mesh("a", &Mesh::cube(100.0)).unwrap();
        let sheet = session.sheet();

        let mut renderer = SheetRenderer::new(80, 24);
        let viewport = Viewport::fit(&view_area(sheet), 80, 24);
        renderer.render_sheet(sheet, &viewport, None);

        let (_, top) = viewport.to_cell(&sheet.bounds().min);
        let border = renderer.row_text(top.floor() as usize);
        assert!(border.contains("+---"));

        let text: String = (0..24).map(|r| renderer.row_text(r)).collect();
        assert!(text.contains('*'));
        assert!(!text.contains('#'));

        renderer.clear();
        renderer.render_sheet(sheet, &viewport, Some(0));
        let text: String = (0..24).map(|r| renderer.row_text(r)).collect();
        assert!(text.contains('#'));
    }

    #[test]
    fn test_lines_off_grid_are_clipped() {
        let mut renderer = SheetRenderer::new(10, 5);
        renderer.draw_line((-50.0, 2.0), (50.0, 2.0), '*', Color::White);
        assert_eq!(renderer.row_text(2), "**********");
        renderer.draw_line((-50.0, -3.0), (50.0, -3.0), '#', Color::White);
        assert!((0..5).all(|r| !renderer.row_text(r).contains('#')));
    }

    #[test]
    fn test_notice_box() {
        let mut renderer = SheetRenderer::new(40, 10);
        renderer.draw_notice("Error", "could not read part.stl", Color::Red);

        let text: Vec<String> = (0..10).map(|r| renderer.row_text(r)).collect();
        assert!(text.iter().any(|l| l.contains(" Error ")));
        assert!(text.iter().any(|l| l.contains("could not read part.stl")));
        assert!(text.iter().any(|l| l.contains("(press any key)")));
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 4), vec![""]);
    }
}
