/// One-page vector rendering of the sheet.
use nalgebra::Point2;
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref};

use crate::sheet::Sheet;

const POINTS_PER_MM: f64 = 72.0 / 25.4;

/// Outline stroke width in millimeters
const STROKE_MM: f64 = 0.5;
/// Light grey fill, 150/255 opaque
const FILL_GRAY: f32 = 200.0 / 255.0;
const FILL_ALPHA: f32 = 150.0 / 255.0;

const FILL_STATE: Name<'static> = Name(b"Fill");

/// Outlines of the items that reach the page, in millimeters (Y down).
///
/// Items lying entirely in scratch space are left out; the rest are kept
/// whole and clipped by the page when drawn.
pub fn page_outlines(sheet: &Sheet) -> Vec<Vec<Vec<Point2<f64>>>> {
    let scale = sheet.scale();
    sheet
        .items()
        .iter()
        .filter(|item| sheet.is_visible(item))
        .map(|item| {
            item.placed_outline()
                .map(|polyline| {
                    polyline
                        .iter()
                        .map(|p| scale.display_to_mm(p))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Render the sheet as a landscape page of its physical size
pub fn render_pdf(sheet: &Sheet) -> Vec<u8> {
    let (width_mm, height_mm) = sheet.size_mm();
    let (width, height) = (
        (width_mm * POINTS_PER_MM) as f32,
        (height_mm * POINTS_PER_MM) as f32,
    );
    // PDF user space is Y up from the bottom-left corner
    let to_page = |p: &Point2<f64>| {
        (
            (p.x * POINTS_PER_MM) as f32,
            ((height_mm - p.y) * POINTS_PER_MM) as f32,
        )
    };

    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let page_id = Ref::new(3);
    let content_id = Ref::new(4);
    let fill_state_id = Ref::new(5);

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id).kids([page_id]).count(1);

    let mut page = pdf.page(page_id);
    page.media_box(Rect::new(0.0, 0.0, width, height));
    page.parent(page_tree_id);
    page.contents(content_id);
    page.resources()
        .ext_g_states()
        .pair(FILL_STATE, fill_state_id);
    page.finish();

    pdf.ext_graphics(fill_state_id)
        .non_stroking_alpha(FILL_ALPHA);

    let mut content = Content::new();
    content.save_state();
    content.rect(0.0, 0.0, width, height);
    content.clip_nonzero();
    content.end_path();

    content.set_parameters(FILL_STATE);
    content.set_fill_rgb(FILL_GRAY, FILL_GRAY, FILL_GRAY);
    content.set_stroke_rgb(0.0, 0.0, 0.0);
    content.set_line_width((STROKE_MM * POINTS_PER_MM) as f32);

    for outline in page_outlines(sheet) {
        for polyline in &outline {
            let Some((first, rest)) = polyline.split_first() else {
                continue;
            };
            let (x, y) = to_page(first);
            content.move_to(x, y);
            for p in rest {
                let (x, y) = to_page(p);
                content.line_to(x, y);
            }
            content.close_path();
        }
        content.fill_even_odd_and_stroke();
    }

    content.restore_state();
    pdf.stream(content_id, &content.finish());

    pdf.finish()
}
