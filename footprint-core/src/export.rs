/// Writing the arrangement: a PDF page plus JSON placement records.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ExportError, ExportResult};
use crate::pdf;
use crate::sheet::Sheet;
use crate::transform::Transform;

/// Files written by a successful export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub pdf_path: PathBuf,
    pub json_path: PathBuf,
    /// Entries in the JSON object (fewer than items when names collide)
    pub records: usize,
    /// Items drawn on the page
    pub on_page: usize,
}

/// `base.pdf` and `base.json`, after stripping a `.pdf` the user typed.
///
/// Suffixes are appended rather than substituted so a base like
/// `layout.v2` keeps its dot.
pub fn export_paths(base: &Path) -> (PathBuf, PathBuf) {
    let base = match base.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => base.with_extension(""),
        _ => base.to_path_buf(),
    };
    let with_suffix = |suffix: &str| {
        let mut name = OsString::from(base.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    };
    (with_suffix(".pdf"), with_suffix(".json"))
}

/// Map each item name to its 4x4 sheet placement, in add order.
///
/// Items sharing a name share a key: the later item's matrix replaces the
/// earlier one in place.
pub fn placement_records(sheet: &Sheet) -> Map<String, Value> {
    let scale = sheet.scale();
    let mut records = Map::new();
    for item in sheet.items() {
        let matrix = Transform::placement_matrix(&item.position_mm(scale));
        records.insert(item.name.clone(), Value::from(rows_value(&Transform::rows(&matrix))));
    }
    records
}

fn rows_value(rows: &[[f64; 4]; 4]) -> Vec<Value> {
    rows.iter()
        .map(|row| Value::from(row.iter().map(|&v| Value::from(v)).collect::<Vec<_>>()))
        .collect()
}

/// Pretty-print placement records with four-space indentation
pub fn records_to_json(records: &Map<String, Value>) -> ExportResult<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    Ok(buf)
}

fn write(path: &Path, bytes: &[u8]) -> ExportResult<()> {
    std::fs::write(path, bytes).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `base.pdf` and `base.json` for the current arrangement.
///
/// Returns `Ok(None)` without touching the filesystem when the sheet is
/// empty.
pub fn export(sheet: &Sheet, base: &Path) -> ExportResult<Option<ExportReport>> {
    if sheet.is_empty() {
        return Ok(None);
    }

    let (pdf_path, json_path) = export_paths(base);

    let records = placement_records(sheet);
    let json = records_to_json(&records)?;
    let on_page = pdf::page_outlines(sheet).len();

    write(&pdf_path, &pdf::render_pdf(sheet))?;
    if let Err(e) = write(&json_path, &json) {
        // Leave no half-written export behind
        if let Err(remove) = std::fs::remove_file(&pdf_path) {
            warn!("Could not remove {:?}: {}", pdf_path, remove);
        }
        return Err(e);
    }

    info!(
        "Exported {} items ({} on page) to {:?} and {:?}",
        sheet.len(),
        on_page,
        pdf_path,
        json_path
    );

    Ok(Some(ExportReport {
        pdf_path,
        json_path,
        records: records.len(),
        on_page,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::PlaceableItem;
    use crate::slice::SliceResult;
    use crate::transform::DisplayScale;
    use nalgebra::{Matrix4, Point2};

    fn item(name: &str) -> PlaceableItem {
        let slice = SliceResult {
            polylines: vec![vec![
                Point2::new(0.0, 0.0),
                Point2::new(4.0, 0.0),
                Point2::new(4.0, 4.0),
            ]],
            to_3d: Matrix4::identity(),
        };
        PlaceableItem::from_slice(name, &slice, &DisplayScale::default())
    }

    fn translation(records: &Map<String, Value>, name: &str) -> (f64, f64, f64) {
        let rows = records[name].as_array().unwrap();
        let at = |r: usize| rows[r][3].as_f64().unwrap();
        (at(0), at(1), at(2))
    }

    #[test]
    fn test_export_paths() {
        let (pdf, json) = export_paths(Path::new("/tmp/out/layout.pdf"));
        assert_eq!(pdf, PathBuf::from("/tmp/out/layout.pdf"));
        assert_eq!(json, PathBuf::from("/tmp/out/layout.json"));

        let (pdf, json) = export_paths(Path::new("template.v2"));
        assert_eq!(pdf, PathBuf::from("template.v2.pdf"));
        assert_eq!(json, PathBuf::from("template.v2.json"));
    }

    #[test]
    fn test_translation_is_display_over_scale() {
        let mut sheet = Sheet::default();
        let index = sheet.add(item("partA"));
        sheet.move_to(index, Point2::new(600.0, 427.5));

        let records = placement_records(&sheet);
        assert_eq!(translation(&records, "partA"), (120.0, 85.5, 0.0));

        let rows = records["partA"].as_array().unwrap();
        assert_eq!(rows[0][0].as_f64(), Some(1.0));
        assert_eq!(rows[1][1].as_f64(), Some(1.0));
        assert_eq!(rows[3][3].as_f64(), Some(1.0));
        assert_eq!(rows[0][1].as_f64(), Some(0.0));
    }

    #[test]
    fn test_same_position_distinct_names() {
        let mut sheet = Sheet::default();
        sheet.add(item("a"));
        sheet.add(item("b"));

        let records = placement_records(&sheet);
        assert_eq!(records.len(), 2);
        assert_eq!(translation(&records, "a"), translation(&records, "b"));
    }

    #[test]
    fn test_name_collision_keeps_later_item() {
        let mut sheet = Sheet::default();
        sheet.add(item("part"));
        sheet.add(item("other"));
        let later = sheet.add(item("part"));
        sheet.move_to(later, Point2::new(50.0, 25.0));

        let records = placement_records(&sheet);
        assert_eq!(records.len(), 2);
        assert_eq!(translation(&records, "part"), (10.0, 5.0, 0.0));
        // Collided key keeps its first position in the object
        assert_eq!(records.keys().next().map(String::as_str), Some("part"));
    }

    #[test]
    fn test_json_layout() {
        let mut sheet = Sheet::default();
        let index = sheet.add(item("partA"));
        sheet.move_to(index, Point2::new(600.0, 427.5));

        let text = String::from_utf8(records_to_json(&placement_records(&sheet)).unwrap()).unwrap();
        assert!(text.starts_with("{\n    \"partA\": [\n        [\n            1.0,"));
        assert!(text.contains("120.0"));
        assert!(text.contains("85.5"));
    }

    #[test]
    fn test_empty_sheet_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("layout");
        assert_eq!(export(&Sheet::default(), &base).unwrap(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = Sheet::default();
        sheet.add(item("a"));

        let report = export(&sheet, &dir.path().join("layout.pdf")).unwrap().unwrap();
        assert_eq!(report.pdf_path, dir.path().join("layout.pdf"));
        assert_eq!(report.records, 1);
        assert_eq!(report.on_page, 1);

        let json: Map<String, Value> =
            serde_json::from_slice(&std::fs::read(&report.json_path).unwrap()).unwrap();
        assert_eq!(translation(&json, "a"), (210.0, 148.5, 0.0));
        assert!(std::fs::read(&report.pdf_path).unwrap().starts_with(b"%PDF-"));
    }

    #[test]
    fn test_failed_json_write_removes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = Sheet::default();
        sheet.add(item("a"));

        // A directory in the way of the JSON file
        std::fs::create_dir(dir.path().join("layout.json")).unwrap();
        let err = export(&sheet, &dir.path().join("layout")).unwrap_err();
        assert!(matches!(err, ExportError::Write { ref path, .. } if path.ends_with("layout.json")));
        assert!(!dir.path().join("layout.pdf").exists());
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let mut sheet = Sheet::default();
        sheet.add(item("a"));

        let base = dir.path().join("missing").join("layout");
        let err = export(&sheet, &base).unwrap_err();
        assert!(matches!(err, ExportError::Write { ref path, .. } if path.ends_with("layout.pdf")));
    }
}
