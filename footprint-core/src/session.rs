/// The layout session: load models onto a sheet, arrange them, export.
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::LayoutConfig;
use crate::error::{ExportResult, LoadError};
use crate::export::{self, ExportReport};
use crate::geometry::Mesh;
use crate::item::PlaceableItem;
use crate::loader;
use crate::sheet::Sheet;
use crate::slice;

/// Result of adding one file from a batch
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: PathBuf,
    pub name: String,
    /// Index of the new item on the sheet
    pub result: Result<usize, LoadError>,
}

impl LoadOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    config: LayoutConfig,
    sheet: Sheet,
}

impl Session {
    pub fn new(config: LayoutConfig) -> Self {
        let sheet = Sheet::new(config.page, config.display_scale());
        Self { config, sheet }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheet
    }

    /// Load, slice and place each file in order.
    ///
    /// A failing file is reported in its outcome and does not stop the
    /// rest of the batch.
    pub fn add_models<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<LoadOutcome> {
        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let name = loader::model_name(path);
                let result = loader::load_mesh(path)
                    .map_err(LoadError::from)
                    .and_then(|mesh| self.add_mesh(&name, &mesh));
                if let Err(e) = &result {
                    warn!("Skipping {:?}: {}", path, e);
                }
                LoadOutcome {
                    path: path.to_path_buf(),
                    name,
                    result,
                }
            })
            .collect()
    }

    /// Slice an in-memory mesh and place its footprint at the sheet center
    pub fn add_mesh(&mut self, name: &str, mesh: &Mesh) -> Result<usize, LoadError> {
        let section = slice::section(mesh, &self.config.plane())?.ok_or_else(|| {
            LoadError::NoCrossSection {
                name: name.to_string(),
            }
        })?;

        let item = PlaceableItem::from_slice(name, &section, self.sheet.scale());
        let index = self.sheet.add(item);
        info!(
            "Placed {} ({} polylines, {:.1} mm^2)",
            name,
            section.polylines.len(),
            section.area()
        );
        Ok(index)
    }

    pub fn clear(&mut self) {
        info!("Cleared {} items", self.sheet.len());
        self.sheet.clear();
    }

    /// Export to `base`, or to the configured name when `base` is `None`
    pub fn export(&self, base: Option<&Path>) -> ExportResult<Option<ExportReport>> {
        let base = base.unwrap_or_else(|| Path::new(&self.config.export_name));
        export::export(&self.sheet, base)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}
