/// Mesh file loading for STL, OBJ and PLY.
///
/// The format is chosen by extension. STL goes through the parser in
/// [`crate::stl`]; OBJ and PLY are delegated to `tobj` and `ply-rs`.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, info};
use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{MeshError, MeshResult};
use crate::geometry::Mesh;
use crate::stl;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    Ply,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "stl" => Some(MeshFormat::Stl),
                "obj" => Some(MeshFormat::Obj),
                "ply" => Some(MeshFormat::Ply),
                _ => None,
            })
    }
}

/// Name an item after its source file, without directory or extension.
pub fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load a mesh from file, auto-detecting format from extension.
pub fn load_mesh(path: &Path) -> MeshResult<Mesh> {
    let format = MeshFormat::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })?;

    info!("Loading mesh from {:?} (format: {:?})", path, format);

    let mesh = match format {
        MeshFormat::Stl => load_stl(path)?,
        MeshFormat::Obj => load_obj(path)?,
        MeshFormat::Ply => load_ply(path)?,
    };

    if mesh.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    check_indices(&mesh, path)?;

    if let Some((min, max)) = mesh.bounds() {
        debug!(
            "Loaded {} vertices, {} faces; bounds [{:.1}, {:.1}, {:.1}] to [{:.1}, {:.1}, {:.1}]",
            mesh.vertices.len(),
            mesh.faces.len(),
            min.x,
            min.y,
            min.z,
            max.x,
            max.y,
            max.z
        );
    }

    Ok(mesh)
}

fn load_stl(path: &Path) -> MeshResult<Mesh> {
    let data = std::fs::read(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    stl::parse_stl(&data).map_err(|details| MeshError::parse(path, details))
}

fn load_obj(path: &Path) -> MeshResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| match e {
        tobj::LoadError::OpenFileFailed => MeshError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
        },
        other => MeshError::parse(path, other.to_string()),
    })?;

    // Merge all models into a single mesh
    let mut mesh = Mesh::new();
    for model in &models {
        let offset = mesh.vertices.len();
        for chunk in model.mesh.positions.chunks_exact(3) {
            mesh.add_vertex(Point3::new(
                f64::from(chunk[0]),
                f64::from(chunk[1]),
                f64::from(chunk[2]),
            ));
        }
        for chunk in model.mesh.indices.chunks_exact(3) {
            mesh.add_face(
                offset + chunk[0] as usize,
                offset + chunk[1] as usize,
                offset + chunk[2] as usize,
            );
        }
    }

    debug!("OBJ merged {} models", models.len());
    Ok(mesh)
}

fn load_ply(path: &Path) -> MeshResult<Mesh> {
    let file = File::open(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .map_err(|e| MeshError::parse(path, format!("failed to parse PLY header: {e}")))?;
    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| MeshError::parse(path, format!("failed to read PLY payload: {e}")))?;

    let mut mesh = Mesh::new();

    if let Some(vertices) = payload.get("vertex") {
        for element in vertices {
            let coord = |key: &str| {
                float_property(element, key)
                    .ok_or_else(|| MeshError::parse(path, format!("vertex is missing {key}")))
            };
            mesh.add_vertex(Point3::new(coord("x")?, coord("y")?, coord("z")?));
        }
    }

    if let Some(faces) = payload.get("face") {
        for element in faces {
            mesh.add_polygon(&index_list(element, path)?);
        }
    }

    Ok(mesh)
}

fn float_property(element: &DefaultElement, key: &str) -> Option<f64> {
    match element.get(key)? {
        Property::Float(v) => Some(f64::from(*v)),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(f64::from(*v)),
        Property::Short(v) => Some(f64::from(*v)),
        _ => None,
    }
}

fn index_list(element: &DefaultElement, path: &Path) -> MeshResult<Vec<usize>> {
    for key in ["vertex_indices", "vertex_index"] {
        if let Some(prop) = element.get(key) {
            return match prop {
                Property::ListInt(v) => signed_indices(v, path),
                Property::ListUInt(v) => Ok(v.iter().map(|&i| i as usize).collect()),
                Property::ListShort(v) => signed_indices(v, path),
                Property::ListUShort(v) => Ok(v.iter().map(|&i| usize::from(i)).collect()),
                Property::ListChar(v) => signed_indices(v, path),
                Property::ListUChar(v) => Ok(v.iter().map(|&i| usize::from(i)).collect()),
                _ => continue,
            };
        }
    }
    Ok(Vec::new())
}

fn signed_indices<T>(values: &[T], path: &Path) -> MeshResult<Vec<usize>>
where
    T: Copy + std::fmt::Display,
    usize: TryFrom<T>,
{
    values
        .iter()
        .map(|&i| {
            usize::try_from(i)
                .map_err(|_| MeshError::parse(path, format!("negative face index {i}")))
        })
        .collect()
}

fn check_indices(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let count = mesh.vertices.len();
    match mesh.faces.iter().flatten().find(|&&i| i >= count) {
        Some(i) => Err(MeshError::parse(
            path,
            format!("face references vertex {i} of {count}"),
        )),
        None => Ok(()),
    }
}
