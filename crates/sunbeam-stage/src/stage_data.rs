//! Static stage data.
//!
//! On construction a stage loads the directory of configuration files at
//! `<stage_data_root>/<stage_name>/` into a nested read-only mapping. The
//! file extension dispatches the parser; directories become nested maps; a
//! predicate may exclude directories at load time.
//!
//! A missing stage-data directory is not an error: many stages carry no
//! static data.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use ndarray::Array1;
use ndarray_npy::ReadNpyExt;
use tracing::info;
use walkdir::WalkDir;

use sunbeam_core::{ConfigError, PipelineError};

/// One parsed stage-data item.
#[derive(Debug, Clone, PartialEq)]
pub enum StageData {
    Directory(BTreeMap<String, StageData>),
    Toml(toml::Value),
    Json(serde_json::Value),
    /// CSV rows, outer Vec per record.
    Csv(Vec<Vec<String>>),
    /// A one-dimensional `f64` array from a `.npy` file.
    Array(Vec<f64>),
    /// Anything with an unrecognized extension.
    Bytes(Vec<u8>),
}

impl StageData {
    pub fn as_directory(&self) -> Option<&BTreeMap<String, StageData>> {
        match self {
            Self::Directory(map) => Some(map),
            _ => None,
        }
    }
}

/// Load the static data tree for `stage_name`. `predicate` receives each
/// directory name below the stage root and may exclude it (and everything
/// under it).
pub fn load_stage_data(
    root: &Path,
    stage_name: &str,
    predicate: &dyn Fn(&str) -> bool,
) -> Result<BTreeMap<String, StageData>, PipelineError> {
    let stage_root = root.join(stage_name);
    let mut data = BTreeMap::new();

    if !stage_root.is_dir() {
        info!(stage = stage_name, "no static stage data found");
        return Ok(data);
    }

    let walker = WalkDir::new(&stage_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry.file_type().is_dir()
                || entry
                    .file_name()
                    .to_str()
                    .map(predicate)
                    .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            PipelineError::Store(std::io::Error::from(e).into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(&stage_root)
            .unwrap_or(entry.path());
        let item = load_item(entry.path())?;
        insert_nested(&mut data, relative, item);
    }

    Ok(data)
}

fn insert_nested(root: &mut BTreeMap<String, StageData>, relative: &Path, item: StageData) {
    let mut components: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .collect();

    let Some(file_name) = components.pop() else {
        return;
    };
    let key = Path::new(&file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&file_name)
        .to_string();

    let mut node = root;
    for part in components {
        node = match node
            .entry(part)
            .or_insert_with(|| StageData::Directory(BTreeMap::new()))
        {
            StageData::Directory(map) => map,
            // A file and a directory with the same stem collide; the
            // directory wins.
            other => {
                *other = StageData::Directory(BTreeMap::new());
                match other {
                    StageData::Directory(map) => map,
                    _ => unreachable!(),
                }
            }
        };
    }
    node.insert(key, item);
}

fn load_item(path: &Path) -> Result<StageData, PipelineError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parse_error = |message: String| {
        PipelineError::Config(ConfigError::Parse {
            what: format!("stage data file {}", path.display()),
            message,
        })
    };

    match extension.as_str() {
        "toml" => {
            let text = fs::read_to_string(path).map_err(io_error)?;
            let value = toml::from_str(&text).map_err(|e| parse_error(e.to_string()))?;
            Ok(StageData::Toml(value))
        }
        "json" => {
            let text = fs::read_to_string(path).map_err(io_error)?;
            let value = serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?;
            Ok(StageData::Json(value))
        }
        "csv" => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(path)
                .map_err(|e| parse_error(e.to_string()))?;
            let mut rows = Vec::new();
            for record in reader.records() {
                let record = record.map_err(|e| parse_error(e.to_string()))?;
                rows.push(record.iter().map(str::to_string).collect());
            }
            Ok(StageData::Csv(rows))
        }
        "npy" => {
            let file = fs::File::open(path).map_err(io_error)?;
            let array = Array1::<f64>::read_npy(file).map_err(|e| parse_error(e.to_string()))?;
            Ok(StageData::Array(array.to_vec()))
        }
        _ => {
            let bytes = fs::read(path).map_err(io_error)?;
            Ok(StageData::Bytes(bytes))
        }
    }
}

fn io_error(e: std::io::Error) -> PipelineError {
    PipelineError::Store(e.into())
}
