//! JSON-backed asset loading: reads a directory layout of condition, sensor,
//! task, method, and task-graph descriptions and feeds them to the engine
//! builder.
//!
//! Layout, relative to the configured asset root:
//!
//! ```text
//! conditions/<kind>/<name>.json      kind in {flag, notflag, comparison,
//!                                    propertycomparison, logical}
//! sensors/simple/<file>.json         settable scalar sensors
//! tasks/{primitive,compound,goal}/   loaded in that order so references
//!     <file>.json                    resolve front to back
//! methods/<file>.json
//! taskgraph.json                     recursive {task, children[]} nodes
//! ```
//!
//! A missing directory loads as empty; dangling names inside the specs are
//! not the loader's concern and surface as configuration errors when the
//! engine is built.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use contracts::assets::{
    ConditionSpec, MethodSpec, SensorSpec, TaskGraphSpec, TaskKind, TaskSpec,
};
use contracts::config::AssetConfig;
use htn_core::sensor::SimpleSensor;
use htn_core::EngineBuilder;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum AssetError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// A condition file sits under a directory the loader does not recognise.
    UnknownKind {
        path: PathBuf,
        kind: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Io { path, source } => {
                write!(f, "error reading {}: {}", path.display(), source)
            }
            AssetError::Parse { path, source } => {
                write!(f, "error parsing {}: {}", path.display(), source)
            }
            AssetError::UnknownKind { path, kind } => {
                write!(f, "unknown asset kind {} at {}", kind, path.display())
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { source, .. } => Some(source),
            AssetError::Parse { source, .. } => Some(source),
            AssetError::UnknownKind { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

pub fn load_config(path: impl AsRef<Path>) -> Result<AssetConfig, AssetError> {
    parse_file(path.as_ref())
}

/// Conditions keyed by file stem, kind taken from the parent directory.
pub fn load_conditions(
    config: &AssetConfig,
) -> Result<BTreeMap<String, ConditionSpec>, AssetError> {
    let root = Path::new(&config.asset_root).join(&config.condition_path);
    let mut conditions = BTreeMap::new();
    for kind_dir in subdirectories(&root)? {
        let kind = file_name(&kind_dir);
        for path in json_files(&kind_dir)? {
            let spec = condition_from_kind(&kind, &path)?;
            conditions.insert(file_stem(&path), spec);
        }
    }
    debug!(count = conditions.len(), "loaded conditions");
    Ok(conditions)
}

/// Settable scalar sensors; other sensor kinds are constructed
/// programmatically.
pub fn load_sensors(config: &AssetConfig) -> Result<Vec<SensorSpec>, AssetError> {
    let root = Path::new(&config.asset_root)
        .join(&config.sensor_path)
        .join("simple");
    let mut sensors = Vec::new();
    for path in json_files(&root)? {
        sensors.push(parse_file::<SensorSpec>(&path)?);
    }
    debug!(count = sensors.len(), "loaded sensors");
    Ok(sensors)
}

/// Task specs keyed by name, kind taken from the subdirectory, loaded in
/// primitive → compound → goal order.
pub fn load_task_specs(config: &AssetConfig) -> Result<BTreeMap<String, TaskSpec>, AssetError> {
    let root = Path::new(&config.asset_root).join(&config.task_path);
    let mut tasks = BTreeMap::new();
    for kind in TaskKind::LOAD_ORDER {
        for path in json_files(&root.join(kind.dir_name()))? {
            let mut spec = parse_file::<TaskSpec>(&path)?;
            spec.kind = kind;
            tasks.insert(spec.name.clone(), spec);
        }
    }
    debug!(count = tasks.len(), "loaded task specs");
    Ok(tasks)
}

pub fn load_methods(config: &AssetConfig) -> Result<BTreeMap<String, MethodSpec>, AssetError> {
    let root = Path::new(&config.asset_root).join(&config.method_path);
    let mut methods = BTreeMap::new();
    for path in json_files(&root)? {
        let spec = parse_file::<MethodSpec>(&path)?;
        methods.insert(spec.name.clone(), spec);
    }
    debug!(count = methods.len(), "loaded methods");
    Ok(methods)
}

pub fn load_task_graph(config: &AssetConfig) -> Result<TaskGraphSpec, AssetError> {
    let path = Path::new(&config.asset_root).join(&config.task_graph_path);
    parse_file(&path)
}

/// Everything a domain directory describes.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAssets {
    pub conditions: BTreeMap<String, ConditionSpec>,
    pub sensors: Vec<SensorSpec>,
    pub tasks: BTreeMap<String, TaskSpec>,
    pub methods: BTreeMap<String, MethodSpec>,
    pub graph: TaskGraphSpec,
}

pub fn load_domain(config: &AssetConfig) -> Result<DomainAssets, AssetError> {
    Ok(DomainAssets {
        conditions: load_conditions(config)?,
        sensors: load_sensors(config)?,
        tasks: load_task_specs(config)?,
        methods: load_methods(config)?,
        graph: load_task_graph(config)?,
    })
}

impl DomainAssets {
    /// Register every loaded asset on the builder. Scalar sensors also get
    /// the same-named property, matching how conditions reference them.
    pub fn apply(self, mut builder: EngineBuilder) -> EngineBuilder {
        for sensor in self.sensors {
            builder = builder
                .with_sensor(Rc::new(SimpleSensor::new(sensor.name.clone(), sensor.value)))
                .with_sensor_property(sensor.name);
        }
        for (name, spec) in &self.conditions {
            builder = builder.with_condition_spec(name.clone(), spec);
        }
        for spec in self.methods.into_values() {
            builder = builder.with_method(spec);
        }
        for spec in self.tasks.into_values() {
            builder = builder.with_task(spec);
        }
        builder.with_graph(self.graph)
    }
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

fn condition_from_kind(kind: &str, path: &Path) -> Result<ConditionSpec, AssetError> {
    match kind {
        "flag" => Ok(ConditionSpec::Flag(parse_file(path)?)),
        "notflag" => Ok(ConditionSpec::NotFlag(parse_file(path)?)),
        "comparison" => Ok(ConditionSpec::Comparison(parse_file(path)?)),
        "propertycomparison" => Ok(ConditionSpec::PropertyComparison(parse_file(path)?)),
        "logical" => Ok(ConditionSpec::Logical(parse_file(path)?)),
        other => Err(AssetError::UnknownKind {
            path: path.to_path_buf(),
            kind: other.to_string(),
        }),
    }
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AssetError> {
    let body = fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Immediate subdirectories, sorted by name. A missing root loads as empty.
fn subdirectories(root: &Path) -> Result<Vec<PathBuf>, AssetError> {
    list_entries(root, |path| path.is_dir())
}

/// `.json` files directly under `dir`, sorted by name. A missing directory
/// loads as empty.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, AssetError> {
    list_entries(dir, |path| {
        path.is_file() && path.extension().is_some_and(|ext| ext == "json")
    })
}

fn list_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, AssetError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %dir.display(), "asset directory absent, loading nothing");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(AssetError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AssetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
