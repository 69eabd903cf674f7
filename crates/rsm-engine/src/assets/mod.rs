//! Asset providers.
//!
//! Everything the engine loads (WGSL, OBJ/MTL, images) is addressed by a
//! `/`-separated path relative to some root and read through `AssetSource`.
//! Hosts pick the backing store: a directory, an in-memory map, the shaders
//! compiled into this crate, or a `Layered` stack of those.

pub mod obj;
pub mod textures;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};

pub trait AssetSource {
    /// Whole file contents. Missing files are `EngineError::AssetNotFound`.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// File names (not paths) directly inside `dir`, sorted.
    fn list(&self, dir: &str) -> Result<Vec<String>>;

    /// `read` decoded as UTF-8.
    fn source(&self, path: &str) -> Result<String> {
        String::from_utf8(self.read(path)?).map_err(|e| EngineError::asset(path, e))
    }

    fn length(&self, path: &str) -> Result<usize> {
        Ok(self.read(path)?.len())
    }
}

fn not_found(path: &str) -> EngineError {
    EngineError::AssetNotFound {
        path: path.to_owned(),
    }
}

/// Joins an asset directory and a file name.
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{dir}/{name}")
    }
}

/// Directory part of an asset path, `""` for top-level files.
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

// ── filesystem ──────────────────────────────────────────────────────────────

/// Files under a root directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

fn io_error(path: &str, err: io::Error) -> EngineError {
    if err.kind() == io::ErrorKind::NotFound {
        not_found(path)
    } else {
        EngineError::asset(path, err)
    }
}

impl AssetSource for DirAssetSource {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        std::fs::read(self.resolve(path)).map_err(|e| io_error(path, e))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(self.resolve(dir)).map_err(|e| io_error(dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(dir, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                names.push(name.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn length(&self, path: &str) -> Result<usize> {
        let meta = std::fs::metadata(self.resolve(path)).map_err(|e| io_error(path, e))?;
        Ok(meta.len() as usize)
    }
}

// ── memory ──────────────────────────────────────────────────────────────────

/// In-memory files keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetSource for MemoryAssetSource {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .files
            .keys()
            .filter(|path| parent(path) == dir.trim_end_matches('/'))
            .map(|path| path.rsplit('/').next().unwrap_or(path).to_owned())
            .collect();
        if names.is_empty() {
            return Err(not_found(dir));
        }
        Ok(names)
    }

    fn length(&self, path: &str) -> Result<usize> {
        self.files.get(path).map(Vec::len).ok_or_else(|| not_found(path))
    }
}

// ── embedded shaders ────────────────────────────────────────────────────────

const SHADERS: &[(&str, &str)] = &[
    (
        "shaders/deferred_shading.fs.wgsl",
        include_str!("../../shaders/deferred_shading.fs.wgsl"),
    ),
    (
        "shaders/fullscreen.vs.wgsl",
        include_str!("../../shaders/fullscreen.vs.wgsl"),
    ),
    (
        "shaders/gbuffer.fs.wgsl",
        include_str!("../../shaders/gbuffer.fs.wgsl"),
    ),
    (
        "shaders/gbuffer.vs.wgsl",
        include_str!("../../shaders/gbuffer.vs.wgsl"),
    ),
    (
        "shaders/indirect_illumination.fs.wgsl",
        include_str!("../../shaders/indirect_illumination.fs.wgsl"),
    ),
    (
        "shaders/present.fs.wgsl",
        include_str!("../../shaders/present.fs.wgsl"),
    ),
    ("shaders/rsm.fs.wgsl", include_str!("../../shaders/rsm.fs.wgsl")),
    ("shaders/rsm.vs.wgsl", include_str!("../../shaders/rsm.vs.wgsl")),
];

/// The WGSL programs shipped with the engine, under `shaders/`.
#[derive(Debug, Copy, Clone, Default)]
pub struct EmbeddedShaders;

impl AssetSource for EmbeddedShaders {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.source(path).map(String::into_bytes)
    }

    fn source(&self, path: &str) -> Result<String> {
        SHADERS
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, text)| (*text).to_owned())
            .ok_or_else(|| not_found(path))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        if dir.trim_end_matches('/') != "shaders" {
            return Err(not_found(dir));
        }
        Ok(SHADERS
            .iter()
            .map(|(p, _)| p.trim_start_matches("shaders/").to_owned())
            .collect())
    }
}

// ── layered ─────────────────────────────────────────────────────────────────

/// Sources searched in insertion order; the first one that has a file wins.
///
/// Only `AssetNotFound` falls through to the next layer. Any other error (an
/// unreadable file, bad UTF-8) is returned as is.
#[derive(Default)]
pub struct Layered {
    layers: Vec<Box<dyn AssetSource>>,
}

impl Layered {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, layer: impl AssetSource + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn first_hit<T>(&self, path: &str, f: impl Fn(&dyn AssetSource) -> Result<T>) -> Result<T> {
        for layer in &self.layers {
            match f(layer.as_ref()) {
                Err(EngineError::AssetNotFound { .. }) => continue,
                other => return other,
            }
        }
        Err(not_found(path))
    }
}

impl AssetSource for Layered {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.first_hit(path, |layer| layer.read(path))
    }

    fn source(&self, path: &str) -> Result<String> {
        self.first_hit(path, |layer| layer.source(path))
    }

    fn length(&self, path: &str) -> Result<usize> {
        self.first_hit(path, |layer| layer.length(path))
    }

    /// Union of every layer's listing.
    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut found = false;
        for layer in &self.layers {
            match layer.list(dir) {
                Ok(listed) => {
                    found = true;
                    names.extend(listed);
                }
                Err(EngineError::AssetNotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        if !found {
            return Err(not_found(dir));
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reads_and_measures() {
        let mut assets = MemoryAssetSource::new();
        assets.insert("models/box.obj", "v 0 0 0\n");
        assert_eq!(assets.source("models/box.obj").unwrap(), "v 0 0 0\n");
        assert_eq!(assets.length("models/box.obj").unwrap(), 8);
        assert!(matches!(
            assets.read("models/none.obj"),
            Err(EngineError::AssetNotFound { path }) if path == "models/none.obj"
        ));
    }

    #[test]
    fn memory_listing_is_one_level_deep() {
        let mut assets = MemoryAssetSource::new();
        assets
            .insert("textures/b.png", [0u8])
            .insert("textures/a.png", [0u8])
            .insert("textures/nested/c.png", [0u8])
            .insert("top.txt", "x");
        assert_eq!(assets.list("textures").unwrap(), ["a.png", "b.png"]);
        assert_eq!(assets.list("textures/").unwrap(), ["a.png", "b.png"]);
        assert_eq!(assets.list("").unwrap(), ["top.txt"]);
        assert!(assets.list("missing").is_err());
    }

    #[test]
    fn invalid_utf8_is_an_asset_error() {
        let mut assets = MemoryAssetSource::new();
        assets.insert("bad.wgsl", vec![0xff, 0xfe]);
        assert!(matches!(assets.source("bad.wgsl"), Err(EngineError::Asset { .. })));
    }

    #[test]
    fn embedded_shaders_cover_every_stage_file() {
        let names = EmbeddedShaders.list("shaders").unwrap();
        assert_eq!(names.len(), 8);
        for name in names {
            let text = EmbeddedShaders.source(&join("shaders", &name)).unwrap();
            assert!(text.contains("fn "), "{name} looks empty");
        }
    }

    #[test]
    fn layered_prefers_earlier_layers() {
        let mut overrides = MemoryAssetSource::new();
        overrides.insert("shaders/present.fs.wgsl", "// override");
        let assets = Layered::new().with(overrides).with(EmbeddedShaders);

        assert_eq!(assets.source("shaders/present.fs.wgsl").unwrap(), "// override");
        assert!(assets.source("shaders/gbuffer.vs.wgsl").unwrap().contains("vs_main"));
        assert!(matches!(
            assets.read("shaders/none.wgsl"),
            Err(EngineError::AssetNotFound { .. })
        ));
        assert_eq!(assets.list("shaders").unwrap().len(), 8);
    }

    #[test]
    fn dir_source_maps_missing_files() {
        let assets = DirAssetSource::new(env!("CARGO_MANIFEST_DIR"));
        assert!(assets.source("shaders/gbuffer.fs.wgsl").unwrap().contains("fs_main"));
        assert!(assets.list("shaders").unwrap().contains(&"rsm.vs.wgsl".to_owned()));
        assert!(matches!(
            assets.read("shaders/none.wgsl"),
            Err(EngineError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn path_helpers() {
        assert_eq!(join("models/", "a.obj"), "models/a.obj");
        assert_eq!(join("", "a.obj"), "a.obj");
        assert_eq!(parent("models/box/box.obj"), "models/box");
        assert_eq!(parent("box.obj"), "");
    }
}
