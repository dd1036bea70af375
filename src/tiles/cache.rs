use super::spec::TileSpec;
use crate::core::constants::CACHE_DIR_NAME;
use crate::Result;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// On-disk tile store.
///
/// Maps every [`TileSpec`] to a stable file path
/// `<root>/<server-key>/<z>/<x>/<y>.<ext>`. The server key combines a
/// sanitised server name with a hash of the fields that make two specs
/// distinct, so the mapping stays injective even for servers sharing a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted in the per-user cache directory
    /// (`~/.cache/mapview`, `~/Library/Caches/mapview`, `%LOCALAPPDATA%\mapview`).
    pub fn user_default() -> Self {
        Self::new(default_cache_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a tile, whether or not it exists yet
    pub fn path_for(&self, spec: &TileSpec) -> PathBuf {
        let server = &spec.server;
        self.root
            .join(server_key(spec))
            .join(spec.zoom().to_string())
            .join(spec.x().to_string())
            .join(format!("{}.{}", spec.y(), server.file_extension()))
    }

    /// Returns the cached file for `spec`, if there is one
    pub fn get(&self, spec: &TileSpec) -> Option<PathBuf> {
        let path = self.path_for(spec);
        path.is_file().then_some(path)
    }

    pub fn contains(&self, spec: &TileSpec) -> bool {
        self.get(spec).is_some()
    }

    /// Writes tile bytes, creating parent directories as needed. The data is
    /// written to a temporary sibling first so readers never see a partial file.
    pub fn store(&self, spec: &TileSpec, data: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(spec);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let partial = path.with_extension("part");
        std::fs::write(&partial, data)?;
        std::fs::rename(&partial, &path)?;
        Ok(path)
    }
}

impl Default for DiskCache {
    fn default() -> Self {
        Self::user_default()
    }
}

/// Platform cache directory for the crate, falling back to the system temp
/// directory when the platform has none.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIR_NAME)
}

fn server_key(spec: &TileSpec) -> String {
    let server = &spec.server;
    let mut hasher = fxhash::FxHasher64::default();
    server.url_template.hash(&mut hasher);
    server.subdomains.hash(&mut hasher);
    server.tile_size.hash(&mut hasher);

    let name: String = server
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{}-{:016x}", name, hasher.finish())
}
