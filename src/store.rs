//! Persistence for region definitions.

use crate::error::{Result, ZoneError};
use crate::regions::{export_regions, import_regions, Region};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage backend holding the authoritative region list
pub trait RegionStore {
    fn load_regions(&self) -> Result<Vec<Region>>;

    /// Replace the stored list with `regions`
    fn save_regions(&self, regions: &[Region]) -> Result<()>;

    fn delete_region(&self, id: &str) -> Result<()> {
        let mut regions = self.load_regions()?;
        let before = regions.len();
        regions.retain(|r| r.id != id);
        if regions.len() == before {
            return Err(ZoneError::RegionNotFound(id.to_string()));
        }
        self.save_regions(&regions)
    }
}

/// Regions kept as a JSON array in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegionStore for JsonFileStore {
    /// A missing file is an empty store
    fn load_regions(&self) -> Result<Vec<Region>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no region file yet");
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.path)?;
        let regions = import_regions(&json)?;
        info!(path = %self.path.display(), count = regions.len(), "regions loaded");
        Ok(regions)
    }

    fn save_regions(&self, regions: &[Region]) -> Result<()> {
        let json = export_regions(regions)?;
        // Write next to the target and rename so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), count = regions.len(), "regions saved");
        Ok(())
    }
}
