use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::params::DetectorParams;

pub const CACHE_EXTENSION: &str = "qrsc";

/// Detections stored beside an input file, together with everything that
/// produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCache {
    pub params: DetectorParams,
    pub sample_rate: u32,
    pub leads: Vec<usize>,
    /// Size of the input file in bytes when the cache was written.
    pub source_len: u64,
    pub beats: Vec<usize>,
}

/// `<input>.qrsc`
pub fn cache_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let mut name = input.as_ref().as_os_str().to_owned();
    name.push(".");
    name.push(CACHE_EXTENSION);
    PathBuf::from(name)
}

impl DetectionCache {
    pub fn matches(&self, params: &DetectorParams, sample_rate: u32, leads: &[usize], source_len: u64) -> bool {
        &self.params == params && self.sample_rate == sample_rate && self.leads == leads && self.source_len == source_len
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read cache {}", path.display()))?;
        let cache = bincode::deserialize(&bytes).with_context(|| format!("Corrupt cache {}", path.display()))?;
        Ok(cache)
    }

    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = bincode::serialize(self).context("Failed to serialize cache")?;
        std::fs::write(path, bytes).with_context(|| format!("Failed to write cache {}", path.display()))?;
        debug!("Stored {} beats in {}", self.beats.len(), path.display());
        Ok(())
    }

    /// Cached beats for `input`, if a cache exists and every key matches.
    pub fn lookup<P: AsRef<Path>>(
        input: P,
        params: &DetectorParams,
        sample_rate: u32,
        leads: &[usize],
    ) -> Option<Vec<usize>> {
        let input = input.as_ref();
        let path = cache_path(input);
        if !path.is_file() {
            return None;
        }
        let source_len = std::fs::metadata(input).ok()?.len();
        match Self::load(&path) {
            Ok(cache) if cache.matches(params, sample_rate, leads, source_len) => {
                info!("Using cached detections from {}", path.display());
                Some(cache.beats)
            }
            Ok(_) => {
                debug!("Cache {} is stale", path.display());
                None
            }
            Err(e) => {
                warn!("Ignoring cache: {:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_appends_extension() {
        assert_eq!(cache_path("data/rec.csv"), PathBuf::from("data/rec.csv.qrsc"));
        assert_eq!(cache_path("noext"), PathBuf::from("noext.qrsc"));
    }

    #[test]
    fn test_store_and_lookup() {
        let input = std::env::temp_dir().join(format!("qrsd-cache-{}.csv", std::process::id()));
        std::fs::write(&input, "0\n1\n2\n").unwrap();
        let source_len = std::fs::metadata(&input).unwrap().len();
        let params = DetectorParams::default();

        assert_eq!(DetectionCache::lookup(&input, &params, 250, &[0]), None);

        let cache = DetectionCache {
            params: params.clone(),
            sample_rate: 250,
            leads: vec![0],
            source_len,
            beats: vec![10, 260, 510],
        };
        cache.store(cache_path(&input)).unwrap();
        assert_eq!(DetectionCache::load(cache_path(&input)).unwrap(), cache);

        assert_eq!(DetectionCache::lookup(&input, &params, 250, &[0]), Some(vec![10, 260, 510]));
        assert_eq!(DetectionCache::lookup(&input, &params, 360, &[0]), None);
        assert_eq!(DetectionCache::lookup(&input, &params, 250, &[0, 1]), None);
        let other = DetectorParams { delay_ms: 0.0, ..Default::default() };
        assert_eq!(DetectionCache::lookup(&input, &other, 250, &[0]), None);

        // a changed input invalidates the cache
        std::fs::write(&input, "0\n1\n2\n3\n").unwrap();
        assert_eq!(DetectionCache::lookup(&input, &params, 250, &[0]), None);

        std::fs::remove_file(cache_path(&input)).ok();
        std::fs::remove_file(&input).ok();
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let input = std::env::temp_dir().join(format!("qrsd-corrupt-{}.csv", std::process::id()));
        std::fs::write(&input, "0\n").unwrap();
        std::fs::write(cache_path(&input), b"not a cache").unwrap();
        assert!(DetectionCache::load(cache_path(&input)).is_err());
        assert_eq!(DetectionCache::lookup(&input, &DetectorParams::default(), 250, &[0]), None);
        std::fs::remove_file(cache_path(&input)).ok();
        std::fs::remove_file(&input).ok();
    }
}
