use anyhow::Context;
use directories::ProjectDirs;
use knuffel::Decode;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::params::DetectorParams;

pub const CONFIG_FILE: &str = "qrsd.kdl";

#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrsConfig {
    #[knuffel(child)]
    pub general: Option<GeneralConfig>,
    #[knuffel(child)]
    pub detector: Option<DetectorConfig>,
}

#[derive(Decode, Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[knuffel(property)]
    pub threads: Option<u32>,
    #[knuffel(property)]
    pub cache: Option<bool>,
}

/// Overrides for [`DetectorParams`]; absent properties keep the defaults.
#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[knuffel(property(name = "low-hz"))]
    pub low_hz: Option<f64>,
    #[knuffel(property(name = "high-hz"))]
    pub high_hz: Option<f64>,
    #[knuffel(property)]
    pub order: Option<u32>,
    #[knuffel(property(name = "window-ms"))]
    pub window_ms: Option<f64>,
    #[knuffel(property(name = "refractory-ms"))]
    pub refractory_ms: Option<f64>,
    #[knuffel(property(name = "threshold-fraction"))]
    pub threshold_fraction: Option<f64>,
    #[knuffel(property(name = "noise-ratio"))]
    pub noise_ratio: Option<f64>,
    #[knuffel(property(name = "min-rr-ms"))]
    pub min_rr_ms: Option<f64>,
    #[knuffel(property(name = "rr-factor"))]
    pub rr_factor: Option<f64>,
    #[knuffel(property(name = "delay-ms"))]
    pub delay_ms: Option<f64>,
    #[knuffel(property(name = "consensus-ms"))]
    pub consensus_ms: Option<f64>,
    #[knuffel(property(name = "max-corrections"))]
    pub max_corrections: Option<u32>,
}

impl DetectorConfig {
    fn apply(&self, params: &mut DetectorParams) {
        let floats = [
            (self.low_hz, &mut params.low_hz),
            (self.high_hz, &mut params.high_hz),
            (self.window_ms, &mut params.window_ms),
            (self.refractory_ms, &mut params.refractory_ms),
            (self.threshold_fraction, &mut params.threshold_fraction),
            (self.noise_ratio, &mut params.noise_ratio),
            (self.min_rr_ms, &mut params.min_rr_ms),
            (self.rr_factor, &mut params.rr_factor),
            (self.delay_ms, &mut params.delay_ms),
            (self.consensus_ms, &mut params.consensus_ms),
        ];
        for (value, slot) in floats {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(order) = self.order {
            params.filter_order = order as usize;
        }
        if let Some(max) = self.max_corrections {
            params.max_row_corrections = max as usize;
        }
    }
}

impl QrsConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config = knuffel::parse(CONFIG_FILE, content)?;
        Ok(config)
    }

    /// `qrsd.kdl` in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "qrsd", "qrsd").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Loads `explicit` if given, else the default config file if it exists,
    /// else the built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            info!("Loading config from {}", path.display());
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Worker threads for per-lead detection; 0 leaves the choice to rayon.
    pub fn threads(&self) -> usize {
        self.general.as_ref().and_then(|g| g.threads).unwrap_or(0) as usize
    }

    pub fn cache_enabled(&self) -> bool {
        self.general.as_ref().and_then(|g| g.cache).unwrap_or(false)
    }

    /// Detector parameters with the configured overrides, validated.
    pub fn params(&self) -> anyhow::Result<DetectorParams> {
        let mut params = DetectorParams::default();
        if let Some(detector) = &self.detector {
            detector.apply(&mut params);
        }
        params.validate().context("Invalid detector configuration")?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = QrsConfig::default();
        assert_eq!(config.threads(), 0);
        assert!(!config.cache_enabled());
        assert_eq!(config.params().unwrap(), DetectorParams::default());
    }

    #[test]
    fn test_parse_overrides() {
        let config = QrsConfig::parse(
            "general threads=4 cache=true\n\
             detector low-hz=4.0 high-hz=20.0 order=3 refractory-ms=250.0 max-corrections=16\n",
        )
        .unwrap();
        assert_eq!(config.threads(), 4);
        assert!(config.cache_enabled());

        let params = config.params().unwrap();
        assert_eq!(params.low_hz, 4.0);
        assert_eq!(params.high_hz, 20.0);
        assert_eq!(params.filter_order, 3);
        assert_eq!(params.refractory_ms, 250.0);
        assert_eq!(params.max_row_corrections, 16);
        assert_eq!(params.window_ms, 80.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = QrsConfig::parse("detector low-hz=20.0 high-hz=10.0\n").unwrap();
        assert!(config.params().is_err());
        assert!(QrsConfig::parse("detector low-hz=\"fast\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("qrsd-config-{}.kdl", std::process::id()));
        std::fs::write(&path, "detector delay-ms=0.0\n").unwrap();
        let config = QrsConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.params().unwrap().delay_ms, 0.0);
        std::fs::remove_file(&path).ok();

        assert!(QrsConfig::load(&path).is_err());
    }
}
