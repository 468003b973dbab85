//! Enhancement configuration
//!
//! JSON-backed settings: one toggle block per stage plus engine tuning.
//! Missing fields fall back to defaults, so a partial file only overrides
//! what it names.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuraError, Result};
use crate::separation::SeparationSpec;
use crate::stage::{CompressorParams, EqParams, GateParams, NormalizeParams, TrimParams};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnhanceConfig {
    pub separation: SeparationSettings,
    pub eq: EqSettings,
    pub gate: GateSettings,
    pub compressor: CompressorSettings,
    pub trim: TrimSettings,
    pub normalize: NormalizeSettings,
    pub engine: EngineSettings,
}

impl EnhanceConfig {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuraError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SeparationSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub spec: SeparationSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EqSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub params: EqParams,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            params: EqParams::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub params: GateParams,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            params: GateParams::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompressorSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub params: CompressorParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TrimSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub params: TrimParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub params: NormalizeParams,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            params: NormalizeParams::default(),
        }
    }
}

/// Engine tuning knobs shared by every job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Allow chunked parallel execution for long inputs.
    pub parallel_enabled: bool,
    /// Halve the chunk budget and use the lighter separation model.
    pub low_ram_mode: bool,
    /// Inputs at or below this duration always run as a single chunk.
    pub long_file_threshold_secs: u64,
    /// Upper bound on chunks regardless of core count.
    pub max_chunks: usize,
    /// Allow separation to use a detected GPU.
    pub gpu_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            parallel_enabled: true,
            low_ram_mode: false,
            long_file_threshold_secs: 300,
            max_chunks: 8,
            gpu_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_enable_the_light_chain() {
        let config = EnhanceConfig::default();
        assert!(!config.separation.enabled);
        assert!(config.eq.enabled);
        assert!(config.gate.enabled);
        assert!(!config.compressor.enabled);
        assert!(!config.trim.enabled);
        assert!(config.normalize.enabled);
        assert_eq!(config.engine.long_file_threshold_secs, 300);
        assert_eq!(config.engine.max_chunks, 8);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"compressor": {{"enabled": true, "ratio": 8.0}}, "engine": {{"max_chunks": 2}}}}"#
        )
        .unwrap();
        let config = EnhanceConfig::load(file.path()).unwrap();
        assert!(config.compressor.enabled);
        assert_eq!(config.compressor.params.ratio, 8.0);
        assert_eq!(config.engine.max_chunks, 2);
        // Untouched sections keep their defaults.
        assert!(config.eq.enabled);
        assert!(config.engine.parallel_enabled);
    }

    #[test]
    fn missing_file_is_reported_by_path() {
        let err = EnhanceConfig::load(Path::new("/nonexistent/aura.json")).unwrap_err();
        assert!(matches!(err, AuraError::FileNotFound { .. }));
    }
}
