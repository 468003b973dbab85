//! Pipeline construction
//!
//! Turns a validated configuration into the ordered stage list one job runs.
//! Construction is all-or-nothing: the first invalid parameter aborts with
//! no partial pipeline.

use log::warn;

use crate::config::EnhanceConfig;
use crate::error::Result;
use crate::stage::StageConfig;

/// An ordered, validated list of stages.
///
/// Caller order is authoritative. A suspicious order (tonal stages before
/// separation, which will then discard their work on the dropped stem) is
/// logged but never silently reordered.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    stages: Vec<StageConfig>,
}

impl PipelineSpec {
    /// Build from explicit stages in caller order.
    pub fn from_stages(stages: Vec<StageConfig>) -> Result<Self> {
        for stage in &stages {
            stage.validate()?;
        }
        warn_on_order_hazard(&stages);
        Ok(Self { stages })
    }

    /// Build from a configuration, taking enabled stages in the fixed
    /// chain order: separation, eq, gate, compressor, trim, normalize.
    pub fn from_config(config: &EnhanceConfig) -> Result<Self> {
        let mut stages = Vec::new();
        if config.separation.enabled {
            let mut spec = config.separation.spec;
            if config.engine.low_ram_mode {
                spec.model = spec.model.lighter();
            }
            if !config.engine.gpu_enabled {
                spec.device = crate::separation::DevicePreference::Cpu;
            }
            stages.push(StageConfig::Separation(spec));
        }
        if config.eq.enabled {
            stages.push(StageConfig::Eq(config.eq.params));
        }
        if config.gate.enabled {
            stages.push(StageConfig::NoiseGate(config.gate.params));
        }
        if config.compressor.enabled {
            stages.push(StageConfig::Compressor(config.compressor.params));
        }
        if config.trim.enabled {
            stages.push(StageConfig::SilenceTrim(config.trim.params));
        }
        if config.normalize.enabled {
            stages.push(StageConfig::Normalize(config.normalize.params));
        }
        Self::from_stages(stages)
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages that run per chunk, in caller order.
    pub fn chunk_stages(&self) -> Vec<&StageConfig> {
        self.stages.iter().filter(|s| s.is_chunkable()).collect()
    }

    /// Whole-buffer stages that run after stitching, in caller order.
    pub fn tail_stages(&self) -> Vec<&StageConfig> {
        self.stages.iter().filter(|s| !s.is_chunkable()).collect()
    }

    /// Sum of progress weights across all stages.
    pub fn total_weight(&self) -> f64 {
        self.stages.iter().map(|s| s.progress_weight()).sum()
    }
}

fn warn_on_order_hazard(stages: &[StageConfig]) {
    let separation_at = stages
        .iter()
        .position(|s| matches!(s, StageConfig::Separation(_)));
    if let Some(sep) = separation_at {
        for stage in &stages[..sep] {
            if matches!(
                stage,
                StageConfig::Eq(_) | StageConfig::NoiseGate(_) | StageConfig::Compressor(_)
            ) {
                warn!(
                    "{} runs before separation; its effect on the discarded stem is wasted",
                    stage.label()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnhanceConfig;
    use crate::error::AuraError;
    use crate::separation::{DevicePreference, ModelKind};
    use crate::stage::{EqParams, GateParams};

    #[test]
    fn default_config_builds_eq_gate_normalize() {
        let pipeline = PipelineSpec::from_config(&EnhanceConfig::default()).unwrap();
        let labels: Vec<_> = pipeline.stages().iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["eq", "gate", "normalize"]);
    }

    #[test]
    fn low_ram_downgrades_the_separation_model() {
        let mut config = EnhanceConfig::default();
        config.separation.enabled = true;
        config.engine.low_ram_mode = true;
        let pipeline = PipelineSpec::from_config(&config).unwrap();
        match &pipeline.stages()[0] {
            StageConfig::Separation(spec) => {
                assert_eq!(spec.model, ModelKind::HtDemucsLight);
            }
            other => panic!("expected separation first, got {}", other.label()),
        }
    }

    #[test]
    fn gpu_disabled_forces_cpu() {
        let mut config = EnhanceConfig::default();
        config.separation.enabled = true;
        config.engine.gpu_enabled = false;
        let pipeline = PipelineSpec::from_config(&config).unwrap();
        match &pipeline.stages()[0] {
            StageConfig::Separation(spec) => {
                assert_eq!(spec.device, DevicePreference::Cpu);
            }
            other => panic!("expected separation first, got {}", other.label()),
        }
    }

    #[test]
    fn first_invalid_parameter_aborts_construction() {
        let stages = vec![
            StageConfig::Eq(EqParams {
                low_gain_db: 99.0,
                ..Default::default()
            }),
            StageConfig::NoiseGate(GateParams::default()),
        ];
        let err = PipelineSpec::from_stages(stages).unwrap_err();
        assert!(matches!(
            err,
            AuraError::InvalidParameter {
                stage: "eq",
                param: "low_gain_db",
                ..
            }
        ));
    }

    #[test]
    fn partition_respects_caller_order() {
        let stages = vec![
            StageConfig::Eq(EqParams::default()),
            StageConfig::SilenceTrim(Default::default()),
            StageConfig::NoiseGate(GateParams::default()),
            StageConfig::Normalize(Default::default()),
        ];
        let pipeline = PipelineSpec::from_stages(stages).unwrap();
        let chunk: Vec<_> = pipeline.chunk_stages().iter().map(|s| s.label()).collect();
        let tail: Vec<_> = pipeline.tail_stages().iter().map(|s| s.label()).collect();
        assert_eq!(chunk, vec!["eq", "gate"]);
        assert_eq!(tail, vec!["trim", "normalize"]);
    }
}
