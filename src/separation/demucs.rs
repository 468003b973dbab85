//! Demucs command-line backend
//!
//! Drives the `demucs` executable as a child process: writes the input to a
//! scratch WAV, runs two-stem separation, and reads the stems back. Keeping
//! the model out of process means a crashed or killed inference never takes
//! the engine down with it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};
use uuid::Uuid;

use crate::audio::{io, SampleBuffer};
use crate::error::{AuraError, Result};

use super::{Separated, SeparationSpec, Separator};

const DEMUCS_BIN: &str = "demucs";

pub struct DemucsCli {
    binary: PathBuf,
}

impl DemucsCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEMUCS_BIN),
        }
    }

    /// Use a specific executable instead of resolving `demucs` on PATH.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, buffer: &SampleBuffer, spec: &SeparationSpec) -> Result<Separated> {
        let device = spec.device.resolve()?;
        let work_dir = std::env::temp_dir().join(format!("aura-demucs-{}", Uuid::new_v4()));
        fs::create_dir_all(&work_dir)?;

        let result = self.run_in(&work_dir, buffer, spec, device);
        if let Err(err) = fs::remove_dir_all(&work_dir) {
            warn!("failed to clean up scratch dir {}: {}", work_dir.display(), err);
        }
        result
    }

    fn run_in(
        &self,
        work_dir: &Path,
        buffer: &SampleBuffer,
        spec: &SeparationSpec,
        device: &str,
    ) -> Result<Separated> {
        let input_path = work_dir.join("input.wav");
        io::encode_wav(buffer, &input_path)?;

        debug!(
            "running demucs model={} device={} frames={}",
            spec.model.model_id(),
            device,
            buffer.num_frames()
        );

        let output = Command::new(&self.binary)
            .arg("--two-stems=vocals")
            .args(["-n", spec.model.model_id()])
            .args(["-d", device])
            .arg("-o")
            .arg(work_dir)
            .arg(&input_path)
            .output()
            .map_err(|err| AuraError::ModelUnavailable {
                model: spec.model.model_id().to_string(),
                reason: format!("failed to launch {}: {}", self.binary.display(), err),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("out of memory") || stderr.contains("CUDA error") {
                return Err(AuraError::ResourceExhausted {
                    details: stderr.trim().to_string(),
                });
            }
            return Err(AuraError::Inference {
                reason: format!(
                    "demucs exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        // Demucs writes <out>/<model>/<input-stem>/{vocals,no_vocals}.wav
        let stem_dir = work_dir.join(spec.model.model_id()).join("input");
        let vocals = io::decode_wav(&stem_dir.join("vocals.wav"))?;
        let accompaniment = io::decode_wav(&stem_dir.join("no_vocals.wav"))?;
        Ok(Separated {
            vocals,
            accompaniment,
        })
    }
}

impl Default for DemucsCli {
    fn default() -> Self {
        Self::new()
    }
}

impl Separator for DemucsCli {
    fn separate(&self, buffer: &SampleBuffer, spec: &SeparationSpec) -> Result<Separated> {
        self.run(buffer, spec)
    }

    fn name(&self) -> &'static str {
        "demucs"
    }

    fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--help")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}
