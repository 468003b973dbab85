//! GPU detection for device resolution
//!
//! Probes NVIDIA hardware through nvidia-smi. Other vendors report as no
//! GPU, which resolves `Auto` device preference to CPU.

use serde::{Deserialize, Serialize};
use std::process::Command;

/// Minimum free VRAM for running separation models on the GPU.
const MIN_USABLE_VRAM_GB: f32 = 2.0;

/// Information about the detected GPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuInfo {
    /// GPU name/model
    pub name: String,
    /// Total VRAM in GB
    pub vram_total_gb: f32,
    /// Available/free VRAM in GB
    pub vram_available_gb: f32,
    /// Driver version
    pub driver_version: String,
    /// Whether the GPU has enough free memory for separation
    pub usable: bool,
}

impl GpuInfo {
    /// Detect GPU information from the system.
    ///
    /// Returns None if no compatible GPU is found.
    pub fn detect() -> Option<Self> {
        Self::detect_nvidia()
    }

    fn detect_nvidia() -> Option<Self> {
        let output = Command::new("nvidia-smi")
            .args([
                "--query-gpu=name,memory.total,memory.free,driver_version",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next()?;
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() < 4 {
            return None;
        }

        let vram_total_mb: f32 = parts[1].parse().ok()?;
        let vram_free_mb: f32 = parts[2].parse().ok()?;
        let vram_available_gb = vram_free_mb / 1024.0;

        Some(Self {
            name: parts[0].to_string(),
            vram_total_gb: vram_total_mb / 1024.0,
            vram_available_gb,
            driver_version: parts[3].to_string(),
            usable: vram_available_gb >= MIN_USABLE_VRAM_GB,
        })
    }

    /// One-line status string for diagnostics output.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:.1} GB free of {:.1} GB, driver {})",
            self.name, self.vram_available_gb, self.vram_total_gb, self.driver_version
        )
    }
}
