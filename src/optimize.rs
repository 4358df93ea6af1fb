use crate::config::Config;
use log::{info, warn};
use std::path::Path;
use std::process::{Command, ExitStatus};

/// External PNG optimizer run once over the finished sheet.
#[derive(Debug, Clone)]
pub struct Optimizer {
    program: String,
    palette: u16,
}

impl Optimizer {
    pub fn new(program: impl Into<String>, palette: u16) -> Self {
        Self {
            program: program.into(),
            palette,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.optimizer.clone(), cfg.optimizer_palette)
    }

    /// Palette cap, no dithering, maximum effort, then the file.
    pub fn args(&self, file: &Path) -> Vec<String> {
        vec![
            format!("-pngpalette={}", self.palette),
            "-nodithering".to_string(),
            "-s9".to_string(),
            file.to_string_lossy().into_owned(),
        ]
    }

    /// Optimizes `file` in place. Best effort: a missing tool or a failing
    /// exit only logs, since the unoptimized sheet is still valid.
    pub fn run(&self, file: &Path) -> Option<ExitStatus> {
        info!("Optimizing '{}' with '{}'", file.display(), self.program);
        match Command::new(&self.program).args(self.args(file)).status() {
            Ok(status) => {
                if status.success() {
                    info!("Optimizer finished.");
                } else {
                    warn!("Optimizer exited with {status}; keeping '{}' as is.", file.display());
                }
                Some(status)
            }
            Err(e) => {
                warn!("Failed to start optimizer '{}': {e}", self.program);
                None
            }
        }
    }
}
