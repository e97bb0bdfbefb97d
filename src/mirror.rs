use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::KiraError;
use crate::extract::find_in_path;

/// Recursive fetch of a whole remote directory, used when no listing could be
/// scraped.
pub trait MirrorTool: Send + Sync {
    fn mirror(&self, request: &MirrorRequest<'_>) -> Result<(), KiraError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRequest<'a> {
    pub url: &'a str,
    pub output_dir: &'a Path,
    /// Comma-separated file-name patterns passed to `--accept`.
    pub accept: &'a str,
    /// Leading remote directories to drop from saved paths.
    pub cut_dirs: usize,
}

impl MirrorRequest<'_> {
    pub fn wget_args(&self) -> Vec<String> {
        vec![
            "-r".to_string(),
            "-np".to_string(),
            "-nH".to_string(),
            format!("--cut-dirs={}", self.cut_dirs),
            "-P".to_string(),
            self.output_dir.to_string_lossy().to_string(),
            "--accept".to_string(),
            self.accept.to_string(),
            "-nc".to_string(),
            self.url.to_string(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct SystemWget {
    wget: Option<PathBuf>,
}

impl SystemWget {
    pub fn new() -> Self {
        Self {
            wget: find_in_path("wget"),
        }
    }
}

impl Default for SystemWget {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorTool for SystemWget {
    fn mirror(&self, request: &MirrorRequest<'_>) -> Result<(), KiraError> {
        let wget = self
            .wget
            .as_ref()
            .ok_or_else(|| KiraError::MissingTool("wget".to_string()))?;
        tracing::debug!(url = request.url, "mirroring with wget");
        let output = Command::new(wget)
            .args(request.wget_args())
            .output()
            .map_err(|err| KiraError::Mirror(err.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last_line = stderr.lines().rev().find(|line| !line.trim().is_empty());
        let message = match last_line {
            Some(line) => format!("wget exited with {}: {}", output.status, line.trim()),
            None => format!("wget exited with {}", output.status),
        };
        Err(KiraError::Mirror(message))
    }
}
