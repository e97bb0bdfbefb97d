use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use flate2::read::MultiGzDecoder;
use serde::Serialize;

use crate::error::KiraError;

/// Unpacks tar archives. Implemented by the system `tar`; tests substitute
/// their own.
pub trait TarTool: Send + Sync {
    fn unpack(&self, archive: &Path, target_dir: &Path) -> Result<(), KiraError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum ExtractOutcome {
    Decompressed(PathBuf),
    AlreadyDecompressed(PathBuf),
    Unpacked(PathBuf),
    NotArchive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Gzip,
    Tar,
}

/// `.gz` that is not `.tar.gz` is a single gzip member; plain `.tar` is a
/// tarball. Compressed tarballs and a bare `.gz` are left alone.
pub fn archive_kind(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_str()?;
    if let Some(stem) = name.strip_suffix(".gz") {
        if stem.is_empty() || stem.ends_with(".tar") {
            return None;
        }
        Some(ArchiveKind::Gzip)
    } else if name.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

pub fn extract_file<T: TarTool + ?Sized>(path: &Path, tar: &T) -> Result<ExtractOutcome, KiraError> {
    match archive_kind(path) {
        Some(ArchiveKind::Gzip) => gunzip(path),
        Some(ArchiveKind::Tar) => {
            let target_dir = parent_dir(path);
            tracing::debug!(archive = %path.display(), "unpacking tar");
            tar.unpack(path, target_dir)?;
            Ok(ExtractOutcome::Unpacked(target_dir.to_path_buf()))
        }
        None => Ok(ExtractOutcome::NotArchive),
    }
}

/// Files under `root` that [`extract_file`] would act on, collected before any
/// extraction so freshly written outputs are not revisited.
pub fn find_archives(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        if let Ok(entries) = fs::read_dir(&path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(".tar") || name.ends_with(".gz"))
                {
                    out.push(path);
                }
            }
        }
    }
    out.sort();
    out
}

fn gunzip(path: &Path) -> Result<ExtractOutcome, KiraError> {
    let Some(stem) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(".gz"))
        .filter(|stem| !stem.is_empty())
    else {
        return Ok(ExtractOutcome::NotArchive);
    };
    let output = path.with_file_name(stem);
    if output.exists() {
        tracing::debug!(output = %output.display(), "decompressed file already present");
        return Ok(ExtractOutcome::AlreadyDecompressed(output));
    }

    let extraction_error = |message: String| KiraError::Extraction {
        path: path.to_path_buf(),
        message,
    };
    let input = File::open(path).map_err(|err| extraction_error(err.to_string()))?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(input));
    let mut temp = tempfile::Builder::new()
        .prefix(".gunzip.")
        .suffix(".part")
        .tempfile_in(parent_dir(path))
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    io::copy(&mut decoder, &mut temp).map_err(|err| extraction_error(err.to_string()))?;
    temp.flush()
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    temp.persist(&output)
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;
    Ok(ExtractOutcome::Decompressed(output))
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

#[derive(Debug, Clone)]
pub struct SystemTar {
    tar: Option<PathBuf>,
}

impl SystemTar {
    pub fn new() -> Self {
        Self {
            tar: find_in_path("tar"),
        }
    }
}

impl Default for SystemTar {
    fn default() -> Self {
        Self::new()
    }
}

impl TarTool for SystemTar {
    fn unpack(&self, archive: &Path, target_dir: &Path) -> Result<(), KiraError> {
        let tar = self
            .tar
            .as_ref()
            .ok_or_else(|| KiraError::MissingTool("tar".to_string()))?;
        let output = Command::new(tar)
            .arg("-xf")
            .arg(archive)
            .arg("-C")
            .arg(target_dir)
            .output()
            .map_err(|err| KiraError::Extraction {
                path: archive.to_path_buf(),
                message: err.to_string(),
            })?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("tar exited with {}", output.status)
        } else {
            stderr
        };
        Err(KiraError::Extraction {
            path: archive.to_path_buf(),
            message,
        })
    }
}

pub(crate) fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
