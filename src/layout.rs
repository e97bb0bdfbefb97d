use std::fs;

use camino::Utf8PathBuf;

use crate::domain::GeoSeriesAccession;
use crate::error::KiraError;

/// Local directory layout: one flat directory per series under `root`.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: Utf8PathBuf,
}

impl OutputLayout {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn current_dir() -> Result<Self, KiraError> {
        let cwd = std::env::current_dir().map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| KiraError::Filesystem("invalid output path".to_string()))?;
        Ok(Self { root })
    }

    pub fn series_dir(&self, accession: &GeoSeriesAccession) -> Utf8PathBuf {
        self.root.join(accession.as_str())
    }

    pub fn ensure_series_dir(
        &self,
        accession: &GeoSeriesAccession,
    ) -> Result<Utf8PathBuf, KiraError> {
        let dir = self.series_dir(accession);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("create {dir}: {err}")))?;
        Ok(dir)
    }
}
