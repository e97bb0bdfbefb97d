use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid GEO series accession: {0}")]
    #[diagnostic(help("expected GSE followed by digits, e.g. GSE76275"))]
    InvalidGeoAccession(String),

    #[error("input file not found: {0}")]
    MissingInputFile(PathBuf),

    #[error("failed to read input file {path}: {message}")]
    InputRead { path: PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("GEO request failed: {0}")]
    GeoHttp(String),

    #[error("GEO returned status {status}: {message}")]
    GeoStatus { status: u16, message: String },

    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("failed to parse GEO page: {0}")]
    PageParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("failed to extract {path}: {message}")]
    Extraction { path: PathBuf, message: String },

    #[error("mirror download failed: {0}")]
    Mirror(String),
}
