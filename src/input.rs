use std::fs;
use std::path::Path;

use crate::error::KiraError;

/// Splits `GSE1,GSE2, GSE3` into its non-empty, trimmed parts.
pub fn split_accession_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// One accession per line; blank lines and `#` comments are ignored.
pub fn parse_accession_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_accession_file(path: &Path) -> Result<Vec<String>, KiraError> {
    if !path.exists() {
        return Err(KiraError::MissingInputFile(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|err| KiraError::InputRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(parse_accession_lines(&content))
}
