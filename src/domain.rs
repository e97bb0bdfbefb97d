use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

static GEO_SERIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^GSE([0-9]+)$").expect("valid GEO series pattern"));

/// Bucket used by the GEO file server for series numbered below 1000.
pub const SMALL_SERIES_BUCKET: &str = "GSEnnn";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeoSeriesAccession(String);

impl GeoSeriesAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn digits(&self) -> &str {
        &self.0[3..]
    }

    /// Remote directory grouping series in ranges of 1000, e.g. `GSE76nnn`
    /// for `GSE76275` and `GSEnnn` for anything below `GSE1000`.
    pub fn bucket(&self) -> String {
        let digits = self.digits();
        if digits.trim_start_matches('0').len() <= 3 {
            return SMALL_SERIES_BUCKET.to_string();
        }
        let head = &digits[..digits.len() - 3];
        format!("GSE{head}nnn")
    }

    pub fn series_matrix_name(&self) -> String {
        format!("{}_series_matrix.txt.gz", self.0)
    }
}

impl fmt::Display for GeoSeriesAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GeoSeriesAccession {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !GEO_SERIES_RE.is_match(&normalized) {
            return Err(KiraError::InvalidGeoAccession(normalized));
        }
        Ok(Self(normalized))
    }
}

/// Which parts of a series to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadSelection {
    pub raw: bool,
    pub matrix: bool,
}

impl DownloadSelection {
    /// Neither flag set means both.
    pub fn from_flags(raw: bool, matrix: bool) -> Self {
        if !raw && !matrix {
            return Self::both();
        }
        Self { raw, matrix }
    }

    pub fn both() -> Self {
        Self {
            raw: true,
            matrix: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesSection {
    Suppl,
    Matrix,
}

impl SeriesSection {
    pub fn dir_name(self) -> &'static str {
        match self {
            SeriesSection::Suppl => "suppl",
            SeriesSection::Matrix => "matrix",
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let acc: GeoSeriesAccession = "  gse76275\n".parse().unwrap();
        assert_eq!(acc.as_str(), "GSE76275");
        assert_eq!(acc.digits(), "76275");
    }

    #[test]
    fn parse_rejects_bad_syntax() {
        for bad in ["GSM76275", "GSE", "GSE76a75", "76275", "GSE 76275", ""] {
            let err = bad.parse::<GeoSeriesAccession>().unwrap_err();
            assert_matches!(err, KiraError::InvalidGeoAccession(_));
        }
    }

    #[test]
    fn bucket_for_small_series() {
        let acc: GeoSeriesAccession = "GSE999".parse().unwrap();
        assert_eq!(acc.bucket(), "GSEnnn");
        let acc: GeoSeriesAccession = "GSE1".parse().unwrap();
        assert_eq!(acc.bucket(), "GSEnnn");
    }

    #[test]
    fn bucket_strips_last_three_digits() {
        let acc: GeoSeriesAccession = "GSE76275".parse().unwrap();
        assert_eq!(acc.bucket(), "GSE76nnn");
        let acc: GeoSeriesAccession = "GSE1000".parse().unwrap();
        assert_eq!(acc.bucket(), "GSE1nnn");
    }

    #[test]
    fn selection_defaults_to_both() {
        assert_eq!(
            DownloadSelection::from_flags(false, false),
            DownloadSelection::both()
        );
        let raw_only = DownloadSelection::from_flags(true, false);
        assert!(raw_only.raw && !raw_only.matrix);
    }
}
