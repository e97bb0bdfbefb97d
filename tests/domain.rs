use assert_matches::assert_matches;

use kira_geo_fetch::domain::{DownloadSelection, GeoSeriesAccession, SMALL_SERIES_BUCKET};
use kira_geo_fetch::error::KiraError;

#[test]
fn parse_geo_series_valid() {
    let acc: GeoSeriesAccession = " gse11909 ".parse().unwrap();
    assert_eq!(acc.as_str(), "GSE11909");
    assert_eq!(acc.to_string(), "GSE11909");
}

#[test]
fn parse_geo_series_invalid() {
    let err = "GDS507".parse::<GeoSeriesAccession>().unwrap_err();
    assert_matches!(err, KiraError::InvalidGeoAccession(_));
}

#[test]
fn buckets_group_by_thousand() {
    let cases = [
        ("GSE1", SMALL_SERIES_BUCKET),
        ("GSE999", SMALL_SERIES_BUCKET),
        ("GSE1000", "GSE1nnn"),
        ("GSE11909", "GSE11nnn"),
        ("GSE76275", "GSE76nnn"),
        ("GSE102902", "GSE102nnn"),
    ];
    for (id, bucket) in cases {
        let acc: GeoSeriesAccession = id.parse().unwrap();
        assert_eq!(acc.bucket(), bucket, "{id}");
    }
}

#[test]
fn series_matrix_name() {
    let acc: GeoSeriesAccession = "GSE76275".parse().unwrap();
    assert_eq!(acc.series_matrix_name(), "GSE76275_series_matrix.txt.gz");
}

#[test]
fn explicit_selection() {
    let both = DownloadSelection::from_flags(true, true);
    assert!(both.raw && both.matrix);
    let matrix = DownloadSelection::from_flags(false, true);
    assert!(!matrix.raw && matrix.matrix);
}
