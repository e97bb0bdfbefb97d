use std::fs;

use assert_matches::assert_matches;

use kira_geo_fetch::error::KiraError;
use kira_geo_fetch::input::{read_accession_file, split_accession_list};

#[test]
fn read_file_of_ids() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("geo_ids.txt");
    fs::write(&path, "# breast cancer\nGSE76275\n\nGSE11909\n").unwrap();

    let ids = read_accession_file(&path).unwrap();
    assert_eq!(ids, vec!["GSE76275", "GSE11909"]);
}

#[test]
fn missing_file_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let err = read_accession_file(&temp.path().join("nope.txt")).unwrap_err();
    assert_matches!(err, KiraError::MissingInputFile(_));
}

#[test]
fn comma_list() {
    assert_eq!(
        split_accession_list("GSE11909,GSE76275"),
        vec!["GSE11909", "GSE76275"]
    );
    assert!(split_accession_list(" , ").is_empty());
}
