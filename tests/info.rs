use std::fs;

use assert_matches::assert_matches;

use kira_geo_fetch::config::Settings;
use kira_geo_fetch::domain::GeoSeriesAccession;
use kira_geo_fetch::error::KiraError;
use kira_geo_fetch::geo::{GeoClient, GeoEndpoints};
use kira_geo_fetch::info::{fetch_info, parse_info_fields};

struct PageClient {
    status: u16,
    body: String,
}

impl GeoClient for PageClient {
    fn fetch_page(&self, _url: &str) -> Result<String, KiraError> {
        if self.status == 200 {
            Ok(self.body.clone())
        } else {
            Err(KiraError::GeoStatus {
                status: self.status,
                message: "Not Found".to_string(),
            })
        }
    }

    fn download_url(&self, _url: &str, _destination: &std::path::Path) -> Result<u64, KiraError> {
        Err(KiraError::GeoHttp("not implemented".to_string()))
    }
}

#[test]
fn parse_accession_page_fields() {
    let html = fs::read_to_string("tests/fixtures/geo_acc_GSE76275.html").unwrap();
    let fields = parse_info_fields(&html).unwrap();
    let pairs: Vec<(&str, &str)> = fields
        .iter()
        .map(|field| (field.key.as_str(), field.value.as_str()))
        .collect();

    assert_eq!(
        pairs,
        vec![
            ("Status", "Public on Feb 01, 2016"),
            ("Title", "Molecular profiling of triple negative breast cancers"),
            ("Organism", "Homo sapiens"),
            ("Summary", "Gene expression of 198 TNBC samples."),
            (
                "Platforms (1)",
                "GPL570 | [HG-U133_Plus_2] Affymetrix Human Genome U133 Plus 2.0 Array"
            ),
        ]
    );
}

#[test]
fn page_without_layout_yields_no_fields() {
    let fields = parse_info_fields("<html><body><p>Temporarily unavailable</p></body></html>")
        .unwrap();
    assert!(fields.is_empty());
}

#[test]
fn fetch_info_reports_status() {
    let client = PageClient {
        status: 404,
        body: String::new(),
    };
    let endpoints = GeoEndpoints::new(&Settings::default());
    let acc: GeoSeriesAccession = "GSE76275".parse().unwrap();
    let err = fetch_info(&client, &endpoints, &acc).unwrap_err();
    assert_matches!(err, KiraError::GeoStatus { status: 404, .. });
}

#[test]
fn fetch_info_parses_page() {
    let client = PageClient {
        status: 200,
        body: fs::read_to_string("tests/fixtures/geo_acc_GSE76275.html").unwrap(),
    };
    let endpoints = GeoEndpoints::new(&Settings::default());
    let acc: GeoSeriesAccession = "gse76275".parse().unwrap();
    let report = fetch_info(&client, &endpoints, &acc).unwrap();
    assert_eq!(report.accession, "GSE76275");
    assert!(report.source_url.ends_with("acc.cgi?acc=GSE76275"));
    assert_eq!(report.fields.len(), 5);
}
