use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::domain::GeoSeriesAccession;
use crate::error::KiraError;
use crate::geo::{GeoClient, GeoEndpoints};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoField {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub accession: String,
    pub source_url: String,
    pub fields: Vec<InfoField>,
}

pub fn fetch_info<G: GeoClient + ?Sized>(
    client: &G,
    endpoints: &GeoEndpoints,
    accession: &GeoSeriesAccession,
) -> Result<InfoReport, KiraError> {
    let url = endpoints.info_url(accession);
    tracing::debug!(url, "requesting accession page");
    let html = client.fetch_page(&url)?;
    let fields = parse_info_fields(&html)?;
    Ok(InfoReport {
        accession: accession.as_str().to_string(),
        source_url: url,
        fields,
    })
}

/// Best-effort reading of the accession page: every `<tr valign="top">` with
/// at least two cells yields a key (first cell) and a value (second cell).
/// A second cell holding a nested table is flattened cell by cell with
/// ` | `. Pairs with an empty key or value are dropped; an empty result is
/// not an error.
pub fn parse_info_fields(html: &str) -> Result<Vec<InfoField>, KiraError> {
    let document = Html::parse_document(html);
    let row_sel = selector(r#"tr[valign="top"]"#)?;
    let cell_sel = selector("td")?;
    let table_sel = selector("table")?;

    let mut fields = Vec::new();
    for row in document.select(&row_sel) {
        let mut cells = row.select(&cell_sel);
        let (Some(key_cell), Some(value_cell)) = (cells.next(), cells.next()) else {
            continue;
        };

        let key = squeezed_text(key_cell);
        let value = if value_cell.select(&table_sel).next().is_some() {
            value_cell
                .select(&cell_sel)
                .map(squeezed_text)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" | ")
        } else {
            spaced_text(value_cell)
        };

        if !key.is_empty() && !value.is_empty() {
            fields.push(InfoField { key, value });
        }
    }
    Ok(fields)
}

fn selector(css: &str) -> Result<Selector, KiraError> {
    Selector::parse(css).map_err(|err| KiraError::PageParse(format!("{css}: {err:?}")))
}

/// Text nodes trimmed and glued together.
fn squeezed_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect::<String>()
}

/// Words of all text nodes separated by single spaces.
fn spaced_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
