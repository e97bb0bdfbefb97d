use std::io::{Read, Write};
use std::path::Path;

use reqwest::{StatusCode, Url};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::config::Settings;
use crate::domain::{GeoSeriesAccession, SeriesSection};
use crate::error::KiraError;

pub trait GeoClient: Send + Sync {
    /// Fetches a small HTML page (directory listing or accession page).
    fn fetch_page(&self, url: &str) -> Result<String, KiraError>;
    /// Streams `url` to `destination`, returning the number of bytes written.
    /// Nothing is left at `destination` unless the whole body arrived.
    fn download_url(&self, url: &str, destination: &Path) -> Result<u64, KiraError>;
}

#[derive(Clone)]
pub struct GeoHttpClient {
    pages: Client,
    downloads: Client,
    chunk_size: usize,
}

impl GeoHttpClient {
    pub fn new(settings: &Settings) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|err| KiraError::GeoHttp(err.to_string()))?,
        );
        let pages = Client::builder()
            .default_headers(headers.clone())
            .timeout(settings.listing_timeout())
            .build()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
        let downloads = Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.download_connect_timeout())
            .timeout(settings.download_timeout())
            .build()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
        Ok(Self {
            pages,
            downloads,
            chunk_size: settings.chunk_size.max(1),
        })
    }

    fn check_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, KiraError> {
        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        let status = response.status();
        let message = status
            .canonical_reason()
            .unwrap_or("GEO request failed")
            .to_string();
        Err(KiraError::GeoStatus {
            status: status.as_u16(),
            message,
        })
    }

    fn write_response_to_file(
        &self,
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<u64, KiraError> {
        let parent = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = destination
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;

        let mut buffer = vec![0u8; self.chunk_size];
        let mut written = 0u64;
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
            if read == 0 {
                break;
            }
            temp.write_all(&buffer[..read])
                .map_err(|err| KiraError::Filesystem(err.to_string()))?;
            written += read as u64;
        }
        temp.flush()
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.persist(destination)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(written)
    }
}

impl GeoClient for GeoHttpClient {
    fn fetch_page(&self, url: &str) -> Result<String, KiraError> {
        let response = self
            .pages
            .get(url)
            .send()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
        let response = Self::check_status(response)?;
        response
            .text()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))
    }

    fn download_url(&self, url: &str, destination: &Path) -> Result<u64, KiraError> {
        let response = self
            .downloads
            .get(url)
            .send()
            .map_err(|err| KiraError::GeoHttp(err.to_string()))?;
        let response = Self::check_status(response)?;
        self.write_response_to_file(response, destination)
    }
}

/// URL scheme of the GEO file server and accession pages.
#[derive(Debug, Clone)]
pub struct GeoEndpoints {
    ftp_base: String,
    info_base: String,
}

impl GeoEndpoints {
    pub fn new(settings: &Settings) -> Self {
        Self {
            ftp_base: settings.ftp_base_url.trim_end_matches('/').to_string(),
            info_base: settings.info_base_url.clone(),
        }
    }

    pub fn series_url(&self, accession: &GeoSeriesAccession) -> String {
        format!(
            "{}/{}/{}/",
            self.ftp_base,
            accession.bucket(),
            accession.as_str()
        )
    }

    pub fn section_url(&self, accession: &GeoSeriesAccession, section: SeriesSection) -> String {
        format!("{}{}/", self.series_url(accession), section.dir_name())
    }

    pub fn direct_matrix_url(&self, accession: &GeoSeriesAccession) -> String {
        format!(
            "{}{}",
            self.section_url(accession, SeriesSection::Matrix),
            accession.series_matrix_name()
        )
    }

    pub fn info_url(&self, accession: &GeoSeriesAccession) -> String {
        format!("{}?acc={}", self.info_base, accession.as_str())
    }
}

/// Resolves a listing entry against the listing page URL.
pub fn join_url(base: &str, name: &str) -> Result<String, KiraError> {
    let base_url = Url::parse(base).map_err(|err| KiraError::InvalidUrl {
        url: base.to_string(),
        message: err.to_string(),
    })?;
    let joined = base_url.join(name).map_err(|err| KiraError::InvalidUrl {
        url: name.to_string(),
        message: err.to_string(),
    })?;
    Ok(joined.to_string())
}

/// Number of path segments in `url`; the mirror tool strips this many
/// directories so files land directly in the output directory.
pub fn path_depth(url: &str) -> Result<usize, KiraError> {
    let parsed = Url::parse(url).map_err(|err| KiraError::InvalidUrl {
        url: url.to_string(),
        message: err.to_string(),
    })?;
    Ok(parsed
        .path_segments()
        .map(|segments| segments.filter(|segment| !segment.is_empty()).count())
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> GeoEndpoints {
        GeoEndpoints::new(&Settings::default())
    }

    #[test]
    fn section_urls() {
        let acc: GeoSeriesAccession = "GSE76275".parse().unwrap();
        let endpoints = endpoints();
        assert_eq!(
            endpoints.section_url(&acc, SeriesSection::Suppl),
            "https://ftp.ncbi.nlm.nih.gov/geo/series/GSE76nnn/GSE76275/suppl/"
        );
        assert_eq!(
            endpoints.direct_matrix_url(&acc),
            "https://ftp.ncbi.nlm.nih.gov/geo/series/GSE76nnn/GSE76275/matrix/GSE76275_series_matrix.txt.gz"
        );
        assert_eq!(
            endpoints.info_url(&acc),
            "https://www.ncbi.nlm.nih.gov/geo/query/acc.cgi?acc=GSE76275"
        );
    }

    #[test]
    fn join_relative_name() {
        let url = join_url(
            "https://ftp.ncbi.nlm.nih.gov/geo/series/GSEnnn/GSE999/suppl/",
            "GSE999_RAW.tar",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://ftp.ncbi.nlm.nih.gov/geo/series/GSEnnn/GSE999/suppl/GSE999_RAW.tar"
        );
    }

    #[test]
    fn depth_of_suppl_url() {
        let depth =
            path_depth("https://ftp.ncbi.nlm.nih.gov/geo/series/GSE76nnn/GSE76275/suppl/").unwrap();
        assert_eq!(depth, 5);
    }
}
