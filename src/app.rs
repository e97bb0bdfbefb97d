use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Settings;
use crate::domain::{DownloadSelection, GeoSeriesAccession, SeriesSection};
use crate::error::KiraError;
use crate::extract::{ExtractOutcome, TarTool, extract_file, find_archives};
use crate::geo::{GeoClient, GeoEndpoints, join_url, path_depth};
use crate::info::{InfoReport, fetch_info};
use crate::layout::OutputLayout;
use crate::listing::{Listing, fetch_listing};
use crate::mirror::{MirrorRequest, MirrorTool};

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub selection: DownloadSelection,
    pub extract: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Stream every file named by the directory listing.
    Listing,
    /// Recursive mirror of the remote directory.
    Mirror,
    /// The single well-known series matrix URL.
    DirectMatrix,
}

/// The listing is tried first; when it is missing or empty the section's
/// last-resort strategy takes over.
pub fn select_strategy(section: SeriesSection, listing: &Listing) -> FetchStrategy {
    if listing.usable_files().is_some() {
        return FetchStrategy::Listing;
    }
    match section {
        SeriesSection::Suppl => FetchStrategy::Mirror,
        SeriesSection::Matrix => FetchStrategy::DirectMatrix,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Downloaded { bytes: u64 },
    SkippedExisting,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub archive: String,
    pub outcome: Option<ExtractOutcome>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    pub url: String,
    pub path: String,
    #[serde(flatten)]
    pub status: FileStatus,
    pub extraction: Option<ExtractionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub section: SeriesSection,
    pub listing_url: String,
    pub strategy: FetchStrategy,
    pub listing_error: Option<String>,
    pub files: Vec<FileReport>,
    pub mirror_error: Option<String>,
    pub mirror_extractions: Vec<ExtractionReport>,
}

impl SectionReport {
    fn new(section: SeriesSection, listing_url: String, strategy: FetchStrategy) -> Self {
        Self {
            section,
            listing_url,
            strategy,
            listing_error: None,
            files: Vec::new(),
            mirror_error: None,
            mirror_extractions: Vec::new(),
        }
    }

    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
    pub accession: String,
    pub output_dir: String,
    pub sections: Vec<SectionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedInput {
    pub input: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub series: Vec<SeriesReport>,
    pub skipped: Vec<SkippedInput>,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: String) {
    sink.event(ProgressEvent {
        message,
        elapsed: None,
    });
}

#[derive(Clone)]
pub struct App<G: GeoClient, M: MirrorTool, T: TarTool> {
    layout: OutputLayout,
    endpoints: GeoEndpoints,
    matrix_keyword: String,
    geo: G,
    mirror: M,
    tar: T,
}

impl<G: GeoClient, M: MirrorTool, T: TarTool> App<G, M, T> {
    pub fn new(layout: OutputLayout, settings: &Settings, geo: G, mirror: M, tar: T) -> Self {
        Self {
            layout,
            endpoints: GeoEndpoints::new(settings),
            matrix_keyword: settings.matrix_keyword.clone(),
            geo,
            mirror,
            tar,
        }
    }

    /// Processes every input in order. Invalid IDs and IDs whose output
    /// directory cannot be created are recorded as skipped; nothing here
    /// aborts the batch.
    pub fn download_batch(
        &self,
        inputs: &[String],
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> BatchReport {
        let mut series = Vec::new();
        let mut skipped = Vec::new();

        for input in inputs {
            let accession = match input.parse::<GeoSeriesAccession>() {
                Ok(accession) => accession,
                Err(err) => {
                    emit(sink, format!("❌ Invalid GEO ID: {}", input.trim().to_uppercase()));
                    skipped.push(SkippedInput {
                        input: input.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            match self.download_series(&accession, options, sink) {
                Ok(report) => series.push(report),
                Err(err) => {
                    emit(sink, format!("❌ [{accession}] {err}"));
                    skipped.push(SkippedInput {
                        input: input.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        BatchReport {
            series,
            skipped,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn download_series(
        &self,
        accession: &GeoSeriesAccession,
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SeriesReport, KiraError> {
        let output_dir = self.layout.ensure_series_dir(accession)?;
        let mut sections = Vec::new();

        if options.selection.raw {
            sections.push(self.fetch_supplementary(
                accession,
                output_dir.as_std_path(),
                options.extract,
                sink,
            ));
        }
        if options.selection.matrix {
            sections.push(self.fetch_matrix(
                accession,
                output_dir.as_std_path(),
                options.extract,
                sink,
            ));
        }

        emit(sink, format!("✅ [{accession}] Download complete."));
        Ok(SeriesReport {
            accession: accession.as_str().to_string(),
            output_dir: output_dir.to_string(),
            sections,
        })
    }

    pub fn info(&self, input: &str) -> Result<InfoReport, KiraError> {
        let accession: GeoSeriesAccession = input.parse()?;
        fetch_info(&self.geo, &self.endpoints, &accession)
    }

    fn fetch_supplementary(
        &self,
        accession: &GeoSeriesAccession,
        output_dir: &Path,
        extract: bool,
        sink: &dyn ProgressSink,
    ) -> SectionReport {
        let url = self.endpoints.section_url(accession, SeriesSection::Suppl);
        emit(
            sink,
            format!("📁 [{accession}] Checking supplementary files at: {url}"),
        );
        let listing = fetch_listing(&self.geo, &url, None);
        let strategy = select_strategy(SeriesSection::Suppl, &listing);
        let mut report = SectionReport::new(SeriesSection::Suppl, url.clone(), strategy);

        match (&listing, strategy) {
            (Listing::Files(files), FetchStrategy::Listing) => {
                report.files = self.download_files(&url, files, output_dir, extract, sink);
            }
            _ => {
                report.listing_error = listing_error(&listing);
                self.mirror_fallback(&url, output_dir, "*", extract, &mut report, sink);
            }
        }
        report
    }

    fn fetch_matrix(
        &self,
        accession: &GeoSeriesAccession,
        output_dir: &Path,
        extract: bool,
        sink: &dyn ProgressSink,
    ) -> SectionReport {
        let url = self.endpoints.section_url(accession, SeriesSection::Matrix);
        emit(
            sink,
            format!("📁 [{accession}] Checking matrix file(s) at: {url}"),
        );
        let listing = fetch_listing(&self.geo, &url, Some(self.matrix_keyword.as_str()));
        let strategy = select_strategy(SeriesSection::Matrix, &listing);
        let mut report = SectionReport::new(SeriesSection::Matrix, url.clone(), strategy);

        match (&listing, strategy) {
            (Listing::Files(files), FetchStrategy::Listing) => {
                report.files = self.download_files(&url, files, output_dir, extract, sink);
            }
            _ => {
                report.listing_error = listing_error(&listing);
                report
                    .files
                    .push(self.direct_matrix_fallback(accession, output_dir, extract, sink));
            }
        }
        report
    }

    /// Streams `files` (relative to `base_url`) into `output_dir` in listing
    /// order. Existing local files are never requested again; one failed file
    /// does not stop the rest.
    pub fn download_files(
        &self,
        base_url: &str,
        files: &[String],
        output_dir: &Path,
        extract: bool,
        sink: &dyn ProgressSink,
    ) -> Vec<FileReport> {
        files
            .iter()
            .map(|name| self.download_one(base_url, name, output_dir, extract, sink))
            .collect()
    }

    fn download_one(
        &self,
        base_url: &str,
        name: &str,
        output_dir: &Path,
        extract: bool,
        sink: &dyn ProgressSink,
    ) -> FileReport {
        let url = match join_url(base_url, name) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(base_url, name, error = %err, "cannot resolve listing entry");
                emit(sink, format!("❌ Failed to download {name}: {err}"));
                return FileReport {
                    name: name.to_string(),
                    url: String::new(),
                    path: String::new(),
                    status: FileStatus::Failed {
                        reason: err.to_string(),
                    },
                    extraction: None,
                };
            }
        };
        let Some(local_name) = Path::new(name).file_name() else {
            emit(sink, format!("❌ Refusing unsafe file name: {name}"));
            return FileReport {
                name: name.to_string(),
                url,
                path: String::new(),
                status: FileStatus::Failed {
                    reason: "file name has no final path component".to_string(),
                },
                extraction: None,
            };
        };
        let path = output_dir.join(local_name);
        let status = self.fetch_to(&url, &path, name, sink);
        let extraction = self.maybe_extract(&path, extract, sink);

        FileReport {
            name: name.to_string(),
            url,
            path: path.display().to_string(),
            status,
            extraction,
        }
    }

    fn fetch_to(&self, url: &str, path: &Path, name: &str, sink: &dyn ProgressSink) -> FileStatus {
        if path.exists() {
            tracing::debug!(path = %path.display(), "skip existing");
            emit(sink, format!("✅ skip existing file: {name}"));
            return FileStatus::SkippedExisting;
        }

        emit(sink, format!("⬇️ Downloading: {name}"));
        let start = Instant::now();
        match self.geo.download_url(url, path) {
            Ok(bytes) => {
                sink.event(ProgressEvent {
                    message: format!("Downloaded {name} ({bytes} bytes)"),
                    elapsed: Some(start.elapsed()),
                });
                FileStatus::Downloaded { bytes }
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "download failed");
                emit(sink, format!("❌ Failed to download {name}: {err}"));
                FileStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn maybe_extract(
        &self,
        path: &Path,
        extract: bool,
        sink: &dyn ProgressSink,
    ) -> Option<ExtractionReport> {
        if !extract || !path.exists() {
            return None;
        }
        Some(self.extract_with_report(path, sink))
    }

    fn extract_with_report(&self, path: &Path, sink: &dyn ProgressSink) -> ExtractionReport {
        let archive = path.display().to_string();
        match extract_file(path, &self.tar) {
            Ok(outcome) => {
                match &outcome {
                    ExtractOutcome::Decompressed(output) => {
                        emit(sink, format!("📦 Extracted .gz: {}", output.display()))
                    }
                    ExtractOutcome::AlreadyDecompressed(output) => emit(
                        sink,
                        format!("✅ Skipping extract: {} exists", output.display()),
                    ),
                    ExtractOutcome::Unpacked(_) => {
                        emit(sink, format!("📦 Extracted .tar: {archive}"))
                    }
                    ExtractOutcome::NotArchive => {}
                }
                ExtractionReport {
                    archive,
                    outcome: Some(outcome),
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(archive, error = %err, "extraction failed");
                emit(sink, format!("❌ {err}"));
                ExtractionReport {
                    archive,
                    outcome: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    fn mirror_fallback(
        &self,
        url: &str,
        output_dir: &Path,
        accept: &str,
        extract: bool,
        report: &mut SectionReport,
        sink: &dyn ProgressSink,
    ) {
        emit(sink, format!("🔁 Falling back to wget for: {url}"));
        let result = path_depth(url).and_then(|cut_dirs| {
            self.mirror.mirror(&MirrorRequest {
                url,
                output_dir,
                accept,
                cut_dirs,
            })
        });
        if let Err(err) = result {
            tracing::warn!(url, error = %err, "mirror fallback failed");
            emit(sink, format!("❌ {err}"));
            report.mirror_error = Some(err.to_string());
        }

        if extract {
            report.mirror_extractions = find_archives(output_dir)
                .iter()
                .map(|archive| self.extract_with_report(archive, sink))
                .filter(|extraction| extraction.outcome != Some(ExtractOutcome::NotArchive))
                .collect();
        }
    }

    fn direct_matrix_fallback(
        &self,
        accession: &GeoSeriesAccession,
        output_dir: &Path,
        extract: bool,
        sink: &dyn ProgressSink,
    ) -> FileReport {
        let name = accession.series_matrix_name();
        let url = self.endpoints.direct_matrix_url(accession);
        let path = output_dir.join(&name);

        let status = if path.exists() {
            emit(sink, format!("✅ Matrix already exists: {}", path.display()));
            FileStatus::SkippedExisting
        } else {
            emit(sink, format!("🔁 Fallback direct download of matrix: {url}"));
            self.fetch_to(&url, &path, &name, sink)
        };
        let extraction = self.maybe_extract(&path, extract, sink);

        FileReport {
            name,
            url,
            path: path.display().to_string(),
            status,
            extraction,
        }
    }
}

fn listing_error(listing: &Listing) -> Option<String> {
    match listing {
        Listing::Files(files) if files.is_empty() => {
            Some("listing has no matching files".to_string())
        }
        Listing::Files(_) => None,
        Listing::Unavailable(reason) => Some(reason.clone()),
    }
}
