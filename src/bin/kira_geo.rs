use std::path::{Path, PathBuf};
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{CommandFactory, Parser};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_geo_fetch::app::{App, FetchOptions};
use kira_geo_fetch::config::ConfigLoader;
use kira_geo_fetch::domain::DownloadSelection;
use kira_geo_fetch::error::KiraError;
use kira_geo_fetch::extract::SystemTar;
use kira_geo_fetch::geo::GeoHttpClient;
use kira_geo_fetch::input::{read_accession_file, split_accession_list};
use kira_geo_fetch::layout::OutputLayout;
use kira_geo_fetch::mirror::SystemWget;
use kira_geo_fetch::output::{ConsoleOutput, JsonOutput, OutputMode};

const EXAMPLES: &str = "\
If neither --matrix nor --raw is given, both are downloaded.

Examples:
    kira-geo GSE76275 --info
    kira-geo GSE76275 --extract
    kira-geo GSE76275,GSE11909 --matrix
    kira-geo geo_ids.txt --file --raw --extract";

#[derive(Parser)]
#[command(name = "kira-geo")]
#[command(about = "Batch download GEO series (supplementary and series-matrix files) by GSE ID")]
#[command(version, after_help = EXAMPLES)]
struct Cli {
    /// GSE IDs separated by commas, or a text file with one ID per line when --file is set
    input: Option<String>,

    /// Treat INPUT as a file containing one GEO ID per line
    #[arg(long)]
    file: bool,

    /// Download series matrix files (matrix/)
    #[arg(long)]
    matrix: bool,

    /// Download supplementary files (suppl/)
    #[arg(long)]
    raw: bool,

    /// Extract .tar and .gz files after download
    #[arg(long)]
    extract: bool,

    /// Show summary info from the GEO accession page instead of downloading
    #[arg(long)]
    info: bool,

    /// Settings file (JSON); defaults to ./kira-geo.json when present
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory in which per-series folders are created
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Print reports as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::ConfigRead(_) | KiraError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(input) = cli.input.as_deref() else {
        Cli::command().print_help().into_diagnostic()?;
        return Ok(());
    };

    let inputs = if cli.file {
        read_accession_file(Path::new(input))?
    } else {
        split_accession_list(input)
    };

    let settings = ConfigLoader::resolve(cli.config.as_deref())?;
    let layout = match &cli.output_dir {
        Some(dir) => OutputLayout::new(
            Utf8PathBuf::from_path_buf(dir.clone())
                .map_err(|_| KiraError::Filesystem("invalid output path".to_string()))?,
        ),
        None => OutputLayout::current_dir()?,
    };
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let geo = GeoHttpClient::new(&settings)?;
    let app = App::new(layout, &settings, geo, SystemWget::new(), SystemTar::new());

    if cli.info {
        run_info(&app, &inputs, output_mode)
    } else {
        let options = FetchOptions {
            selection: DownloadSelection::from_flags(cli.raw, cli.matrix),
            extract: cli.extract,
        };
        run_download(&app, &inputs, options, output_mode)
    }
}

fn run_info(
    app: &App<GeoHttpClient, SystemWget, SystemTar>,
    inputs: &[String],
    output_mode: OutputMode,
) -> miette::Result<()> {
    let mut reports = Vec::new();
    for input in inputs {
        match app.info(input) {
            Ok(report) => match output_mode {
                OutputMode::Human => ConsoleOutput::print_info(&report),
                OutputMode::Json => reports.push(report),
            },
            Err(KiraError::GeoStatus { status, .. }) => {
                eprintln!("❌ [{}] Failed to fetch info: HTTP {status}", input.trim());
            }
            Err(err) => {
                eprintln!("⚠️ [{}] Error fetching info: {err}", input.trim());
            }
        }
    }
    if output_mode == OutputMode::Json {
        JsonOutput::print_info(&reports).into_diagnostic()?;
    }
    Ok(())
}

fn run_download(
    app: &App<GeoHttpClient, SystemWget, SystemTar>,
    inputs: &[String],
    options: FetchOptions,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match output_mode {
        OutputMode::Human => {
            let result = app.download_batch(inputs, options, &ConsoleOutput);
            ConsoleOutput::print_batch_summary(&result);
        }
        OutputMode::Json => {
            let result = app.download_batch(inputs, options, &JsonOutput);
            JsonOutput::print_batch(&result).into_diagnostic()?;
        }
    }
    Ok(())
}
