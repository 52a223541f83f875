use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use taxon_enricher::app::App;
use taxon_enricher::catalog::Catalog;
use taxon_enricher::config::{ConfigLoader, ConfigOverrides};
use taxon_enricher::domain::AssetKind;
use taxon_enricher::error::EnrichError;
use taxon_enricher::http::HttpDownloader;
use taxon_enricher::output::{ConsoleOutput, JsonOutput};
use taxon_enricher::providers::commons::CommonsHttpClient;
use taxon_enricher::providers::gbif::GbifHttpClient;
use taxon_enricher::providers::wikipedia::WikipediaHttpClient;
use taxon_enricher::providers::xeno_canto::XenoCantoHttpClient;
use taxon_enricher::resolver::Resolver;

#[derive(Parser)]
#[command(name = "taxon-enrich")]
#[command(
    about = "Fill a species catalog with cover images, spectrograms, descriptions and occurrence ranges"
)]
#[command(version, author)]
struct Cli {
    /// Catalog JSON to read
    #[arg(long)]
    db: Option<String>,

    /// Where the updated catalog is written after every change (defaults to --db)
    #[arg(long)]
    out_db: Option<String>,

    /// Directory holding one asset folder per species
    #[arg(long)]
    base_dir: Option<String>,

    /// Prefix of the asset paths recorded in the catalog
    #[arg(long)]
    asset_prefix: Option<String>,

    /// Seconds to wait after each network-bound asset attempt
    #[arg(long)]
    delay: Option<f64>,

    /// Upper bound on occurrence records paged per species
    #[arg(long)]
    max_occ: Option<usize>,

    /// Refetch assets that are already present
    #[arg(long)]
    overwrite: bool,

    /// Process only the species with this scientific name (case-insensitive)
    #[arg(long)]
    only: Option<String>,

    /// Assets to update
    #[arg(long, value_enum, value_delimiter = ',')]
    assets: Option<Vec<AssetKind>>,

    /// Description languages, in resolution order
    #[arg(long = "lang", value_delimiter = ',')]
    languages: Option<Vec<String>>,

    /// JSON config file (defaults to ./taxon-enrich.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Print a JSON run summary instead of the closing status line
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<EnrichError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EnrichError) -> u8 {
    match error {
        EnrichError::CatalogRead(_) | EnrichError::CatalogParse(_) => 2,
        EnrichError::ConfigRead(_)
        | EnrichError::ConfigParse(_)
        | EnrichError::MissingSetting(_)
        | EnrichError::InvalidSetting { .. }
        | EnrichError::InvalidLanguage(_) => 2,
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
    let overrides = ConfigOverrides {
        db: cli.db,
        out_db: cli.out_db,
        base_dir: cli.base_dir,
        asset_prefix: cli.asset_prefix,
        delay: cli.delay,
        max_occ: cli.max_occ,
        overwrite: cli.overwrite,
        only: cli.only,
        assets: cli.assets,
        languages: cli.languages,
    };
    let options = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let mut catalog = Catalog::load(&options.catalog_path)?;
    tracing::info!(
        catalog = %options.catalog_path,
        species = catalog.species.len(),
        "catalog loaded"
    );

    let resolver = Resolver::new(
        CommonsHttpClient::new()?,
        GbifHttpClient::new()?,
        XenoCantoHttpClient::new()?,
        WikipediaHttpClient::new()?,
    );
    let app = App::new(resolver, HttpDownloader::new()?, options);
    let summary = app.run(&mut catalog, &ConsoleOutput);

    if cli.json {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    } else {
        ConsoleOutput::print_done(&summary);
    }
    Ok(())
}
