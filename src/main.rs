use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostpath::{
    export, parse_localization, render_table, run_association, AssociationConfig,
    AssociationRequest, CandidatePrior, CandidatePriorPolicy, CsvCatalog, FilterRegistry,
    OffsetPrior, OffsetPriorFamily, OutputFormat, PosteriorMethod,
};

#[derive(Parser)]
#[command(
    name = "hostpath",
    about = "Rank candidate host galaxies for a transient localization"
)]
struct Cli {
    /// Central coordinates of the localization, e.g. J081240.7+320809,
    /// 122.223,-23.2322 or 07:45:00.47,34:17:31.1
    coord: String,

    /// Localization parameters; for an ellipse "a,b,pa" with semi-major and
    /// semi-minor axes in arcsec and PA in degrees east of north.
    lparam: String,

    /// Localization type.
    #[arg(long, default_value = "ellipse")]
    ltype: String,

    /// Prior probability that the host is unseen.
    #[arg(short = 'U', long = "PU", default_value = "0.0")]
    pu: f64,

    /// Public survey whose photometry is used.
    #[arg(short, long, default_value = "Pan-STARRS")]
    survey: String,

    /// Catalog search radius in arcmin.
    #[arg(long, default_value = "5.0")]
    ssize: f64,

    /// Local export of the survey's photometry (CSV or TSV with a header row).
    #[arg(short, long)]
    catalog: PathBuf,

    /// Candidate prior: identical, inverse, inverse1 or inverse2.
    #[arg(long, default_value = "inverse")]
    cand_prior: CandidatePriorPolicy,

    /// Offset prior family: uniform, core or exp.
    #[arg(long, default_value = "exp")]
    offset_prior: OffsetPriorFamily,

    /// Posterior integration method.
    #[arg(long, default_value = "local")]
    method: PosteriorMethod,

    /// Posterior integration cell size in arcsec.
    #[arg(long, default_value = "0.1")]
    step_size: f64,

    /// Log debug output, including statistics of the filtered catalog.
    #[arg(long)]
    debug: bool,

    /// Output file for the ranked candidates; must end in .csv or .tsv.
    #[arg(short, long)]
    outfile: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Reject a bad output path before doing any work.
    if let Some(path) = &cli.outfile {
        OutputFormat::from_path(path)?;
    }

    let localization = parse_localization(&cli.ltype, &cli.coord, &cli.lparam)?;
    let request = AssociationRequest {
        localization,
        survey: cli.survey.clone(),
        search_radius_arcmin: cli.ssize,
        config: AssociationConfig {
            cand_prior: CandidatePrior {
                policy: cli.cand_prior,
                p_u: cli.pu,
            },
            offset_prior: OffsetPrior {
                family: cli.offset_prior,
                ..OffsetPrior::default()
            },
            method: cli.method,
            step_size: cli.step_size,
        },
        debug: cli.debug,
    };

    let catalog = CsvCatalog::new(&cli.catalog);
    let result = run_association(&request, &catalog, &FilterRegistry::default())
        .with_context(|| format!("association failed for {}", cli.coord))?;

    print!("{}", render_table(&result));

    if let Some(path) = &cli.outfile {
        export(&result, path)?;
        println!("Wrote: {}", path.display());
    }
    Ok(())
}
