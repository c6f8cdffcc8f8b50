//! CMDB command line tools
//!
//! Manage authentication for the CMDB API, query variants and annotate VCF
//! files from the command line.

use std::io::{self, LineWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::util::SubscriberInitExt;

use cmdb_tools::client::ClientConfig;
use cmdb_tools::commands::format_variant_vcf;
use cmdb_tools::protocol::constants::{DEFAULT_API_URL, REGION_SPAN};
use cmdb_tools::{CmdbClient, CmdbError, CredentialStore, Session, VariantId};

#[derive(Parser)]
#[command(name = "cmdbtools")]
#[command(about = "Manage authentication for CMDB API and do querying from command line.")]
#[command(version)]
struct Cli {
    /// CMDB API base URL
    #[arg(long, global = true, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Directory holding the credential record (default: ~/.cmdb)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Vcf,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize access to CMDB API.
    Login {
        /// CMDB API access key (token).
        #[arg(short = 'k', long)]
        token: String,
    },

    /// Display access token for CMDB API.
    PrintAccessToken,

    /// Query variant by identifier CHROM-POS[-REF-ALT], or by chromosome name and position.
    QueryVariant {
        /// Variant identifier CHROM-POS or CHROM-POS-REF-ALT.
        #[arg(short = 'v', long = "variant", value_name = "chrom-pos-ref-alt", conflicts_with_all = ["chromosome", "position"])]
        variant_id: Option<VariantId>,

        /// Chromosome name.
        #[arg(short, long, value_name = "name")]
        chromosome: Option<String>,

        /// Position.
        #[arg(short, long, value_name = "base-pair")]
        position: Option<u64>,

        /// Output format.
        #[arg(short = 'o', long = "output", value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Query all variants of a region starting at a position.
    QueryRegion {
        /// Chromosome name.
        #[arg(short, long, value_name = "name")]
        chromosome: String,

        /// First position of the region.
        #[arg(short, long, value_name = "base-pair")]
        position: u64,

        /// Last position of the region (default: position + 8000).
        #[arg(short, long, value_name = "base-pair")]
        end: Option<u64>,

        /// Output format.
        #[arg(short = 'o', long = "output", value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Annotate input VCF.
    ///
    /// Uncompressed or gzip-compressed (.gz) input VCF is read from a file.
    /// Uncompressed output VCF is streamed to standard output. Multi-allelic
    /// variant records must be split into bi-allelic records beforehand.
    Annotate {
        /// Input VCF file.
        #[arg(short = 'i', long = "vcffile", value_name = "name")]
        vcffile: PathBuf,

        /// Filtering expression.
        #[arg(short, long, value_name = "expression")]
        filter: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            if let Some(hint) = failure_hint(&e) {
                eprintln!("{}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Extra line printed after errors that a fresh login would fix.
fn failure_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.downcast_ref::<CmdbError>()
        .is_some_and(CmdbError::requires_login)
        .then_some("Sign in with `cmdbtools login --token TOKEN`.")
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("Invalid log level '{}'", level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = match cli.config_dir {
        Some(dir) => CredentialStore::new(dir),
        None => CredentialStore::default_location()?,
    };
    let client = CmdbClient::with_config(ClientConfig::with_api_url(cli.api_url))?;
    let session = Session::new(client, store);

    match cli.command {
        Commands::Login { token } => {
            session.login(&token).await?;
            println!("Done.\nYou are signed in.");
        }
        Commands::PrintAccessToken => println!("{}", session.access_token()?),
        Commands::QueryVariant {
            variant_id,
            chromosome,
            position,
            format,
        } => {
            let id = resolve_variant(variant_id, chromosome, position)?;
            query_variant_command(&session, &id, format).await?;
        }
        Commands::QueryRegion {
            chromosome,
            position,
            end,
            format,
        } => {
            let end = end.unwrap_or(position.saturating_add(REGION_SPAN));
            query_region_command(&session, &chromosome, position, end, format).await?;
        }
        Commands::Annotate { vcffile, filter } => {
            let output = LineWriter::new(io::stdout());
            session
                .annotate(&vcffile, filter.as_deref(), output)
                .await
                .with_context(|| format!("Failed to annotate {}", vcffile.display()))?;
        }
    }
    Ok(())
}

/// The variant named by `-v`, or by `-c` and `-p` together.
fn resolve_variant(
    variant_id: Option<VariantId>,
    chromosome: Option<String>,
    position: Option<u64>,
) -> anyhow::Result<VariantId> {
    if let Some(id) = variant_id {
        return Ok(id);
    }
    let (chromosome, position) = chromosome.zip(position).context(
        "Provide either \"-v,--variant\" or both \"-c,--chromosome\" and \"-p,--position\".",
    )?;
    Ok(VariantId {
        chromosome,
        position,
        reference: None,
        alternate: None,
    })
}

async fn query_variant_command(
    session: &Session,
    id: &VariantId,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let Some(body) = session.query_variant_id(id).await? else {
        eprintln!("No CMDB record found for {}.", id);
        return Ok(());
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body)?),
        OutputFormat::Vcf => {
            let version = session.load_version()?;
            for line in format_variant_vcf(id, &body, &version)? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

async fn query_region_command(
    session: &Session,
    chromosome: &str,
    start: u64,
    end: u64,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut rows = session.region_rows(chromosome, start, end, format == OutputFormat::Vcf)?;
    let mut out = LineWriter::new(io::stdout());

    while let Some(row) = rows.next().await {
        match row? {
            Value::String(line) => writeln!(out, "{}", line)?,
            other => writeln!(out, "{}", serde_json::to_string(&other)?)?,
        }
    }
    out.flush()?;
    Ok(())
}
