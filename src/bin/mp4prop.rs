use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use mp4atom::{AtomFile, PropertyKind, util::parse_int};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(version, about = "Read or modify a single atom property by path")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    #[command(subcommand)]
    cmd: Command,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a property, e.g. `get moov.trak.mdia.minf.stbl.stsd.c608.dataReferenceIndex`
    Get { property: String },
    /// Set a property and store the file.
    ///
    /// Integers accept decimal, 0x-hex or a quoted 4CC ('isom'). Blobs take
    /// text, or hex with a `hex:` prefix. Tables take a JSON array of rows.
    Set {
        property: String,
        value: String,
        /// Write to this file instead of rewriting the input
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .compact()
        .without_time()
        .with_target(false)
        .with_max_level(if args.verbose { LevelFilter::INFO } else { LevelFilter::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut file = AtomFile::load(&args.path).with_context(|| format!("parsing {}", args.path))?;

    match args.cmd {
        Command::Get { property } => {
            let p = file.property(&property)?;
            println!("{}", p.display_value());
        }
        Command::Set {
            property,
            value,
            output,
        } => {
            let p = file.property_mut(&property)?;
            match p.kind() {
                PropertyKind::Integer { .. } => {
                    let v = parse_int(&value)
                        .with_context(|| format!("'{value}' is not an integer"))?;
                    p.set_integer(v)?;
                }
                PropertyKind::Blob { .. } => {
                    let bytes = match value.strip_prefix("hex:") {
                        Some(h) => hex::decode(h).context("invalid hex")?,
                        None => value.clone().into_bytes(),
                    };
                    p.set_bytes(&bytes)?;
                }
                PropertyKind::Table { .. } => {
                    let rows: Vec<Vec<u64>> =
                        serde_json::from_str(&value).context("expected a JSON array of rows")?;
                    p.set_rows(rows)?;
                }
                PropertyKind::Reserved { .. } => bail!("'{property}' is reserved"),
            }
            let out = output.unwrap_or_else(|| args.path.clone());
            file.store(&out).with_context(|| format!("writing {out}"))?;
            info!(%property, %out, "updated");
        }
    }
    Ok(())
}
