use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use mp4atom::{
    Atom, AtomFile, FourCC, ParseOptions,
    json::{JsonAtom, tree_to_json},
    registry::{Registry, default_registry},
    util::hex_dump,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(version, about = "MP4/ISOBMFF atom tree explorer")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Only print subtree(s) at a dotted path (e.g. moov.trak[0].mdia.minf.stbl)
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Dump the encoded payload of every atom of this 4CC (e.g. --raw stsd)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Limit printed depth (for text/tree output)
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Print property values under each atom
    #[arg(long, action = ArgAction::SetTrue)]
    decode: bool,

    /// Show bytes count when dumping raw (0 means entire payload)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// Emit JSON instead of human-readable tree
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Parser options as a JSON file, e.g. {"max_depth": 32, "strict_children": true}
    #[arg(long)]
    options: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .compact()
        .without_time()
        .with_target(false)
        .with_max_level(LevelFilter::from(args.log_level))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = match &args.options {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading {p}"))?;
            ParseOptions::from_json(&text).with_context(|| format!("parsing {p}"))?
        }
        None => ParseOptions::default(),
    };

    let reg = default_registry();
    let file = AtomFile::load_with(&args.path, &reg, &options)
        .with_context(|| format!("parsing {}", args.path))?;

    let targets: Vec<&Atom> = match &args.filter {
        Some(path) => vec![file.find(path)?],
        None => file.atoms().iter().collect(),
    };

    // JSON mode: output JSON and exit (no tree or raw to keep output clean)
    if args.json {
        let json: Vec<JsonAtom> = targets.iter().map(|a| tree_to_json(a, &reg)).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for a in &targets {
        print_atom(a, 0, args.max_depth, args.decode, &reg);
    }

    if let Some(sel) = args.raw.as_deref() {
        let typ = FourCC::from_str(&format!("{sel:<4}"))
            .with_context(|| format!("'{sel}' is not a 4CC"))?;
        for a in &targets {
            dump_raw(a, typ, args.bytes)?;
        }
    }

    Ok(())
}

// ---------- Human-readable tree ----------

fn print_atom(a: &Atom, depth: usize, max_depth: usize, decode: bool, reg: &Registry) {
    let indent = "  ".repeat(depth);
    let note = if a.is_opaque() {
        " (opaque)".to_string()
    } else if !a.children().is_empty() {
        " (container)".to_string()
    } else {
        reg.name(a.typ()).map(|n| format!(" {n}")).unwrap_or_default()
    };
    println!("{indent}{} {:>10}{note}", a.typ(), a.size());

    if decode && !a.is_opaque() {
        for p in a.properties().iter().filter(|p| !p.is_reserved()) {
            println!("{indent}    {} = {}", p.name(), p.display_value());
        }
    }
    if depth < max_depth {
        for c in a.children() {
            print_atom(c, depth + 1, max_depth, decode, reg);
        }
    }
}

// ---------- Raw dump ----------

fn dump_raw(root: &Atom, typ: FourCC, limit: usize) -> anyhow::Result<()> {
    let mut matches = Vec::new();
    root.walk(&mut |a: &Atom, _: usize| {
        if a.typ() == typ {
            matches.push(a.clone());
        }
    });
    for (i, mut a) in matches.into_iter().enumerate() {
        let bytes = a.to_bytes()?;
        let payload = &bytes[a.header_size() as usize..];
        let shown = if limit == 0 || limit > payload.len() {
            payload
        } else {
            &payload[..limit]
        };
        println!("\n== Dump {} ({}) payload: len={} ==", i, typ, shown.len());
        print!("{}", hex_dump(shown, 0));
    }
    Ok(())
}
