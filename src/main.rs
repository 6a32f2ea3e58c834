//! CLI entry point for `mimefilter`.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mimefilter::arg::{ArgValue, ObjectState};
use mimefilter::config::Config;
use mimefilter::filter::FilterSpec;
use mimefilter::stream::{FilterStream, StreamStats};

#[derive(Parser)]
#[command(name = "mimefilter", version, about = "Streaming MIME text filters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a file (or stdin) through a filter chain
    Run(RunArgs),
    /// Dump an object state file
    State {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration, or write a default config file
    Config {
        /// Write the default configuration to the config file path
        #[arg(long)]
        init: bool,
        /// Overwrite an existing config file
        #[arg(long, requires = "init")]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args)]
struct RunArgs {
    /// Input file; stdin when omitted or "-"
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file; stdout when omitted
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Filter to apply, in order (chomp, from, crlf-encode[-dots],
    /// crlf-decode[-dots], strip-header:NAME). Defaults to the configured chain.
    #[arg(short = 'f', long = "filter", value_name = "SPEC")]
    filters: Vec<FilterSpec>,

    /// Bytes read per filter call
    #[arg(long, value_name = "BYTES", env = "MIMEFILTER_CHUNK_SIZE")]
    chunk_size: Option<usize>,

    /// Print byte counts to stderr when done
    #[arg(long)]
    stats: bool,

    /// Print the stats as JSON
    #[arg(long, requires = "stats")]
    json: bool,

    /// Show a progress bar (file inputs only)
    #[arg(long)]
    progress: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mimefilter::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Run(args) => cmd_run(args, &config),
        Commands::State { path, json } => cmd_state(&path, json),
        Commands::Config { init, force } => cmd_config(&config, init, force),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = mimefilter::config::log_file_path(config);
    let log_dir = log_path.parent().unwrap_or(Path::new("."));
    let log_name = log_path.file_name().unwrap_or("mimefilter.log".as_ref());
    if std::fs::create_dir_all(log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(log_dir, log_name);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Print the effective configuration, or write the defaults with `--init`.
fn cmd_config(config: &Config, init: bool, force: bool) -> anyhow::Result<()> {
    let path = mimefilter::config::config_file_path();

    if init {
        if let Some(existing) = path.as_ref().filter(|p| p.exists()) {
            if !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    existing.display()
                );
            }
        }
        let written = mimefilter::config::save_config(&Config::default())?;
        println!("Wrote {}", written.display());
        return Ok(());
    }

    if let Some(path) = &path {
        let state = if path.exists() { "" } else { " (not found, using defaults)" };
        println!("# {}{state}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mimefilter", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Filter INPUT into OUTPUT through the requested chain.
fn cmd_run(args: RunArgs, config: &Config) -> anyhow::Result<()> {
    let specs = if args.filters.is_empty() {
        config.filters.chain.clone()
    } else {
        args.filters
    };
    let chunk_size = args.chunk_size.unwrap_or(config.stream.chunk_size).max(1);

    let (mut reader, total): (Box<dyn Read>, Option<u64>) = match &args.input {
        Some(path) if path.as_os_str() != "-" => {
            if !path.exists() {
                anyhow::bail!("File not found: {}", path.display());
            }
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            let len = file.metadata()?.len();
            (Box::new(file), Some(len))
        }
        _ => (Box::new(io::stdin().lock()), None),
    };

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut stream = FilterStream::new(writer);
    for spec in &specs {
        stream.add(spec.build());
    }
    tracing::info!(
        filters = specs.len(),
        chunk_size,
        "starting filter run"
    );

    let pb = match total {
        Some(len) if args.progress => {
            let pb = ProgressBar::new(len);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} Filtering [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                    )?
                    .progress_chars("#>-"),
            );
            pb
        }
        _ => ProgressBar::hidden(),
    };

    let start = Instant::now();
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("reading input"),
        };
        stream.write_all(&buf[..n])?;
        pb.inc(n as u64);
    }
    stream.close()?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    if args.stats {
        let names: Vec<String> = specs.iter().map(ToString::to_string).collect();
        if args.json {
            print_stats_json(&names, &stream.stats(), elapsed)?;
        } else {
            print_stats_table(&names, &stream.stats(), elapsed);
        }
    }
    Ok(())
}

/// Print run statistics in a human-readable table.
fn print_stats_table(filters: &[String], stats: &StreamStats, elapsed: Duration) {
    use humansize::{format_size, BINARY};

    let chain = if filters.is_empty() {
        "(none)".to_string()
    } else {
        filters.join(", ")
    };
    eprintln!();
    eprintln!("  {:<12} {}", "Filters", chain);
    eprintln!("  {:<12} {}", "Bytes in", format_size(stats.bytes_in, BINARY));
    eprintln!("  {:<12} {}", "Bytes out", format_size(stats.bytes_out, BINARY));
    eprintln!("  {:<12} {}", "Chunks", stats.chunks);
    eprintln!("  {:<12} {:.2?}", "Elapsed", elapsed);
    eprintln!();
}

/// Print run statistics as JSON.
fn print_stats_json(
    filters: &[String],
    stats: &StreamStats,
    elapsed: Duration,
) -> anyhow::Result<()> {
    let out = serde_json::json!({
        "filters": filters,
        "stats": stats,
        "elapsed_ms": elapsed.as_millis(),
    });
    eprintln!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Print the metadata and properties stored in an object state file.
fn cmd_state(path: &Path, json: bool) -> anyhow::Result<()> {
    let state = ObjectState::load(path)?;

    if json {
        let meta: serde_json::Map<String, serde_json::Value> = state
            .meta
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(v.as_str())))
            .collect();
        let props: Vec<serde_json::Value> = state
            .props
            .iter()
            .map(|(tag, value)| {
                serde_json::json!({
                    "tag": tag.to_string(),
                    "raw": tag.raw(),
                    "value": value_json(value),
                })
            })
            .collect();
        let out = serde_json::json!({ "meta": meta, "props": props });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    for (key, value) in &state.meta {
        println!("  {key:<20} {value}");
    }
    if !state.meta.is_empty() && !state.props.is_empty() {
        println!();
    }
    for (tag, value) in &state.props {
        println!("  {:<20} {}", tag.to_string(), value_json(value));
    }
    println!();
    Ok(())
}

fn value_json(value: &ArgValue) -> serde_json::Value {
    match value {
        ArgValue::Int(v) => serde_json::Value::from(*v),
        ArgValue::Bool(v) => serde_json::Value::from(*v),
        ArgValue::Str(v) => serde_json::Value::from(v.clone()),
        ArgValue::Double(v) => serde_json::Value::from(*v),
        ArgValue::Pointer(v) => serde_json::Value::from(*v),
        ArgValue::Object(_) => serde_json::Value::Null,
    }
}
