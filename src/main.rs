use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use lumacam::{
    AnalysisRunner, LoggingObserver, LumaConfig, LumaObserver, SyntheticFrameSource,
};

#[derive(Parser, Debug)]
#[command(name = "lumacam")]
#[command(about = "Measure average frame luminosity from a camera frame source")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lumacam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Stop after this many frames (overrides source.frame_limit)
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Emit one JSON line per luminosity sample on stdout
    #[arg(long)]
    json: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

/// Writes each sample as a JSON line on stdout
struct JsonLinesObserver;

impl LumaObserver for JsonLinesObserver {
    fn on_luma(&self, luma: f64) {
        let line = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "luma": luma,
        });
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", LumaConfig::default().to_toml()?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting lumacam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match LumaConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(frames) = args.frames {
        config.source.frame_limit = Some(frames);
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let source = SyntheticFrameSource::new(config.source.clone());
    let pool = source.pool();

    let runner = if args.json {
        AnalysisRunner::start(source, JsonLinesObserver, config.analyzer.clone())
    } else {
        AnalysisRunner::start(source, LoggingObserver, config.analyzer.clone())
    };

    let stop = runner.cancellation_token();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, stopping analysis");
                stop.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let stats = runner.join().await.map_err(|e| {
        error!("Analysis failed: {}", e);
        e
    })?;

    let pool_stats = pool.stats();
    info!(
        "Analyzed {} frames ({} malformed); {} of {} buffers outstanding",
        stats.frames_analyzed,
        stats.format_errors,
        pool_stats.outstanding(),
        pool_stats.capacity
    );

    if let Some(luma) = stats.luma.filter(|luma| luma.count > 0) {
        let mean = luma.mean().unwrap_or_default();
        if args.json {
            println!("{}", serde_json::json!({ "summary": luma, "mean": mean }));
        } else {
            println!(
                "frames={} min={:.2} max={:.2} mean={:.2}",
                luma.count, luma.min, luma.max, mean
            );
        }
    }

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lumacam={}", log_level)));

    // Logs go to stderr so --json output on stdout stays machine readable
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}
