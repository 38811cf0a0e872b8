use anyhow::Result;
use clap::Parser;
use evive::presentation::render_result;
use evive::{EviveConfig, EviveOrchestrator};
use std::path::Path;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "evive")]
#[command(about = "Camera capture and vision-model component classification station")]
#[command(version)]
#[command(long_about = "Captures a still frame from a network camera, asks a vision model to \
classify the visible electronic components into Reuse, Repair and Recycle, and presents the \
swarm action plan. Runs interactively in the terminal or as a single capture/analysis cycle.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "evive.toml", help = "Path to TOML configuration file")]
    config: String,

    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    #[arg(long, help = "Validate configuration file and exit without starting the station")]
    validate_config: bool,

    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    #[arg(long, help = "Perform dry run - initialize components but don't start them")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", help = "Write log output to a file")]
    log_file: Option<String>,

    #[arg(long, help = "Capture and analyze one frame, print the result and exit")]
    oneshot: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let log_guard = init_logging(&args)?;

    info!("Starting E-Vive station v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match EviveConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                flush_logs(log_guard);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;
    info!("Effective configuration: {:?}", config.redacted());

    let mut orchestrator = EviveOrchestrator::new(config).await.map_err(|e| {
        error!("Failed to create orchestrator: {}", e);
        e
    })?;
    orchestrator.set_console_enabled(!args.oneshot);

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize station: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start station: {}", e);
        e
    })?;

    let exit_code = if args.oneshot {
        let outcome = orchestrator.run_cycle().await;
        let shutdown_code = orchestrator.shutdown().await?;
        match outcome {
            Ok(result) => {
                println!("{}", render_result(&result));
                shutdown_code
            }
            Err(e) => {
                error!("Cycle failed: {}", e);
                eprintln!("✗ {}", e);
                1
            }
        }
    } else {
        orchestrator.run().await.map_err(|e| {
            error!("Station error during execution: {}", e);
            e
        })?
    };

    info!("E-Vive station exited with code: {}", exit_code);
    flush_logs(log_guard);
    std::process::exit(exit_code);
}

/// `process::exit` skips destructors, so the file writer is flushed by hand first
fn flush_logs(log_guard: Option<WorkerGuard>) {
    drop(log_guard);
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
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
        .unwrap_or_else(|_| EnvFilter::new(format!("evive={}", log_level)));

    // The console owns the terminal in raw mode, so a log file keeps it readable
    let (writer, guard) = match &args.log_file {
        Some(path) => {
            let path = Path::new(path);
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = args.log_file.is_none();

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# E-Vive Configuration File");
    println!("# Every key may also be set via EVIVE__<SECTION>__<KEY>, e.g. EVIVE__INFERENCE__API_KEY");
    println!("# The API key falls back to the GEMINI_API_KEY environment variable");
    println!();
    println!("{}", EviveConfig::default().to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flush_logs_writes_buffered_lines() {
        let dir = tempfile::tempdir().unwrap();
        let appender = tracing_appender::rolling::never(dir.path(), "evive.log");
        let (mut writer, guard) = tracing_appender::non_blocking(appender);

        writer.write_all(b"station exited\n").unwrap();
        flush_logs(Some(guard));

        let written = std::fs::read_to_string(dir.path().join("evive.log")).unwrap();
        assert_eq!(written, "station exited\n");
    }

    #[test]
    fn test_parse_log_file_args() {
        let args = Args::parse_from(["evive", "--log-file", "logs/evive.log", "--oneshot"]);
        assert_eq!(args.log_file.as_deref(), Some("logs/evive.log"));
        assert!(args.oneshot);
        assert_eq!(args.config, "evive.toml");
    }
}
