use anyhow::{anyhow, Result};
use clap::Parser;
use repcount::{
    PoseSource, PresetCatalog, PresetOverrides, RepcountConfig, RepcountOrchestrator,
    TimestampMode,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "repcount")]
#[command(about = "Exercise repetition counter driven by pose observations")]
#[command(version)]
#[command(long_about = "Counts synchronized arm-raise repetitions from a stream of pose \
observations, tracks sets and rest periods, flags form errors, and signals each outcome \
to a feedback microcontroller over a serial line.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "repcount.toml", help = "Path to TOML configuration file")]
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
    #[arg(long, help = "Validate configuration file and exit without starting a session")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start components
    #[arg(long, help = "Resolve configuration and preset, initialize, then exit")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Exercise presets file
    #[arg(long, value_name = "PATH")]
    presets: Option<String>,

    /// Exercise preset name
    #[arg(short, long, value_name = "NAME")]
    exercise: Option<String>,

    /// List the available presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Repetitions per set
    #[arg(long)]
    reps: Option<u32>,

    /// Number of sets
    #[arg(long)]
    sets: Option<u32>,

    /// Rest between sets in seconds
    #[arg(long)]
    rest: Option<u32>,

    /// Green (upper) line offset from the shoulder baseline
    #[arg(long, allow_hyphen_values = true)]
    green: Option<f64>,

    /// Red (lower) line offset from the shoulder baseline
    #[arg(long, allow_hyphen_values = true)]
    red: Option<f64>,

    /// Pose observation source, `-` for stdin
    #[arg(short, long, value_name = "PATH")]
    input: Option<String>,

    /// Sample timestamps: stamp on arrival or use the record's own
    #[arg(long, value_parser = ["arrival", "source"])]
    timestamps: Option<String>,

    /// Serial device of the feedback microcontroller
    #[arg(long, value_name = "PATH")]
    device: Option<String>,

    /// Run without the microcontroller
    #[arg(long)]
    no_transport: bool,

    /// Skip writing the JSON report
    #[arg(long)]
    no_report: bool,

    /// Enable keyboard controls ('l' reset, 't' terminate)
    #[arg(long)]
    keyboard: bool,
}

impl Args {
    fn overrides(&self) -> PresetOverrides {
        PresetOverrides {
            reps_per_set: self.reps,
            sets_total: self.sets,
            rest_seconds: self.rest,
            green_offset: self.green,
            red_offset: self.red,
        }
    }

    /// Fold command-line settings into the loaded configuration
    fn apply_to(&self, config: &mut RepcountConfig) {
        if let Some(presets) = &self.presets {
            config.exercise.presets_file = presets.clone();
        }
        if let Some(exercise) = &self.exercise {
            config.exercise.preset = Some(exercise.clone());
        }
        if let Some(input) = &self.input {
            config.input.source = input.clone();
        }
        match self.timestamps.as_deref() {
            Some("source") => config.input.timestamps = TimestampMode::Source,
            Some("arrival") => config.input.timestamps = TimestampMode::Arrival,
            _ => {}
        }
        if let Some(device) = &self.device {
            config.transport.device = device.clone();
        }
        if self.no_transport {
            config.transport.enabled = false;
        }
        if self.no_report {
            config.report.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // Held until exit so buffered file logs are flushed
    let _log_guard = init_logging(&args)?;

    info!("Starting repcount v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match RepcountConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    args.apply_to(&mut config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let catalog = PresetCatalog::load(&config.exercise.presets_file).map_err(|e| {
        error!("Failed to load exercise presets: {}", e);
        e
    })?;

    if args.list_presets {
        print_presets(&catalog);
        return Ok(());
    }

    let mut preset = catalog
        .select(config.exercise.preset.as_deref())?
        .clone();
    let overrides = args.overrides();
    if !overrides.is_empty() {
        info!("Applying command-line overrides to preset '{}'", preset.name);
        preset.apply_overrides(&overrides);
    }
    let session_config = config.session.apply(preset.to_session_config());

    if args.keyboard && config.input.source == "-" {
        warn!("Keyboard controls and stdin input share the terminal");
    }

    let mut orchestrator = RepcountOrchestrator::new(config.clone(), session_config).map_err(|e| {
        error!("Failed to create session: {}", e);
        e
    })?;
    orchestrator.set_keyboard_enabled(args.keyboard);

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - session configured but not started");
        println!("✓ Dry run completed successfully - exercise '{}' is ready", preset.name);
        return Ok(());
    }

    let source = PoseSource::open(&config.input.source).await?;

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start session: {}", e);
        e
    })?;

    let outcome = orchestrator.run(source).await.map_err(|e| {
        error!("Session error during execution: {}", e);
        e
    })?;

    println!("{}", outcome.report.summary());
    if let Some(path) = &outcome.report_path {
        println!("Report: {}", path.display());
    }

    info!("Repcount exited ({:?})", outcome.reason);
    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
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
        .unwrap_or_else(|_| EnvFilter::new(format!("repcount={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("--log-file must name a file: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

fn print_presets(catalog: &PresetCatalog) {
    println!("{:<24} {:>5} {:>5} {:>6} {:>8} {:>8}", "NAME", "REPS", "SETS", "REST", "GREEN", "RED");
    for preset in catalog.presets() {
        println!(
            "{:<24} {:>5} {:>5} {:>6} {:>+8.3} {:>+8.3}",
            preset.name,
            preset.reps_per_set,
            preset.sets_total,
            preset.rest_seconds,
            preset.green_offset,
            preset.red_offset
        );
    }
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Repcount Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Environment overrides use REPCOUNT_<SECTION>__<KEY>, e.g. REPCOUNT_TRANSPORT__DEVICE");
    println!();
    println!("{}", toml::to_string_pretty(&RepcountConfig::default())?);
    Ok(())
}
