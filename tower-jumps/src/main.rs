//! Tower Jumps - Carrier Location Analysis
//!
//! Flags intervals where a subscriber's serving tower changes faster than
//! any plausible travel allows.

use std::path::{Path, PathBuf};
use tower_jumps::analysis::generate_summary;
use tower_jumps::app::cli::{Cli, Commands, ConfigAction};
use tower_jumps::app::config::{Config, LoggingConfig};
use tower_jumps::data::{load_csv, validate_data, write_report, DatasetStats};
use tower_jumps::pipeline::events::{EventData, EventKind};
use tower_jumps::pipeline::run;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    // Config comes first so its logging section can seed the filter
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    init_tracing(cli.verbose, &config.logging);

    match cli.command {
        Commands::Analyze {
            input,
            output,
            window,
            max_speed,
            confidence_threshold,
            quiet,
        } => {
            run_analyze(&input, &output, window, max_speed, confidence_threshold, quiet, &config)?;
        }
        Commands::Validate { input } => {
            run_validate(&input)?;
        }
        Commands::Serve { host, port } => {
            run_serve(host, port, &config)?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, logging: &LoggingConfig) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn run_analyze(
    input: &Path,
    output: &Path,
    window: Option<u32>,
    max_speed: Option<f64>,
    confidence_threshold: Option<f64>,
    quiet: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mut analysis = config.analysis.clone();
    if let Some(minutes) = window {
        analysis = analysis.with_window_minutes(minutes);
    }
    if let Some(mph) = max_speed {
        analysis = analysis.with_max_speed_mph(mph);
    }
    if let Some(threshold) = confidence_threshold {
        analysis = analysis.with_confidence_threshold(threshold);
    }
    analysis.validate()?;

    info!("Analyzing {:?}", input);
    let loaded = load_csv(input)?;
    if loaded.skipped_rows > 0 {
        warn!("Skipped {} unreadable rows", loaded.skipped_rows);
    }

    print_stats(&validate_data(&loaded.samples));

    println!("\nAnalysis parameters:");
    println!("  Window: {} minutes", analysis.window_minutes);
    println!("  Max speed: {:.1} mph ({:.1} km/h)", analysis.max_speed_mph(), analysis.max_speed_kmh);
    println!("  Confidence threshold: {:.2}", analysis.min_confidence_threshold);

    let mut pipeline = run(loaded.samples, analysis.clone());
    let mut failure = None;
    for event in pipeline.by_ref() {
        match &event.data {
            EventData::Error(data) => {
                error!(error_type = %data.error_type, "{}", event.message);
                failure = Some(event.message.clone());
            }
            EventData::IntervalCompleted(interval) if !quiet => {
                println!(
                    "  {} - {}  {:<8} jump={:<3} confidence={:.1}%",
                    interval.start_time.format("%Y-%m-%d %H:%M"),
                    interval.end_time.format("%H:%M"),
                    interval.estimated_state,
                    if interval.is_tower_jump { "yes" } else { "no" },
                    interval.confidence,
                );
            }
            _ if event.kind() == EventKind::AnalysisProgress => info!("{}", event.message),
            _ => debug!(kind = event.kind().as_str(), "{}", event.message),
        }
    }

    if let Some(message) = failure {
        anyhow::bail!("{}", message);
    }

    let intervals = pipeline.into_intervals();
    if intervals.is_empty() {
        anyhow::bail!("Analysis produced no intervals");
    }

    write_report(&intervals, output)?;
    info!("Wrote {} intervals to {:?}", intervals.len(), output);

    let uncertain = intervals
        .iter()
        .filter(|i| i.confidence < analysis.min_confidence_threshold)
        .count();

    if let Some(summary) = generate_summary(&intervals) {
        println!("\nAnalysis Complete!");
        println!("  Intervals: {}", summary.total_intervals);
        println!(
            "  Tower jumps: {} ({:.1}%)",
            summary.tower_jump_intervals, summary.tower_jump_percentage
        );
        println!("  Most common state: {}", summary.most_common_region);
        println!("  Average confidence: {:.1}%", summary.average_confidence * 100.0);
        println!("  Below confidence threshold: {}", uncertain);
        println!("  States observed: {}", summary.regions_observed.join(", "));
        println!("  Output: {:?}", output);
    }

    Ok(())
}

fn run_validate(input: &Path) -> anyhow::Result<()> {
    info!("Validating {:?}", input);

    let loaded = load_csv(input)?;
    let stats = validate_data(&loaded.samples);
    print_stats(&stats);
    println!("  Rows skipped: {} of {}", loaded.skipped_rows, loaded.total_rows);

    if stats.records_with_location == 0 {
        anyhow::bail!("No records with location data found");
    }
    Ok(())
}

fn print_stats(stats: &DatasetStats) {
    println!("Dataset statistics:");
    println!("  Records: {}", stats.total_records);
    println!(
        "  With location: {} ({:.1}%)",
        stats.records_with_location,
        stats.location_coverage()
    );
    println!("  Without location: {}", stats.records_without_location);
    if let Some((first, last)) = stats.date_range {
        println!("  Date range: {} to {}", first, last);
    }
    println!(
        "  States: {}",
        stats.unique_regions.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!(
        "  Cell types: {}",
        stats.cell_types.iter().cloned().collect::<Vec<_>>().join(", ")
    );
}

fn run_serve(host: Option<String>, port: Option<u16>, config: &Config) -> anyhow::Result<()> {
    let mut server = config.server.clone().with_env_overrides();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(tower_jumps::server::serve(server, config.analysis.clone()))?;
    Ok(())
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save(&config_path)?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = config.to_toml()?;
            println!("Configuration ({:?}):\n", Config::default_path());
            println!("{}", toml_str);
        }
        ConfigAction::Get { key } => match config.lookup(&key)? {
            Some(value) => println!("{} = {}", key, value),
            None => anyhow::bail!("Configuration key '{}' not found", key),
        },
        ConfigAction::Reset { force } => {
            let config_path: PathBuf = Config::default_path();

            if config_path.exists() && !force {
                println!("Config exists at {:?}", config_path);
                println!("Use --force to reset to defaults");
                return Ok(());
            }

            Config::default().save(&config_path)?;
            println!("Configuration reset to defaults at {:?}", config_path);
        }
    }

    Ok(())
}
