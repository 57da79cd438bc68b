use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

use fabricmap::config::ScanConfig;
use fabricmap::config_loader;
use fabricmap::device::Device;
use fabricmap::fabric::discovery::CrawlSummary;
use fabricmap::fabric::Fabric;
use fabricmap::report;
use fabricmap::session::snapshot::SnapshotConnector;

/// Topology discovery for switched networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log filter, e.g. "info" or "fabricmap=debug"
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the network from the configured seeds and print a report
    Discover {
        /// Path to the scan configuration YAML file
        #[arg(short, long)]
        config: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a saved running configuration and print it normalised
    Render {
        /// Running configuration file
        file: PathBuf,

        /// Hostname printed in the header
        #[arg(long, default_value = "device")]
        hostname: String,
    },

    /// Crawl, then list every path between two switches
    Paths {
        /// Path to the scan configuration YAML file
        #[arg(short, long)]
        config: PathBuf,

        /// Hostname the paths start from
        #[arg(long)]
        from: String,

        /// Destination hostname; may be repeated
        #[arg(long, required = true)]
        to: Vec<String>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str())).init();

    match args.command {
        Command::Discover { config, json, output } => {
            let config = config_loader::load_config(&config)?;
            let (fabric, summary) = crawl(&config)?;

            let report = report::build_report(&fabric, Some(summary));
            let rendered = if json {
                report::generate_json_report(&report)?
            } else {
                report::generate_text_report(&report)
            };
            match output {
                Some(path) => report::write_report(&rendered, &path)?,
                None => println!("{}", rendered),
            }
        }
        Command::Render { file, hostname } => {
            let text = fs::read_to_string(&file)
                .wrap_err_with(|| format!("Failed to read running configuration {:?}", file))?;
            let mut device = Device::with_hostname(hostname, None);
            let count = device.parse_running_config(&text)?;
            info!("Parsed {} interface(s) from {:?}", count, file);
            print!("{}", device.render_config()?);
        }
        Command::Paths { config, from, to } => {
            let config = config_loader::load_config(&config)?;
            let (fabric, _) = crawl(&config)?;

            let destinations: Vec<&str> = to.iter().map(String::as_str).collect();
            let paths = fabric.find_paths_between(&from, &destinations)?;
            if paths.is_empty() {
                warn!("No path from {} to {}", from, to.join(", "));
            }
            for (n, path) in paths.iter().enumerate() {
                let hops: Vec<String> = path.iter().map(|hop| fabric.describe(*hop)).collect();
                println!("{}. {}", n + 1, hops.join(" -> "));
            }
        }
    }

    Ok(())
}

fn crawl(config: &ScanConfig) -> Result<(Fabric, CrawlSummary)> {
    info!("Reading device snapshots from {:?}", config.snapshot_dir);
    let connector = SnapshotConnector::new(&config.snapshot_dir);
    let filter = config.neighbor_filter.compile()?;

    let mut fabric = Fabric::new();
    let summary = fabric
        .discover(config.seeds.as_slice(), &connector, &config.to_options(), |n| filter.allows(n))
        .wrap_err("Discovery failed")?;

    info!(
        "Discovery finished: {} completed, {} failed, {} skipped",
        summary.completed, summary.failed, summary.skipped
    );
    Ok((fabric, summary))
}
