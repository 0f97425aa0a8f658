use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vpn_hub::{
    aggregator::{collect_candidates, DiscoveryResponse},
    app::run_worker,
    export::{self, ExportKind},
    tui::HubApp,
    Config, Hub, LinkFilter, LinkType,
};

/// Aggregates public VPN subscription links and checks their liveness
#[derive(Parser)]
#[command(name = "vpn-hub")]
#[command(about = "Aggregates public VPN subscription links and checks their liveness")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database URL (overrides VPN_HUB_DATABASE)
    #[arg(short, long)]
    database: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive TUI
    Tui,
    /// Discover new links and probe the new ones
    Sync,
    /// Probe links still waiting for a result
    Validate {
        /// Probe every link, not only pending ones
        #[arg(short, long)]
        all: bool,
    },
    /// List saved links
    List {
        /// Only links of this type
        #[arg(short = 't', long = "type", value_enum)]
        link_type: Option<TypeArg>,
        /// Only active links under 2000ms
        #[arg(short, long)]
        fast: bool,
        /// Filter by title or source
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Export usable links
    Export {
        /// What to export
        #[arg(value_enum)]
        kind: ExportArg,
        /// Output file (defaults to the generated file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include active links slower than 2000ms
        #[arg(long)]
        include_slow: bool,
    },
    /// Ask the AI service for a one-line summary of the pool
    Summary,
    /// Extract candidate links from a text file without saving them
    Extract {
        /// Text file to scan
        input: PathBuf,
    },
    /// Show how a URL would be classified
    Classify {
        url: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    V2ray,
    Clash,
    Unknown,
}

impl From<TypeArg> for LinkType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::V2ray => LinkType::V2Ray,
            TypeArg::Clash => LinkType::Clash,
            TypeArg::Unknown => LinkType::Unknown,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportArg {
    V2ray,
    Clash,
    Report,
}

impl From<ExportArg> for ExportKind {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::V2ray => ExportKind::V2Ray,
            ExportArg::Clash => ExportKind::Clash,
            ExportArg::Report => ExportKind::Report,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let is_tui = matches!(cli.command, Some(Commands::Tui) | None);
    // The TUI owns the terminal, so its logs always go to a file
    let log_file = match (&cli.log_file, is_tui) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from("vpn-hub.log")),
        (None, false) => None,
    };
    init_tracing(log_file.as_deref())?;

    let mut config = Config::from_env();
    if let Some(database) = cli.database {
        config = config.with_database_url(database);
    }

    match cli.command {
        Some(Commands::Tui) | None => {
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let (command_tx, command_rx) = mpsc::unbounded_channel();

            let hub = Hub::open(&config).await?.with_events(event_tx);
            let discovery_enabled = hub.discovery_enabled();
            let mut app = HubApp::new(command_tx, event_rx, discovery_enabled, std::env::current_dir()?);
            let worker = tokio::spawn(run_worker(hub, command_rx));

            let result = app.run().await;
            drop(app);
            worker.abort();
            result?;
        }
        Some(Commands::Sync) => {
            let mut hub = Hub::open(&config).await?;
            let report = hub.sync().await?;
            if report.disabled {
                return Err(anyhow!("API key not configured, set GEMINI_API_KEY to enable discovery"));
            }
            println!(
                "Discovered {} candidates, {} new, {} active, {} expired",
                report.discovered,
                report.added,
                report.validation.active,
                report.validation.expired
            );
        }
        Some(Commands::Validate { all }) => {
            let mut hub = Hub::open(&config).await?;
            let summary = if all {
                hub.revalidate_all().await
            } else {
                hub.validate_pending().await
            };
            println!(
                "Probed {} links: {} active, {} expired",
                summary.probed, summary.active, summary.expired
            );
        }
        Some(Commands::List {
            link_type,
            fast,
            search,
        }) => {
            let hub = Hub::open(&config).await?;
            let filter = LinkFilter::new()
                .with_search(search)
                .with_type(link_type.map(LinkType::from))
                .with_only_fast(fast);
            let links = hub.filtered(&filter);

            if links.is_empty() {
                println!("No links found.");
            } else {
                for link in links {
                    let ping = link.ping.map_or_else(|| "-".to_string(), |p| format!("{}ms", p));
                    println!("[{}] {} {} - {}", link.link_type, link.status, ping, link.title);
                    println!("   {}", link.url);
                }
            }
            let stats = hub.stats();
            println!(
                "\nTotal: {} | Active: {} | Fast: {} | Avg ping: {}ms",
                stats.total, stats.active, stats.fast, stats.avg_ping_ms
            );
        }
        Some(Commands::Export {
            kind,
            output,
            include_slow,
        }) => {
            let hub = Hub::open(&config).await?;
            let kind = ExportKind::from(kind);
            let artifact = export::render(kind, hub.links(), !include_slow, chrono::Local::now())
                .ok_or_else(|| anyhow!("No usable links in category [{}]", kind))?;

            let path = match output {
                Some(path) => {
                    std::fs::write(&path, &artifact.content)?;
                    path
                }
                None => artifact.save_to_dir(std::env::current_dir()?)?,
            };
            println!("Exported {} links to {:?}", artifact.count, path);
        }
        Some(Commands::Summary) => {
            let hub = Hub::open(&config).await?;
            println!("{}", hub.summary().await);
        }
        Some(Commands::Extract { input }) => {
            let text = std::fs::read_to_string(&input)?;
            let links = collect_candidates(&DiscoveryResponse {
                text,
                sources: Vec::new(),
            });
            info!(count = links.len(), input = %input.display(), "extracted candidates");

            println!("Found {} candidate links in {:?}", links.len(), input);
            for link in &links {
                println!("[{}] {} ({})", link.link_type, link.url, link.source);
            }
        }
        Some(Commands::Classify { url }) => {
            println!("type: {}", vpn_hub::classify(&url));
            println!("subscription candidate: {}", vpn_hub::is_candidate(&url));
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vpn_hub=info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
