//! rust-inet: address resolution and reachability from the command line
//!
//! # Usage
//!
//! ```bash
//! # Resolve hostnames through the cache
//! rust-inet resolve example.com localhost
//!
//! # Probe a host on the echo port
//! rust-inet probe 192.0.2.1 2000
//!
//! # List interfaces
//! rust-inet -c /path/to/config.json interfaces
//!
//! # Run with environment overrides
//! RUST_INET_PREFER_IPV6=true rust-inet resolve example.com
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context as _, Result};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rust_inet::config::{apply_env_overrides, load_config_with_env, Config};
use rust_inet::InetContext;

const DEFAULT_CONFIG_PATH: &str = "/etc/rust-inet/config.json";

/// Subcommand to run
enum Command {
    Resolve(Vec<String>),
    Probe { host: String, timeout_ms: Option<i64> },
    Interfaces,
}

/// Command-line arguments
struct Args {
    /// Configuration file path, if given explicitly
    config_path: Option<PathBuf>,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
    command: Option<Command>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = std::env::args().skip(1);
        let mut config_path = None;
        let mut generate_config = false;
        let mut check_config = false;
        let mut command = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    let path = args.next().context("--config requires a path")?;
                    config_path = Some(PathBuf::from(path));
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("rust-inet v{}", rust_inet::VERSION);
                    std::process::exit(0);
                }
                "resolve" => {
                    let hosts: Vec<String> = args.by_ref().collect();
                    if hosts.is_empty() {
                        bail!("resolve requires at least one host");
                    }
                    command = Some(Command::Resolve(hosts));
                }
                "probe" => {
                    let host = args.next().context("probe requires an address")?;
                    let timeout_ms = args
                        .next()
                        .map(|t| t.parse().with_context(|| format!("Invalid timeout: {t}")))
                        .transpose()?;
                    command = Some(Command::Probe { host, timeout_ms });
                }
                "interfaces" => {
                    command = Some(Command::Interfaces);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Ok(Self {
            config_path,
            generate_config,
            check_config,
            command,
        })
    }
}

fn print_help() {
    println!(
        r"rust-inet v{}

Hostname resolution, address inspection and reachability probing.

USAGE:
    rust-inet [OPTIONS] <COMMAND>

COMMANDS:
    resolve <HOST>...               Resolve hostnames and print every address
    probe <ADDRESS> [TIMEOUT_MS]    Probe a host on the echo port
    interfaces                      List network interfaces and their addresses

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: {DEFAULT_CONFIG_PATH}]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    -h, --help              Print help information
    -v, --version           Print version information

ENVIRONMENT:
    RUST_INET_LOG_LEVEL           Override log level (trace, debug, info, warn, error)
    RUST_INET_CACHE_MAX_ENTRIES   Override resolution cache capacity
    RUST_INET_PREFER_IPV6         Order IPv6 results first (true/false)
",
        rust_inet::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target)
        .with_writer(std::io::stderr);

    if config.log.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Load the configuration file, or the defaults when none exists
fn load(args: &Args) -> Result<Config> {
    let path = match &args.config_path {
        Some(path) => path.clone(),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !path.exists() {
                return apply_env_overrides(Config::default())
                    .map_err(|e| anyhow!("Invalid environment override: {e}"));
            }
            path
        }
    };

    load_config_with_env(&path)
        .map_err(|e| anyhow!("Failed to load configuration from {}: {e}", path.display()))
}

async fn resolve(context: &InetContext, hosts: &[String]) -> Result<()> {
    let resolver = context.resolver();
    for host in hosts {
        match resolver.resolve_all(host).await {
            Ok(addresses) => {
                for addr in addresses {
                    println!("{host}\t{addr}");
                }
            }
            Err(e) if e.is_unknown_host() => println!("{host}\tunknown host"),
            Err(e) => return Err(e).with_context(|| format!("Failed to resolve {host}")),
        }
    }

    let stats = context.cache().stats().snapshot();
    debug!(
        "Cache: {} hits, {} misses, {} negative hits",
        stats.hits, stats.misses, stats.negative_hits
    );
    Ok(())
}

async fn probe(context: &InetContext, host: &str, timeout_ms: Option<i64>) -> Result<()> {
    let addr = context
        .resolver()
        .resolve_one(host)
        .await
        .with_context(|| format!("Failed to resolve {host}"))?;
    let timeout_ms = timeout_ms.unwrap_or_else(|| {
        i64::try_from(context.config().probe.default_timeout_ms).unwrap_or(i64::MAX)
    });

    let reachable = context.prober().is_reachable(&addr, timeout_ms).await?;
    println!(
        "{addr} is {}",
        if reachable { "reachable" } else { "unreachable" }
    );
    Ok(())
}

fn interfaces(context: &InetContext) -> Result<()> {
    for interface in context.list_interfaces()? {
        println!("{}: {}", interface.index(), interface.name());
        for addr in interface.addresses() {
            println!("    {addr}");
        }
    }
    Ok(())
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse()?;

    if args.generate_config {
        let path = args
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        rust_inet::config::create_default_config(&path)?;
        println!("Generated default configuration at {}", path.display());
        return Ok(());
    }

    let config = load(&args)?;

    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config);
    info!("rust-inet v{}", rust_inet::VERSION);

    let Some(command) = args.command else {
        print_help();
        std::process::exit(1);
    };

    let context = InetContext::system(&config)?;

    match command {
        Command::Resolve(hosts) => resolve(&context, &hosts).await,
        Command::Probe { host, timeout_ms } => probe(&context, &host, timeout_ms).await,
        Command::Interfaces => interfaces(&context),
    }
}
