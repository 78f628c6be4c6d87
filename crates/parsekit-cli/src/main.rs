//! ParseKit CLI - run the extraction gateway or parse a single URL

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use parsekit::{server, Config, Gateway, ResponseMode, API_LLMTXT};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ParseKit - fetch web pages and extract readable articles
#[derive(Parser, Debug)]
#[command(name = "parsekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print API documentation
    #[arg(long)]
    llmtxt: bool,

    /// Print JSON schemas of the response payloads
    #[arg(long)]
    schema: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Bind address (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides PORT)
        #[arg(long, short)]
        port: Option<u16>,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Fetch and extract one URL, printing the JSON response body
    Parse {
        /// URL to parse
        url: String,

        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Settings shared by both subcommands
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Map failures to non-2xx status codes (overrides STRICT_HTTP)
    #[arg(long)]
    strict: bool,

    /// Fetch deadline in milliseconds (overrides FETCH_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Overrides {
    fn apply(&self, mut config: Config) -> Result<Config> {
        if self.strict {
            config = config.with_response_mode(ResponseMode::Strict);
        }
        if let Some(ms) = self.timeout_ms {
            if ms == 0 {
                bail!("--timeout-ms must be greater than zero");
            }
            config = config.with_fetch_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.llmtxt {
        writeln_safe(API_LLMTXT);
        return Ok(());
    }

    if cli.schema {
        let json = serde_json::to_string_pretty(&parsekit::response_schemas())
            .context("Failed to serialize schemas")?;
        writeln_safe(&json);
        return Ok(());
    }

    // Load .env file if present (development)
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Serve {
            host,
            port,
            overrides,
        }) => {
            let mut config = overrides.apply(config)?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            run_server(config).await
        }
        Some(Commands::Parse { url, overrides }) => run_parse(&url, overrides.apply(config)?).await,
        None => {
            eprintln!("Usage: parsekit serve");
            eprintln!("   or: parsekit parse <URL>");
            eprintln!("   or: parsekit --help");
            std::process::exit(1);
        }
    }
}

/// Log to stderr so `parse` output on stdout stays valid JSON
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,parsekit=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run_server(config: Config) -> Result<()> {
    let gateway = Gateway::new(&config).context("Failed to build gateway")?;
    let app = server::router(Arc::new(gateway));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!("Server running on http://{}", addr);
    tracing::info!(
        fetch_timeout_ms = config.fetch_timeout.as_millis() as u64,
        body_timeout_ms = config.body_timeout.as_millis() as u64,
        max_redirects = config.max_redirects,
        batch_concurrency = config.batch_concurrency,
        mode = %config.response_mode,
        "Configuration loaded"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn run_parse(url: &str, config: Config) -> Result<()> {
    let gateway = Gateway::new(&config).context("Failed to build gateway")?;
    let rendered = gateway.parse(Some(url)).await?;

    let json =
        serde_json::to_string_pretty(&rendered.body).context("Failed to serialize response")?;
    writeln_safe(&json);

    if !rendered.is_ok() {
        std::process::exit(1);
    }
    Ok(())
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommand_args() {
        let cli = Cli::try_parse_from([
            "parsekit",
            "parse",
            "https://example.com",
            "--strict",
            "--timeout-ms",
            "500",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Parse { url, overrides }) => {
                assert_eq!(url, "https://example.com");
                assert!(overrides.strict);
                assert_eq!(overrides.timeout_ms, Some(500));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = Overrides {
            strict: true,
            timeout_ms: Some(1500),
        };
        let config = overrides.apply(Config::default()).unwrap();

        assert_eq!(config.response_mode, ResponseMode::Strict);
        assert_eq!(config.fetch_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_overrides_default_keeps_config() {
        let config = Overrides::default().apply(Config::default()).unwrap();
        assert_eq!(config.response_mode, ResponseMode::Lenient);
        assert_eq!(config.fetch_timeout, parsekit::config::DEFAULT_FETCH_TIMEOUT);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let overrides = Overrides {
            strict: false,
            timeout_ms: Some(0),
        };
        assert!(overrides.apply(Config::default()).is_err());
    }
}
