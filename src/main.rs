use clap::Parser;
use psa_gateway::services::logger::LogLevel;
use psa_gateway::services::settings::Settings;

/// MCP server exposing the PSA backend as tools over stdio.
#[derive(Debug, Parser)]
#[command(name = "psa-gateway", version, about)]
struct Cli {
    /// Backend base URL (overrides PSA_SERVICE_URL).
    #[arg(long, value_name = "URL")]
    service_url: Option<String>,

    /// Serve fixed sample tickets instead of calling the backend.
    #[arg(long)]
    mock_data: bool,

    /// error, warn, info or debug (overrides LOG_LEVEL).
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings::from_env();
        if let Some(url) = &self.service_url {
            settings = settings.with_service_url(url.clone());
        }
        if self.mock_data {
            settings = settings.with_mock_data(true);
        }
        if let Some(level) = &self.log_level {
            settings.log_level = LogLevel::parse(level);
        }
        settings
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = psa_gateway::mcp::server::run_stdio(cli.settings()).await {
        eprintln!("psa-gateway: {}", err);
        std::process::exit(1);
    }
}
