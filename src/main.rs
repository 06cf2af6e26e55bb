use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use equity_payoff::api::{
    self,
    price::{ConfiguredPriceSource, PriceCache},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "equity-payoff",
    about = "Projects a home-equity loan against a volatile asset bought with the extracted cash"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, help = "Unit price served when a request does not supply one")]
        unit_price: Option<f64>,
    },
    /// Project a single scenario from a JSON file and print the result.
    Project {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, help = "Unit price used when the input file does not supply one")]
        unit_price: Option<f64>,
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port, unit_price } => {
            let source = ConfiguredPriceSource::new(unit_price);
            if let Err(e) = api::run_http_server(port, source).await {
                eprintln!("Server error: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Command::Project {
            input,
            unit_price,
            pretty,
        } => run_project(&input, unit_price, pretty),
    }
}

fn run_project(input: &Path, unit_price: Option<f64>, pretty: bool) -> ExitCode {
    let json = match fs::read_to_string(input) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };

    let source = ConfiguredPriceSource::new(unit_price);
    let mut cache = PriceCache::default();
    let response =
        match api::project_from_json(&json, &source, &mut cache, Utc::now().date_naive()) {
            Ok(response) => response,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        };

    let rendered = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    match rendered {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Cannot serialize result: {e}");
            ExitCode::FAILURE
        }
    }
}
