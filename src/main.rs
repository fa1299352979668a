mod agent;
mod catalog;
mod config;
mod download;
mod fetch;
mod geocode;
mod select;
#[cfg(test)]
mod test_support;
mod web;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use crate::agent::{Agent, AgentEvent, Conversation, OpenAiChat};
use crate::catalog::Satellite;
use crate::config::Config;
use crate::fetch::{FetchRequest, SceneFetcher};

#[derive(Parser)]
#[command(name = "scene-o-mat")]
#[command(about = "Find and download the Sentinel scene closest to a place and date")]
struct Cli {
    /// YAML configuration file; built-in defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web UI and JSON API
    Serve,
    /// Download one scene directly
    Fetch {
        #[arg(long, value_enum)]
        satellite: Satellite,
        /// Place name to geocode instead of coordinates
        #[arg(long, conflicts_with_all = ["lat", "lon"], required_unless_present = "lat")]
        place: Option<String>,
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Days searched on each side of the date
        #[arg(long)]
        days: Option<u32>,
        /// Maximum cloud cover in percent (Sentinel-2 only)
        #[arg(long)]
        cloud: Option<f64>,
        /// Comma-separated asset keys, overriding the defaults
        #[arg(long, value_delimiter = ',')]
        bands: Vec<String>,
    },
    /// Resolve a place name to coordinates
    Geocode { place: String },
    /// Run one assistant turn from the terminal
    Chat {
        #[arg(required = true)]
        message: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Serve => block_on(serve(config)),
        Commands::Fetch {
            satellite,
            place,
            lat,
            lon,
            date,
            days,
            cloud,
            bands,
        } => {
            let request = FetchRequest {
                satellite,
                lat,
                lon,
                place,
                date,
                day_window: days,
                cloud_ceiling: cloud,
                bbox_offset: None,
                bands: (!bands.is_empty()).then_some(bands),
            };
            block_on(fetch(config, request))
        }
        Commands::Geocode { place } => block_on(geocode(config, place)),
        Commands::Chat { message } => block_on(chat(config, message.join(" "))),
    }
}

fn block_on(task: impl Future<Output = ExitCode>) -> ExitCode {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(task),
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> ExitCode {
    match web::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn fetcher(config: &Config) -> Option<SceneFetcher> {
    match SceneFetcher::new(config) {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

async fn fetch(config: Config, request: FetchRequest) -> ExitCode {
    let Some(fetcher) = fetcher(&config) else {
        return ExitCode::FAILURE;
    };

    match fetcher.fetch(&request).await {
        Ok(report) => {
            println!("{}", report);
            if report.saved_count() > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}

async fn geocode(config: Config, place: String) -> ExitCode {
    let Some(fetcher) = fetcher(&config) else {
        return ExitCode::FAILURE;
    };

    match fetcher.geocode(&place).await {
        Ok(location) => {
            println!("{}", location.address);
            println!("  lat {:.4}, lon {:.4}", location.latitude, location.longitude);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}

async fn chat(config: Config, message: String) -> ExitCode {
    let model = match OpenAiChat::new(&config.llm) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let Some(fetcher) = fetcher(&config) else {
        return ExitCode::FAILURE;
    };
    let agent = Agent::new(Arc::new(model), Arc::new(fetcher), config.llm.max_iterations);

    let mut conversation = Conversation::new();
    match agent.respond(&mut conversation, &message).await {
        Ok(turn) => {
            for event in &turn.events {
                match event {
                    AgentEvent::Geocoding { query } => println!("> geocoding \"{}\"", query),
                    AgentEvent::Downloading {
                        satellite,
                        lat,
                        lon,
                        date,
                        day_window,
                    } => println!(
                        "> searching {} at {:.4}, {:.4} around {} (+/- {} days)",
                        satellite, lat, lon, date, day_window
                    ),
                    AgentEvent::ToolResult { tool, content } => println!("> {}: {}", tool, content),
                }
            }
            println!("{}", turn.reply);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fetch_by_coordinates() {
        let cli = Cli::try_parse_from([
            "scene-o-mat",
            "fetch",
            "--satellite",
            "sentinel-2",
            "--lat",
            "-33.86",
            "--lon",
            "151.21",
            "--date",
            "2023-06-02",
            "--bands",
            "red,green",
        ])
        .unwrap();

        match cli.command {
            Commands::Fetch {
                satellite,
                lat,
                place,
                bands,
                ..
            } => {
                assert_eq!(satellite, Satellite::Sentinel2);
                assert_eq!(lat, Some(-33.86));
                assert_eq!(place, None);
                assert_eq!(bands, ["red", "green"]);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn fetch_needs_place_or_coordinates() {
        let missing = Cli::try_parse_from([
            "scene-o-mat",
            "fetch",
            "--satellite",
            "sentinel-1",
            "--date",
            "2023-06-02",
        ]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "scene-o-mat",
            "fetch",
            "--satellite",
            "sentinel-1",
            "--place",
            "Busan",
            "--lat",
            "1",
            "--lon",
            "2",
            "--date",
            "2023-06-02",
        ]);
        assert!(both.is_err());
    }
}
