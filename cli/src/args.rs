//! Command-line parsing.

use std::path::PathBuf;

use clap::Parser;
use contend_types::ScenarioId;

/// Where the scenario endpoint lives, when given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Port(u16),
    BaseUrl(String),
}

impl Target {
    pub fn base_url(&self) -> String {
        match self {
            Target::Port(port) => format!("http://localhost:{port}"),
            Target::BaseUrl(url) => url.clone(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "contend")]
#[command(about = "Run the structured-concurrency scenarios against a scenario endpoint")]
pub struct Args {
    /// Endpoint port on localhost, or a full base URL (e.g. http://10.0.0.5:8080)
    #[arg(value_name = "PORT|BASE_URL", value_parser = parse_target)]
    pub target: Option<Target>,
    /// Run only the listed scenarios (comma separated, 1-10)
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub only: Vec<ScenarioId>,
    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
    /// Read settings from PATH instead of ~/.contend/config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Selected scenario ids, sorted and without repeats.
    pub fn only(&self) -> Vec<ScenarioId> {
        let mut ids = self.only.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn parse_target(raw: &str) -> Result<Target, String> {
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return contend_config::parse_port(raw).map(Target::Port);
    }
    if raw.contains("://") {
        return Ok(Target::BaseUrl(raw.to_string()));
    }
    Err(format!("{raw:?} is neither a port nor a base URL"))
}
