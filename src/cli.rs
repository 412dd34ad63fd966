use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use crate::catalog::IndexPolicy;
use crate::server::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "zipshelf")]
#[command(version)]
#[command(about = "Serve a directory of zip image archives over HTTP", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipshelf                          serve archives under ./data on port 8888\n  \
  zipshelf -d /srv/manga -l 127.0.0.1:9000\n  \
  zipshelf --strict -v              refuse to start if any archive is unreadable")]
pub struct Cli {
    /// Directory scanned (recursively) for .zip and .cbz archives
    #[arg(short = 'd', long = "data", value_name = "DIR", default_value = "data/")]
    pub data: PathBuf,

    /// Address to listen on
    #[arg(short = 'l', long, value_name = "ADDR", default_value = "0.0.0.0:8888")]
    pub listen: String,

    /// Seconds to wait for each request head
    #[arg(long, value_name = "SECS", default_value_t = 15)]
    pub read_timeout: u64,

    /// Seconds allowed for writing each response
    #[arg(long, value_name = "SECS", default_value_t = 15)]
    pub write_timeout: u64,

    /// Abort startup on the first unreadable archive
    #[arg(long)]
    pub strict: bool,

    /// More log output (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less log output (-qq => errors only)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match (self.verbose, self.quiet) {
            (0, 0) => Level::INFO,
            (1, _) => Level::DEBUG,
            (_, 0) => Level::TRACE,
            (_, 1) => Level::WARN,
            _ => Level::ERROR,
        }
    }

    pub fn index_policy(&self) -> IndexPolicy {
        if self.strict {
            IndexPolicy::Strict
        } else {
            IndexPolicy::BestEffort
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen: self.listen.clone(),
            read_timeout: Duration::from_secs(self.read_timeout),
            write_timeout: Duration::from_secs(self.write_timeout),
            ..ServerConfig::default()
        }
    }
}
