use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::analytics::window::MAX_HALF_WIDTH;

/// NFL weather and injury analytics API
#[derive(Parser, Debug, Clone)]
#[command(name = "gridiron-weather", version, about)]
pub struct Config {
    /// HTTP listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// SQLite database path (dataset tables and accounts)
    #[arg(long, env = "DATABASE_PATH", default_value = "gridiron.db")]
    pub database_path: String,

    /// Serve the analytical views from a JSON snapshot instead of SQLite
    #[arg(long, env = "SNAPSHOT_PATH")]
    pub snapshot_path: Option<PathBuf>,

    /// Half width W of the injury/weather association window used by
    /// /injury_probability/:season
    #[arg(long, env = "DEFAULT_WINDOW_HALF_WIDTH", default_value = "2")]
    pub default_window_half_width: u32,

    /// PBKDF2 iterations for newly stored passwords
    #[arg(long, env = "PASSWORD_HASH_ITERATIONS", default_value = "100000")]
    pub password_hash_iterations: u32,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("listen_addr must be host:port, got {:?}", self.listen_addr);
        }
        if self.database_path.trim().is_empty() {
            anyhow::bail!("database_path must not be empty");
        }
        if self.default_window_half_width > MAX_HALF_WIDTH {
            anyhow::bail!("default_window_half_width must be at most {}", MAX_HALF_WIDTH);
        }
        if self.password_hash_iterations < 1_000 {
            anyhow::bail!("password_hash_iterations must be at least 1000");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["gridiron-weather"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]);
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.default_window_half_width, 2);
        assert!(config.snapshot_path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse(&["--default-window-half-width", "18"]).validate().is_err());
        assert!(parse(&["--default-window-half-width", "17"]).validate().is_ok());
        assert!(parse(&["--password-hash-iterations", "10"]).validate().is_err());
        assert!(parse(&["--listen-addr", "localhost"]).validate().is_err());
    }

    #[test]
    fn snapshot_path_flag() {
        let config = parse(&["--snapshot-path", "/tmp/nfl.json"]);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/nfl.json")));
    }
}
