//! Runtime configuration for the gateway server.
//!
//! Every option can be given on the command line or through a `GATEWAY_*`
//! environment variable.

use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use log::LevelFilter;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Gateway server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "note-store-gateway", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "GATEWAY_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,

    /// Do not serve the business note store
    #[arg(long, env = "GATEWAY_NO_BUSINESS_STORE")]
    pub no_business_store: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            log_level: LevelFilter::Info,
            no_business_store: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = Config::try_parse_from(["note-store-gateway"]).unwrap();
        let defaults = Config::default();

        assert_eq!(config.bind, defaults.bind);
        assert_eq!(config.log_level, defaults.log_level);
        assert!(!config.no_business_store);
    }

    #[test]
    fn test_parse_flags() {
        let config = Config::try_parse_from([
            "note-store-gateway",
            "--bind",
            "0.0.0.0:9000",
            "--log-level",
            "debug",
            "--no-business-store",
        ])
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(config.no_business_store);
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(Config::try_parse_from(["note-store-gateway", "--bind", "nowhere"]).is_err());
    }
}
