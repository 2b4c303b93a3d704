//! Process configuration.
//!
//! Everything has a default; the environment can only override the listen
//! address. Log filtering is read separately by [`telemetry`](crate::telemetry)
//! from `RUST_LOG`.

use std::env;

/// Listen address used when `RABIE_ADDR` is unset.
pub const DEFAULT_ADDR: &str = "0.0.0.0:1323";

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `host:port` to listen on.
    pub addr: String,
}

impl Config {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let addr = get("RABIE_ADDR")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDR.to_owned());
        Self { addr }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { addr: DEFAULT_ADDR.to_owned() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_port_1323() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
        assert_eq!(Config::default().addr, "0.0.0.0:1323");
    }

    #[test]
    fn env_overrides_the_address() {
        let cfg = Config::from_lookup(|k| (k == "RABIE_ADDR").then(|| " 127.0.0.1:8080 ".to_owned()));
        assert_eq!(cfg.addr, "127.0.0.1:8080");
    }

    #[test]
    fn blank_override_is_ignored() {
        let cfg = Config::from_lookup(|_| Some("   ".to_owned()));
        assert_eq!(cfg.addr, DEFAULT_ADDR);
    }
}
