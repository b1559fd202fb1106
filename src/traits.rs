//! Connector extension point.
//!
//! Every lead source implements [`Connector`]. The built-in CSV and HTTP
//! connectors are created from config by [`ConnectorRegistry::from_config`];
//! library users (and the test suite) can [`register`](ConnectorRegistry::register)
//! their own.
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │        ConnectorRegistry         │
//! │  ┌─────────┐ ┌───────┐ ┌──────┐  │
//! │  │ csv dir │ │ http  │ │custom│  │
//! │  └─────────┘ └───────┘ └──────┘  │
//! └───────────────┬──────────────────┘
//!                 ▼
//!        run_discover() → normalize → dedupe → upsert
//! ```
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use anyhow::Result;
//! use outreach_finder::models::RawRecord;
//! use outreach_finder::traits::{Connector, ConnectorRegistry};
//!
//! struct Fixed;
//!
//! #[async_trait]
//! impl Connector for Fixed {
//!     fn name(&self) -> &str { "fixed" }
//!     fn description(&self) -> &str { "Static list of companies" }
//!
//!     async fn scan(&self, _since_days: Option<i64>) -> Result<Vec<RawRecord>> {
//!         Ok(vec![RawRecord::new("fixed").with("name", "Acme")])
//!     }
//! }
//!
//! let mut registry = ConnectorRegistry::new();
//! registry.register(Box::new(Fixed));
//! assert_eq!(registry.len(), 1);
//! ```

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::models::RawRecord;

/// A lead source that produces raw records for discovery.
///
/// Connectors fetch and parse only. Field names and values are handed over
/// untouched; cleanup happens in [`crate::normalize`].
#[async_trait]
pub trait Connector: Send + Sync {
    /// Instance name from config (e.g. `"nc_directories"`). Also used as the
    /// `source` tag on every record the connector returns.
    fn name(&self) -> &str;

    /// One-line description for `outreach sources`.
    fn description(&self) -> &str;

    /// Connector type identifier (`"csv"`, `"http"`, or `"custom"`).
    fn connector_type(&self) -> &str {
        "custom"
    }

    /// Fetch all records, optionally restricted to the last `since_days` days
    /// when the source supports it.
    async fn scan(&self, since_days: Option<i64>) -> Result<Vec<RawRecord>>;
}

/// Ordered collection of connectors.
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
        }
    }

    /// Create a registry holding every source configured under `[sources]`.
    ///
    /// CSV sources come first, then HTTP sources, each in name order.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_csv::CsvConnector;
        use crate::connector_http::HttpConnector;

        let mut registry = Self::new();
        for (name, cfg) in &config.sources.csv {
            registry.register(Box::new(CsvConnector::new(name.clone(), cfg.clone())));
        }
        for (name, cfg) in &config.sources.http {
            registry.register(Box::new(HttpConnector::new(name.clone(), cfg.clone())));
        }
        registry
    }

    pub fn register(&mut self, connector: Box<dyn Connector>) {
        self.connectors.push(connector);
    }

    pub fn connectors(&self) -> &[Box<dyn Connector>] {
        &self.connectors
    }

    /// Find a connector by instance name.
    pub fn find(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Stub(&'static str);

    #[async_trait]
    impl Connector for Stub {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "stub"
        }
        async fn scan(&self, _since_days: Option<i64>) -> Result<Vec<RawRecord>> {
            Ok(vec![RawRecord::new(self.0).with("name", "Stub Co")])
        }
    }

    #[test]
    fn test_register_and_find() {
        let mut registry = ConnectorRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(Stub("a")));
        registry.register(Box::new(Stub("b")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.find("b").unwrap().connector_type(), "custom");
        assert!(registry.find("c").is_none());
    }

    #[test]
    fn test_from_config_orders_csv_before_http() {
        let mut config: Config = toml::from_str("[db]\npath = \"x.sqlite\"\n").unwrap();
        config.sources.http.insert(
            "api".to_string(),
            toml::from_str("url = \"https://example.com/companies\"").unwrap(),
        );
        config.sources.csv.insert(
            "zdrops".to_string(),
            crate::config::CsvSourceConfig {
                dir: PathBuf::from("data/raw"),
                include_globs: vec!["*.csv".to_string()],
            },
        );

        let registry = ConnectorRegistry::from_config(&config);
        assert_eq!(registry.names(), vec!["zdrops", "api"]);
        assert_eq!(registry.find("zdrops").unwrap().connector_type(), "csv");
        assert_eq!(registry.find("api").unwrap().connector_type(), "http");
    }

    #[tokio::test]
    async fn test_custom_connector_scan() {
        let stub = Stub("manual");
        let records = stub.scan(None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "manual");
    }
}
