//! JSON-over-HTTP lead source.
//!
//! Issues a single GET, locates the record array at `records_path` and
//! flattens each object into a [`RawRecord`]. No pagination and no retries.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::HttpSourceConfig;
use crate::models::RawRecord;
use crate::traits::Connector;

pub struct HttpConnector {
    name: String,
    description: String,
    config: HttpSourceConfig,
}

impl HttpConnector {
    pub fn new(name: String, config: HttpSourceConfig) -> Self {
        let description = format!("JSON API at {}", config.url);
        Self {
            name,
            description,
            config,
        }
    }

    /// The configured API key, if the source needs one.
    ///
    /// `Ok(None)` means the source has no `api_key_env`; `Err` means it has
    /// one but the variable is unset or empty.
    fn api_key(&self) -> Result<Option<String>> {
        let Some(var) = &self.config.api_key_env else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key.trim().to_string())),
            _ => bail!("environment variable {} is not set", var),
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn connector_type(&self) -> &str {
        "http"
    }

    async fn scan(&self, since_days: Option<i64>) -> Result<Vec<RawRecord>> {
        let api_key = match self.api_key() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(source = %self.name, "skipping source: {}", e);
                return Ok(Vec::new());
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;

        let mut query: Vec<(String, String)> = self
            .config
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let (Some(param), Some(days)) = (&self.config.since_param, since_days) {
            let since = chrono::Utc::now().date_naive() - chrono::Duration::days(days);
            query.push((param.clone(), since.format("%Y-%m-%d").to_string()));
        }

        let mut request = client.get(&self.config.url).query(&query);
        if let Some(key) = api_key {
            let header = &self.config.api_key_header;
            let value = if header.eq_ignore_ascii_case("authorization") {
                format!("Bearer {}", key)
            } else {
                key
            };
            request = request.header(header.as_str(), value);
        }

        tracing::debug!(source = %self.name, url = %self.config.url, "fetching");
        let response = request
            .send()
            .await
            .with_context(|| format!("HTTP source '{}': request failed", self.name))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP source '{}' returned {}", self.name, status);
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("HTTP source '{}': response is not JSON", self.name))?;

        extract_records(&self.name, &body, &self.config.records_path)
    }
}

/// Walk `records_path` (dot-separated) into `body` and flatten the array found there.
pub fn extract_records(source: &str, body: &Value, records_path: &str) -> Result<Vec<RawRecord>> {
    let mut node = body;
    for segment in records_path.split('.').filter(|s| !s.is_empty()) {
        node = node.get(segment).with_context(|| {
            format!(
                "HTTP source '{}': records_path '{}' not found in response",
                source, records_path
            )
        })?;
    }

    let Some(items) = node.as_array() else {
        bail!(
            "HTTP source '{}': value at records_path '{}' is not an array",
            source,
            records_path
        );
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else {
            tracing::warn!(source, "skipping non-object record");
            continue;
        };
        let mut fields = BTreeMap::new();
        for (key, value) in obj {
            flatten_value(key, value, &mut fields);
        }
        records.push(RawRecord {
            source: source.to_string(),
            fields,
        });
    }
    Ok(records)
}

fn flatten_value(key: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (child, v) in map {
                flatten_value(&format!("{}.{}", key, child), v, out);
            }
        }
        Value::Array(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar_to_string).collect();
            if !joined.is_empty() {
                out.insert(key.to_string(), joined.join(","));
            }
        }
        other => {
            if let Some(s) = scalar_to_string(other) {
                out.insert(key.to_string(), s);
            }
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(url: String) -> HttpSourceConfig {
        toml::from_str(&format!("url = \"{}\"\nrecords_path = \"data.items\"", url)).unwrap()
    }

    #[test]
    fn test_flattening() {
        let body = json!({
            "data": { "items": [
                {
                    "name": "Acme",
                    "employees": 42,
                    "hiring": true,
                    "tags": ["saas", "ai", {"skip": 1}],
                    "hq": { "city": "Raleigh", "state": null },
                    "empty": null
                },
                "not an object"
            ]}
        });
        let records = extract_records("api", &body, "data.items").unwrap();
        assert_eq!(records.len(), 1);
        let f = &records[0].fields;
        assert_eq!(f["name"], "Acme");
        assert_eq!(f["employees"], "42");
        assert_eq!(f["hiring"], "true");
        assert_eq!(f["tags"], "saas,ai");
        assert_eq!(f["hq.city"], "Raleigh");
        assert!(!f.contains_key("hq.state"));
        assert!(!f.contains_key("empty"));
    }

    #[test]
    fn test_root_array_and_bad_path() {
        let body = json!([{ "name": "Root Co" }]);
        assert_eq!(extract_records("api", &body, "").unwrap().len(), 1);
        let err = extract_records("api", &body, "data").unwrap_err();
        assert!(err.to_string().contains("not found"));
        let err = extract_records("api", &json!({"data": 3}), "data").unwrap_err();
        assert!(err.to_string().contains("not an array"));
    }

    #[tokio::test]
    async fn test_scan_sends_params_since_and_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/companies"))
            .and(query_param("city", "Raleigh"))
            .and(header("authorization", "Bearer secret-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "items": [{ "name": "Acme", "website": "acme.io" }] }
            })))
            .mount(&server)
            .await;

        std::env::set_var("OUTREACH_TEST_HTTP_KEY_OK", "secret-123");
        let mut cfg = source(format!("{}/companies", server.uri()));
        cfg.params.insert("city".into(), "Raleigh".into());
        cfg.api_key_env = Some("OUTREACH_TEST_HTTP_KEY_OK".into());
        cfg.since_param = Some("updated_since".into());

        let connector = HttpConnector::new("api".into(), cfg);
        let records = connector.scan(Some(14)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["website"], "acme.io");
        assert_eq!(records[0].source, "api");

        let requests = server.received_requests().await.unwrap();
        let url = requests[0].url.to_string();
        let expected = (chrono::Utc::now().date_naive() - chrono::Duration::days(14))
            .format("%Y-%m-%d")
            .to_string();
        assert!(url.contains(&format!("updated_since={}", expected)), "{}", url);
    }

    #[tokio::test]
    async fn test_custom_key_header_has_no_bearer_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-api-key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"items": []}})))
            .expect(1)
            .mount(&server)
            .await;

        std::env::set_var("OUTREACH_TEST_HTTP_KEY_CUSTOM", "k");
        let mut cfg = source(server.uri());
        cfg.api_key_env = Some("OUTREACH_TEST_HTTP_KEY_CUSTOM".into());
        cfg.api_key_header = "X-Api-Key".into();

        let records = HttpConnector::new("api".into(), cfg).scan(None).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_skips_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut cfg = source(server.uri());
        cfg.api_key_env = Some("OUTREACH_TEST_HTTP_KEY_NEVER_SET".into());
        let records = HttpConnector::new("api".into(), cfg).scan(None).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = HttpConnector::new("api".into(), source(server.uri()))
            .scan(None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"), "{}", err);
    }
}
