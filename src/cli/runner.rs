//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, Config};
use crate::error::{Error, Result, ResultExt};
use crate::types::{JsonValue, ScrollTtl};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Scroll {
                index,
                query,
                query_file,
                page_size,
                ttl,
                max_records,
            } => {
                let query = Self::load_query(query.as_deref(), query_file.as_deref())?;
                self.scroll(
                    index.as_deref(),
                    query,
                    *page_size,
                    ttl.as_deref(),
                    *max_records,
                )
                .await
            }
            Commands::Validate => self.validate(),
            Commands::Check => self.check().await,
        }
    }

    /// Load configuration from `--config`, or defaults plus environment
    fn load_config(&self) -> Result<Config> {
        match &self.cli.config {
            Some(path) => load_config(path),
            None => {
                let mut config = Config::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Resolve the query from inline JSON or a file; `match_all` when neither is given
    fn load_query(inline: Option<&str>, file: Option<&Path>) -> Result<JsonValue> {
        let raw = match (inline, file) {
            (Some(raw), _) => raw.to_string(),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read query file '{}'", path.display()))?,
            (None, None) => return Ok(json!({ "match_all": {} })),
        };

        let query: JsonValue = serde_json::from_str(&raw)
            .map_err(|e| Error::invalid_value("query", format!("not valid JSON: {e}")))?;
        if !query.is_object() {
            return Err(Error::invalid_value("query", "must be a JSON object"));
        }
        Ok(query)
    }

    /// Stream records of a query to stdout
    async fn scroll(
        &self,
        index: Option<&str>,
        query: JsonValue,
        page_size: Option<u32>,
        ttl: Option<&str>,
        max_records: Option<u64>,
    ) -> Result<()> {
        let config = self.load_config()?;

        let mut request = config.scroll_request(index, query)?;
        if let Some(page_size) = page_size {
            request = request.with_page_size(page_size);
        }
        if let Some(ttl) = ttl {
            request = request.with_ttl(ttl.parse::<ScrollTtl>()?);
        }

        info!(
            "Scrolling '{}' on {} (page size {}, ttl {})",
            request.index, config.backend.url, request.page_size, request.ttl
        );

        let cancel = CancellationToken::new();
        let mut handle = config.session()?.spawn(request, cancel.clone());

        let interrupt = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping scroll");
                interrupt.cancel();
            }
        });

        let mut emitted: u64 = 0;
        while let Some(record) = handle.recv().await {
            self.output_message(&json!({
                "type": "RECORD",
                "record": record
            }));
            emitted += 1;

            if max_records.is_some_and(|max| emitted >= max) {
                info!("Reached max records ({}), stopping", emitted);
                handle.cancel();
                break;
            }
        }

        let outcome = handle.finish().await;
        ctrl_c.abort();
        let summary = outcome?;

        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": summary
        }));

        Ok(())
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": "Configuration is valid"
            }
        }));

        self.output_message(&json!({
            "type": "CONFIG",
            "config": {
                "backend": {
                    "url": config.backend.url,
                    "index": config.backend.index,
                    "auth": config.backend.auth.scheme()
                },
                "http": {
                    "timeout_seconds": config.http.timeout_seconds,
                    "max_retries": config.http.max_retries,
                    "rate_limit": config.http.rate_limit
                },
                "scroll": config.scroll
            }
        }));

        Ok(())
    }

    /// Check connection to the backend
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let backend = config.build_backend()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking connection to {}", backend.base_url())
            }
        }));

        match backend.info().await {
            Ok(banner) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED",
                        "message": describe_cluster(&banner)
                    }
                }));
                Ok(())
            }
            Err(e) => {
                self.output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "message": e.to_string()
                    }
                }));
                Err(e)
            }
        }
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Summarize a cluster banner (`GET /`) as "name (version)"
fn describe_cluster(banner: &Value) -> String {
    let name = banner
        .get("cluster_name")
        .and_then(Value::as_str)
        .unwrap_or("unknown cluster");
    match banner.pointer("/version/number").and_then(Value::as_str) {
        Some(version) => format!("Connected to {name} ({version})"),
        None => format!("Connected to {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_query_defaults_to_match_all() {
        let query = Runner::load_query(None, None).unwrap();
        assert_eq!(query, json!({"match_all": {}}));
    }

    #[test]
    fn test_load_query_inline_and_file() {
        let query = Runner::load_query(Some(r#"{"term":{"lang":"en"}}"#), None).unwrap();
        assert_eq!(query, json!({"term": {"lang": "en"}}));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"exists":{"field":"url"}}"#).unwrap();
        let query = Runner::load_query(None, Some(file.path())).unwrap();
        assert_eq!(query, json!({"exists": {"field": "url"}}));
    }

    #[test]
    fn test_load_query_rejects_bad_input() {
        assert!(matches!(
            Runner::load_query(Some("{not json"), None),
            Err(Error::InvalidConfigValue { .. })
        ));
        assert!(Runner::load_query(Some("[1, 2]"), None).is_err());
        assert!(Runner::load_query(None, Some(Path::new("/nonexistent/q.json"))).is_err());
    }

    #[test]
    fn test_describe_cluster() {
        let banner = json!({"cluster_name": "search", "version": {"number": "8.13.0"}});
        assert_eq!(describe_cluster(&banner), "Connected to search (8.13.0)");
        assert_eq!(describe_cluster(&json!({})), "Connected to unknown cluster");
    }
}
