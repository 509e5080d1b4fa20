use std::path::Path;

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ClientError;

pub const DEFAULT_CONFIG_FILE: &str = "bakeoff";
pub const ENV_PREFIX: &str = "BAKEOFF";

/// Which score route the server exposes. Older deployments only had `/api/score`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreEndpoint {
    #[default]
    Score,
    Scores,
}

impl ScoreEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            ScoreEndpoint::Score => "api/score",
            ScoreEndpoint::Scores => "api/scores",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub score_endpoint: ScoreEndpoint,
    pub realtime_path: String,
    pub admin_token: Option<String>,
    pub judge_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            score_endpoint: ScoreEndpoint::Score,
            realtime_path: "/ws".into(),
            admin_token: None,
            judge_name: None,
        }
    }
}

/// Layers defaults, then `bakeoff.toml` (or `path`), then `BAKEOFF__*` variables.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ClientError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config: ClientConfig = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    if config.server_url.trim().is_empty() {
        return Err(ClientError::InvalidUrl("server_url must not be empty".into()));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "server_url = \"https://bakeoff.example\"\nscore_endpoint = \"scores\"\njudge_name = \"Ana\""
        )
        .expect("write");

        let config = load_config(Some(file.path())).expect("config");
        assert_eq!(config.server_url, "https://bakeoff.example");
        assert_eq!(config.score_endpoint, ScoreEndpoint::Scores);
        assert_eq!(config.judge_name.as_deref(), Some("Ana"));
        assert_eq!(config.realtime_path, "/ws");
        assert_eq!(config.admin_token, None);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/bakeoff-test.toml")))
            .expect_err("must fail");
        assert!(matches!(err, ClientError::Config(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn empty_server_url_is_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(file, "server_url = \"  \"").expect("write");

        let err = load_config(Some(file.path())).expect_err("must fail");
        assert!(matches!(err, ClientError::InvalidUrl(ref message) if message.contains("server_url")));
    }
}
