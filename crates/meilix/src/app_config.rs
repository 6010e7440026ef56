//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." -- every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment. `MEILIX_*` env vars form the base layer and an optional TOML
//! file sits on top. Nested keys use a double underscore: `MEILIX_TASKS__TIMEOUT_MS=0`.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::tasks::WaitOptions;

/// 📦 The AppConfig: one struct to rule them all.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 Where the server lives and how we knock on its door.
    #[serde(flatten)]
    pub client: ClientConfig,
    /// ⏳ How long and how often to poll tasks.
    #[serde(default)]
    pub tasks: TaskWaitConfig,
    /// 📄 Batching knobs for document uploads.
    #[serde(default)]
    pub documents: DocumentsConfig,
}

/// 🔌 Connection settings. Enough to build a [`crate::Client`] and nothing more.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    /// 🔒 Sent as `Authorization: Bearer <key>`. "masterKey123" is not a key. It is a confession.
    #[serde(default)]
    pub api_key: Option<String>,
    /// ⏱️ Per-request timeout. None means reqwest's default, which is "forever, basically".
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub custom_headers: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        ClientConfig {
            url: url.into(),
            api_key: None,
            timeout_secs: None,
            custom_headers: BTreeMap::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// ⏱️ Whole seconds only, rounded up so a sub-second timeout never becomes "no time at all".
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let whole_secs = timeout.as_secs().saturating_add(u64::from(timeout.subsec_nanos() > 0));
        self.timeout_secs = Some(whole_secs);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(name.into(), value.into());
        self
    }
}

/// ⏳ Poll settings. `timeout_ms = 0` means wait forever, like a dog at the window.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TaskWaitConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub raise_for_status: bool,
}

fn default_timeout_ms() -> u64 {
    crate::tasks::DEFAULT_TIMEOUT_MS
}

fn default_interval_ms() -> u64 {
    crate::tasks::DEFAULT_INTERVAL_MS
}

impl Default for TaskWaitConfig {
    fn default() -> Self {
        TaskWaitConfig {
            timeout_ms: default_timeout_ms(),
            interval_ms: default_interval_ms(),
            raise_for_status: false,
        }
    }
}

impl From<TaskWaitConfig> for WaitOptions {
    fn from(config: TaskWaitConfig) -> Self {
        let timeout = match config.timeout_ms {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        };
        WaitOptions {
            timeout,
            interval: Duration::from_millis(config.interval_ms),
            raise_for_status: config.raise_for_status,
        }
    }
}

/// 📄 Document upload knobs.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DocumentsConfig {
    /// 🔢 Documents per request for fixed-count batching.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 🐘 Byte ceiling per request for auto-batching. 100 MiB, the server's own default.
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,
    /// 🫁 Gzip request bodies.
    #[serde(default)]
    pub compress: bool,
}

fn default_batch_size() -> usize {
    1000
}

fn default_max_payload_size() -> usize {
    crate::batching::DEFAULT_MAX_PAYLOAD_SIZE
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        DocumentsConfig {
            batch_size: default_batch_size(),
            max_payload_size: default_max_payload_size(),
            compress: false,
        }
    }
}

/// 🚀 Load the config: env vars (`MEILIX_*`) first, then the TOML file if one was given.
///
/// 📐 If `config_file_name` is None, env vars only. If Some, env + TOML, TOML wins on
/// conflicts. No silent fallback to a default filename, nobody asked for that.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("MEILIX_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    // 💬 A context message that says what went wrong. No "error: error" energy.
    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (MEILIX_*). \
             The file exists in our hearts, but apparently not on disk.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (MEILIX_*). \
                 No file was provided, so this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create temp config. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write test config.");
        file
    }

    #[test]
    fn the_one_where_every_knob_gets_turned() {
        let config_file = write_test_config(
            r#"
            url = "http://localhost:7700/"
            api_key = "masterKey"
            timeout_secs = 12

            [custom_headers]
            "X-Tenant" = "wombat"

            [tasks]
            timeout_ms = 0
            interval_ms = 250
            raise_for_status = true

            [documents]
            batch_size = 500
            max_payload_size = 2048
            compress = true
            "#,
        );

        let app_config = load_config(Some(config_file.path()))
            .expect("💀 Full config should parse. The schema drift goblin does not get this win.");

        assert_eq!(app_config.client.url, "http://localhost:7700/");
        assert_eq!(app_config.client.api_key.as_deref(), Some("masterKey"));
        assert_eq!(app_config.client.timeout_secs, Some(12));
        assert_eq!(
            app_config.client.custom_headers.get("X-Tenant").map(String::as_str),
            Some("wombat")
        );
        assert_eq!(app_config.documents.batch_size, 500);
        assert_eq!(app_config.documents.max_payload_size, 2048);
        assert!(app_config.documents.compress);

        let wait: WaitOptions = app_config.tasks.into();
        assert_eq!(wait.timeout, None);
        assert_eq!(wait.interval, Duration::from_millis(250));
        assert!(wait.raise_for_status);
    }

    #[test]
    fn the_one_where_only_the_url_shows_up_and_defaults_do_the_rest() {
        let config_file = write_test_config(r#"url = "http://meili:7700""#);

        let app_config =
            load_config(Some(config_file.path())).expect("💀 Minimal config should parse.");

        assert_eq!(app_config.tasks, TaskWaitConfig::default());
        assert_eq!(app_config.documents, DocumentsConfig::default());
        assert_eq!(app_config.documents.max_payload_size, 104_857_600);

        let wait: WaitOptions = app_config.tasks.into();
        assert_eq!(wait, WaitOptions::default());
    }

    #[test]
    fn the_one_where_the_toml_is_cursed_and_the_error_says_so() {
        let config_file = write_test_config(
            r#"
            url = "http://meili:7700"
            [tasks]
            timeout_ms = "soon"
            "#,
        );

        let error = load_config(Some(config_file.path()))
            .expect_err("💀 A string timeout should not parse");
        assert!(format!("{error:#}").contains("Failed to parse configuration"));
    }

    #[test]
    fn the_one_where_a_documents_table_stands_on_its_own() {
        let documents: DocumentsConfig = toml::from_str("batch_size = 42")
            .expect("💀 A lone documents table should deserialize");
        assert_eq!(documents.batch_size, 42);
        assert_eq!(documents.max_payload_size, crate::batching::DEFAULT_MAX_PAYLOAD_SIZE);
        assert!(!documents.compress);
    }

    #[test]
    fn the_one_where_half_a_second_rounds_up_instead_of_vanishing() {
        let cases = [(200, 1), (1000, 1), (1500, 2), (12_000, 12)];
        for (millis, expected_secs) in cases {
            let config = ClientConfig::new("http://localhost:7700")
                .with_timeout(Duration::from_millis(millis));
            assert_eq!(config.timeout_secs, Some(expected_secs), "💀 {millis}ms rounded wrong");
        }
    }
}
