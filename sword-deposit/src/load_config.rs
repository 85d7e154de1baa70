/// `load_config` module: reads the server config file into the immutable [`ServerConfig`].
///
/// This module is the only place where the user-supplied config file is parsed.
///
/// # Accepted formats
/// - `*.yaml` / `*.yml`: a flat YAML mapping.
/// - anything else: a Java properties file, the format of the
///   `swordv2-server.properties` files used with earlier SWORD tooling.
///   Escapes such as `http\://host/sd` and `\uXXXX`, line continuations and
///   `#`/`!` comments are handled by `java-properties`.
///
/// # Keys
/// - `sdIRI`, `user`, `pass`: required. When `pass` is absent from the file it
///   is read from the `SWORD_PASS` environment variable, so the password can
///   live in `.env` instead of the file.
/// - `ssoToken`, `obo`, `timeoutSecs`: optional.
///
/// # Errors
/// Every failure is a `SwordError::Config` naming the file and, for missing
/// values, the key.
use java_properties::{PropertiesError, PropertiesIter};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use sword_deposit_core::config::ServerConfig;
use sword_deposit_core::SwordError;
use tracing::{error, info};

/// Environment variable consulted when the file has no `pass` key.
pub const PASS_ENV_VAR: &str = "SWORD_PASS";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "sdIRI")]
    sd_iri: Option<String>,
    user: Option<String>,
    pass: Option<String>,
    #[serde(rename = "ssoToken", alias = "openAmSSOID")]
    sso_token: Option<String>,
    obo: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

impl RawConfig {
    fn from_properties(path: &Path, content: &str) -> Result<Self, SwordError> {
        let mut entries = parse_properties(content).map_err(|e| {
            error!(error = ?e, config_path = ?path, "Failed to parse config properties");
            SwordError::Config {
                path: path.to_path_buf(),
                reason: format!("failed to parse config properties: {e}"),
            }
        })?;
        let timeout_secs = match entries.remove("timeoutSecs") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                error!(error = ?e, raw = %raw, "timeoutSecs must be a whole number of seconds");
                SwordError::Config {
                    path: path.to_path_buf(),
                    reason: format!("timeoutSecs must be a whole number of seconds: {e}"),
                }
            })?),
            None => None,
        };
        Ok(RawConfig {
            sd_iri: entries.remove("sdIRI"),
            user: entries.remove("user"),
            pass: entries.remove("pass"),
            sso_token: entries
                .remove("ssoToken")
                .or_else(|| entries.remove("openAmSSOID")),
            obo: entries.remove("obo"),
            timeout_secs,
        })
    }
}

/// Java properties syntax: `key=value`, `key: value` or `key value`, with
/// escapes and line continuations resolved. Later keys override earlier ones.
pub fn parse_properties(content: &str) -> Result<BTreeMap<String, String>, PropertiesError> {
    let mut entries = BTreeMap::new();
    // The file was already read as UTF-8; the crate defaults to ISO-8859-1.
    PropertiesIter::new_with_encoding(content.as_bytes(), encoding_rs::UTF_8).read_into(
        |key, value| {
            entries.insert(key, value);
        },
    )?;
    Ok(entries)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(path: &Path, key: &str, value: Option<String>) -> Result<String, SwordError> {
    non_empty(value).ok_or_else(|| {
        error!(config_path = ?path, key, "Required config key missing");
        SwordError::missing_key(path, key)
    })
}

/// Loads the server config file and fills in secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig, SwordError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(SwordError::Config {
                path: path_ref.to_path_buf(),
                reason: format!("failed to read config file: {e}"),
            });
        }
    };

    let is_yaml = path_ref
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let raw = if !is_yaml {
        RawConfig::from_properties(path_ref, &config_content)?
    } else if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        match serde_yaml::from_str::<RawConfig>(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(SwordError::Config {
                    path: path_ref.to_path_buf(),
                    reason: format!("failed to parse config YAML: {e}"),
                });
            }
        }
    };

    let sd_iri = required(path_ref, "sdIRI", raw.sd_iri)?;
    let user = required(path_ref, "user", raw.user)?;
    let pass = match non_empty(raw.pass) {
        Some(pass) => pass,
        None => {
            let from_env = non_empty(std::env::var(PASS_ENV_VAR).ok());
            if from_env.is_some() {
                info!(env_var = PASS_ENV_VAR, "Password taken from environment");
            }
            required(path_ref, "pass", from_env)?
        }
    };

    let config = ServerConfig {
        sd_iri,
        user,
        pass,
        sso_token: non_empty(raw.sso_token),
        on_behalf_of: non_empty(raw.obo),
        timeout: raw.timeout_secs.map(Duration::from_secs),
    };
    config.trace_loaded();
    Ok(config)
}
