//! Configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `draftsaver.yaml` but can be specified via `-f` flag or the `DRAFTSAVER_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (a missing file is fine, defaults apply)
//! 2. **Environment variables** - Variables prefixed with `DRAFTSAVER_` override YAML values
//!
//! ## Example
//!
//! ```yaml
//! save_url: https://cms.example.com/publisher/content/auto-save
//! surface: editor          # editor = 3s quiet period, publisher = 5s
//! quiet_period: 4s         # optional, overrides the surface default
//! request_timeout: 30s
//! csrf_token: abc123
//! validate_on_submit: true
//! ```
//!
//! ```bash
//! DRAFTSAVER_SAVE_URL="http://localhost:5000/editor/content/auto-save"
//! DRAFTSAVER_QUIET_PERIOD=2s
//! ```

use std::time::Duration;

use clap::Parser;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::saver::{SaverConfig, Surface};

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "DRAFTSAVER_CONFIG", default_value = "draftsaver.yaml")]
    pub config: String,

    /// Validate configuration and exit.
    #[arg(long)]
    pub validate: bool,
}

/// Top-level configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Endpoint that receives draft saves
    pub save_url: Url,
    /// Editing surface, which picks the default quiet period
    pub surface: Surface,
    /// Overrides the surface's quiet period when set
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub quiet_period: Option<Duration>,
    /// Timeout for a single save request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Token sent as `csrf_token` form field and `X-CSRFToken` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
    /// Check required fields before sending an explicit submit
    pub validate_on_submit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_url: Url::parse("http://localhost:5000/publisher/content/auto-save").expect("default save URL is valid"),
            surface: Surface::default(),
            quiet_period: None,
            request_timeout: Duration::from_secs(30),
            csrf_token: None,
            validate_on_submit: true,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("save_url", &self.save_url.as_str())
            .field("surface", &self.surface)
            .field("quiet_period", &self.quiet_period)
            .field("request_timeout", &self.request_timeout)
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "<redacted>"))
            .field("validate_on_submit", &self.validate_on_submit)
            .finish()
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // DRAFTSAVER_CONFIG names the file itself and is not a config key
            .merge(Env::prefixed("DRAFTSAVER_").ignore(&["config"]).split("__"))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.save_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "save_url must be an http(s) URL, got scheme '{}'",
                self.save_url.scheme()
            )));
        }

        if self.quiet_period() < Duration::from_millis(100) {
            return Err(Error::Config(format!(
                "quiet_period ({:?}) must be at least 100ms",
                self.quiet_period()
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config("request_timeout must be greater than zero".to_string()));
        }

        Ok(())
    }

    /// Effective quiet period: the explicit override or the surface default.
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period.unwrap_or_else(|| self.surface.default_quiet_period())
    }

    pub fn saver_config(&self) -> SaverConfig {
        SaverConfig {
            quiet_period: self.quiet_period(),
            validate_on_submit: self.validate_on_submit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("missing.yaml"))?;

            assert_eq!(config.surface, Surface::Publisher);
            assert_eq!(config.quiet_period(), Duration::from_secs(5));
            assert_eq!(config.request_timeout, Duration::from_secs(30));
            assert!(config.validate_on_submit);
            assert_eq!(config.save_url.path(), "/publisher/content/auto-save");

            Ok(())
        });
    }

    #[test]
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
save_url: https://cms.example.com/editor/content/7/edit
surface: editor
request_timeout: 10s
csrf_token: tok
validate_on_submit: false
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.save_url.as_str(), "https://cms.example.com/editor/content/7/edit");
            assert_eq!(config.quiet_period(), Duration::from_secs(3));
            assert_eq!(config.request_timeout, Duration::from_secs(10));
            assert_eq!(config.csrf_token.as_deref(), Some("tok"));

            let saver = config.saver_config();
            assert_eq!(saver.quiet_period, Duration::from_secs(3));
            assert!(!saver.validate_on_submit);

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "surface: editor\nquiet_period: 4s\n")?;
            jail.set_env("DRAFTSAVER_QUIET_PERIOD", "1500ms");
            jail.set_env("DRAFTSAVER_SAVE_URL", "http://127.0.0.1:8080/save");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.quiet_period(), Duration::from_millis(1500));
            assert_eq!(config.save_url.as_str(), "http://127.0.0.1:8080/save");

            Ok(())
        });
    }

    #[test]
    fn test_rejects_unknown_fields() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "quiet_periods: 3s\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_debug_output_redacts_csrf_token() {
        let config = Config {
            csrf_token: Some("s3cret-token".to_string()),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("s3cret-token"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("localhost:5000"));
    }

    #[test]
    fn test_validation_failures() {
        let config = Config {
            quiet_period: Some(Duration::from_millis(10)),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("quiet_period"));

        let config = Config {
            save_url: Url::parse("ftp://example.com/save").unwrap(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("http(s)"));

        let config = Config {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
