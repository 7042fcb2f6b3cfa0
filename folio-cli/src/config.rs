use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FolioConfig {
    pub build: BuildConfig,
    /// Site settings (from folio-core)
    #[serde(flatten)]
    pub site: folio_core::config::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Source directory holding index.html, assets/ and data/
    pub source: String,
    /// Output directory for the rendered site
    pub output: String,
    /// Configuration file path
    pub config: String,
    /// Load site data from this base URL instead of the source tree
    pub data_url: Option<String>,
    /// Fail the build when the page falls back to the error banner
    pub strict: bool,
    /// Compress the stylesheet and minify HTML
    pub release: bool,
    /// Host for dev server
    pub host: String,
    /// Port for dev server
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: "./site".to_string(),
            output: "./dist".to_string(),
            config: "./folio.toml".to_string(),
            data_url: None,
            strict: false,
            release: false,
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            site: folio_core::config::Config::default(),
        }
    }
}

impl FolioConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (FOLIO_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .unwrap_or(None)
            .cloned()
            .unwrap_or_else(|| BuildConfig::default().config);

        let mut builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&Self::default())?)
            .add_source(File::from(Path::new(&config_file)).required(false))
            .add_source(
                Environment::with_prefix("FOLIO")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Only override with CLI args that are actually defined for this command
        for key in ["source", "output", "config", "data_url", "host"] {
            if let Some(value) = args.try_get_one::<String>(key).unwrap_or(None) {
                builder = builder.set_override(format!("build.{key}"), value.as_str())?;
            }
        }
        if let Some(port) = args.try_get_one::<u16>("port").unwrap_or(None) {
            builder = builder.set_override("build.port", i64::from(*port))?;
        }
        for flag in ["strict", "release", "open"] {
            if args.try_get_one::<bool>(flag).unwrap_or(None) == Some(&true) {
                builder = builder.set_override(format!("build.{flag}"), true)?;
            }
        }

        let config: FolioConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn command() -> Command {
        Command::new("test")
            .arg(Arg::new("source").long("source"))
            .arg(Arg::new("output").long("output"))
            .arg(Arg::new("config").long("config"))
            .arg(Arg::new("strict").long("strict").action(ArgAction::SetTrue))
            .arg(Arg::new("release").long("release").action(ArgAction::SetTrue))
    }

    #[test]
    fn test_default_config() {
        let config = FolioConfig::default();
        assert_eq!(config.build.source, "./site");
        assert_eq!(config.build.output, "./dist");
        assert_eq!(config.build.port, 3000);
        assert!(config.build.data_url.is_none());
        assert!(!config.build.release);
    }

    #[test]
    fn test_cli_args_override() {
        let matches = command()
            .try_get_matches_from(["test", "--source", "/custom/src", "--strict"])
            .unwrap();

        let config = FolioConfig::load(&matches).unwrap();
        assert_eq!(config.build.source, "/custom/src");
        assert!(config.build.strict);
        assert!(!config.build.release);
        assert_eq!(config.build.output, "./dist");
    }

    #[test]
    fn test_release_flag_and_file() {
        let matches = command()
            .try_get_matches_from(["test", "--release"])
            .unwrap();
        assert!(FolioConfig::load(&matches).unwrap().build.release);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(&path, "[build]\nrelease = true\n").unwrap();
        let matches = command()
            .try_get_matches_from(["test", "--config", path.to_str().unwrap()])
            .unwrap();
        assert!(FolioConfig::load(&matches).unwrap().build.release);
    }

    #[test]
    fn test_config_file_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.toml");
        std::fs::write(
            &path,
            "[build]\noutput = \"public\"\n\n[form]\nrelay_endpoint = \"https://relay.example\"\n",
        )
        .unwrap();

        let matches = command()
            .try_get_matches_from(["test", "--config", path.to_str().unwrap()])
            .unwrap();
        let config = FolioConfig::load(&matches).unwrap();

        assert_eq!(config.build.output, "public");
        assert_eq!(config.site.form().relay_endpoint, "https://relay.example");
        assert_eq!(config.site.site().data_path, "data/site.json");
    }
}
