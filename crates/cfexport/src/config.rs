use crate::cli::Cli;
use anyhow::{anyhow, Result};
use directories::{BaseDirs, ProjectDirs};
use export_core::ExportSettings;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "cfexport.toml";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Connection settings
    #[serde(default)]
    pub confluence: ConfluenceConfig,
    /// What to export and where
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ConfluenceConfig {
    pub url: Option<String>,
    /// Basic auth user; when absent the token is sent as a bearer token
    pub username: Option<String>,
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout: Option<u64>,
    /// Results requested per listing call
    pub page_size: Option<usize>,
}

impl Config {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
        }

        for path in config_paths(config_path) {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        // Legacy CONFLUENCE_* variables first so CFEXPORT_* wins
        figment = figment
            .merge(Env::prefixed("CONFLUENCE_").map(|key| match key.as_str() {
                "url" => "confluence.url".into(),
                "username" => "confluence.username".into(),
                "token" => "confluence.token".into(),
                _ => key.into(),
            }))
            .merge(Env::prefixed("CFEXPORT_").split("__"));

        figment
            .extract()
            .map_err(|e| anyhow!("Failed to load config: {}", e))
    }

    pub fn merge_with_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.url {
            self.confluence.url = Some(url.clone());
        }
        if let Some(username) = &cli.username {
            self.confluence.username = Some(username.clone());
        }
        if let Some(token) = &cli.token {
            self.confluence.token = Some(token.clone());
        }
        if let Some(path) = &cli.output_path {
            self.export.output_path = path.clone();
        }
        if let Some(format) = cli.export_format {
            self.export.export_format = format;
        }
        if let Some(template) = &cli.page_path {
            self.export.page_path = template.clone();
        }
        if let Some(template) = &cli.attachment_path {
            self.export.attachment_path = template.clone();
        }
    }

    /// Check that connection settings are present
    pub fn validate(&self) -> Result<()> {
        if self.confluence.url.as_deref().is_none_or(str::is_empty) {
            return Err(anyhow!(
                "Confluence URL not configured. Set via --url, CFEXPORT_CONFLUENCE__URL env var, or config file"
            ));
        }
        if self.confluence.token.as_deref().is_none_or(str::is_empty) {
            return Err(anyhow!(
                "Confluence token not configured. Set via --token, CFEXPORT_CONFLUENCE__TOKEN env var, or config file"
            ));
        }
        Ok(())
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.confluence.token.is_some() {
            config.confluence.token = Some("********".to_string());
        }
        config
    }
}

/// Config files in load order; later files override earlier ones
pub fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
        return paths;
    }

    if let Some(path) = get_project_config_path() {
        push_unique(&mut paths, path);
    }
    if let Some(path) = get_xdg_config_path() {
        push_unique(&mut paths, path);
    }
    if let Some(path) = get_local_config_path() {
        push_unique(&mut paths, path);
    }

    paths
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

fn get_project_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cfexport").map(|d| d.config_dir().join("config.toml"))
}

fn get_xdg_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir).join("cfexport").join("config.toml"));
    }

    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(".config")
            .join("cfexport")
            .join("config.toml")
    })
}

fn get_local_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use export_core::ExportFormat;
    use figment::Jail;

    #[test]
    fn explicit_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
[confluence]
url = "https://example.atlassian.net/wiki"
username = "me@example.com"
token = "from-file"

[export]
export_format = "html"
page_breadcrumbs = false
"#,
            )?;
            jail.set_env("CONFLUENCE_TOKEN", "legacy");
            jail.set_env("CFEXPORT_CONFLUENCE__TOKEN", "from-env");
            jail.set_env("CFEXPORT_EXPORT__OUTPUT_PATH", "/tmp/out");

            let config = Config::load(Some(Path::new("custom.toml"))).unwrap();
            assert_eq!(
                config.confluence.url.as_deref(),
                Some("https://example.atlassian.net/wiki")
            );
            assert_eq!(config.confluence.token.as_deref(), Some("from-env"));
            assert_eq!(config.export.export_format, ExportFormat::Html);
            assert!(!config.export.page_breadcrumbs);
            assert!(config.export.include_document_title);
            assert_eq!(config.export.output_path, PathBuf::from("/tmp/out"));
            Ok(())
        });
    }

    #[test]
    fn legacy_env_fills_connection() {
        Jail::expect_with(|jail| {
            jail.set_env("XDG_CONFIG_HOME", jail.directory().display().to_string());
            jail.set_env("CONFLUENCE_URL", "https://wiki.example.com");
            jail.set_env("CONFLUENCE_TOKEN", "pat");

            let config = Config::load(None).unwrap();
            assert_eq!(
                config.confluence.url.as_deref(),
                Some("https://wiki.example.com")
            );
            assert_eq!(config.confluence.token.as_deref(), Some("pat"));
            assert!(config.confluence.username.is_none());
            config.validate().unwrap();
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/no/such/cfexport.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn cli_overrides_config() {
        let mut config = Config::default();
        config.confluence.url = Some("https://old".to_string());

        let cli = Cli::try_parse_from([
            "cfexport",
            "page",
            "1",
            "--url",
            "https://new",
            "--output-path",
            "out",
            "--page-path",
            "{page_title}{page_extension}",
        ])
        .unwrap();
        config.merge_with_cli(&cli);

        assert_eq!(config.confluence.url.as_deref(), Some("https://new"));
        assert_eq!(config.export.output_path, PathBuf::from("out"));
        assert_eq!(config.export.page_path, "{page_title}{page_extension}");
    }

    #[test]
    fn validate_requires_url_and_token() {
        let mut config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("URL not configured"));

        config.confluence.url = Some("https://wiki".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("token not configured"));
    }

    #[test]
    fn redacted_hides_token() {
        let mut config = Config::default();
        config.confluence.token = Some("secret".to_string());
        assert_eq!(config.redacted().confluence.token.as_deref(), Some("********"));
    }
}
