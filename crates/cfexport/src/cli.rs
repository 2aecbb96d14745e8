use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use export_core::ExportFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cfexport",
    version,
    about = "Export Confluence spaces and page trees to Markdown or HTML"
)]
pub struct Cli {
    /// Output format of the run summary
    #[arg(long, short = 'o', value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// When to colorize output
    #[arg(long, value_enum, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML config file
    #[arg(long, env = "CFEXPORT_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Confluence base URL, including /wiki on Cloud (overrides config file)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Username or email; omit to authenticate with a personal access token
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// API token or personal access token (overrides config file)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Directory the export is written to
    #[arg(long, global = true, value_name = "DIR")]
    pub output_path: Option<PathBuf>,

    /// Page format: markdown (md) or html
    #[arg(long, global = true, value_parser = parse_export_format)]
    pub export_format: Option<ExportFormat>,

    /// Path template for pages
    #[arg(long, global = true, value_name = "TEMPLATE")]
    pub page_path: Option<String>,

    /// Path template for attachments
    #[arg(long, global = true, value_name = "TEMPLATE")]
    pub attachment_path: Option<String>,

    /// Stop starting new pages and attachments after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_export_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: export_core::ExportError| e.to_string())
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Debug, Copy, Default)]
pub enum ColorChoice {
    /// Colorize output if stdout is a terminal
    #[default]
    Auto,
    /// Always colorize output
    Always,
    /// Never colorize output
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export whole spaces, starting at each space's homepage
    #[command(visible_alias = "s")]
    Space {
        /// Space keys (e.g., DOCS)
        #[arg(required = true, num_args = 1..)]
        keys: Vec<String>,
    },
    /// Export single pages with their attachments
    #[command(visible_alias = "p")]
    Page {
        /// Page ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u64>,
    },
    /// Export pages with their attachments and all descendants
    #[command(visible_alias = "tree")]
    PageTree {
        /// Root page ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u64>,
    },
    /// Inspect the effective configuration
    #[command(visible_alias = "cfg")]
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Generate shell completions and write to stdout
    pub fn generate_completions(shell: Shell) {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "cfexport", &mut std::io::stdout());
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the merged configuration (token redacted)
    Show,
    /// List the config files that are searched, in load order
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cfexport",
            "space",
            "DOCS",
            "ENG",
            "--export-format",
            "html",
            "-vv",
            "--timeout",
            "30",
        ])
        .unwrap();

        assert_eq!(cli.export_format, Some(ExportFormat::Html));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.timeout, Some(30));
        match cli.command {
            Commands::Space { keys } => assert_eq!(keys, vec!["DOCS", "ENG"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_export_format() {
        let err = Cli::try_parse_from(["cfexport", "page", "1", "--export-format", "pdf"])
            .unwrap_err();
        assert!(err.to_string().contains("Unknown export format"));
    }

    #[test]
    fn page_ids_must_be_numeric() {
        assert!(Cli::try_parse_from(["cfexport", "page", "abc"]).is_err());
        assert!(Cli::try_parse_from(["cfexport", "page-tree"]).is_err());
    }
}
