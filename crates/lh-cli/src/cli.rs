use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};

/// How the entry's result is printed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    Raw,
}

/// Top-level CLI parser for the `lakehouse` binary.
#[derive(Debug, Parser)]
#[command(name = "lakehouse", version, about = "Lakehouse - run ingestion scripts")]
pub struct Cli {
    /// Script to run (a folder under <root>/scripts)
    #[arg(short, long)]
    pub script: String,

    /// Entry to invoke
    #[arg(short, long, default_value = lh_runner::DEFAULT_ENTRY)]
    pub entry: String,

    /// BIMcloud user name
    #[arg(short, long, env = "BIMCLOUD_USER")]
    pub user: Option<String>,

    /// BIMcloud password
    #[arg(short, long, env = "BIMCLOUD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Extra entry parameter; the value is parsed as JSON, falling back to a string
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Config root holding config/, scripts/ and schema files
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Output format: json, raw
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parameters handed to the entry: `--param`s plus the credentials.
    #[must_use]
    pub fn parameters(&self) -> Map<String, Value> {
        let mut parameters: Map<String, Value> = self.params.iter().cloned().collect();
        if let Some(user) = &self.user {
            parameters.insert("user".into(), Value::String(user.clone()));
        }
        if let Some(password) = &self.password {
            parameters.insert("password".into(), Value::String(password.clone()));
        }
        parameters
    }
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err("parameter name is empty".into());
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::{Cli, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["lakehouse", "--script", "BIMcloud"]).expect("cli should parse");
        assert_eq!(cli.script, "BIMcloud");
        assert_eq!(cli.entry, "execute");
        assert_eq!(cli.root, std::path::PathBuf::from("."));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(!cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn script_is_required() {
        assert!(Cli::try_parse_from(["lakehouse", "--entry", "fetch"]).is_err());
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from([
            "lakehouse", "-s", "BIMcloud", "-e", "fetch", "-u", "alice", "-p", "secret", "-r",
            "/srv/lh", "-v",
        ])
        .expect("cli should parse");

        assert_eq!(cli.entry, "fetch");
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert_eq!(cli.password.as_deref(), Some("secret"));
        assert_eq!(cli.root, std::path::PathBuf::from("/srv/lh"));
        assert!(cli.verbose);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["lakehouse", "-s", "x", "-q", "-v"]).is_err());
    }

    #[test]
    fn params_parse_json_with_string_fallback() {
        let cli = Cli::try_parse_from([
            "lakehouse",
            "-s",
            "BIMcloud",
            "-P",
            r#"criterion={"$eq":{"type":"project"}}"#,
            "--param",
            "label=nightly",
            "--param",
            "limit=5",
        ])
        .expect("cli should parse");

        let parameters = cli.parameters();
        assert_eq!(parameters["criterion"], json!({"$eq": {"type": "project"}}));
        assert_eq!(parameters["label"], json!("nightly"));
        assert_eq!(parameters["limit"], json!(5));
    }

    #[test]
    fn malformed_param_is_rejected() {
        assert!(Cli::try_parse_from(["lakehouse", "-s", "x", "-P", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["lakehouse", "-s", "x", "-P", "=1"]).is_err());
    }

    #[test]
    fn credentials_become_parameters() {
        let cli = Cli::try_parse_from(["lakehouse", "-s", "x", "-u", "alice", "-p", "pw"])
            .expect("cli should parse");
        let parameters = cli.parameters();
        assert_eq!(parameters["user"], json!("alice"));
        assert_eq!(parameters["password"], json!("pw"));
    }
}
