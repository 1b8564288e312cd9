use clap::Parser;
use std::path::PathBuf;

/// Command-line surface. Every setting falls back to the environment variable
/// the deployment already exports, then to the built-in default.
#[derive(Debug, Parser)]
#[command(
    name = "provider-ingest",
    version,
    about = "Parse learning provider exports into the database and archive them"
)]
pub struct Cli {
    /// Learning provider to ingest (e.g. Coursera, Linux, SimpliLearn, Cisco)
    pub provider: Option<String>,

    /// Execution log written during the run and exported at the end
    #[arg(long, env = "LOGFILE", default_value = "/WeLearnTT/scriptExecution.logs")]
    pub log_file: PathBuf,

    /// Minimum level recorded in the execution log
    #[arg(long, env = "LOGLEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Directory the provider exports are delivered to
    #[arg(long, env = "LOCAL_DOWNLOAD", default_value = "/WeLearnTT/Downloads/")]
    pub download_dir: PathBuf,

    /// Root of the date-partitioned archive
    #[arg(long, env = "LOCAL_ARCHIVE", default_value = "/WeLearnTT/Archive/")]
    pub archive_dir: PathBuf,

    /// Space-separated list of providers this deployment accepts
    #[arg(
        long,
        env = "PARSERS",
        default_value = "Coursera Linux SimpliLearn Cisco",
        value_delimiter = ' '
    )]
    pub parsers: Vec<String>,

    /// Database user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database host
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long, env = "DB_PORT")]
    pub db_port: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "provider-ingest",
            "Cisco",
            "--download-dir",
            "/tmp/in",
            "--parsers",
            "Cisco Linux",
        ]);
        let Ok(cli) = cli else {
            panic!("arguments should parse");
        };
        assert_eq!(cli.provider.as_deref(), Some("Cisco"));
        assert_eq!(cli.download_dir, PathBuf::from("/tmp/in"));
        assert_eq!(cli.parsers, vec!["Cisco".to_owned(), "Linux".to_owned()]);
    }
}
