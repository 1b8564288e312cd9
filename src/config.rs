//! Runtime settings, built once at startup and passed by reference.

use crate::cli::Cli;
use crate::error::{IngestError, Result};
use secrecy::{ExposeSecret as _, SecretString};
use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Where and how verbosely the execution log is written.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub file: PathBuf,
    pub level: LevelFilter,
}

/// Connection parameters for the relational store.
///
/// Every field is optional: an incomplete configuration only surfaces when an
/// export is attempted, where it is reported as a failed write.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub database: Option<String>,
}

impl StoreSettings {
    /// Build driver connection options from the configured parameters.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] if the host is missing or the port is
    /// not a number.
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| IngestError::Config("DB_HOST is not set".to_owned()))?;

        let mut options = PgConnectOptions::new().host(host);

        if let Some(port) = self.port.as_deref() {
            let port = port
                .parse::<u16>()
                .map_err(|e| IngestError::Config(format!("DB_PORT '{port}' is invalid: {e}")))?;
            options = options.port(port);
        }
        if let Some(user) = self.user.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }
        if let Some(database) = self.database.as_deref() {
            options = options.database(database);
        }

        Ok(options)
    }

    /// `host:port/database`, for log lines. Never includes credentials.
    pub fn describe(&self) -> String {
        format!(
            "{}:{}/{}",
            self.host.as_deref().unwrap_or("<unset>"),
            self.port.as_deref().unwrap_or("5432"),
            self.database.as_deref().unwrap_or("<unset>")
        )
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub log: LogSettings,
    pub download_dir: PathBuf,
    pub archive_dir: PathBuf,
    /// Provider allow-list, matched by containment.
    pub providers: Vec<String>,
    pub store: StoreSettings,
}

impl Settings {
    /// Validate the parsed command line into settings.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Config`] when the log file or log level is blank,
    /// or the log level is not recognised.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.log_file.as_os_str().is_empty() {
            return Err(IngestError::Config(
                "The LOGFILE variable is blank".to_owned(),
            ));
        }
        if cli.log_level.trim().is_empty() {
            return Err(IngestError::Config(
                "The LOGLEVEL variable is blank".to_owned(),
            ));
        }

        let level = parse_level(&cli.log_level)?;

        Ok(Self {
            log: LogSettings {
                file: cli.log_file.clone(),
                level,
            },
            download_dir: cli.download_dir.clone(),
            archive_dir: cli.archive_dir.clone(),
            providers: cli
                .parsers
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
            store: StoreSettings {
                user: non_blank(cli.db_user.as_deref()),
                password: non_blank(cli.db_password.as_deref())
                    .map(|p| SecretString::new(p.into())),
                host: non_blank(cli.db_host.as_deref()),
                port: non_blank(cli.db_port.as_deref()),
                database: non_blank(cli.db_name.as_deref()),
            },
        })
    }

    /// Whether `provider` appears inside any allow-list entry.
    ///
    /// This is a substring test, not equality: `"Cours"` is allowed when
    /// `"Coursera"` is listed.
    pub fn allows(&self, provider: &str) -> bool {
        self.providers.iter().any(|entry| entry.contains(provider))
    }
}

/// Parse a log level name. Accepts the tracing names plus `WARNING` and
/// `CRITICAL`, case-insensitively.
///
/// # Errors
///
/// Returns [`IngestError::Config`] for anything else.
pub fn parse_level(raw: &str) -> Result<LevelFilter> {
    let level = match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => LevelFilter::TRACE,
        "DEBUG" => LevelFilter::DEBUG,
        "INFO" => LevelFilter::INFO,
        "WARN" | "WARNING" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" => LevelFilter::ERROR,
        "OFF" => LevelFilter::OFF,
        other => {
            return Err(IngestError::Config(format!(
                "The LOGLEVEL value '{other}' is not a log level"
            )));
        }
    };
    Ok(level)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["provider-ingest"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(e) => panic!("arguments should parse: {e}"),
        }
    }

    #[test]
    fn test_blank_log_level_is_a_configuration_error() {
        let result = Settings::from_cli(&cli(&["--log-level", " "]));
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_blank_log_file_is_a_configuration_error() {
        let mut parsed = cli(&[]);
        parsed.log_file = PathBuf::new();
        let result = Settings::from_cli(&parsed);
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_python_style_level_names() -> Result<()> {
        assert_eq!(parse_level("warning")?, LevelFilter::WARN);
        assert_eq!(parse_level("CRITICAL")?, LevelFilter::ERROR);
        assert_eq!(parse_level("Info")?, LevelFilter::INFO);
        assert!(parse_level("LOUD").is_err());
        Ok(())
    }

    #[test]
    fn test_allow_list_uses_containment() -> Result<()> {
        let settings = Settings::from_cli(&cli(&["--parsers", "Coursera Linux"]))?;
        assert!(settings.allows("Coursera"));
        assert!(settings.allows("Cours"));
        assert!(settings.allows("inu"));
        assert!(!settings.allows("Cisco"));
        Ok(())
    }

    #[test]
    fn test_store_describe_hides_password() -> Result<()> {
        let settings = Settings::from_cli(&cli(&[
            "--db-host",
            "db.internal",
            "--db-port",
            "5433",
            "--db-name",
            "learning",
            "--db-password",
            "hunter2",
        ]))?;
        let described = settings.store.describe();
        assert_eq!(described, "db.internal:5433/learning");
        assert!(!format!("{:?}", settings.store).contains("hunter2"));
        Ok(())
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let store = StoreSettings {
            host: Some("localhost".to_owned()),
            port: Some("fivefourthree".to_owned()),
            ..StoreSettings::default()
        };
        assert!(matches!(store.connect_options(), Err(IngestError::Config(_))));
    }
}
