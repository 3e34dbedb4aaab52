use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use services::config::{DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS, parse_timeout};

pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidTimeout { raw: String },
    InvalidLimit { raw: String },
    InvalidDate { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDate { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (expected YYYY-MM-DD)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app register --name <name> --email <email> --password <pw> [--confirm <pw>]");
    eprintln!("  app login    --email <email> --password <pw>");
    eprintln!("  app logout");
    eprintln!("  app quiz     --topic <id>");
    eprintln!("  app history  --topic <id> [--limit <n>]");
    eprintln!("  app report   [--from <YYYY-MM-DD>] [--to <YYYY-MM-DD>]");
    eprintln!();
    eprintln!("Options accepted by every subcommand:");
    eprintln!("  --api <url>       (default {DEFAULT_API_BASE_URL})");
    eprintln!("  --db <sqlite_url> (default {DEFAULT_DB_URL})");
    eprintln!("  --timeout <secs>  (default {DEFAULT_TIMEOUT_SECS})");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_API_BASE_URL, QUIZ_DB_URL, QUIZ_HTTP_TIMEOUT_SECS, RUST_LOG");
}

/// Where the app talks to and stores into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub db_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register {
        name: String,
        email: String,
        password: String,
        confirm: String,
    },
    Login {
        email: String,
        password: String,
    },
    Logout,
    Quiz {
        topic: String,
    },
    History {
        topic: String,
        limit: u32,
    },
    Report {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub settings: Settings,
    pub command: Command,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_date(flag: &'static str, raw: String) -> Result<NaiveDate, ArgsError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ArgsError::InvalidDate { flag, raw })
}

/// Flags seen on the command line, before defaults are applied.
#[derive(Default)]
struct Flags {
    api: Option<String>,
    db: Option<String>,
    timeout: Option<String>,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    confirm: Option<String>,
    topic: Option<String>,
    limit: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

impl Flags {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut flags = Self::default();
        while let Some(arg) = args.next() {
            let (slot, flag) = match arg.as_str() {
                "--api" => (&mut flags.api, "--api"),
                "--db" => (&mut flags.db, "--db"),
                "--timeout" => (&mut flags.timeout, "--timeout"),
                "--name" => (&mut flags.name, "--name"),
                "--email" => (&mut flags.email, "--email"),
                "--password" => (&mut flags.password, "--password"),
                "--confirm" => (&mut flags.confirm, "--confirm"),
                "--topic" => (&mut flags.topic, "--topic"),
                "--limit" => (&mut flags.limit, "--limit"),
                "--from" => (&mut flags.from, "--from"),
                "--to" => (&mut flags.to, "--to"),
                _ => return Err(ArgsError::UnknownArg(arg)),
            };
            *slot = Some(require_value(args, flag)?);
        }
        Ok(flags)
    }
}

fn required(value: Option<String>, flag: &'static str) -> Result<String, ArgsError> {
    value.ok_or(ArgsError::MissingFlag { flag })
}

impl Invocation {
    /// Parse `argv` (without the program name). `env` resolves environment
    /// variables; flags win over the environment, which wins over defaults.
    ///
    /// Returns `Ok(None)` when help was requested.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let Some(cmd) = args.next() else {
            return Ok(None);
        };
        if matches!(cmd.as_str(), "--help" | "-h" | "help") {
            return Ok(None);
        }

        let mut flags = Flags::parse(&mut args)?;
        let settings = Settings::resolve(&mut flags, &env)?;
        let command = match cmd.as_str() {
            "register" => {
                let password = required(flags.password, "--password")?;
                Command::Register {
                    name: required(flags.name, "--name")?,
                    email: required(flags.email, "--email")?,
                    confirm: flags.confirm.unwrap_or_else(|| password.clone()),
                    password,
                }
            }
            "login" => Command::Login {
                email: required(flags.email, "--email")?,
                password: required(flags.password, "--password")?,
            },
            "logout" => Command::Logout,
            "quiz" => Command::Quiz {
                topic: required(flags.topic, "--topic")?,
            },
            "history" => {
                let limit = match flags.limit {
                    Some(raw) => raw
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLimit { raw })?,
                    None => DEFAULT_HISTORY_LIMIT,
                };
                Command::History {
                    topic: required(flags.topic, "--topic")?,
                    limit,
                }
            }
            "report" => Command::Report {
                from: flags.from.map(|raw| parse_date("--from", raw)).transpose()?,
                to: flags.to.map(|raw| parse_date("--to", raw)).transpose()?,
            },
            _ => return Err(ArgsError::UnknownCommand(cmd)),
        };

        Ok(Some(Self { settings, command }))
    }
}

impl Settings {
    fn resolve(
        flags: &mut Flags,
        env: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let api_base_url = flags
            .api
            .take()
            .or_else(|| env("QUIZ_API_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());

        let db_raw = flags.db.take().or_else(|| env("QUIZ_DB_URL"));
        let db_url = match db_raw {
            Some(raw) if raw.trim().is_empty() => return Err(ArgsError::InvalidDbUrl { raw }),
            Some(raw) => normalize_sqlite_url(raw),
            None => DEFAULT_DB_URL.into(),
        };

        let timeout = match flags.timeout.take().or_else(|| env("QUIZ_HTTP_TIMEOUT_SECS")) {
            Some(raw) => parse_timeout(&raw).map_err(|_| ArgsError::InvalidTimeout { raw })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url,
            db_url,
            timeout,
        })
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_owned()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn quiz_uses_defaults() {
        let inv = Invocation::parse(argv(&["quiz", "--topic", "frações"]), no_env)
            .unwrap()
            .unwrap();
        assert_eq!(
            inv.command,
            Command::Quiz {
                topic: "frações".into()
            }
        );
        assert_eq!(inv.settings.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(inv.settings.db_url, DEFAULT_DB_URL);
        assert_eq!(inv.settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "QUIZ_API_BASE_URL" => Some("http://env:1".to_owned()),
            "QUIZ_HTTP_TIMEOUT_SECS" => Some("5".to_owned()),
            _ => None,
        };
        let inv = Invocation::parse(
            argv(&["logout", "--api", "http://flag:2", "--db", "sqlite::memory:"]),
            env,
        )
        .unwrap()
        .unwrap();
        assert_eq!(inv.settings.api_base_url, "http://flag:2");
        assert_eq!(inv.settings.db_url, "sqlite::memory:");
        assert_eq!(inv.settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn register_confirm_defaults_to_password() {
        let inv = Invocation::parse(
            argv(&["register", "--name", "Ana", "--email", "ana@example.com", "--password", "segredo"]),
            no_env,
        )
        .unwrap()
        .unwrap();
        let Command::Register { confirm, .. } = inv.command else {
            panic!("expected register");
        };
        assert_eq!(confirm, "segredo");
    }

    #[test]
    fn report_dates_are_validated() {
        let inv = Invocation::parse(argv(&["report", "--from", "2024-03-01"]), no_env)
            .unwrap()
            .unwrap();
        assert_eq!(
            inv.command,
            Command::Report {
                from: NaiveDate::from_ymd_opt(2024, 3, 1),
                to: None
            }
        );

        let err = Invocation::parse(argv(&["report", "--to", "31/03/2024"]), no_env).unwrap_err();
        assert!(matches!(err, ArgsError::InvalidDate { flag: "--to", .. }));
    }

    #[test]
    fn reports_missing_and_unknown_arguments() {
        assert_eq!(
            Invocation::parse(argv(&["quiz"]), no_env).unwrap_err(),
            ArgsError::MissingFlag { flag: "--topic" }
        );
        assert_eq!(
            Invocation::parse(argv(&["history", "--topic"]), no_env).unwrap_err(),
            ArgsError::MissingValue { flag: "--topic" }
        );
        assert_eq!(
            Invocation::parse(argv(&["quiz", "--deck", "1"]), no_env).unwrap_err(),
            ArgsError::UnknownArg("--deck".into())
        );
        assert_eq!(
            Invocation::parse(argv(&["play"]), no_env).unwrap_err(),
            ArgsError::UnknownCommand("play".into())
        );
        assert!(matches!(
            Invocation::parse(argv(&["logout", "--timeout", "0"]), no_env).unwrap_err(),
            ArgsError::InvalidTimeout { .. }
        ));
    }

    #[test]
    fn help_yields_nothing() {
        assert!(Invocation::parse(argv(&[]), no_env).unwrap().is_none());
        assert!(Invocation::parse(argv(&["--help"]), no_env).unwrap().is_none());
    }
}
