use std::fmt;

use services::{
    ApiRequest, AppServices, Clock, Method, PortalConfig, ProgressService, RunMode, StoreLocation,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidSeconds { raw: String },
    InvalidMethod { raw: String },
    InvalidJson { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidSeconds { raw } => write!(f, "invalid <seconds> value: {raw}"),
            ArgsError::InvalidMethod { raw } => write!(f, "invalid HTTP method: {raw}"),
            ArgsError::InvalidJson { raw } => write!(f, "body is not valid JSON: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

const USAGE: &str = "\
Usage:
  portal progress show     <course>
  portal progress complete <course> <lesson>
  portal progress watch    <course> <lesson> <seconds>
  portal progress resume   <course> <lesson>
  portal api <METHOD> <PATH> [JSON]

Options:
  --store <memory|sqlite:<path>|<dir>>  progress store (default: .portal)
  --mode <development|production>       API backend (default: development)

Environment:
  PORTAL_RUN_MODE, PORTAL_API_BASE_URL, PORTAL_STORE, PORTAL_STORE_KEY,
  PORTAL_MOCK_DELAY, RUST_LOG
";

fn print_usage() {
    eprint!("{USAGE}");
}

/// Bad command line; reported together with the usage text.
#[derive(Debug)]
struct UsageError(Box<dyn std::error::Error>);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for UsageError {}

/// Text printed once when `run` fails.
fn failure_message(err: &(dyn std::error::Error + 'static)) -> String {
    if err.is::<UsageError>() {
        format!("{err}\n\n{USAGE}")
    } else {
        err.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ProgressCommand {
    Show { course: String },
    Complete { course: String, lesson: String },
    Watch { course: String, lesson: String, seconds: u32 },
    Resume { course: String, lesson: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Progress(ProgressCommand),
    Api { method: Method, path: String, body: Option<serde_json::Value> },
}

struct Args {
    config: PortalConfig,
    command: Command,
}

impl Args {
    fn parse(
        mut config: PortalConfig,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Option<Self>, Box<dyn std::error::Error>> {
        let mut positional = Vec::new();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--store" => {
                    let value = require_value(args, "--store")?;
                    config.store = value.parse()?;
                }
                "--mode" => {
                    let value = require_value(args, "--mode")?;
                    config.run_mode = value.parse()?;
                }
                "--help" | "-h" => return Ok(None),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg).into()),
                _ => positional.push(arg),
            }
        }

        let command = parse_command(positional)?;
        Ok(Some(Self { config, command }))
    }
}

fn parse_command(positional: Vec<String>) -> Result<Command, ArgsError> {
    let mut words = positional.into_iter();
    let mut next = |name: &'static str| words.next().ok_or(ArgsError::MissingArgument { name });

    let command = match next("command")?.as_str() {
        "progress" => Command::Progress(match next("action")?.as_str() {
            "show" => ProgressCommand::Show {
                course: next("course")?,
            },
            "complete" => ProgressCommand::Complete {
                course: next("course")?,
                lesson: next("lesson")?,
            },
            "watch" => {
                let course = next("course")?;
                let lesson = next("lesson")?;
                let raw = next("seconds")?;
                let seconds = raw
                    .parse()
                    .map_err(|_| ArgsError::InvalidSeconds { raw: raw.clone() })?;
                ProgressCommand::Watch {
                    course,
                    lesson,
                    seconds,
                }
            }
            "resume" => ProgressCommand::Resume {
                course: next("course")?,
                lesson: next("lesson")?,
            },
            other => return Err(ArgsError::UnknownCommand(format!("progress {other}"))),
        }),
        "api" => {
            let raw = next("method")?;
            let method = raw
                .parse()
                .map_err(|_| ArgsError::InvalidMethod { raw: raw.clone() })?;
            let path = next("path")?;
            let body = match next("json") {
                Ok(raw) => Some(
                    serde_json::from_str(&raw).map_err(|_| ArgsError::InvalidJson { raw })?,
                ),
                Err(_) => None,
            };
            Command::Api { method, path, body }
        }
        other => return Err(ArgsError::UnknownCommand(other.to_string())),
    };

    if let Some(extra) = words.next() {
        return Err(ArgsError::UnknownArg(extra));
    }
    Ok(command)
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
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

/// `SQLite` refuses to open a missing file without `mode=rwc`, so create it.
fn prepare_sqlite_file(db_url: &str) -> std::io::Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Ok(());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run_progress(
    progress: &ProgressService,
    command: ProgressCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ProgressCommand::Show { course } => match progress.course_progress(&course) {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!("no progress recorded for course {course}"),
        },
        ProgressCommand::Complete { course, lesson } => {
            progress.mark_completed(&course, &lesson).await?;
            println!(
                "completed {course}/{lesson} ({} lessons done)",
                progress.completed_count(&course)
            );
        }
        ProgressCommand::Watch {
            course,
            lesson,
            seconds,
        } => {
            progress.update_watch_time(&course, &lesson, seconds).await?;
            println!("recorded {seconds}s for {course}/{lesson}");
        }
        ProgressCommand::Resume { course, lesson } => {
            progress.set_last_lesson(&course, &lesson).await?;
            println!("{course} resumes at {lesson}");
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = PortalConfig::from_env()?;
    let mut iter = std::env::args().skip(1);
    let parsed = match Args::parse(config, &mut iter) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => return Err(Box::new(UsageError(e))),
    };

    let mut config = parsed.config;
    if let StoreLocation::Sqlite(url) = &config.store {
        let url = normalize_sqlite_url(url.clone());
        prepare_sqlite_file(&url)?;
        config.store = StoreLocation::Sqlite(url);
    }

    let services = AppServices::new(&config, Clock::system()).await?;
    if services.run_mode() == RunMode::Development {
        tracing::info!("serving API calls from the in-process mock");
    }

    match parsed.command {
        Command::Api { method, path, body } => {
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                request = request.with_body(body);
            }
            let response = services.api().send(request).await?;
            println!("{}", response.status);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            Ok(())
        }
        Command::Progress(command) => run_progress(&services.progress(), command).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{}", failure_message(&*err));
        std::process::exit(2);
    }
}
