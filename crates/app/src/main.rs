use std::fmt;
use std::sync::Arc;

use classroom_core::model::{ClassId, LessonId, ThemeId};
use services::{
    ApiClient, ApiConfig, CadenceConfig, DashboardHandle, DashboardSession, DashboardSnapshot,
    ExerciseConfig, MergeMode, PushChannel, SessionSettings,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

const DEFAULT_LOG_FILTER: &str = "dashboard=info,services=info";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  dashboard --lesson-id <id> --class-id <id> [--api <url>] [--theme-id <id>]");
    eprintln!("            [--minutes <n>] [--no-push]");
    eprintln!();
    eprintln!("Commands on stdin:");
    print_commands();
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CLASSROOM_API_BASE_URL, CLASSROOM_EXERCISE_MINUTES,");
    eprintln!("  CLASSROOM_FAST_SECS, CLASSROOM_SLOW_SECS, CLASSROOM_TICK_SECS, RUST_LOG");
}

fn print_commands() {
    eprintln!("  lesson [theme-id]   generate answer rows and start the lesson");
    eprintln!("  start | stop        start or pause the exercise");
    eprintln!("  minutes <n>         change the exercise length");
    eprintln!("  refresh             full resync now");
    eprintln!("  quit");
}

struct Args {
    api: Option<String>,
    lesson_id: LessonId,
    class_id: ClassId,
    theme_id: Option<ThemeId>,
    minutes: Option<String>,
    push: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api = None;
        let mut lesson_id = None;
        let mut class_id = None;
        let mut theme_id = None;
        let mut minutes = None;
        let mut push = true;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => api = Some(require_value(args, "--api")?),
                "--lesson-id" => {
                    let value = require_value(args, "--lesson-id")?;
                    lesson_id = Some(parse_id("--lesson-id", value)?);
                }
                "--class-id" => {
                    let value = require_value(args, "--class-id")?;
                    class_id = Some(parse_id("--class-id", value)?);
                }
                "--theme-id" => {
                    let value = require_value(args, "--theme-id")?;
                    theme_id = Some(parse_id("--theme-id", value)?);
                }
                "--minutes" => minutes = Some(require_value(args, "--minutes")?),
                "--no-push" => push = false,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            api,
            lesson_id: lesson_id.ok_or(ArgsError::MissingFlag { flag: "--lesson-id" })?,
            class_id: class_id.ok_or(ArgsError::MissingFlag { flag: "--class-id" })?,
            theme_id,
            minutes,
            push,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    let api = match &args.api {
        Some(raw) => ApiConfig::new(raw)?,
        None => ApiConfig::from_env()?,
    };
    let exercise = match &args.minutes {
        Some(raw) => ExerciseConfig::from_minutes_str("--minutes", raw)?,
        None => ExerciseConfig::from_env()?,
    };
    let settings = SessionSettings::new(args.lesson_id, args.class_id)
        .with_theme(args.theme_id)
        .with_exercise(exercise)
        .with_cadence(CadenceConfig::from_env()?);

    let push = if args.push {
        match PushChannel::connect(&api).await {
            Ok(channel) => Some(channel),
            Err(err) => {
                warn!(%err, "push channel unavailable; polling only");
                None
            }
        }
    } else {
        None
    };

    let backend = Arc::new(ApiClient::new(&api)?);
    info!(api = %backend.base_url(), lesson = %args.lesson_id, "starting dashboard");
    let handle = DashboardSession::start(backend, settings, push).await?;
    let renderer = tokio::spawn(render_updates(handle.subscribe()));

    let result = tokio::select! {
        result = console(&handle) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };

    handle.shutdown().await;
    renderer.abort();
    result
}

async fn render_updates(mut snapshots: watch::Receiver<DashboardSnapshot>) {
    loop {
        let frame = render::render(&snapshots.borrow_and_update());
        print!("\x1B[2J\x1B[H{frame}");
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

async fn console(handle: &DashboardHandle) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let outcome = match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("lesson"), theme) => {
                match theme.map(str::parse::<ThemeId>).transpose() {
                    Ok(theme) => handle.start_lesson(theme).await,
                    Err(err) => {
                        eprintln!("{err}");
                        continue;
                    }
                }
            }
            (Some("start"), None) => handle.start_exercise().await,
            (Some("stop"), None) => handle.stop_exercise().await,
            (Some("minutes"), Some(raw)) => match raw.parse::<u32>() {
                Ok(minutes) => handle.set_exercise_minutes(minutes).await,
                Err(_) => {
                    eprintln!("invalid minutes: {raw}");
                    continue;
                }
            },
            (Some("refresh"), None) => handle.refresh(MergeMode::Authoritative).await,
            (Some("quit" | "exit"), None) => break,
            (Some("help"), _) => {
                print_commands();
                continue;
            }
            (Some(other), _) => {
                eprintln!("unknown command: {other} (try `help`)");
                continue;
            }
        };
        if let Err(err) = outcome {
            eprintln!("{err}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut raw.iter().map(ToString::to_string))
    }

    #[test]
    fn parses_full_flag_set() {
        let args = parse(&[
            "--lesson-id", "7", "--class-id", "3", "--theme-id", "11", "--minutes", "8",
            "--api", "http://localhost:8000", "--no-push",
        ])
        .unwrap();
        assert_eq!(args.lesson_id, LessonId::new(7));
        assert_eq!(args.class_id, ClassId::new(3));
        assert_eq!(args.theme_id, Some(ThemeId::new(11)));
        assert_eq!(args.minutes.as_deref(), Some("8"));
        assert_eq!(args.api.as_deref(), Some("http://localhost:8000"));
        assert!(!args.push);
    }

    #[test]
    fn lesson_and_class_are_required() {
        assert!(matches!(
            parse(&["--class-id", "3"]),
            Err(ArgsError::MissingFlag { flag: "--lesson-id" })
        ));
        assert!(matches!(
            parse(&["--lesson-id", "7"]),
            Err(ArgsError::MissingFlag { flag: "--class-id" })
        ));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse(&["--lesson-id", "seven"]),
            Err(ArgsError::InvalidId { flag: "--lesson-id", .. })
        ));
        assert!(matches!(
            parse(&["--lesson-id"]),
            Err(ArgsError::MissingValue { flag: "--lesson-id" })
        ));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
    }
}
