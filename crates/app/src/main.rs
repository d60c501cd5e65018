use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mastery_core::QuizResult;
use mastery_core::model::{Catalog, Module, ModuleId, SkillLevel};
use services::{AppServices, Clock, DashboardView};
use tracing::debug;

mod telemetry;

const BUNDLED_CATALOG: &str = include_str!("../assets/catalog.json");
const DEFAULT_DB_URL: &str = "sqlite://learn.sqlite3";

type BoxError = Box<dyn std::error::Error>;

#[derive(Debug, PartialEq, Eq)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidModuleId { raw: String },
    InvalidLessonNumber { raw: String },
    InvalidAnswer { raw: String },
    InvalidSkillLevel { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command}: missing <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidModuleId { raw } => write!(f, "invalid module id: {raw:?}"),
            ArgsError::InvalidLessonNumber { raw } => {
                write!(f, "invalid lesson number: {raw} (lessons are numbered from 1)")
            }
            ArgsError::InvalidAnswer { raw } => {
                write!(f, "invalid answer: {raw} (use an option number from 1, or - to skip)")
            }
            ArgsError::InvalidSkillLevel { raw } => {
                write!(f, "invalid skill level: {raw} (Beginner, Intermediate or Advanced)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app [status] [--json]                     show dashboard");
    eprintln!("  app complete <module> <lesson#>           mark a lesson done");
    eprintln!("  app quiz <module> <answer>...             submit quiz answers (1-based, - skips)");
    eprintln!("  app badges                                list earned badges");
    eprintln!("  app level [<Beginner|Intermediate|Advanced>]  show or set your skill level");
    eprintln!("  app catalog                               list modules, lessons and practice");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>      default {DEFAULT_DB_URL}");
    eprintln!("  --catalog <path>       catalog JSON, default is the bundled catalog");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_CATALOG_PATH, LOG_LEVEL, LOG_FORMAT");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status { json: bool },
    /// `lesson` is zero-based here; the command line is one-based.
    Complete { module: ModuleId, lesson: usize },
    Quiz { module: ModuleId, answers: Vec<Option<usize>> },
    Badges,
    /// `None` shows the current level.
    Level { level: Option<SkillLevel> },
    Catalog,
}

impl Command {
    fn from_positional(args: Vec<String>, json: bool) -> Result<Self, ArgsError> {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            None | Some("status") => Self::Status { json },
            Some("badges") => Self::Badges,
            Some("catalog") => Self::Catalog,
            Some("level") => {
                let level = args
                    .next()
                    .map(|raw| SkillLevel::parse(&raw).ok_or(ArgsError::InvalidSkillLevel { raw }))
                    .transpose()?;
                Self::Level { level }
            }
            Some("complete") => {
                let module = parse_module(args.next(), "complete")?;
                let raw = args.next().ok_or(ArgsError::MissingArgument {
                    command: "complete",
                    name: "lesson#",
                })?;
                let lesson = parse_one_based(&raw)
                    .ok_or(ArgsError::InvalidLessonNumber { raw })?;
                Self::Complete { module, lesson }
            }
            Some("quiz") => {
                let module = parse_module(args.next(), "quiz")?;
                let answers = args
                    .by_ref()
                    .map(|raw| parse_answer(&raw).ok_or(ArgsError::InvalidAnswer { raw }))
                    .collect::<Result<Vec<_>, _>>()?;
                if answers.is_empty() {
                    return Err(ArgsError::MissingArgument {
                        command: "quiz",
                        name: "answer",
                    });
                }
                Self::Quiz { module, answers }
            }
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        match args.next() {
            Some(extra) => Err(ArgsError::UnknownArg(extra)),
            None => Ok(command),
        }
    }
}

fn parse_module(raw: Option<String>, command: &'static str) -> Result<ModuleId, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArgument {
        command,
        name: "module",
    })?;
    raw.parse()
        .map_err(|_| ArgsError::InvalidModuleId { raw: raw.clone() })
}

fn parse_one_based(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok()?.checked_sub(1)
}

fn parse_answer(raw: &str) -> Option<Option<usize>> {
    if raw == "-" {
        return Some(None);
    }
    parse_one_based(raw).map(Some)
}

/// Values taken from the environment before flags are applied.
struct Defaults {
    db_url: String,
    catalog_path: Option<PathBuf>,
}

impl Defaults {
    fn from_env() -> Self {
        let db_url = std::env::var("LEARN_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let catalog_path = std::env::var_os("LEARN_CATALOG_PATH").map(PathBuf::from);
        Self {
            db_url,
            catalog_path,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    db_url: String,
    catalog_path: Option<PathBuf>,
    command: Command,
}

impl Args {
    /// `Ok(None)` means help was requested.
    fn parse(
        argv: impl IntoIterator<Item = String>,
        defaults: Defaults,
    ) -> Result<Option<Self>, ArgsError> {
        let Defaults {
            mut db_url,
            mut catalog_path,
        } = defaults;
        let mut json = false;
        let mut positional = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    catalog_path = Some(PathBuf::from(require_value(&mut args, "--catalog")?));
                }
                "--json" => json = true,
                "--help" | "-h" => return Ok(None),
                "-" => positional.push(arg),
                _ if arg.starts_with('-') => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let command = Command::from_positional(positional, json)?;
        Ok(Some(Self {
            db_url,
            catalog_path,
            command,
        }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), BoxError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
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

fn load_catalog(path: Option<&Path>) -> Result<Catalog, BoxError> {
    let catalog = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read catalog {}: {e}", path.display()))?;
            Catalog::from_json(&raw)?
        }
        None => Catalog::from_json(BUNDLED_CATALOG)?,
    };
    Ok(catalog)
}

async fn execute(
    app: &mut AppServices,
    command: Command,
    out: &mut impl Write,
) -> Result<(), BoxError> {
    match command {
        Command::Status { json } => {
            let view = app.dashboard().dashboard(app.progress());
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
                return Ok(());
            }
            write_dashboard(out, &view)?;
            let reviews = app
                .dashboard()
                .suggest_reviews(app.progress(), &mut rand::rng());
            if !reviews.is_empty() {
                let ids: Vec<&str> = reviews.iter().map(ModuleId::as_str).collect();
                writeln!(out, "Worth a review: {}", ids.join(", "))?;
            }
        }
        Command::Complete { module, lesson } => {
            let outcome = app.progress_mut().complete_lesson(&module, lesson).await?;
            writeln!(
                out,
                "{module}: lesson {} done, {}% complete",
                lesson + 1,
                outcome.percent
            )?;
            if let Some(badge) = outcome.badge {
                writeln!(out, "Badge earned: {badge}")?;
            }
        }
        Command::Quiz { module, answers } => {
            let was_complete = app
                .progress()
                .store()
                .record(&module)
                .is_ok_and(|r| r.is_complete());
            let result = app.progress_mut().submit_quiz(&module, &answers).await?;
            write_quiz_result(out, app.progress().catalog(), &module, &result)?;
            let record = app.progress().store().record(&module)?;
            writeln!(out, "{module}: {}% complete", record.percent())?;
            if !was_complete && record.badge_awarded() {
                if let Some(badge) = record.badge() {
                    writeln!(out, "Badge earned: {badge}")?;
                }
            }
        }
        Command::Badges => {
            let summary = app.progress().summary();
            if summary.badges.is_empty() {
                writeln!(out, "No badges yet.")?;
            }
            for badge in &summary.badges {
                writeln!(out, "{badge}")?;
            }
        }
        Command::Level { level: None } => {
            writeln!(out, "Skill level: {}", app.progress().skill_level().as_str())?;
        }
        Command::Level { level: Some(level) } => {
            app.progress_mut().set_skill_level(level).await?;
            writeln!(out, "Skill level set to {}", level.as_str())?;
        }
        Command::Catalog => write_catalog(out, app.progress().catalog())?,
    }
    Ok(())
}

fn write_dashboard(out: &mut impl Write, view: &DashboardView) -> std::io::Result<()> {
    writeln!(
        out,
        "Completed {}/{} modules ({}%)",
        view.completed_count, view.total_modules, view.completion_percent
    )?;
    writeln!(out, "Hours studied: {:.1}", view.hours_studied)?;
    writeln!(out, "Skill level: {}", view.skill_level.as_str())?;
    if view.badges.is_empty() {
        writeln!(out, "Badges: none")?;
    } else {
        writeln!(out, "Badges: {}", view.badges.join(", "))?;
    }

    writeln!(out)?;
    for row in &view.modules {
        let quiz = row
            .best_quiz_percent
            .map(|pct| format!("  best quiz {pct}%"))
            .unwrap_or_default();
        let badge = if row.badge_awarded { "  *" } else { "" };
        writeln!(
            out,
            "  {:<18} {:>3}%  {}{quiz}{badge}",
            row.id.as_str(),
            row.percent,
            row.title
        )?;
    }

    if let Some(next) = &view.next_up {
        writeln!(out)?;
        writeln!(
            out,
            "Next up: {} ({}, {}%)",
            next.title,
            next.difficulty.as_str(),
            next.percent
        )?;
        if let Some(time) = &next.estimated_time {
            writeln!(out, "  Estimated time: {time}")?;
        }
        if !next.unmet_prerequisites.is_empty() {
            let ids: Vec<&str> = next.unmet_prerequisites.iter().map(ModuleId::as_str).collect();
            writeln!(out, "  Recommended first: {}", ids.join(", "))?;
        }
    }
    Ok(())
}

fn write_quiz_result(
    out: &mut impl Write,
    catalog: &Catalog,
    module: &ModuleId,
    result: &QuizResult,
) -> std::io::Result<()> {
    for (i, (question, correct)) in catalog.quiz(module).iter().zip(&result.correct).enumerate() {
        let mark = if *correct { "+" } else { "-" };
        writeln!(out, "  {mark} {}. {}", i + 1, question.question())?;
        if !correct {
            if let Some(answer) = question.options().get(question.correct_index()) {
                writeln!(out, "      answer: {answer}")?;
            }
            if let Some(explanation) = question.explanation() {
                writeln!(out, "      {explanation}")?;
            }
        }
    }

    let verdict = if result.passed { "passed" } else { "not passed" };
    writeln!(
        out,
        "Score {}/{} ({}%), {verdict}",
        result.score,
        result.total_possible,
        result.score_percent()
    )?;
    if result.bonus_applied {
        writeln!(out, "Quiz bonus applied")?;
    }
    Ok(())
}

fn write_catalog(out: &mut impl Write, catalog: &Catalog) -> std::io::Result<()> {
    for module in catalog.modules() {
        writeln!(
            out,
            "{} - {} [{}]",
            module.id,
            module.title,
            module.difficulty.as_str()
        )?;
        if !module.prerequisites.is_empty() {
            let ids: Vec<&str> = module.prerequisites.iter().map(ModuleId::as_str).collect();
            writeln!(out, "  prerequisites: {}", ids.join(", "))?;
        }
        for (i, lesson) in module.lessons.iter().enumerate() {
            writeln!(out, "  {}. {} ({})", i + 1, lesson.title, lesson.duration)?;
        }
        if module.has_quiz() {
            writeln!(
                out,
                "  quiz: {} questions, {} points",
                module.quiz.len(),
                module.quiz_total_points()
            )?;
        }
        write_practice(out, module)?;
    }
    Ok(())
}

fn write_practice(out: &mut impl Write, module: &Module) -> std::io::Result<()> {
    for exercise in &module.exercises {
        let time = exercise
            .estimated_time
            .as_deref()
            .map(|t| format!(", {t}"))
            .unwrap_or_default();
        writeln!(
            out,
            "  exercise: {} ({}{time})",
            exercise.title,
            exercise.difficulty.as_str()
        )?;
        if !exercise.skills.is_empty() {
            writeln!(out, "    skills: {}", exercise.skills.join(", "))?;
        }
        for (i, step) in exercise.steps.iter().enumerate() {
            writeln!(out, "    {}. {step}", i + 1)?;
        }
    }
    for case in &module.case_studies {
        writeln!(out, "  case study: {}", case.title)?;
        for task in &case.tasks {
            writeln!(out, "    - {task}")?;
        }
        if !case.learning_outcomes.is_empty() {
            writeln!(out, "    outcomes: {}", case.learning_outcomes.join("; "))?;
        }
    }
    Ok(())
}

async fn run() -> Result<(), BoxError> {
    let Some(args) = Args::parse(std::env::args().skip(1), Defaults::from_env()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    telemetry::init_tracing();

    let catalog = Arc::new(load_catalog(args.catalog_path.as_deref())?);
    prepare_sqlite_file(&args.db_url)?;
    let mut app = AppServices::new_sqlite(&args.db_url, Clock::default(), catalog).await?;
    debug!(db = %args.db_url, modules = app.progress().catalog().len(), "session loaded");

    let stdout = std::io::stdout();
    execute(&mut app, args.command, &mut stdout.lock()).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
