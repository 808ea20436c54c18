use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use coursegate::config::SessionCache;
use coursegate::dashboard::{ActivityEvent, SummaryStats};
use coursegate::progress::snapshot::parse_chapter_snapshot;
use coursegate::progress::{
    AttemptRecord, ChapterContentSpec, ContentCatalog, Course, CourseReport, QuizAttemptState,
    WatchLedger, evaluate_course,
};
use coursegate::{
    Config, CounterKind, CounterSynchronizer, DashboardAggregator, Freshness, HttpRemote,
    LearnerSession, Role,
};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coursegate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a course from a local JSON fixture
    Evaluate {
        /// Path to the fixture file
        path: PathBuf,
    },
    /// Fetch a course and a learner's progress from the API
    Sync {
        /// Learner identifier
        #[arg(short, long)]
        learner: String,
        /// Course identifier
        #[arg(short, long)]
        course: String,
    },
    /// Fetch a learner's unread counters
    Unread {
        /// Learner identifier
        #[arg(short, long)]
        learner: String,
    },
    /// Print the config file location
    Config,
}

/// Offline input for `evaluate`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    course: Course,
    chapters: Vec<ChapterContentSpec>,
    /// Raw progress payloads per chapter, in any shape the API produces
    #[serde(default)]
    progress: HashMap<String, serde_json::Value>,
    #[serde(default)]
    attempts: HashMap<String, QuizAttemptState>,
    #[serde(default)]
    summary: Option<SummaryStats>,
    #[serde(default)]
    activity: Vec<ActivityEvent>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursegate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate { path } => evaluate_fixture(&path)?,
        Commands::Sync { learner, course } => sync(&learner, &course).await?,
        Commands::Unread { learner } => unread(&learner).await?,
        Commands::Config => println!("{}", Config::config_path()?.display()),
    }

    Ok(())
}

fn evaluate_fixture(path: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {:?}", path))?;
    let fixture: Fixture =
        serde_json::from_str(&contents).with_context(|| "Failed to parse fixture")?;

    let catalog: ContentCatalog = fixture.chapters.into_iter().collect();
    let mut ledger = WatchLedger::default();
    for (chapter_id, raw) in &fixture.progress {
        let snapshot = parse_chapter_snapshot(raw)
            .with_context(|| format!("Invalid progress for chapter {chapter_id}"))?;
        ledger.replace_from_remote(chapter_id, snapshot.progress);
    }
    let mut attempts = AttemptRecord::default();
    for (chapter_id, state) in &fixture.attempts {
        attempts.merge_remote(chapter_id, state);
    }

    let report = evaluate_course(&fixture.course, &catalog, &ledger, &attempts);
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    print_report(&fixture.course.title, &report);

    let summary = fixture.summary.ok_or("no summary in fixture");
    let limit = Config::default().recent_activity_limit;
    let mut aggregator = DashboardAggregator::new(Role::Student, limit);
    let activity = Ok(fixture.activity);
    let view = aggregator.compose(summary, activity, &[report], &Default::default(), unix_now());
    println!();
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn sync(learner: &str, course: &str) -> Result<()> {
    let config = Config::load()?;
    let remote = Arc::new(HttpRemote::from_config(&config)?);
    let session = LearnerSession::new(learner, remote, Arc::new(CounterSynchronizer::new()));

    match SessionCache::load(learner) {
        Ok(Some(cache)) => {
            session.restore_cache(cache);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Ignoring unreadable session cache: {:#}", e),
    }

    if session.load_course(course).await == Freshness::Stale {
        bail!("Could not load course {course}");
    }
    if session.refresh_course(course).await == Freshness::Stale {
        tracing::warn!("Some chapters could not be refreshed; showing last known progress");
    }

    let report = session.course_report(course).context("Course disappeared from session")?;
    print_report(course, &report);

    session.to_cache(unix_now()).save()?;
    Ok(())
}

async fn unread(learner: &str) -> Result<()> {
    let config = Config::load()?;
    let remote = Arc::new(HttpRemote::from_config(&config)?);
    let session = LearnerSession::new(learner, remote, Arc::new(CounterSynchronizer::new()));

    if session.refresh_counts().await == Freshness::Stale {
        tracing::warn!("Unread counts unavailable");
    }
    for kind in CounterKind::all() {
        println!("{:<14} {}", kind.as_str(), session.effective_unread_count(*kind));
    }
    Ok(())
}

fn print_report(title: &str, report: &CourseReport) {
    let suffix = if report.completed { " (completed)" } else { "" };
    println!("{title}: {}%{suffix}", report.progress_percent);
    for chapter in &report.chapters {
        println!(
            "  {:<24} {:<12} {:>5.0}%",
            chapter.chapter_id,
            chapter.status.label(),
            chapter.completion_percent
        );
    }
}

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or_default()
}
