//! repcoach - Camera-based exercise rep counter with local training history

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use repcoach::config::{DEFAULT_DATA_DIR, DataPaths, DetectorConfig, Settings};
use repcoach::db::{CsvLog, Database, ExerciseSession, SessionStore};
use repcoach::exercises::Exercise;
use repcoach::ml::plan::export_plan;
use repcoach::ml::{Analytics, HistoryFilter, Recommendation, Recommender};
use repcoach::session::{ConsoleFeedback, SessionOutcome, SessionRunner};
use repcoach::source::{CAMERA_PLACEHOLDER, CommandSource, FrameSource, JsonLinesSource, SyntheticSource};
use repcoach::tips;

#[derive(Parser)]
#[command(name = "repcoach")]
#[command(author, version, about = "Camera-based rep counter with training history")]
struct Cli {
    /// Directory holding the session log, database and settings
    #[arg(long, global = true, env = "REPCOACH_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Session storage backend
    #[arg(long, global = true, value_enum, env = "REPCOACH_STORE", default_value = "csv")]
    store: StoreKind,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StoreKind {
    Csv,
    Sqlite,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceKind {
    /// External pose-estimation process
    Camera,
    /// Recorded JSON-lines landmark file
    Replay,
    /// Generated motion, for demos
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// Track a workout live and save it when the target is reached
    Track {
        /// Exercise name (e.g., "push-ups", "squats", "plank")
        exercise: String,

        /// Reps to reach, or seconds for plank (default from settings)
        #[arg(short, long)]
        target: Option<u32>,

        /// Where landmark frames come from
        #[arg(long, value_enum, default_value = "camera")]
        source: SourceKind,

        /// Landmark file for --source replay
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Pose-estimation program for --source camera
        #[arg(long, env = "REPCOACH_POSE_COMMAND", default_value = "pose-estimator")]
        pose_command: String,

        /// Argument for the pose program; "{camera}" becomes the camera index
        #[arg(long = "pose-arg", allow_hyphen_values = true)]
        pose_args: Vec<String>,

        /// Seed for --source synthetic
        #[arg(long, default_value = "7")]
        seed: u64,

        /// JSON file overriding detector thresholds
        #[arg(long, env = "REPCOACH_DETECTOR_CONFIG")]
        detector_config: Option<PathBuf>,
    },

    /// Log a session by hand
    Log {
        exercise: String,

        /// Reps, or seconds for plank
        reps: u32,

        /// Session duration in seconds
        #[arg(short, long, default_value = "0")]
        duration: u32,
    },

    /// List session history
    History {
        /// Only these exercises (repeatable)
        #[arg(short, long)]
        exercise: Vec<String>,

        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Write the filtered history to a CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show totals and per-exercise statistics
    Dashboard,

    /// Next-session targets and a 7-day mini plan
    Recommend {
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Save the mini plan as CSV
        #[arg(long)]
        plan_csv: Option<PathBuf>,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Form tips for an exercise
    Tips {
        exercise: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        camera: Option<u32>,
        #[arg(long)]
        beep: Option<bool>,
        #[arg(long)]
        voice: Option<bool>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        target: Option<u32>,
        /// Pause between frames in milliseconds
        #[arg(long)]
        frame_interval: Option<u64>,
    },
}

fn open_store(kind: StoreKind, paths: &DataPaths) -> Result<Box<dyn SessionStore>> {
    Ok(match kind {
        StoreKind::Csv => Box::new(CsvLog::new(paths.sessions_csv())),
        StoreKind::Sqlite => {
            std::fs::create_dir_all(&paths.dir)
                .with_context(|| format!("creating {}", paths.dir.display()))?;
            Box::new(Database::open(paths.sessions_db())?)
        }
    })
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let paths = DataPaths::new(&cli.data_dir);
    let settings = Settings::load(&paths.settings())?;

    match cli.command {
        Some(Commands::Track {
            exercise,
            target,
            source,
            input,
            pose_command,
            pose_args,
            seed,
            detector_config,
        }) => {
            let exercise: Exercise = exercise.parse()?;
            let target = target.unwrap_or(settings.default_target);
            let config = DetectorConfig::for_session(detector_config.as_deref(), &settings)?;

            let mut frames: Box<dyn FrameSource> = match source {
                SourceKind::Camera => {
                    let args = if pose_args.is_empty() {
                        vec!["--camera".to_string(), CAMERA_PLACEHOLDER.to_string()]
                    } else {
                        pose_args
                    };
                    Box::new(CommandSource::new(pose_command, args, settings.camera_index))
                }
                SourceKind::Replay => {
                    let Some(path) = input else {
                        bail!("--source replay needs --input <FILE>");
                    };
                    Box::new(JsonLinesSource::from_path(path))
                }
                SourceKind::Synthetic => {
                    let cycles = if exercise.is_timed() { target + 1 } else { target };
                    Box::new(SyntheticSource::new(exercise, seed).cycles(cycles))
                }
            };

            let store = open_store(cli.store, &paths)?;
            track(exercise, target, config, &settings, frames.as_mut(), store.as_ref())?;
        }

        Some(Commands::Log { exercise, reps, duration }) => {
            let exercise: Exercise = exercise.parse()?;
            let session = ExerciseSession::completed_now(settings.user_name.clone(), exercise, reps, duration);
            open_store(cli.store, &paths)?.append(&session)?;
            println!(
                "Logged: {} - {} {} ({}s)",
                exercise,
                reps,
                exercise.unit(),
                duration
            );
        }

        Some(Commands::History {
            exercise,
            from,
            to,
            limit,
            export,
        }) => {
            let exercises = exercise
                .iter()
                .map(|e| e.parse::<Exercise>())
                .collect::<Result<Vec<_>>>()?;
            let filter = HistoryFilter { exercises, from, to };
            let analytics = Analytics::new(open_store(cli.store, &paths)?.load_all()?).filtered(&filter);

            if analytics.total_sessions() == 0 {
                println!("No sessions found.");
                return Ok(());
            }

            println!("{}", analytics.summary());
            println!();
            println!("Recent sessions:");
            println!("{:-<64}", "");
            for s in analytics.newest_first().into_iter().take(limit) {
                println!(
                    "{} | {:14} | {:>5} {:4} | {:>5}s | {}",
                    s.timestamp.format("%Y-%m-%d %H:%M"),
                    s.exercise,
                    s.reps_or_seconds,
                    s.exercise.unit(),
                    s.duration_s,
                    s.name
                );
            }

            if let Some(path) = export {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                analytics.export_csv(file)?;
                println!("Exported {} sessions to {}", analytics.total_sessions(), path.display());
            }
        }

        Some(Commands::Dashboard) | None => {
            let analytics = Analytics::new(open_store(cli.store, &paths)?.load_all()?);
            dashboard(&analytics);
        }

        Some(Commands::Recommend { json, plan_csv }) => {
            let sessions = open_store(cli.store, &paths)?.load_all()?;
            let recommendation = Recommender::new(sessions).recommend();

            if json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                print_recommendation(&recommendation);
            }

            if let Some(path) = plan_csv {
                match recommendation.bundle() {
                    Some(bundle) => export_plan(&bundle.mini_plan, &path)?,
                    None => println!("Nothing to export yet."),
                }
            }
        }

        Some(Commands::Settings { action }) => match action {
            Some(SettingsAction::Set {
                camera,
                beep,
                voice,
                name,
                target,
                frame_interval,
            }) => {
                let mut updated = settings.clone();
                if let Some(camera) = camera {
                    updated.camera_index = camera;
                }
                if let Some(beep) = beep {
                    updated.beep_enabled = beep;
                }
                if let Some(voice) = voice {
                    updated.voice_enabled = voice;
                }
                if let Some(name) = name {
                    updated.user_name = name;
                }
                if let Some(target) = target {
                    updated.default_target = target.max(1);
                }
                if let Some(ms) = frame_interval {
                    updated.frame_interval_ms = ms;
                }
                updated.save(&paths.settings())?;
                println!("{}", serde_json::to_string_pretty(&updated)?);
            }
            Some(SettingsAction::Show) | None => {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
        },

        Some(Commands::Tips { exercise }) => {
            let list = match exercise {
                Some(name) => tips::tips_for(name.parse()?),
                None => tips::TIPS.iter().collect(),
            };
            for tip in list {
                let scope = tip.exercise.map(|e| e.name()).unwrap_or("All");
                println!("[{}] {}", scope, tips::format_tip(tip));
            }
        }
    }

    Ok(())
}

fn track(
    exercise: Exercise,
    target: u32,
    config: DetectorConfig,
    settings: &Settings,
    source: &mut dyn FrameSource,
    store: &dyn SessionStore,
) -> Result<()> {
    if let Some(tip) = tips::random_tip(exercise) {
        println!("{}", tips::format_tip(tip));
    }
    println!(
        "{} {} - target {} {}. Press Enter to stop.",
        exercise.category().emoji(),
        exercise,
        target,
        exercise.unit()
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut line = String::new();
            // EOF (no terminal) never stops the session
            if matches!(io::stdin().read_line(&mut line), Ok(n) if n > 0) {
                running.store(false, Ordering::SeqCst);
            }
        });
    }

    let runner = SessionRunner::new(exercise, target, config).with_settings(settings);
    let mut feedback = ConsoleFeedback::default();

    match runner.run(source, store, &mut feedback, &running)? {
        SessionOutcome::Completed(session) => {
            println!(
                "Target reached: {} {} in {}s. Saved.",
                session.reps_or_seconds,
                exercise.unit(),
                session.duration_s
            );
        }
        SessionOutcome::Stopped { counter } => {
            println!("Stopped at {} {}. Nothing saved.", counter, exercise.unit());
        }
        SessionOutcome::SourceEnded { counter } => {
            println!("Frame not received, stopping at {} {}.", counter, exercise.unit());
        }
        SessionOutcome::SourceUnavailable(reason) => {
            println!("Could not open the camera: {}", reason);
        }
    }
    Ok(())
}

fn dashboard(analytics: &Analytics) {
    println!("Training Dashboard");
    println!("{:-<40}", "");
    println!("Sessions:      {}", analytics.total_sessions());
    println!("Reps/seconds:  {}", analytics.total_volume());
    println!("Calories:      {}", analytics.total_calories());
    println!("Duration:      {} min", analytics.total_duration_secs() / 60);
    println!("Frequency:     {:.1} sessions/week", analytics.weekly_frequency());

    if analytics.total_sessions() == 0 {
        return;
    }

    println!();
    println!("By exercise:");
    let averages = analytics.average_by_exercise();
    for ((exercise, total), (_, avg)) in analytics.volume_by_exercise().into_iter().zip(averages) {
        println!(
            "  {} {:14} total {:>6}  avg {:>6.1} {}",
            exercise.category().emoji(),
            exercise.name(),
            total,
            avg,
            exercise.unit()
        );
    }

    println!();
    println!("Last days:");
    let days = analytics.daily_totals();
    for (day, total) in days.iter().rev().take(7).rev() {
        println!("  {} {:>6}", day.format("%Y-%m-%d"), total);
    }
}

fn print_recommendation(recommendation: &Recommendation) {
    let Some(bundle) = recommendation.bundle() else {
        println!("{}", recommendation.note());
        return;
    };

    println!("{}", bundle.summary_text());
    println!();
    println!(
        "{:14} {:>7} {:>7} {:>7} {:>7}",
        "Exercise", "Avg", "Median", "Trend", "Next"
    );
    for insight in &bundle.insights {
        println!(
            "{:14} {:>7.1} {:>7.1} {:>+7.2} {:>7}",
            insight.exercise.name(),
            insight.avg,
            insight.med,
            insight.trend,
            insight.next_target
        );
    }

    println!();
    println!("Mini plan:");
    for entry in &bundle.mini_plan {
        println!(
            "  {} {:14} {:>4} {} - {}",
            entry.date.format("%a %Y-%m-%d"),
            entry.exercise.name(),
            entry.target,
            entry.exercise.unit(),
            entry.note
        );
    }
    println!();
    println!("{}", bundle.note);
    info!("Recommendation shown for {} exercises", bundle.insights.len());
}
