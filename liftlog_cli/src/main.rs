use clap::{Parser, Subcommand};
use liftlog_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Workout session tracker: run routines, log sets, keep history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Whose data to use (defaults to profile.user from the config)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Show debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active workout (default)
    Status,

    /// List available routines
    Routines,

    /// Merge routines and exercises from a library JSON file
    Import {
        /// Library document with `routines` and/or `exercises`
        file: PathBuf,
    },

    /// Start a workout from a routine (replaces an unfinished one)
    Start {
        routine_id: String,
    },

    /// Log the current exercise's sets and move on
    Log {
        /// One entry per set, written REPSxWEIGHT (e.g. 10x50) or REPS
        #[arg(required = true, allow_hyphen_values = true)]
        sets: Vec<String>,
    },

    /// Save the finished workout to history
    Finish,

    /// Discard the active workout without saving it
    Abandon,

    /// List finished workouts
    History {
        /// Number of most recent workouts to show (0 for all)
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show every set of one finished workout
    Show {
        /// Workout id as printed by `history`
        id: uuid::Uuid,
    },

    /// Export every logged set to CSV
    Export {
        output: PathBuf,
    },
}

struct App {
    config: Config,
    paths: UserPaths,
}

impl App {
    fn engine(&self) -> SessionEngine<FileSessionStore> {
        let mut engine = SessionEngine::new(FileSessionStore::for_user(&self.paths));
        engine.resume();
        engine
    }

    fn library(&self) -> Result<UserLibrary> {
        UserLibrary::load(&self.paths.library())
    }

    fn units(&self, library: &UserLibrary) -> String {
        library
            .units()
            .unwrap_or(&self.config.profile.units)
            .to_string()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        liftlog_core::logging::init_with_level("debug");
    } else {
        liftlog_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.is_retriable() {
                eprintln!("Your workout is unchanged; try again.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let user = cli.user.unwrap_or_else(|| config.profile.user.clone());
    let app = App {
        paths: UserPaths::new(&data_dir, &user),
        config,
    };
    tracing::debug!("Using data for {:?} at {:?}", user, app.paths.root());

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => cmd_status(&app),
        Commands::Routines => cmd_routines(&app),
        Commands::Import { file } => cmd_import(&app, &file),
        Commands::Start { routine_id } => cmd_start(&app, &routine_id),
        Commands::Log { sets } => cmd_log(&app, &sets),
        Commands::Finish => cmd_finish(&app),
        Commands::Abandon => cmd_abandon(&app),
        Commands::History { limit } => cmd_history(&app, limit),
        Commands::Show { id } => cmd_show(&app, id),
        Commands::Export { output } => cmd_export(&app, &output),
    }
}

fn cmd_status(app: &App) -> Result<()> {
    let engine = app.engine();
    let library = app.library()?;

    match (engine.status(), engine.session()) {
        (SessionStatus::SubmissionInProgress, _) => {
            println!("Workout is being saved right now.");
        }
        (_, Some(session)) => display_session(session, &app.units(&library)),
        (_, None) => {
            println!("No active workout. Start one with `liftlog start <routine-id>`.");
        }
    }
    Ok(())
}

fn cmd_routines(app: &App) -> Result<()> {
    let library = app.library()?;
    if library.routines.is_empty() {
        println!("No routines yet. Add some with `liftlog import <file>`.");
        return Ok(());
    }

    let units = app.units(&library);
    let catalog = library.catalog();
    for routine in &library.routines {
        let count = routine.exercises.len();
        println!(
            "{}  {} ({} exercise{})",
            routine.id,
            routine.name,
            count,
            if count == 1 { "" } else { "s" }
        );
        for ex in &routine.exercises {
            println!(
                "    {}: {}×{} @ {} {}",
                catalog.resolve(&ex.exercise_id),
                ex.target_sets,
                ex.target_reps,
                format_number(ex.target_weight),
                units
            );
        }
    }
    Ok(())
}

fn cmd_import(app: &App, file: &std::path::Path) -> Result<()> {
    let report = UserLibrary::import_from(&app.paths.library(), file)?;
    println!(
        "✓ Imported {} new routine(s), updated {}; {} new exercise(s), updated {}",
        report.routines_added,
        report.routines_replaced,
        report.exercises_added,
        report.exercises_replaced
    );
    Ok(())
}

fn cmd_start(app: &App, routine_id: &str) -> Result<()> {
    let library = app.library()?;
    let mut engine = app.engine();

    let unfinished = engine
        .session()
        .map(|s| (s.routine_name.clone(), s.current_index, s.len()));

    let session = engine.start_routine(&library, &library.catalog(), routine_id)?;

    if let Some((name, logged, total)) = unfinished {
        println!(
            "Replacing unfinished workout \"{}\" ({} of {} exercises logged).",
            name, logged, total
        );
    }
    display_session(session, &app.units(&library));
    Ok(())
}

fn cmd_log(app: &App, specs: &[String]) -> Result<()> {
    let library = app.library()?;
    let mut engine = app.engine();
    if engine.session().is_none() {
        return Err(Error::NoActiveSession);
    }

    let sets = sets_from_inputs(specs.iter().map(|s| parse_set_spec(s)));
    let session = engine.log_current_exercise(sets)?;

    let logged = &session.exercise_logs[session.current_index - 1];
    println!(
        "✓ Logged {}: {} sets, {} {} volume",
        logged.exercise_name,
        logged.sets_completed.len(),
        format_number(logged.volume()),
        app.units(&library)
    );
    println!();
    display_session(session, &app.units(&library));
    Ok(())
}

fn cmd_finish(app: &App) -> Result<()> {
    let library = app.library()?;
    let mut engine = app.engine();
    let mut reporter = AggregationReporter::new(JsonlWorkoutLog::new(
        app.paths.workout_log(),
        app.config.submission.timeout(),
    ));

    let done = reporter.finalize(&mut engine)?;
    println!("✓ Workout saved: {}", done.entry.routine_name);
    println!();
    display_summary(&done.summary, &app.units(&library));
    Ok(())
}

fn cmd_abandon(app: &App) -> Result<()> {
    let mut engine = app.engine();
    let name = engine.session().map(|s| s.routine_name.clone());
    engine.abandon()?;

    match name {
        Some(name) => println!("Discarded workout \"{}\".", name),
        None => println!("No active workout."),
    }
    Ok(())
}

fn cmd_history(app: &App, limit: usize) -> Result<()> {
    let library = app.library()?;
    let units = app.units(&library);
    let entries = load_recent_entries(&app.paths.workout_log(), limit)?;

    if entries.is_empty() {
        println!("No finished workouts yet.");
        return Ok(());
    }

    for entry in entries.iter().rev() {
        let summary = summarize_entry(entry);
        println!(
            "{}  {}  {}: {} exercises · {} sets · {} {} volume",
            entry.id,
            entry
                .completed_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            entry.routine_name,
            summary.exercise_count,
            summary.total_sets,
            format_number(summary.total_volume),
            units
        );
    }
    Ok(())
}

fn cmd_show(app: &App, id: uuid::Uuid) -> Result<()> {
    let library = app.library()?;
    let units = app.units(&library);
    let entry = history::find_entry(&app.paths.workout_log(), id)?;

    println!("{}", entry.routine_name);
    println!(
        "  {} → {}",
        entry.started_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
        entry.completed_at.with_timezone(&chrono::Local).format("%H:%M")
    );
    for exercise in &entry.exercises {
        println!();
        println!(
            "  {} (target {}×{})",
            exercise.exercise_name, exercise.target_sets, exercise.target_reps
        );
        for set in &exercise.sets_completed {
            println!(
                "    Set {}: {} reps @ {} {}",
                set.set_number,
                set.reps_completed,
                format_number(set.weight_used),
                units
            );
        }
    }
    println!();
    display_summary(&summarize_entry(&entry), &units);
    Ok(())
}

fn cmd_export(app: &App, output: &std::path::Path) -> Result<()> {
    let count = export_csv(&app.paths.workout_log(), output)?;
    println!("✓ Exported {} sets to {}", count, output.display());
    Ok(())
}

/// Split `10x50` into reps and weight. Anything unparsable is left for
/// the core to coerce to zero.
fn parse_set_spec(spec: &str) -> (String, String) {
    match spec.split_once(['x', 'X', '@']) {
        Some((reps, weight)) => (reps.to_string(), weight.to_string()),
        None => (spec.to_string(), String::new()),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn display_session(session: &Session, units: &str) {
    println!("╭─────────────────────────────────────────╮");
    println!("│  {}", session.routine_name);
    println!("╰─────────────────────────────────────────╯");

    let (logged, total) = session.progress();
    match session.current_exercise() {
        None => {
            println!("  All done! {} of {} exercises logged.", logged, total);
            println!("  Run `liftlog finish` to save this workout.");
        }
        Some(current) => {
            println!("  Exercise {} of {}: {}", logged + 1, total, current.exercise_name);
            println!(
                "  Target: {} sets × {} reps",
                current.target_sets, current.target_reps
            );
            println!(
                "  Log with: liftlog log {}",
                vec![format!("{}x<{}>", current.target_reps, units); current.target_sets as usize]
                    .join(" ")
            );

            let upcoming = session.upcoming();
            if !upcoming.is_empty() {
                println!();
                println!("  Up next:");
                for ex in upcoming {
                    println!("    {}  {}×{}", ex.exercise_name, ex.target_sets, ex.target_reps);
                }
            }
        }
    }
}

fn display_summary(summary: &WorkoutSummary, units: &str) {
    for ex in &summary.exercises {
        println!(
            "  {}: {} sets · {} {} volume",
            ex.exercise_name,
            ex.sets,
            format_number(ex.volume),
            units
        );
    }
    println!();
    println!(
        "  {} exercises · {} sets · {} {} total volume",
        summary.exercise_count,
        summary.total_sets,
        format_number(summary.total_volume),
        units
    );
}
