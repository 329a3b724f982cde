use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gymlog_core::formatter;
use gymlog_core::*;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gymlog")]
#[command(about = "Conversational workout diary", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the diary: `/command` lines, `@data` button taps, other lines are text
    Chat {
        #[arg(long)]
        user: String,
    },

    /// Import a whole training in log format (reads stdin without FILE)
    Import {
        #[arg(long)]
        user: String,

        file: Option<PathBuf>,
    },

    /// Manage the exercise catalog
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },

    /// Show finished trainings
    History {
        #[arg(long)]
        user: String,

        /// First day (YYYY-MM-DD), defaults to the configured window
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD), inclusive, defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Show the per-day best weight and reps of an exercise
    Progression {
        #[arg(long)]
        user: String,

        exercise: String,
    },
}

#[derive(Subcommand)]
enum ExerciseCommands {
    /// Add an exercise to the catalog
    Add {
        name: String,
        muscle_group: String,
        equipment: String,
    },

    /// List the exercises of a muscle group
    List { muscle_group: String },

    /// Add the starter exercises that are not in the catalog yet
    Seed,
}

fn main() {
    // Initialize logging
    gymlog_core::logging::init_with_level("warn");

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    let service = Arc::new(open_service(&data_dir, &config));

    match cli.command {
        Commands::Chat { user } => cmd_chat(service, &config, &user),
        Commands::Import { user, file } => cmd_import(&service, &user, file.as_deref()),
        Commands::Exercise { command } => cmd_exercise(&service, command),
        Commands::History { user, from, to } => cmd_history(&service, &user, from, to),
        Commands::Progression { user, exercise } => cmd_progression(&service, &user, &exercise),
    }
}

fn open_service(data_dir: &Path, config: &Config) -> WorkoutService {
    let store = Arc::new(FileTrainingStore::new(data_dir));
    let cache = Arc::new(FileSessionCache::new(data_dir.join("sessions")));

    WorkoutService::new(store, cache)
        .with_history(config.history.clone())
        .with_muscle_groups(config.bot.muscle_groups.clone())
}

fn cmd_chat(service: Arc<WorkoutService>, config: &Config, user: &str) -> Result<()> {
    let router = Router::new(
        service,
        Arc::new(MemoryStateStore::new()),
        config.bot.clone(),
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut pending: Vec<String> = Vec::new();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        let event = if let Some(name) = trimmed.strip_prefix('/') {
            flush_text(&router, user, &mut pending, &mut out)?;
            Some(Inbound::Command {
                user_id: user.to_string(),
                name: name.to_string(),
            })
        } else if let Some(data) = trimmed.strip_prefix('@') {
            flush_text(&router, user, &mut pending, &mut out)?;
            Some(Inbound::Callback {
                user_id: user.to_string(),
                data: data.to_string(),
            })
        } else if trimmed.is_empty() {
            flush_text(&router, user, &mut pending, &mut out)?;
            None
        } else {
            pending.push(line.clone());
            None
        };

        if let Some(event) = event {
            tracing::debug!("Chat event: {:?}", event);
            print_reply(&mut out, &router.handle(&event))?;
        }
    }

    flush_text(&router, user, &mut pending, &mut out)?;
    Ok(())
}

/// Send accumulated text lines as one message
fn flush_text(
    router: &Router,
    user: &str,
    pending: &mut Vec<String>,
    out: &mut impl Write,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }

    let event = Inbound::Text {
        user_id: user.to_string(),
        text: pending.join("\n"),
    };
    pending.clear();
    print_reply(out, &router.handle(&event))
}

fn print_reply(out: &mut impl Write, reply: &Reply) -> Result<()> {
    writeln!(out, "{}", reply.text.trim_end())?;
    for row in &reply.buttons {
        let rendered: Vec<String> = row
            .iter()
            .map(|button| format!("[{}] @{}", button.label, button.data))
            .collect();
        writeln!(out, "{}", rendered.join("  "))?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn cmd_import(service: &WorkoutService, user: &str, file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let session = service.parse_training(user, &text)?;
    println!("{}", formatter::format_summary(&session));
    Ok(())
}

fn cmd_exercise(service: &WorkoutService, command: ExerciseCommands) -> Result<()> {
    match command {
        ExerciseCommands::Add {
            name,
            muscle_group,
            equipment,
        } => {
            let exercise = service.create_exercise(&name, &muscle_group, &equipment)?;
            println!(
                "Exercise \"{}\" added to group \"{}\" ({})",
                exercise.name(),
                exercise.muscle_group(),
                exercise.id()
            );
        }
        ExerciseCommands::List { muscle_group } => {
            let exercises = service.exercises_by_muscle_group(&muscle_group)?;
            if exercises.is_empty() {
                println!("No exercises in group \"{}\"", muscle_group);
            }
            for exercise in exercises {
                println!("{}  {} ({})", exercise.id(), exercise.name(), exercise.equipment());
            }
        }
        ExerciseCommands::Seed => {
            let added = seed_catalog(service)?;
            println!("Added {} starter exercises", added);
        }
    }
    Ok(())
}

fn cmd_history(
    service: &WorkoutService,
    user: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let from = from.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc());
    let to = to.and_then(|d| d.and_hms_opt(23, 59, 59)).map(|d| d.and_utc());

    let sessions = service.training_sessions(user, from, to)?;
    if sessions.is_empty() {
        println!("No trainings found");
        return Ok(());
    }

    print!("{}", formatter::format_training_logs(&sessions));
    Ok(())
}

fn cmd_progression(service: &WorkoutService, user: &str, exercise: &str) -> Result<()> {
    let exercise = service.exercise_by_name(exercise)?;
    let points = service.exercise_progression(user, exercise.id())?;
    if points.is_empty() {
        println!("No trainings with \"{}\" in the last year", exercise.name());
        return Ok(());
    }

    print!("{}", formatter::format_progression(&points));
    Ok(())
}
