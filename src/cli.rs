// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate, edit and sync workout plans", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Request a generated plan from the backend
    Generate {
        #[arg(long)]
        age: u32,
        /// Height in centimeters
        #[arg(long)]
        height: u32,
        /// Weight in kilograms
        #[arg(long)]
        weight: u32,
        /// Difficulty hint, passed through to the generator
        #[arg(long)]
        difficulty: Option<String>,
        /// Maximum session duration in minutes, passed through
        #[arg(long)]
        max_session_duration: Option<u32>,
        /// Maximum workout days per week, passed through
        #[arg(long)]
        max_workout_days: Option<u32>,
        /// Training at a gym with full equipment access
        #[arg(long)]
        gym: bool,
        /// Available equipment when not at a gym (repeatable)
        #[arg(long = "equipment", conflicts_with = "gym")]
        equipment_list: Vec<String>,
    },
    /// Display the current plan as an agenda
    Show,
    /// Edit one exercise of the current plan
    EditExercise {
        /// Day number (1-based)
        day: usize,
        /// Exercise number within the day (1-based)
        exercise: usize,
        /// New exercise name (must be a catalog entry)
        #[arg(short, long)]
        name: Option<String>,
        /// New number of sets
        #[arg(short, long)]
        sets: Option<u32>,
        /// Repetitions per set (repetition-based exercises)
        #[arg(short, long)]
        reps: Option<u32>,
        /// Duration in minutes (time-based exercises)
        #[arg(short, long)]
        duration: Option<u32>,
    },
    /// Add an exercise to a workout day
    AddExercise {
        /// Day number (1-based)
        day: usize,
        /// Exercise name (must be a catalog entry)
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value_t = 3)]
        sets: u32,
        /// Repetitions per set (repetition-based exercises)
        #[arg(short, long)]
        reps: Option<u32>,
        /// Duration in minutes (time-based exercises)
        #[arg(short, long)]
        duration: Option<u32>,
    },
    /// Remove an exercise from the plan
    DeleteExercise {
        /// Day number (1-based)
        day: usize,
        /// Exercise number within the day (1-based)
        exercise: usize,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Force a save of the current plan to the backend
    Save,
    /// List the exercise catalog
    Catalog,
    /// Show authentication state against the backend
    CheckAuth,
    /// Set (or clear, with no value) the backend URL
    SetServer { url: Option<String> },
    /// Show the path to the config file
    ConfigPath,
    /// Show the path to the working plan document
    PlanPath,
    /// Generate shell completion scripts
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
