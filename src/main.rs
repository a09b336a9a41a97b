//src/main.rs
mod cli; // Keep cli module for parsing args

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::{stdin, stdout, Write};

use workout_planner_lib::{
    parse_color, DayBody, EditError, EditSubmission, GenerateRequest, GeneratedProgram,
    PlanService, PlanView, ProductSuggestion, SaveOutcome, SyncError, EMPTY_DAY_PLACEHOLDER,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args();
    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    // Initialize the service (loads config and the working plan document)
    let mut service = PlanService::initialize().context("Failed to initialize plan service")?;
    let header_color = header_color(&service);

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Generate {
            age,
            height,
            weight,
            difficulty,
            max_session_duration,
            max_workout_days,
            gym,
            equipment_list,
        } => {
            let request = GenerateRequest {
                age,
                height,
                weight,
                difficulty,
                max_session_duration,
                max_workout_days,
                gym,
                equipment_list,
            };
            let outcome = match service.generate(&request).await {
                Ok(outcome) => outcome,
                Err(e) => return Err(map_auth_error(e)),
            };
            match outcome.program {
                GeneratedProgram::Structured => {
                    println!("Generated plan:");
                    print_plan(&service.view(), header_color);
                    println!("Working copy: {}", service.get_plan_path().display());
                }
                GeneratedProgram::Text(text) => {
                    println!("The generator returned an unstructured program:\n");
                    println!("{text}");
                }
            }
            print_products(&outcome.products);
        }
        cli::Commands::Show => {
            if !service.has_plan() {
                bail!("No plan loaded. Run 'generate' first.");
            }
            print_plan(&service.view(), header_color);
        }
        cli::Commands::EditExercise {
            day,
            exercise,
            name,
            sets,
            reps,
            duration,
        } => {
            if !service.has_plan() {
                bail!("No plan loaded. Run 'generate' first.");
            }
            service
                .ensure_catalog()
                .await
                .context("Failed to load the exercise catalog")?;
            let day_id = service.resolve_day(day)?;
            let ex_id = service.resolve_exercise(day_id, exercise)?;

            // The form opens pre-populated from the stored record; flags
            // overlay it.
            let form = service
                .begin_edit(day_id, ex_id)
                .map_err(|e| anyhow::anyhow!(e))?;
            let mut submission = form.submission();
            if let Some(n) = name {
                submission.name = n;
            }
            if let Some(s) = sets {
                submission.sets = s;
            }
            if reps.is_some() || duration.is_some() {
                submission.repetitions = reps;
                submission.duration_minutes = duration;
            }

            match service.submit_edit(day_id, ex_id, submission) {
                Ok(view) => {
                    println!("Updated: {} — {}", view.name, view.dosage_label);
                    report_sync(service.sync_if_modified().await?);
                }
                Err(e) => {
                    // The edit form stays open server-side of the state
                    // machine; for the CLI that just means nothing changed.
                    service.cancel_edit(day_id, ex_id);
                    bail!("Edit rejected: {e}");
                }
            }
        }
        cli::Commands::AddExercise {
            day,
            name,
            sets,
            reps,
            duration,
        } => {
            if !service.has_plan() {
                bail!("No plan loaded. Run 'generate' first.");
            }
            service
                .ensure_catalog()
                .await
                .context("Failed to load the exercise catalog")?;
            let day_id = service.resolve_day(day)?;
            service.begin_add(day_id).map_err(|e| anyhow::anyhow!(e))?;
            let submission = EditSubmission {
                name,
                sets,
                repetitions: reps,
                duration_minutes: duration,
            };
            match service.submit_add(day_id, submission) {
                Ok((_, view)) => {
                    println!("Added: {} — {}", view.name, view.dosage_label);
                    report_sync(service.sync_if_modified().await?);
                }
                Err(e) => {
                    service.cancel_add(day_id);
                    bail!("Add rejected: {e}");
                }
            }
        }
        cli::Commands::DeleteExercise { day, exercise, yes } => {
            if !service.has_plan() {
                bail!("No plan loaded. Run 'generate' first.");
            }
            let day_id = service.resolve_day(day)?;
            let ex_id = service.resolve_exercise(day_id, exercise)?;
            let record = service
                .plan()
                .days
                .iter()
                .find(|d| d.id == day_id)
                .and_then(|d| d.exercises.iter().find(|e| e.id == ex_id))
                .map(|e| e.name.clone())
                .unwrap_or_else(|| format!("exercise {exercise}"));

            let confirmed = yes || !service.config.confirm_delete || confirm_delete(&record)?;
            match service.delete_exercise(day_id, ex_id, confirmed) {
                Ok(emptied) => {
                    println!("Deleted '{record}'.");
                    if emptied {
                        println!("Day {day} has no exercises left; use 'add-exercise {day}' to add one.");
                    }
                    report_sync(service.sync_if_modified().await?);
                }
                Err(EditError::NotConfirmed) => {
                    println!("Deletion cancelled.");
                }
                Err(e) => bail!("Delete failed: {e}"),
            }
        }
        cli::Commands::Save => {
            if !service.has_plan() {
                bail!("No plan loaded. Run 'generate' first.");
            }
            match service.persist_plan().await? {
                None => println!("No unsaved changes."),
                Some(outcome) => report_sync(Some(outcome)),
            }
        }
        cli::Commands::Catalog => {
            let catalog = service
                .ensure_catalog()
                .await
                .context("Failed to load the exercise catalog")?;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    Cell::new("ID").fg(header_color).add_attribute(Attribute::Bold),
                    Cell::new("Exercise").fg(header_color).add_attribute(Attribute::Bold),
                    Cell::new("Measured in").fg(header_color).add_attribute(Attribute::Bold),
                ]);
            for entry in catalog.entries() {
                table.add_row(vec![
                    Cell::new(entry.id),
                    Cell::new(&entry.name),
                    Cell::new(entry.measurement_kind),
                ]);
            }
            println!("{table}");
        }
        cli::Commands::CheckAuth => match service.check_auth().await {
            Ok(status) if status.authenticated => {
                println!(
                    "Authenticated as {}.",
                    status.user.as_deref().unwrap_or("(unknown user)")
                );
            }
            Ok(_) => println!("Not authenticated."),
            Err(e) => bail!("Auth check failed: {e}"),
        },
        cli::Commands::SetServer { url } => {
            let cleared = url.is_none();
            service.set_server_url(url)?;
            if cleared {
                println!("Server URL cleared; using the default.");
            } else {
                println!(
                    "Server URL set to {}.",
                    service.config.server_url.as_deref().unwrap_or_default()
                );
            }
        }
        cli::Commands::ConfigPath => {
            println!("{}", service.get_config_path().display());
        }
        cli::Commands::PlanPath => {
            println!("{}", service.get_plan_path().display());
        }
    }

    Ok(())
}

fn header_color(service: &PlanService) -> Color {
    parse_color(&service.config.theme.header_color)
        .map(Color::from)
        .unwrap_or(Color::Green)
}

/// Surfaces the 401 case as a login hint instead of a bare error chain.
fn map_auth_error(e: anyhow::Error) -> anyhow::Error {
    match e.downcast_ref::<SyncError>() {
        Some(SyncError::NotAuthenticated) => {
            anyhow::anyhow!("Not authenticated. Log in on the website, then retry.")
        }
        _ => e,
    }
}

fn confirm_delete(name: &str) -> Result<bool> {
    print!("Delete '{name}'? (y/N): ");
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn report_sync(outcome: Option<SaveOutcome>) {
    match outcome {
        Some(SaveOutcome::Saved) => println!("✅ Programme sauvegardé"),
        Some(SaveOutcome::Failed) => {
            println!("Save failed; changes are kept locally and will be retried on the next edit.");
        }
        Some(SaveOutcome::Superseded) | None => {}
    }
}

fn print_plan(view: &PlanView, header_color: Color) {
    for day in &view.days {
        println!("\n{} [{}]", day.title, day.css_class);
        match &day.body {
            DayBody::Rest { placeholder } => println!("  {placeholder}"),
            DayBody::Workout {
                exercises,
                add_control,
            } => {
                if exercises.is_empty() {
                    print!("  {EMPTY_DAY_PLACEHOLDER}.");
                    if *add_control {
                        print!(" [+ Ajouter un exercice]");
                    }
                    println!();
                    continue;
                }
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec![
                        Cell::new("#").fg(header_color).add_attribute(Attribute::Bold),
                        Cell::new("Exercice").fg(header_color).add_attribute(Attribute::Bold),
                        Cell::new("Dosage").fg(header_color).add_attribute(Attribute::Bold),
                    ]);
                for (i, ex) in exercises.iter().enumerate() {
                    table.add_row(vec![
                        Cell::new(i + 1),
                        Cell::new(&ex.name),
                        Cell::new(&ex.dosage_label),
                    ]);
                }
                println!("{table}");
            }
        }
    }
}

fn print_products(products: &[ProductSuggestion]) {
    if products.is_empty() {
        return;
    }
    println!("\nSuggested gear:");
    for product in products {
        println!("  - {}: {}", product.name, product.description);
        if !product.link.is_empty() && product.link != "#" {
            println!("    {}", product.link);
        }
    }
}
