use anyhow::Result;
use workout_planner_lib::{
    attach_editing_controls, exercise_label, render_plan, Catalog, CatalogEntry, Control, DayBody,
    DayKind, Dosage, EditController, EditError, EditState, EditSubmission, ExerciseFields,
    MeasurementKind, PlanStore, REST_PLACEHOLDER,
};

const SAMPLE_PLAN: &str = r#"{
    "jours": [
        {
            "type": "workout",
            "nomJour": "Day 1",
            "exercices": [
                { "nom": "Squat", "series": 3, "repetitions": 10 }
            ]
        },
        { "type": "rest", "nomJour": "Day 2" }
    ]
}"#;

// Helper to build a loaded store plus the reference catalog
fn create_test_store() -> Result<(PlanStore, Catalog)> {
    let mut store = PlanStore::new();
    store.load(SAMPLE_PLAN)?;
    Ok((store, test_catalog()))
}

fn test_catalog() -> Catalog {
    Catalog::new(vec![
        CatalogEntry {
            id: 1,
            name: "Squat".to_string(),
            measurement_kind: MeasurementKind::Repetitions,
            image: None,
        },
        CatalogEntry {
            id: 4,
            name: "Planche".to_string(),
            measurement_kind: MeasurementKind::Time,
            image: None,
        },
        CatalogEntry {
            id: 2,
            name: "Pompes".to_string(),
            measurement_kind: MeasurementKind::Repetitions,
            image: Some("pompes.jpg".to_string()),
        },
    ])
}

#[test]
fn test_load_and_render_sample_plan() -> Result<()> {
    let (store, _) = create_test_store()?;

    let view = render_plan(store.plan());
    assert_eq!(view.days.len(), 2);

    let day1 = &view.days[0];
    assert_eq!(day1.css_class, "workout-day");
    assert_eq!(day1.title, "Day 1");
    match &day1.body {
        DayBody::Workout { exercises, .. } => {
            assert_eq!(exercises.len(), 1);
            assert_eq!(exercises[0].name, "Squat");
            assert_eq!(exercises[0].dosage_label, "3 séries × 10 répétitions");
        }
        DayBody::Rest { .. } => panic!("Day 1 should be a workout day"),
    }

    let day2 = &view.days[1];
    assert_eq!(day2.css_class, "rest-day");
    match &day2.body {
        DayBody::Rest { placeholder } => assert_eq!(*placeholder, REST_PLACEHOLDER),
        DayBody::Workout { .. } => panic!("Day 2 should be a rest day"),
    }

    Ok(())
}

#[test]
fn test_dosage_is_exactly_one_of_reps_or_duration() {
    // Both set: rejected
    let both = r#"{"jours":[{"type":"workout","nomJour":"D","exercices":[
        {"nom":"Squat","series":3,"repetitions":10,"duree_minutes":5}]}]}"#;
    let mut store = PlanStore::new();
    assert!(store.load(both).is_err());

    // Neither set: rejected
    let neither = r#"{"jours":[{"type":"workout","nomJour":"D","exercices":[
        {"nom":"Squat","series":3}]}]}"#;
    assert!(store.load(neither).is_err());

    // A malformed load leaves the store clean for the raw-text fallback
    assert!(!store.is_dirty());
    assert!(store.plan().is_empty());
}

#[test]
fn test_wire_round_trip_keeps_single_dosage() -> Result<()> {
    let (store, _) = create_test_store()?;
    let json = serde_json::to_string(store.plan())?;
    assert!(json.contains("\"repetitions\":10"));
    assert!(!json.contains("duree_minutes"));

    let mut reloaded = PlanStore::new();
    reloaded.load(&json)?;
    assert_eq!(reloaded.plan().days[0].exercises[0].dosage, Dosage::Repetitions(10));
    Ok(())
}

#[test]
fn test_label_is_pure_function_of_record() -> Result<()> {
    let (store, _) = create_test_store()?;
    let record = &store.plan().days[0].exercises[0];

    let direct = exercise_label(record);
    let rendered = match &render_plan(store.plan()).days[0].body {
        DayBody::Workout { exercises, .. } => exercises[0].dosage_label.clone(),
        DayBody::Rest { .. } => unreachable!(),
    };
    assert_eq!(direct, rendered);
    Ok(())
}

#[test]
fn test_attach_editing_controls_is_idempotent() -> Result<()> {
    let (store, _) = create_test_store()?;
    let mut view = render_plan(store.plan());

    attach_editing_controls(&mut view);
    attach_editing_controls(&mut view);

    match &view.days[0].body {
        DayBody::Workout {
            exercises,
            add_control,
        } => {
            assert!(*add_control);
            assert_eq!(
                exercises[0].controls,
                vec![Control::Edit, Control::Delete],
                "repeated attachment must leave exactly one set of controls"
            );
        }
        DayBody::Rest { .. } => unreachable!(),
    }
    Ok(())
}

#[test]
fn test_edit_to_time_based_entry() -> Result<()> {
    let (mut store, catalog) = create_test_store()?;
    let mut editor = EditController::new();

    let day = store.day_id_at(0).unwrap();
    let ex = store.exercise_id_at(day, 0).unwrap();

    // Pre-population comes from the stored record, not from rendered text
    let form = editor.begin_edit(&store, &catalog, day, ex)?.clone();
    assert_eq!(form.name, "Squat");
    assert_eq!(form.sets, 3);
    assert_eq!(form.repetitions, Some(10));
    assert_eq!(form.measurement, Some(MeasurementKind::Repetitions));

    let view = editor.submit_edit(
        &mut store,
        &catalog,
        day,
        ex,
        EditSubmission {
            name: "planche".to_string(), // case-insensitive catalog match
            sets: 2,
            repetitions: None,
            duration_minutes: Some(5),
        },
    )?;
    assert_eq!(view.dosage_label, "2 séries × 5 min");

    let record = store.exercise(day, ex).unwrap();
    assert_eq!(record.name, "Planche"); // canonical catalog casing
    assert_eq!(record.sets, 2);
    assert_eq!(record.dosage, Dosage::Duration(5));
    assert_eq!(record.dosage.repetitions(), None);
    assert!(store.is_dirty());
    assert!(editor.take_plan_modified());

    let json = serde_json::to_string(store.plan())?;
    assert!(json.contains("\"duree_minutes\":5"));
    assert!(!json.contains("repetitions"));
    Ok(())
}

#[test]
fn test_edit_without_catalog_selection_is_rejected() -> Result<()> {
    let (mut store, catalog) = create_test_store()?;
    let mut editor = EditController::new();

    let day = store.day_id_at(0).unwrap();
    let ex = store.exercise_id_at(day, 0).unwrap();
    let before = store.plan().clone();

    editor.begin_edit(&store, &catalog, day, ex)?;
    let result = editor.submit_edit(
        &mut store,
        &catalog,
        day,
        ex,
        EditSubmission {
            name: "  ".to_string(),
            sets: 3,
            repetitions: Some(10),
            duration_minutes: None,
        },
    );
    assert_eq!(result.unwrap_err(), EditError::MissingSelection);

    // Aborted transition: store unchanged, element still editing
    assert_eq!(*store.plan(), before);
    assert!(!store.is_dirty());
    assert_eq!(editor.state(day, ex), EditState::Editing);
    Ok(())
}

#[test]
fn test_dosage_gated_by_measurement_kind() -> Result<()> {
    let (mut store, catalog) = create_test_store()?;
    let mut editor = EditController::new();

    let day = store.day_id_at(0).unwrap();
    let ex = store.exercise_id_at(day, 0).unwrap();
    editor.begin_edit(&store, &catalog, day, ex)?;

    // Time-kind entry rejects a reps-only submission
    let result = editor.submit_edit(
        &mut store,
        &catalog,
        day,
        ex,
        EditSubmission {
            name: "Planche".to_string(),
            sets: 2,
            repetitions: Some(10),
            duration_minutes: None,
        },
    );
    assert_eq!(
        result.unwrap_err(),
        EditError::ExpectedDuration("Planche".to_string())
    );

    // Repetition-kind entry rejects a duration-only submission
    let result = editor.submit_edit(
        &mut store,
        &catalog,
        day,
        ex,
        EditSubmission {
            name: "Squat".to_string(),
            sets: 2,
            repetitions: None,
            duration_minutes: Some(5),
        },
    );
    assert_eq!(
        result.unwrap_err(),
        EditError::ExpectedRepetitions("Squat".to_string())
    );

    // Both inputs at once never validate
    let result = editor.submit_edit(
        &mut store,
        &catalog,
        day,
        ex,
        EditSubmission {
            name: "Squat".to_string(),
            sets: 2,
            repetitions: Some(10),
            duration_minutes: Some(5),
        },
    );
    assert_eq!(result.unwrap_err(), EditError::AmbiguousDosage);

    assert!(!store.is_dirty());
    Ok(())
}

#[test]
fn test_delete_last_exercise_then_re_add() -> Result<()> {
    let (mut store, catalog) = create_test_store()?;
    let mut editor = EditController::new();

    let day = store.day_id_at(0).unwrap();
    let ex = store.exercise_id_at(day, 0).unwrap();

    // Unconfirmed deletion is refused
    assert_eq!(
        editor.delete_exercise(&mut store, day, ex, false),
        Err(EditError::NotConfirmed)
    );

    let emptied = editor.delete_exercise(&mut store, day, ex, true)?;
    assert!(emptied);
    assert!(store.day(day).unwrap().exercises.is_empty());

    // Emptied day still renders a visible add affordance
    let mut view = render_plan(store.plan());
    attach_editing_controls(&mut view);
    match &view.days[0].body {
        DayBody::Workout {
            exercises,
            add_control,
        } => {
            assert!(exercises.is_empty());
            assert!(*add_control);
        }
        DayBody::Rest { .. } => unreachable!(),
    }

    // Re-adding restores a one-exercise list
    let form = editor.begin_add(&store, &catalog, day)?.clone();
    assert_eq!(form.name, "Squat"); // pre-populated from the catalog
    let (new_id, view) = editor.submit_add(
        &mut store,
        &catalog,
        day,
        EditSubmission {
            name: "Pompes".to_string(),
            sets: 3,
            repetitions: Some(12),
            duration_minutes: None,
        },
    )?;
    assert_eq!(view.dosage_label, "3 séries × 12 répétitions");
    assert_eq!(store.day(day).unwrap().exercises.len(), 1);
    assert_eq!(store.exercise(day, new_id).unwrap().name, "Pompes");
    Ok(())
}

#[test]
fn test_rest_day_never_renders_exercises() -> Result<()> {
    // A rest day carrying exercises in the payload is normalized on load
    let payload = r#"{"jours":[{"type":"rest","nomJour":"Repos","exercices":[
        {"nom":"Squat","series":3,"repetitions":10}]}]}"#;
    let mut store = PlanStore::new();
    store.load(payload)?;

    let day = store.day_id_at(0).unwrap();
    assert!(store.day(day).unwrap().exercises.is_empty());
    match &render_plan(store.plan()).days[0].body {
        DayBody::Rest { placeholder } => assert_eq!(*placeholder, REST_PLACEHOLDER),
        DayBody::Workout { .. } => panic!("rest day rendered as workout"),
    }

    // And the add path refuses rest days outright
    let catalog = test_catalog();
    let mut editor = EditController::new();
    assert_eq!(
        editor.begin_add(&store, &catalog, day).unwrap_err(),
        EditError::RestDay
    );
    assert!(store.add_exercise(
        day,
        ExerciseFields {
            name: "Squat".to_string(),
            sets: 3,
            dosage: Dosage::Repetitions(10),
        }
    ).is_none());
    Ok(())
}

#[test]
fn test_stale_references_are_no_ops() -> Result<()> {
    let (mut store, _) = create_test_store()?;

    let day = store.day_id_at(0).unwrap();
    let ex = store.exercise_id_at(day, 0).unwrap();
    let other_day = store.day_id_at(1).unwrap();

    // The exercise lives on day 1, not day 2
    assert!(!store.update_exercise(
        other_day,
        ex,
        ExerciseFields {
            name: "Squat".to_string(),
            sets: 5,
            dosage: Dosage::Repetitions(5),
        }
    ));
    assert!(!store.remove_exercise(other_day, ex));
    assert!(!store.is_dirty());

    // Removing twice: the second call no-ops
    assert!(store.remove_exercise(day, ex));
    assert!(!store.remove_exercise(day, ex));
    Ok(())
}

#[test]
fn test_day_kind_strings() {
    assert_eq!(DayKind::Rest.to_string(), "rest");
    assert_eq!(DayKind::Workout.to_string(), "workout");
}

#[test]
fn test_catalog_lookup_is_case_insensitive_exact() {
    let catalog = test_catalog();
    assert_eq!(catalog.find_by_name("sQuAt").map(|e| e.id), Some(1));
    assert_eq!(catalog.find_by_name(" Planche ").map(|e| e.id), Some(4));
    assert!(catalog.find_by_name("Squats").is_none()); // exact, not prefix
    assert!(catalog.find_by_name("").is_none());
}
