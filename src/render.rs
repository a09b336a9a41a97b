// src/render.rs
//! Projects the canonical plan into disposable view elements. Views hold no
//! state of their own; every label is re-derived from the stored record, so
//! displayed text can never drift from the data. Rendering granularity is
//! whole-day or whole-plan, never a single-field patch.

use crate::plan::{Day, DayId, DayKind, Dosage, Exercise, ExerciseId, Plan};

pub const REST_PLACEHOLDER: &str = "Jour de repos";
pub const EMPTY_DAY_PLACEHOLDER: &str = "Aucun exercice";

/// Editing affordances attached to a view element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Edit,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseView {
    pub exercise_id: ExerciseId,
    pub name: String,
    pub dosage_label: String,
    pub controls: Vec<Control>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DayBody {
    Rest {
        placeholder: &'static str,
    },
    Workout {
        exercises: Vec<ExerciseView>,
        /// The day-scoped "add exercise" affordance.
        add_control: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayView {
    pub day_id: DayId,
    pub title: String,
    pub css_class: &'static str,
    pub body: DayBody,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanView {
    pub days: Vec<DayView>,
}

/// The display label is a pure function of the record.
pub fn exercise_label(exercise: &Exercise) -> String {
    match exercise.dosage {
        Dosage::Repetitions(reps) => {
            format!("{} séries × {} répétitions", exercise.sets, reps)
        }
        Dosage::Duration(minutes) => format!("{} séries × {} min", exercise.sets, minutes),
    }
}

pub fn render_exercise(exercise: &Exercise) -> ExerciseView {
    ExerciseView {
        exercise_id: exercise.id,
        name: exercise.name.clone(),
        dosage_label: exercise_label(exercise),
        controls: Vec::new(),
    }
}

/// Rebuilds one day card. Rest days always render the fixed placeholder and
/// never exercises, whatever the payload carried.
pub fn render_day(day: &Day, position: usize) -> DayView {
    let title = if day.label.trim().is_empty() {
        format!("Jour {}", position + 1)
    } else {
        day.label.clone()
    };
    let (css_class, body) = match day.kind {
        DayKind::Rest => (
            "rest-day",
            DayBody::Rest {
                placeholder: REST_PLACEHOLDER,
            },
        ),
        DayKind::Workout => (
            "workout-day",
            DayBody::Workout {
                exercises: day.exercises.iter().map(render_exercise).collect(),
                add_control: false,
            },
        ),
    };
    DayView {
        day_id: day.id,
        title,
        css_class,
        body,
    }
}

/// Clears and rebuilds the full view from scratch.
pub fn render_plan(plan: &Plan) -> PlanView {
    PlanView {
        days: plan
            .days
            .iter()
            .enumerate()
            .map(|(i, day)| render_day(day, i))
            .collect(),
    }
}

/// Idempotently ensures edit/delete controls exist on every exercise and an
/// add control on every workout day. Existing controls are left alone, so
/// repeated calls attach exactly one set.
pub fn attach_editing_controls(view: &mut PlanView) {
    for day in &mut view.days {
        if let DayBody::Workout {
            exercises,
            add_control,
        } = &mut day.body
        {
            *add_control = true;
            for ex in exercises.iter_mut() {
                for control in [Control::Edit, Control::Delete] {
                    if !ex.controls.contains(&control) {
                        ex.controls.push(control);
                    }
                }
            }
        }
    }
}
