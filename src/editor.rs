// src/editor.rs
//! Handles user edit/add/delete actions against the plan store. Each
//! rendered exercise is either `Viewing` or `Editing`; a failed validation
//! leaves the form open and the store untouched. Every successful mutation
//! latches a plan-modified signal for the sync agent.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::catalog::{Catalog, CatalogEntry, MeasurementKind};
use crate::plan::{DayId, DayKind, Dosage, ExerciseFields, ExerciseId, PlanStore};
use crate::render::{render_exercise, ExerciseView};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("Exercise '{0}' is not in the catalog")]
    UnknownExercise(String),
    #[error("An exercise name must be selected from the catalog")]
    MissingSelection,
    #[error("Sets must be at least 1")]
    InvalidSets,
    #[error("Exactly one of repetitions or duration must be provided")]
    AmbiguousDosage,
    #[error("Repetitions and duration must be at least 1")]
    InvalidDosageValue,
    #[error("'{0}' is time-based; provide a duration in minutes, not repetitions")]
    ExpectedDuration(String),
    #[error("'{0}' is repetition-based; provide repetitions, not a duration")]
    ExpectedRepetitions(String),
    #[error("Cannot add exercises to a rest day")]
    RestDay,
    #[error("Unknown day or exercise reference")]
    StaleReference,
    #[error("No edit in progress for this exercise")]
    NotEditing,
    #[error("No add form open for this day")]
    NoAddForm,
    #[error("Deletion requires confirmation")]
    NotConfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Viewing,
    Editing,
}

/// Inline form contents. Pre-populated from the stored record, never from
/// rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub name: String,
    pub sets: u32,
    pub repetitions: Option<u32>,
    pub duration_minutes: Option<u32>,
    /// Which dosage input the form shows, from the catalog match on the
    /// current name. `None` when the name is not (yet) a catalog entry.
    pub measurement: Option<MeasurementKind>,
}

impl EditForm {
    fn for_entry(entry: &CatalogEntry) -> Self {
        let (repetitions, duration_minutes) = match entry.measurement_kind {
            MeasurementKind::Repetitions => (Some(10), None),
            MeasurementKind::Time => (None, Some(5)),
        };
        Self {
            name: entry.name.clone(),
            sets: 3,
            repetitions,
            duration_minutes,
            measurement: Some(entry.measurement_kind),
        }
    }

    /// Turns the form into a submission as-is.
    pub fn submission(&self) -> EditSubmission {
        EditSubmission {
            name: self.name.clone(),
            sets: self.sets,
            repetitions: self.repetitions,
            duration_minutes: self.duration_minutes,
        }
    }
}

/// What the user submits from an edit or add form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSubmission {
    pub name: String,
    pub sets: u32,
    pub repetitions: Option<u32>,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Default)]
pub struct EditController {
    editing: BTreeMap<(DayId, ExerciseId), EditForm>,
    adding: BTreeMap<DayId, EditForm>,
    plan_modified: bool,
}

impl EditController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, day: DayId, ex: ExerciseId) -> EditState {
        if self.editing.contains_key(&(day, ex)) {
            EditState::Editing
        } else {
            EditState::Viewing
        }
    }

    /// Takes the latched plan-modified signal, clearing it.
    pub fn take_plan_modified(&mut self) -> bool {
        std::mem::take(&mut self.plan_modified)
    }

    /// `Viewing -> Editing`: opens the inline form pre-populated from the
    /// stored record; the catalog match on the current name decides which
    /// dosage input is shown.
    pub fn begin_edit(
        &mut self,
        store: &PlanStore,
        catalog: &Catalog,
        day: DayId,
        ex: ExerciseId,
    ) -> Result<&EditForm, EditError> {
        let record = store.exercise(day, ex).ok_or(EditError::StaleReference)?;
        let measurement = catalog
            .find_by_name(&record.name)
            .map(|entry| entry.measurement_kind);
        let form = EditForm {
            name: record.name.clone(),
            sets: record.sets,
            repetitions: record.dosage.repetitions(),
            duration_minutes: record.dosage.duration_minutes(),
            measurement,
        };
        Ok(self.editing.entry((day, ex)).or_insert(form))
    }

    /// `Editing -> Viewing` on success. On validation failure the transition
    /// aborts: the error is returned for inline display, the form stays open,
    /// the store is unchanged.
    pub fn submit_edit(
        &mut self,
        store: &mut PlanStore,
        catalog: &Catalog,
        day: DayId,
        ex: ExerciseId,
        input: EditSubmission,
    ) -> Result<ExerciseView, EditError> {
        if !self.editing.contains_key(&(day, ex)) {
            return Err(EditError::NotEditing);
        }
        let fields = validate(catalog, &input)?;
        if !store.update_exercise(day, ex, fields) {
            return Err(EditError::StaleReference);
        }
        self.editing.remove(&(day, ex));
        self.plan_modified = true;
        debug!(?day, ?ex, "exercise updated");
        let record = store.exercise(day, ex).ok_or(EditError::StaleReference)?;
        Ok(render_exercise(record))
    }

    /// `Editing -> Viewing` discarding form input, no store mutation.
    pub fn cancel_edit(&mut self, day: DayId, ex: ExerciseId) {
        self.editing.remove(&(day, ex));
    }

    /// Reveals the day-scoped add form, pre-populated from the catalog.
    pub fn begin_add(
        &mut self,
        store: &PlanStore,
        catalog: &Catalog,
        day: DayId,
    ) -> Result<&EditForm, EditError> {
        let day_entry = store.day(day).ok_or(EditError::StaleReference)?;
        if day_entry.kind == DayKind::Rest {
            return Err(EditError::RestDay);
        }
        let form = catalog
            .entries()
            .first()
            .map(EditForm::for_entry)
            .unwrap_or_else(|| EditForm {
                name: String::new(),
                sets: 3,
                repetitions: Some(10),
                duration_minutes: None,
                measurement: None,
            });
        Ok(self.adding.entry(day).or_insert(form))
    }

    /// Same validation as an edit save, then appends to the day.
    pub fn submit_add(
        &mut self,
        store: &mut PlanStore,
        catalog: &Catalog,
        day: DayId,
        input: EditSubmission,
    ) -> Result<(ExerciseId, ExerciseView), EditError> {
        if !self.adding.contains_key(&day) {
            return Err(EditError::NoAddForm);
        }
        let fields = validate(catalog, &input)?;
        let Some(new_id) = store.add_exercise(day, fields) else {
            // Rest days were refused at begin_add; reaching this means the
            // day vanished underneath us.
            return Err(EditError::StaleReference);
        };
        self.adding.remove(&day);
        self.plan_modified = true;
        debug!(?day, ?new_id, "exercise added");
        let record = store
            .exercise(day, new_id)
            .ok_or(EditError::StaleReference)?;
        Ok((new_id, render_exercise(record)))
    }

    /// Hides the add form without mutation.
    pub fn cancel_add(&mut self, day: DayId) {
        self.adding.remove(&day);
    }

    /// Removes an exercise after explicit confirmation. Returns whether the
    /// day is left without exercises, so the caller can show the add
    /// placeholder.
    pub fn delete_exercise(
        &mut self,
        store: &mut PlanStore,
        day: DayId,
        ex: ExerciseId,
        confirmed: bool,
    ) -> Result<bool, EditError> {
        if !confirmed {
            return Err(EditError::NotConfirmed);
        }
        if !store.remove_exercise(day, ex) {
            return Err(EditError::StaleReference);
        }
        self.editing.remove(&(day, ex));
        self.plan_modified = true;
        debug!(?day, ?ex, "exercise removed");
        let emptied = store.day(day).is_some_and(|d| d.exercises.is_empty());
        Ok(emptied)
    }
}

/// Shared save-edit / save-new-exercise validation: a catalog selection and
/// positive sets are mandatory, and exactly one dosage must be supplied,
/// gated by the selected entry's measurement kind.
fn validate(catalog: &Catalog, input: &EditSubmission) -> Result<ExerciseFields, EditError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(EditError::MissingSelection);
    }
    let entry = catalog
        .find_by_name(name)
        .ok_or_else(|| EditError::UnknownExercise(name.to_string()))?;
    if input.sets == 0 {
        return Err(EditError::InvalidSets);
    }
    let dosage = match (entry.measurement_kind, input.repetitions, input.duration_minutes) {
        (_, Some(_), Some(_)) | (_, None, None) => return Err(EditError::AmbiguousDosage),
        (MeasurementKind::Repetitions, Some(reps), None) => {
            if reps == 0 {
                return Err(EditError::InvalidDosageValue);
            }
            Dosage::Repetitions(reps)
        }
        (MeasurementKind::Time, None, Some(minutes)) => {
            if minutes == 0 {
                return Err(EditError::InvalidDosageValue);
            }
            Dosage::Duration(minutes)
        }
        (MeasurementKind::Time, Some(_), None) => {
            return Err(EditError::ExpectedDuration(entry.name.clone()))
        }
        (MeasurementKind::Repetitions, None, Some(_)) => {
            return Err(EditError::ExpectedRepetitions(entry.name.clone()))
        }
    };
    Ok(ExerciseFields {
        // Canonical catalog casing, not whatever the user typed.
        name: entry.name.clone(),
        sets: input.sets,
        dosage,
    })
}
