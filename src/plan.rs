// src/plan.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors produced while loading or mutating a plan document.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Plan document does not match the expected shape: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Failed to read plan document: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable identifier for a day within one store instance.
///
/// Assigned when the document is loaded or an entry is created, never
/// serialized. Identity only has to outlive the session; the wire document
/// stays positional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayId(u64);

/// Stable identifier for an exercise within one store instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExerciseId(u64);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DayKind {
    Rest,
    Workout,
}

/// Exercise dosage: exactly one of a repetition count or a duration in
/// minutes, decided by the catalog entry's measurement kind. Making this an
/// enum keeps "never both, never neither" out of reach of any caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dosage {
    Repetitions(u32),
    Duration(u32),
}

impl Dosage {
    pub const fn repetitions(&self) -> Option<u32> {
        match self {
            Self::Repetitions(r) => Some(*r),
            Self::Duration(_) => None,
        }
    }

    pub const fn duration_minutes(&self) -> Option<u32> {
        match self {
            Self::Duration(m) => Some(*m),
            Self::Repetitions(_) => None,
        }
    }
}

/// Wire shape of one exercise: French field names, two nullable dosage
/// columns. Used only as a serde bridge for [`Exercise`].
#[derive(Serialize, Deserialize)]
struct ExerciseWire {
    nom: String,
    series: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repetitions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duree_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExerciseWire", into = "ExerciseWire")]
pub struct Exercise {
    /// Unassigned until the owning store hands the record an id.
    pub id: ExerciseId,
    pub name: String,
    pub sets: u32,
    pub dosage: Dosage,
}

impl TryFrom<ExerciseWire> for Exercise {
    type Error = String;

    fn try_from(wire: ExerciseWire) -> Result<Self, Self::Error> {
        let dosage = match (wire.repetitions, wire.duree_minutes) {
            (Some(r), None) => Dosage::Repetitions(r),
            (None, Some(m)) => Dosage::Duration(m),
            (Some(_), Some(_)) => {
                return Err(format!(
                    "exercise '{}' sets both repetitions and duration",
                    wire.nom
                ))
            }
            (None, None) => {
                return Err(format!(
                    "exercise '{}' sets neither repetitions nor duration",
                    wire.nom
                ))
            }
        };
        if wire.series == 0 {
            return Err(format!("exercise '{}' has zero sets", wire.nom));
        }
        match dosage {
            Dosage::Repetitions(0) | Dosage::Duration(0) => {
                return Err(format!("exercise '{}' has a zero dosage", wire.nom));
            }
            _ => {}
        }
        Ok(Self {
            id: ExerciseId::default(),
            name: wire.nom,
            sets: wire.series,
            dosage,
        })
    }
}

impl From<Exercise> for ExerciseWire {
    fn from(ex: Exercise) -> Self {
        Self {
            nom: ex.name,
            series: ex.sets,
            repetitions: ex.dosage.repetitions(),
            duree_minutes: ex.dosage.duration_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    #[serde(skip)]
    pub id: DayId,
    #[serde(rename = "type")]
    pub kind: DayKind,
    #[serde(rename = "nomJour", default)]
    pub label: String,
    #[serde(rename = "exercices", default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
}

/// The full multi-day schedule. Day order is schedule order; the sequence
/// length is fixed for a given plan instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "jours")]
    pub days: Vec<Day>,
    #[serde(skip)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Replacement fields for one exercise. Validation (catalog membership,
/// positive sets, dosage gating) belongs to the edit controller; the store
/// only guards entry identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseFields {
    pub name: String,
    pub sets: u32,
    pub dosage: Dosage,
}

/// Sole owner of the canonical plan state, with a dirty flag tracking
/// unsaved mutations. Every mutating call marks the store dirty; rendering
/// and persistence are triggered by the caller.
#[derive(Debug, Default)]
pub struct PlanStore {
    plan: Plan,
    dirty: bool,
    next_id: u64,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Replaces the current plan wholesale from a JSON document and clears
    /// the dirty flag. Rest days carrying exercises are normalized to empty;
    /// every entry receives a fresh stable id.
    pub fn load(&mut self, json: &str) -> Result<(), PlanError> {
        let mut plan: Plan = serde_json::from_str(json)?;
        for day in &mut plan.days {
            if day.kind == DayKind::Rest && !day.exercises.is_empty() {
                warn!(day = %day.label, "rest day carried exercises, dropping them");
                day.exercises.clear();
            }
            day.id = DayId(self.next_id());
            for ex in &mut day.exercises {
                ex.id = ExerciseId(self.next_id());
            }
        }
        plan.generated_at = Some(Utc::now());
        self.plan = plan;
        self.dirty = false;
        Ok(())
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn day(&self, day: DayId) -> Option<&Day> {
        self.plan.days.iter().find(|d| d.id == day)
    }

    pub fn exercise(&self, day: DayId, ex: ExerciseId) -> Option<&Exercise> {
        self.day(day)?.exercises.iter().find(|e| e.id == ex)
    }

    /// Resolves a 0-based schedule position to a day id. Positional
    /// addresses exist only at the outer boundary; everything past it works
    /// with ids.
    pub fn day_id_at(&self, position: usize) -> Option<DayId> {
        self.plan.days.get(position).map(|d| d.id)
    }

    pub fn exercise_id_at(&self, day: DayId, position: usize) -> Option<ExerciseId> {
        self.day(day)?.exercises.get(position).map(|e| e.id)
    }

    /// Replaces one exercise in place. Unknown ids are a logged no-op.
    pub fn update_exercise(&mut self, day: DayId, ex: ExerciseId, fields: ExerciseFields) -> bool {
        let Some(day_entry) = self.plan.days.iter_mut().find(|d| d.id == day) else {
            warn!(?day, "update ignored, unknown day");
            return false;
        };
        let Some(entry) = day_entry.exercises.iter_mut().find(|e| e.id == ex) else {
            warn!(?day, ?ex, "update ignored, unknown exercise");
            return false;
        };
        entry.name = fields.name;
        entry.sets = fields.sets;
        entry.dosage = fields.dosage;
        self.dirty = true;
        true
    }

    /// Appends an exercise to a workout day. No-op on rest days and unknown
    /// days.
    pub fn add_exercise(&mut self, day: DayId, fields: ExerciseFields) -> Option<ExerciseId> {
        let id = ExerciseId(self.next_id());
        let Some(day_entry) = self.plan.days.iter_mut().find(|d| d.id == day) else {
            warn!(?day, "add ignored, unknown day");
            return None;
        };
        if day_entry.kind == DayKind::Rest {
            warn!(day = %day_entry.label, "add ignored, rest day");
            return None;
        }
        day_entry.exercises.push(Exercise {
            id,
            name: fields.name,
            sets: fields.sets,
            dosage: fields.dosage,
        });
        self.dirty = true;
        Some(id)
    }

    /// Removes one exercise. Unknown ids are a logged no-op.
    pub fn remove_exercise(&mut self, day: DayId, ex: ExerciseId) -> bool {
        let Some(day_entry) = self.plan.days.iter_mut().find(|d| d.id == day) else {
            warn!(?day, "remove ignored, unknown day");
            return false;
        };
        let Some(pos) = day_entry.exercises.iter().position(|e| e.id == ex) else {
            warn!(?day, ?ex, "remove ignored, unknown exercise");
            return false;
        };
        day_entry.exercises.remove(pos);
        self.dirty = true;
        true
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
