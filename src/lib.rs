use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

// --- Declare modules ---
pub mod catalog;
mod config;
pub mod editor;
pub mod plan;
pub mod render;
pub mod sync;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util,
    load as load_config_util,
    parse_color,
    save as save_config_util,
    Config,
    ConfigError,
    StandardColor,
    ThemeConfig,
};

pub use catalog::{Catalog, CatalogEntry, CatalogError, MeasurementKind};
pub use editor::{EditController, EditError, EditForm, EditState, EditSubmission};
pub use plan::{
    Day, DayId, DayKind, Dosage, Exercise, ExerciseFields, ExerciseId, Plan, PlanError, PlanStore,
};
pub use render::{
    attach_editing_controls, exercise_label, render_day, render_exercise, render_plan, Control,
    DayBody, DayView, ExerciseView, PlanView, EMPTY_DAY_PLACEHOLDER, REST_PLACEHOLDER,
};
pub use sync::{
    AuthStatus, GenerateRequest, GenerateResponse, PlanTransport, ProductSuggestion, SaveOutcome,
    SyncAgent, SyncClient, SyncError,
};

/// Where the original deployment served from; used when no server URL is
/// configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

const PLAN_FILE_NAME: &str = "plan.json";
const APP_DATA_DIR: &str = "workout-planner";

/// Path of the working copy of the delivered plan document. The remote
/// endpoint owns durability; this file only carries the session's plan
/// between invocations.
pub fn get_plan_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Failed to determine application data directory")?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(PLAN_FILE_NAME))
}

/// What the generation endpoint handed back, after the plan string was
/// interpreted.
#[derive(Debug)]
pub enum GeneratedProgram {
    /// The plan parsed as a structured document and is now loaded.
    Structured,
    /// The plan did not parse; display the raw text instead.
    Text(String),
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub program: GeneratedProgram,
    pub products: Vec<ProductSuggestion>,
}

/// Composition root for the plan edit model: owns the store, the catalog and
/// the edit controller, and drives the sync agent over an injected
/// transport.
pub struct PlanService<T = SyncClient> {
    pub config: Config,
    store: PlanStore,
    catalog: Catalog,
    editor: EditController,
    agent: SyncAgent<T>,
    config_path: PathBuf,
    plan_path: PathBuf,
}

impl PlanService<SyncClient> {
    /// Initializes the service from the on-disk config, wiring the HTTP
    /// transport, and reloads the working plan document when one exists.
    /// # Errors
    /// Returns `anyhow::Error` if config or data paths cannot be prepared.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .context(format!("Failed to load config from {config_path:?}"))?;
        let plan_path = get_plan_path()?;

        let server_url = config
            .server_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let transport = SyncClient::new(server_url);
        let mut service = Self::with_transport(config, transport, config_path, plan_path);
        service.reload_working_copy();
        Ok(service)
    }
}

impl<T: PlanTransport> PlanService<T> {
    /// Builds a service around an explicit transport. Dependencies are
    /// injected here rather than reached through any ambient global.
    pub fn with_transport(
        config: Config,
        transport: T,
        config_path: PathBuf,
        plan_path: PathBuf,
    ) -> Self {
        let coalesce = Duration::from_millis(config.save_coalesce_ms);
        Self {
            agent: SyncAgent::with_coalesce(transport, coalesce),
            store: PlanStore::new(),
            catalog: Catalog::default(),
            editor: EditController::new(),
            config,
            config_path,
            plan_path,
        }
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_plan_path(&self) -> &Path {
        &self.plan_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets (or clears) the backend URL in the configuration.
    /// # Errors
    /// - `ConfigError::InvalidServerUrl` if the URL is blank or not HTTP(S).
    /// - `ConfigError` variants if saving fails.
    pub fn set_server_url(&mut self, url: Option<String>) -> Result<(), ConfigError> {
        if let Some(ref u) = url {
            let trimmed = u.trim();
            if trimmed.is_empty() || !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                return Err(ConfigError::InvalidServerUrl(u.clone()));
            }
        }
        self.config.server_url = url.map(|s| s.trim().trim_end_matches('/').to_string());
        self.save_config()
    }

    // --- Plan document lifecycle ---

    /// Loads a plan document wholesale, replacing any current plan.
    /// # Errors
    /// Returns `PlanError::Malformed` if the payload does not match the
    /// plan shape.
    pub fn load_plan_document(&mut self, json: &str) -> Result<(), PlanError> {
        self.store.load(json)
    }

    fn reload_working_copy(&mut self) {
        if !self.plan_path.exists() {
            return;
        }
        match fs::read_to_string(&self.plan_path) {
            Ok(json) => {
                if let Err(e) = self.store.load(&json) {
                    warn!(error = %e, path = ?self.plan_path, "working plan copy unreadable, starting empty");
                }
            }
            Err(e) => {
                warn!(error = %e, path = ?self.plan_path, "could not read working plan copy");
            }
        }
    }

    /// Writes the working copy of the current plan document.
    /// # Errors
    /// Returns `anyhow::Error` on serialization or I/O failure.
    pub fn store_working_copy(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self.store.plan())
            .context("Failed to serialize plan document")?;
        fs::write(&self.plan_path, json)
            .with_context(|| format!("Failed to write plan document to {:?}", self.plan_path))?;
        Ok(())
    }

    pub fn plan(&self) -> &Plan {
        self.store.plan()
    }

    pub fn has_plan(&self) -> bool {
        !self.store.plan().is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Full re-render of the current plan with editing controls attached.
    pub fn view(&self) -> PlanView {
        let mut view = render_plan(self.store.plan());
        attach_editing_controls(&mut view);
        view
    }

    // --- Catalog ---

    /// Fetches the exercise catalog once per session.
    /// # Errors
    /// Returns `SyncError` variants when the fetch fails.
    pub async fn ensure_catalog(&mut self) -> Result<&Catalog, SyncError> {
        if self.catalog.is_empty() {
            self.catalog = self.agent.transport().fetch_catalog().await?;
        }
        Ok(&self.catalog)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Injects a pre-loaded catalog (tests, offline use).
    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    // --- Generation ---

    /// Requests a generated plan from the backend. A structured response
    /// replaces the current plan and working copy; a response that fails to
    /// parse as a plan document degrades to raw text for display.
    /// # Errors
    /// `SyncError::NotAuthenticated` maps a 401 from the endpoint; other
    /// `SyncError` variants cover transport failures.
    pub async fn generate(&mut self, request: &GenerateRequest) -> Result<GenerationOutcome> {
        let response = self.agent.transport().generate_plan(request).await?;
        let program = match self.store.load(&response.plan) {
            Ok(()) => {
                self.store_working_copy()?;
                info!(days = self.store.plan().days.len(), "structured plan loaded");
                GeneratedProgram::Structured
            }
            Err(e) => {
                warn!(error = %e, "generated plan is not structured, falling back to raw text");
                GeneratedProgram::Text(response.plan)
            }
        };
        Ok(GenerationOutcome {
            program,
            products: response.products,
        })
    }

    // --- Positional boundary (CLI uses 1-based positions) ---

    /// Resolves a 1-based day position to its stable id.
    /// # Errors
    /// Returns `anyhow::Error` when the position is out of range.
    pub fn resolve_day(&self, position: usize) -> Result<DayId> {
        if position == 0 {
            bail!("Day numbers start at 1.");
        }
        self.store
            .day_id_at(position - 1)
            .ok_or_else(|| anyhow::anyhow!("Day {position} not found in the current plan."))
    }

    /// Resolves a 1-based exercise position within a day to its stable id.
    /// # Errors
    /// Returns `anyhow::Error` when the position is out of range.
    pub fn resolve_exercise(&self, day: DayId, position: usize) -> Result<ExerciseId> {
        if position == 0 {
            bail!("Exercise numbers start at 1.");
        }
        self.store
            .exercise_id_at(day, position - 1)
            .ok_or_else(|| anyhow::anyhow!("Exercise {position} not found on that day."))
    }

    // --- Edit flows (delegate to the controller) ---

    pub fn begin_edit(&mut self, day: DayId, ex: ExerciseId) -> Result<EditForm, EditError> {
        self.editor
            .begin_edit(&self.store, &self.catalog, day, ex)
            .cloned()
    }

    pub fn submit_edit(
        &mut self,
        day: DayId,
        ex: ExerciseId,
        input: EditSubmission,
    ) -> Result<ExerciseView, EditError> {
        self.editor
            .submit_edit(&mut self.store, &self.catalog, day, ex, input)
    }

    pub fn cancel_edit(&mut self, day: DayId, ex: ExerciseId) {
        self.editor.cancel_edit(day, ex);
    }

    pub fn edit_state(&self, day: DayId, ex: ExerciseId) -> EditState {
        self.editor.state(day, ex)
    }

    pub fn begin_add(&mut self, day: DayId) -> Result<EditForm, EditError> {
        self.editor
            .begin_add(&self.store, &self.catalog, day)
            .cloned()
    }

    pub fn submit_add(
        &mut self,
        day: DayId,
        input: EditSubmission,
    ) -> Result<(ExerciseId, ExerciseView), EditError> {
        self.editor
            .submit_add(&mut self.store, &self.catalog, day, input)
    }

    pub fn cancel_add(&mut self, day: DayId) {
        self.editor.cancel_add(day);
    }

    pub fn delete_exercise(
        &mut self,
        day: DayId,
        ex: ExerciseId,
        confirmed: bool,
    ) -> Result<bool, EditError> {
        self.editor
            .delete_exercise(&mut self.store, day, ex, confirmed)
    }

    // --- Persistence ---

    /// Serializes the whole plan and submits it for saving when the store is
    /// dirty. The dirty flag is cleared only on a confirmed save; failures
    /// leave it set for the next attempt.
    pub async fn persist_plan(&mut self) -> Result<Option<SaveOutcome>> {
        if !self.store.is_dirty() {
            return Ok(None);
        }
        self.store_working_copy()?;
        let snapshot = self.store.plan().clone();
        let outcome = self.agent.submit(snapshot).await;
        if outcome == SaveOutcome::Saved {
            self.store.clear_dirty();
        }
        Ok(Some(outcome))
    }

    /// Honors the plan-modified signal raised by the edit controller: when
    /// one is pending and the store is dirty, persist.
    pub async fn sync_if_modified(&mut self) -> Result<Option<SaveOutcome>> {
        if !self.editor.take_plan_modified() {
            return Ok(None);
        }
        self.persist_plan().await
    }

    // --- Auth probe ---

    /// Lightweight authentication-state check against the backend.
    /// # Errors
    /// Returns `SyncError` variants when the probe fails.
    pub async fn check_auth(&self) -> Result<AuthStatus, SyncError> {
        self.agent.transport().check_auth().await
    }
}
