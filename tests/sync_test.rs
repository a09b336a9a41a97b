use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use workout_planner_lib::{
    AuthStatus, Catalog, CatalogEntry, Config, Day, DayKind, Dosage, EditSubmission, Exercise,
    GenerateRequest, GenerateResponse, GeneratedProgram, MeasurementKind, Plan, PlanService,
    PlanTransport, SaveOutcome, SyncAgent, SyncError,
};

/// In-memory transport recording every saved snapshot.
#[derive(Clone, Default)]
struct FakeTransport {
    saved: Arc<Mutex<Vec<Plan>>>,
    fail_saves: Arc<AtomicBool>,
    unauthenticated: bool,
    plan_payload: String,
}

impl PlanTransport for FakeTransport {
    async fn fetch_catalog(&self) -> Result<Catalog, SyncError> {
        Ok(test_catalog())
    }

    async fn generate_plan(&self, _request: &GenerateRequest) -> Result<GenerateResponse, SyncError> {
        if self.unauthenticated {
            return Err(SyncError::NotAuthenticated);
        }
        Ok(GenerateResponse {
            plan: self.plan_payload.clone(),
            products: Vec::new(),
        })
    }

    async fn save_plan(&self, plan: &Plan) -> Result<(), SyncError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SyncError::Server {
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.saved.lock().unwrap().push(plan.clone());
        Ok(())
    }

    async fn check_auth(&self) -> Result<AuthStatus, SyncError> {
        Ok(AuthStatus {
            authenticated: !self.unauthenticated,
            user: (!self.unauthenticated).then(|| "lea".to_string()),
        })
    }
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
    ])
}

fn plan_with_label(label: &str) -> Plan {
    Plan {
        days: vec![Day {
            id: Default::default(),
            kind: DayKind::Workout,
            label: label.to_string(),
            exercises: vec![Exercise {
                id: Default::default(),
                name: "Squat".to_string(),
                sets: 3,
                dosage: Dosage::Repetitions(10),
            }],
        }],
        generated_at: None,
    }
}

const STRUCTURED_PLAN: &str = r#"{"jours":[
    {"type":"workout","nomJour":"Jour 1","exercices":[
        {"nom":"Squat","series":3,"repetitions":10}]},
    {"type":"rest","nomJour":"Jour 2"}
]}"#;

// Service wired with a fake transport and throwaway paths. The TempDir must
// stay alive for the duration of the test.
fn create_test_service(transport: FakeTransport) -> Result<(PlanService<FakeTransport>, TempDir)> {
    let dir = TempDir::new()?;
    let mut config = Config::default();
    config.save_coalesce_ms = 10;
    let config_path: PathBuf = dir.path().join("config.toml");
    let plan_path: PathBuf = dir.path().join("plan.json");
    let mut service = PlanService::with_transport(config, transport, config_path, plan_path);
    service.set_catalog(test_catalog());
    Ok((service, dir))
}

#[tokio::test]
async fn test_burst_of_submits_coalesces_to_one_save() {
    let transport = FakeTransport::default();
    let saved = Arc::clone(&transport.saved);
    let agent = SyncAgent::with_coalesce(transport, Duration::from_millis(20));

    let (a, b) = tokio::join!(
        agent.submit(plan_with_label("first")),
        agent.submit(plan_with_label("second")),
    );

    // Exactly one request went out, carrying the latest snapshot.
    let saved = saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].days[0].label, "second");

    let mut outcomes = [a, b];
    outcomes.sort_by_key(|o| *o == SaveOutcome::Superseded);
    assert_eq!(outcomes, [SaveOutcome::Saved, SaveOutcome::Superseded]);
}

#[tokio::test]
async fn test_failed_save_keeps_store_dirty_until_retry() -> Result<()> {
    let transport = FakeTransport::default();
    let saved = Arc::clone(&transport.saved);
    let fail_saves = Arc::clone(&transport.fail_saves);
    let (mut service, _dir) = create_test_service(transport)?;

    service.load_plan_document(STRUCTURED_PLAN)?;
    let day = service.resolve_day(1)?;
    let ex = service.resolve_exercise(day, 1)?;
    service.begin_edit(day, ex)?;
    service.submit_edit(
        day,
        ex,
        EditSubmission {
            name: "Squat".to_string(),
            sets: 5,
            repetitions: Some(8),
            duration_minutes: None,
        },
    )?;

    fail_saves.store(true, Ordering::SeqCst);
    let outcome = service.sync_if_modified().await?;
    assert_eq!(outcome, Some(SaveOutcome::Failed));
    assert!(service.is_dirty());
    assert!(saved.lock().unwrap().is_empty());

    // The next attempt ships the full current plan and clears the flag.
    fail_saves.store(false, Ordering::SeqCst);
    let outcome = service.persist_plan().await?;
    assert_eq!(outcome, Some(SaveOutcome::Saved));
    assert!(!service.is_dirty());

    let saved = saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].days[0].exercises[0].sets, 5);
    Ok(())
}

#[tokio::test]
async fn test_persist_is_a_noop_when_nothing_changed() -> Result<()> {
    let transport = FakeTransport::default();
    let saved = Arc::clone(&transport.saved);
    let (mut service, _dir) = create_test_service(transport)?;

    service.load_plan_document(STRUCTURED_PLAN)?;
    assert!(!service.is_dirty());
    assert_eq!(service.persist_plan().await?, None);
    assert_eq!(service.sync_if_modified().await?, None);
    assert!(saved.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_structured_generation_replaces_plan_and_working_copy() -> Result<()> {
    let transport = FakeTransport {
        plan_payload: STRUCTURED_PLAN.to_string(),
        ..FakeTransport::default()
    };
    let (mut service, _dir) = create_test_service(transport)?;

    let outcome = service.generate(&GenerateRequest::default()).await?;
    assert!(matches!(outcome.program, GeneratedProgram::Structured));
    assert!(service.has_plan());
    assert!(!service.is_dirty());
    assert_eq!(service.plan().days.len(), 2);
    assert!(service.get_plan_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_unstructured_generation_degrades_to_text() -> Result<()> {
    let transport = FakeTransport {
        plan_payload: "Fais des pompes tous les matins.".to_string(),
        ..FakeTransport::default()
    };
    let (mut service, _dir) = create_test_service(transport)?;

    let outcome = service.generate(&GenerateRequest::default()).await?;
    match outcome.program {
        GeneratedProgram::Text(text) => {
            assert_eq!(text, "Fais des pompes tous les matins.");
        }
        GeneratedProgram::Structured => panic!("prose payload must not load as a plan"),
    }
    assert!(!service.has_plan());
    Ok(())
}

#[tokio::test]
async fn test_unauthenticated_generation_maps_to_login_error() -> Result<()> {
    let transport = FakeTransport {
        unauthenticated: true,
        ..FakeTransport::default()
    };
    let (mut service, _dir) = create_test_service(transport)?;

    let err = service
        .generate(&GenerateRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SyncError>(),
        Some(SyncError::NotAuthenticated)
    ));

    let status = service.check_auth().await?;
    assert!(!status.authenticated);
    assert_eq!(status.user, None);
    Ok(())
}

#[tokio::test]
async fn test_catalog_is_fetched_once_per_session() -> Result<()> {
    let transport = FakeTransport::default();
    let dir = TempDir::new()?;
    let mut config = Config::default();
    config.save_coalesce_ms = 10;
    let mut service = PlanService::with_transport(
        config,
        transport,
        dir.path().join("config.toml"),
        dir.path().join("plan.json"),
    );

    assert!(service.catalog().is_empty());
    let len = service.ensure_catalog().await?.len();
    assert_eq!(len, 2);
    // A second call keeps the already-loaded catalog.
    service.ensure_catalog().await?;
    assert_eq!(service.catalog().len(), 2);
    Ok(())
}
