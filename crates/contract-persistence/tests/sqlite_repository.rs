use contract_domain::{Actor, BlueprintRepository, DomainStubs, FieldValue, UserId, WorkflowState};
use contract_flow::{ContractRepository, EngineConfig, FlowError, WorkflowEngine};
use contract_persistence::schema::contracts;
use contract_persistence::{new_sqlite_for_test, DieselRepository};
use diesel::prelude::*;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Base de datos temporal que se borra al salir del test.
struct TempDb {
  path: PathBuf,
}

impl TempDb {
  fn new() -> Self {
    Self { path: std::env::temp_dir().join(format!("contracts_test_{}.db", Uuid::new_v4())) }
  }

  fn repo(&self) -> DieselRepository {
    new_sqlite_for_test(self.path.to_str().expect("utf8 path")).expect("sqlite repo")
  }
}

impl Drop for TempDb {
  fn drop(&mut self) {
    for suffix in ["", "-wal", "-shm"] {
      let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
    }
  }
}

#[test]
fn blueprints_round_trip_and_are_owner_scoped() {
  let db = TempDb::new();
  let repo = db.repo();
  let ana = Actor::new(UserId::new(), "Ana");
  let luis = Actor::new(UserId::new(), "Luis");

  let nda = DomainStubs::nda_blueprint(&ana).expect("nda");
  let id = repo.save_blueprint(nda.clone()).expect("save");
  thread::sleep(Duration::from_millis(2));
  let newer = DomainStubs::nda_blueprint(&ana).expect("nda");
  repo.save_blueprint(newer.clone()).expect("save");
  repo.save_blueprint(DomainStubs::nda_blueprint(&luis).expect("nda")).expect("save");

  assert_eq!(repo.get_blueprint(&id).expect("get"), Some(nda));
  let mine = repo.list_blueprints(&ana.id).expect("list");
  assert_eq!(mine.iter().map(|b| b.id()).collect::<Vec<_>>(), vec![newer.id(), id]);

  assert!(!repo.delete_blueprint(&id, &luis.id).expect("delete"));
  assert!(repo.delete_blueprint(&id, &ana.id).expect("delete"));
  assert_eq!(repo.get_blueprint(&id).expect("get"), None);
}

#[test]
fn engine_over_sqlite_keeps_history_and_versions() {
  let db = TempDb::new();
  let repo = Arc::new(db.repo());
  let ana = Actor::new(UserId::new(), "Ana");
  let bp_id = repo.save_blueprint(DomainStubs::nda_blueprint(&ana).expect("nda")).expect("save");
  let engine = WorkflowEngine::new(repo.clone(), repo.clone(), EngineConfig::default());

  let created = engine.instantiate(&bp_id, "NDA", &ana).expect("instantiate");
  assert_eq!(repo.get_contract(&created.id()).expect("get"), Some(created.clone()));

  engine.update_field_values(&created.id(), &[("start_date".to_string(), json!("2025-03-01"))], &ana)
        .expect("update");
  for to in [WorkflowState::Approved, WorkflowState::Sent, WorkflowState::Signed] {
    engine.transition(&created.id(), to, &ana).expect("transition");
  }
  let locked = engine.transition(&created.id(), WorkflowState::Locked, &ana).expect("lock");

  let stored = repo.get_contract(&created.id()).expect("get").expect("some");
  assert_eq!(stored, locked);
  assert_eq!(stored.version(), 5);
  assert_eq!(stored.status_history().len(), 4);
  assert!(stored.status_history().is_consistent(WorkflowState::Created));
  assert_eq!(stored.field("start_date").expect("f").value(), &FieldValue::Date("2025-03-01".into()));

  let err = engine.update_fields(&created.id(), stored.fields().to_vec(), &ana).unwrap_err();
  assert!(err.is_immutable());
}

#[test]
fn stale_writes_conflict_without_touching_rows() {
  let db = TempDb::new();
  let repo = db.repo();
  let ana = Actor::new(UserId::new(), "Ana");
  let bp = DomainStubs::nda_blueprint(&ana).expect("nda");
  let mut contract =
    contract_domain::Contract::instantiate(&bp, "NDA", ana.id, false, contract_flow::now()).expect("contract");
  repo.insert_contract(&contract).expect("insert");
  assert!(repo.insert_contract(&contract).is_err());

  let record = contract.apply_transition(WorkflowState::Approved, ana.id, contract_flow::now()).expect("apply");
  assert!(!repo.commit_transition(&contract.id(), &record, 0).expect("commit").is_conflict());
  assert!(repo.commit_transition(&contract.id(), &record, 0).expect("commit").is_conflict());
  assert!(repo.replace_fields(&contract.id(), contract.fields(), contract_flow::now(), 0)
              .expect("replace")
              .is_conflict());

  let stored = repo.get_contract(&contract.id()).expect("get").expect("some");
  assert_eq!(stored.status(), WorkflowState::Approved);
  assert_eq!(stored.status_history().len(), 1);
  assert_eq!(stored.version(), 1);

  let missing = repo.commit_transition(&Uuid::new_v4(), &record, 0).unwrap_err();
  assert!(missing.is_not_found());
}

#[test]
fn unknown_stored_status_blocks_field_writes() {
  let db = TempDb::new();
  let repo = db.repo();
  let ana = Actor::new(UserId::new(), "Ana");
  let bp = DomainStubs::nda_blueprint(&ana).expect("nda");
  let contract =
    contract_domain::Contract::instantiate(&bp, "NDA", ana.id, false, contract_flow::now()).expect("contract");
  repo.insert_contract(&contract).expect("insert");

  let mut conn = SqliteConnection::establish(db.path.to_str().expect("utf8 path")).expect("connect");
  diesel::update(contracts::table.filter(contracts::id.eq(contract.id().to_string())))
    .set(contracts::status.eq("ARCHIVED"))
    .execute(&mut conn)
    .expect("corrupt status");

  let err = repo.replace_fields(&contract.id(), contract.fields(), contract_flow::now(), 0).unwrap_err();
  assert!(matches!(err, FlowError::Storage(_)), "{:?}", err);
  let version: i64 = contracts::table.filter(contracts::id.eq(contract.id().to_string()))
                                     .select(contracts::version)
                                     .first(&mut conn)
                                     .expect("version");
  assert_eq!(version, 0);
}

#[test]
fn unreachable_database_reports_storage_error() {
  let path = std::env::temp_dir().join(format!("missing_{}", Uuid::new_v4())).join("contracts.db");
  let err = new_sqlite_for_test(path.to_str().expect("utf8 path")).err().expect("open must fail");
  match err {
    FlowError::Storage(msg) => assert!(msg.starts_with("pool"), "{}", msg),
    other => panic!("error inesperado: {:?}", other),
  }
}

#[test]
fn list_contracts_most_recent_first() {
  let db = TempDb::new();
  let repo = Arc::new(db.repo());
  let ana = Actor::new(UserId::new(), "Ana");
  let luis = Actor::new(UserId::new(), "Luis");
  let bp_id = repo.save_blueprint(DomainStubs::nda_blueprint(&ana).expect("nda")).expect("save");
  let engine = WorkflowEngine::new(repo.clone(), repo.clone(), EngineConfig::default());

  let first = engine.instantiate(&bp_id, "Primero", &ana).expect("first");
  thread::sleep(Duration::from_millis(2));
  let second = engine.instantiate(&bp_id, "Segundo", &ana).expect("second");
  engine.instantiate(&bp_id, "Ajeno", &luis).expect("other");

  let mine = engine.list_contracts(&ana).expect("list");
  assert_eq!(mine.iter().map(|c| c.id()).collect::<Vec<_>>(), vec![second.id(), first.id()]);
}

#[test]
fn concurrent_transitions_on_sqlite_commit_once() {
  let db = TempDb::new();
  let repo = Arc::new(db.repo());
  let ana = Actor::new(UserId::new(), "Ana");
  let bp_id = repo.save_blueprint(DomainStubs::nda_blueprint(&ana).expect("nda")).expect("save");
  let engine = Arc::new(WorkflowEngine::new(repo.clone(), repo.clone(), EngineConfig::default()));
  let c = engine.instantiate(&bp_id, "NDA", &ana).expect("instantiate");

  let handles: Vec<_> = (0..4).map(|_| {
                                let engine = engine.clone();
                                let ana = ana.clone();
                                let id = c.id();
                                thread::spawn(move || engine.transition(&id, WorkflowState::Revoked, &ana).is_ok())
                              })
                              .collect();
  let wins = handles.into_iter().map(|h| h.join().expect("join")).filter(|ok| *ok).count();
  assert_eq!(wins, 1);
  assert_eq!(repo.get_contract(&c.id()).expect("get").expect("some").status_history().len(), 1);
}
