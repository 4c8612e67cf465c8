use contract_domain::{DomainStubs, FieldInput, InMemoryBlueprintRepository, WorkflowState};
use contract_flow::{ContractService, Credentials, EngineConfig, IdentityProvider, InMemoryContractRepository,
                    InMemoryIdentityProvider, SessionToken, StatusCode, StatusCounts};
use serde_json::json;
use std::sync::Arc;

fn service_with_users() -> (ContractService, Arc<InMemoryIdentityProvider>) {
  let identity = Arc::new(InMemoryIdentityProvider::new());
  identity.register("Ana", "ana@example.com", "s3creta").expect("register ana");
  identity.register("Luis", "luis@example.com", "otra").expect("register luis");
  let service = ContractService::new(identity.clone(),
                                     Arc::new(InMemoryBlueprintRepository::new()),
                                     Arc::new(InMemoryContractRepository::new()),
                                     EngineConfig::default());
  (service, identity)
}

#[test]
fn login_and_resolve_session() {
  let (service, identity) = service_with_users();
  let session = service.login(&Credentials::new("  ANA@example.com ", "s3creta")).expect("login");
  assert_eq!(session.actor.name, "Ana");
  assert_eq!(service.resolve(&session.token).expect("resolve"), session.actor);

  let bad = service.login(&Credentials::new("ana@example.com", "nope")).unwrap_err();
  assert_eq!(bad.status_code(), StatusCode::Forbidden);
  assert!(service.resolve(&SessionToken::new("desconocido")).is_err());

  assert!(identity.logout(&session.token).expect("logout"));
  assert!(identity.resolve(&session.token).is_err());
}

#[test]
fn duplicate_registration_is_rejected() {
  let (_service, identity) = service_with_users();
  let err = identity.register("Otra Ana", "ana@example.com", "x").unwrap_err();
  assert!(err.is_validation());
}

#[test]
fn blueprint_crud_is_owner_scoped() {
  let (service, _) = service_with_users();
  let ana = service.login(&Credentials::new("ana@example.com", "s3creta")).expect("login").actor;
  let luis = service.login(&Credentials::new("luis@example.com", "otra")).expect("login").actor;

  let bp = service.create_blueprint("NDA", DomainStubs::nda_fields(), &ana).expect("create");
  assert_eq!(service.list_blueprints(&ana).expect("list").len(), 1);
  assert!(service.list_blueprints(&luis).expect("list").is_empty());
  assert!(service.get_blueprint(&bp.id(), &luis).unwrap_err().is_not_found());

  assert!(service.delete_blueprint(&bp.id(), &luis).unwrap_err().is_not_found());
  service.delete_blueprint(&bp.id(), &ana).expect("delete");
  assert!(service.delete_blueprint(&bp.id(), &ana).unwrap_err().is_not_found());
}

#[test]
fn blueprint_validation_errors() {
  let (service, _) = service_with_users();
  let ana = service.login(&Credentials::new("ana@example.com", "s3creta")).expect("login").actor;

  let cases = vec![("", vec![FieldInput::new("text", "A")]),
                   ("Vacío", vec![]),
                   ("Sin etiqueta", vec![FieldInput::new("text", " ")]),
                   ("Tipo raro", vec![FieldInput::new("number", "N")]),
                   ("Valor", vec![FieldInput::new("checkbox", "C").with_value(json!("true"))]),
                   ("Duplicado", vec![FieldInput::new("text", "A").with_id("a"), FieldInput::new("date", "B").with_id("a")])];
  for (name, fields) in cases {
    let err = service.create_blueprint(name, fields, &ana).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::ValidationFailed, "{}", name);
  }
  assert!(service.list_blueprints(&ana).expect("list").is_empty());
}

#[test]
fn contracts_survive_blueprint_deletion() {
  let (service, _) = service_with_users();
  let ana = service.login(&Credentials::new("ana@example.com", "s3creta")).expect("login").actor;
  let bp = service.create_blueprint("NDA", DomainStubs::nda_fields(), &ana).expect("create");
  let c = service.instantiate(&bp.id(), "NDA Globex", &ana).expect("instantiate");

  let summaries = service.list_contracts(&ana).expect("list");
  assert_eq!(summaries[0].blueprint_name.as_deref(), Some("NDA"));

  service.delete_blueprint(&bp.id(), &ana).expect("delete");
  let summaries = service.list_contracts(&ana).expect("list");
  assert_eq!(summaries.len(), 1);
  assert_eq!(summaries[0].blueprint_name, None);
  let stored = service.get_contract(&c.id(), &ana).expect("get");
  assert_eq!(stored.fields().len(), 5);
  assert_eq!(stored.blueprint_id(), Some(bp.id()));
}

#[test]
fn full_lifecycle_through_the_facade() {
  let (service, _) = service_with_users();
  let ana = service.login(&Credentials::new("ana@example.com", "s3creta")).expect("login").actor;
  let bp = service.create_blueprint("NDA", DomainStubs::nda_fields(), &ana).expect("create");
  let a = service.instantiate(&bp.id(), "A", &ana).expect("a");
  let b = service.instantiate(&bp.id(), "B", &ana).expect("b");
  let c = service.instantiate(&bp.id(), "C", &ana).expect("c");

  service.set_field_values(&a.id(), &[("receiving_party".to_string(), json!("Globex"))], &ana).expect("fill");
  for action in ["approve", "send"] {
    service.transition_by_action(&a.id(), action.parse().expect("action"), &ana).expect("a");
  }
  for to in [WorkflowState::Approved, WorkflowState::Sent, WorkflowState::Signed, WorkflowState::Locked] {
    service.transition(&b.id(), to, &ana).expect("b");
  }
  service.transition(&c.id(), WorkflowState::Revoked, &ana).expect("c");

  assert_eq!(service.status_counts(&ana).expect("counts"),
             StatusCounts { total: 3, active: 2, pending_signature: 1, completed: 1, revoked: 1 });
  assert_eq!(service.history(&b.id(), &ana).expect("history").len(), 4);
  assert_eq!(service.get_contract(&a.id(), &ana)
                    .expect("get")
                    .field("receiving_party")
                    .expect("field")
                    .value()
                    .to_json(),
             json!("Globex"));
}
