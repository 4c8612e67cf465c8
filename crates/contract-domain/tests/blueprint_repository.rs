use contract_domain::{Actor, BlueprintRepository, DomainError, DomainStubs, FieldKind, InMemoryBlueprintRepository, UserId};

#[test]
fn list_is_owner_scoped_and_most_recent_first() -> Result<(), DomainError> {
  let ana = Actor::new(UserId::new(), "Ana");
  let luis = Actor::new(UserId::new(), "Luis");
  let repo = DomainStubs::sample_repo(&ana)?;
  repo.save_blueprint(DomainStubs::nda_blueprint(&luis)?)?;

  let mine = repo.list_blueprints(&ana.id)?;
  assert_eq!(mine.len(), 2);
  // sample_repo inserts the NDA first, so the services blueprint is newer
  assert_eq!(mine[0].name(), "Contrato de servicios");
  assert_eq!(mine[1].name(), "Acuerdo de confidencialidad");
  assert_eq!(repo.list_blueprints(&luis.id)?.len(), 1);
  Ok(())
}

#[test]
fn delete_requires_ownership() -> Result<(), DomainError> {
  let ana = Actor::new(UserId::new(), "Ana");
  let luis = Actor::new(UserId::new(), "Luis");
  let repo = InMemoryBlueprintRepository::new();
  let id = repo.save_blueprint(DomainStubs::nda_blueprint(&ana)?)?;

  assert!(!repo.delete_blueprint(&id, &luis.id)?);
  assert!(repo.get_blueprint(&id)?.is_some());
  assert!(repo.delete_blueprint(&id, &ana.id)?);
  assert!(repo.get_blueprint(&id)?.is_none());
  assert!(!repo.delete_blueprint(&id, &ana.id)?);
  Ok(())
}

#[test]
fn stub_blueprint_fields_are_typed() -> Result<(), DomainError> {
  let ana = Actor::new(UserId::new(), "Ana");
  let bp = DomainStubs::nda_blueprint(&ana)?;
  let kinds: Vec<FieldKind> = bp.fields().iter().map(|f| f.kind()).collect();
  assert_eq!(kinds,
             vec![FieldKind::Text, FieldKind::Text, FieldKind::Date, FieldKind::Checkbox, FieldKind::Signature]);
  Ok(())
}
