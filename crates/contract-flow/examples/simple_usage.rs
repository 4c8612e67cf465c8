// Ejemplo mínimo: registrar un usuario, crear un blueprint, instanciar un
// contrato y llevarlo hasta LOCKED con los repositorios en memoria.
use contract_domain::{DomainStubs, InMemoryBlueprintRepository, TransitionAction};
use contract_flow::{ContractService, Credentials, EngineConfig, InMemoryContractRepository, InMemoryIdentityProvider};
use serde_json::json;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let identity = Arc::new(InMemoryIdentityProvider::new());
  identity.register("Ana", "ana@example.com", "s3creta")?;
  let service = ContractService::new(identity,
                                     Arc::new(InMemoryBlueprintRepository::new()),
                                     Arc::new(InMemoryContractRepository::new()),
                                     EngineConfig::default());

  let ana = service.login(&Credentials::new("ana@example.com", "s3creta"))?.actor;
  let bp = service.create_blueprint("Acuerdo de confidencialidad", DomainStubs::nda_fields(), &ana)?;
  let contract = service.instantiate(&bp.id(), "NDA con Globex", &ana)?;

  service.set_field_values(&contract.id(),
                           &[("disclosing_party".to_string(), json!("ACME")),
                             ("receiving_party".to_string(), json!("Globex")),
                             ("start_date".to_string(), json!("2025-03-01"))],
                           &ana)?;
  for action in [TransitionAction::Approve, TransitionAction::Send] {
    service.transition_by_action(&contract.id(), action, &ana)?;
  }
  service.set_field_values(&contract.id(), &[("signature".to_string(), json!("Globex S.A."))], &ana)?;
  for action in [TransitionAction::Sign, TransitionAction::Lock] {
    service.transition_by_action(&contract.id(), action, &ana)?;
  }

  let done = service.get_contract(&contract.id(), &ana)?;
  println!("{}", done);
  for record in service.history(&contract.id(), &ana)? {
    println!("  {} -> {} ({})", record.from, record.to, record.at);
  }
  Ok(())
}
