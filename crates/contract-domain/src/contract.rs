// contract.rs
use crate::blueprint::{ensure_unique_ids, schema_hash};
use crate::{AuditTrail, Blueprint, DomainError, FieldDefinition, FieldKind, Owned, TransitionRecord, UserId,
            WorkflowState};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Instancia con estado de un blueprint.
///
/// El contrato es autocontenido: guarda su propia copia de los campos y sólo
/// conserva `blueprint_id` como referencia débil para mostrar. Nunca se
/// borra; la revocación es un estado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ContractParts")]
pub struct Contract {
  id: Uuid,
  name: String,
  blueprint_id: Option<Uuid>,
  owner: UserId,
  status: WorkflowState,
  fields: Vec<FieldDefinition>,
  status_history: AuditTrail,
  schema_hash: String,
  /// Contador de versión para control optimista; lo mantiene el repositorio.
  version: i64,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

/// Partes crudas de un contrato, usadas por las capas de persistencia para
/// rehidratar el agregado.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractParts {
  pub id: Uuid,
  pub name: String,
  pub blueprint_id: Option<Uuid>,
  pub owner: UserId,
  pub status: WorkflowState,
  pub fields: Vec<FieldDefinition>,
  pub status_history: AuditTrail,
  pub schema_hash: String,
  pub version: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Contract {
  /// Crea un contrato nuevo copiando los campos del blueprint.
  ///
  /// Por defecto cada valor se reinicia al vacío de su tipo; con
  /// `seed_defaults` se conservan los valores configurados en el blueprint.
  pub fn instantiate(blueprint: &Blueprint,
                     name: &str,
                     owner: UserId,
                     seed_defaults: bool,
                     at: DateTime<Utc>)
                     -> Result<Self, DomainError> {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre del contrato no puede estar vacío".to_string()));
    }
    let fields: Vec<FieldDefinition> = blueprint.fields()
                                                .iter()
                                                .map(|f| if seed_defaults { f.clone() } else { f.cleared() })
                                                .collect();
    Ok(Self { id: Uuid::new_v4(),
              name: name.trim().to_string(),
              blueprint_id: Some(blueprint.id()),
              owner,
              status: WorkflowState::Created,
              fields,
              status_history: AuditTrail::new(),
              schema_hash: blueprint.schema_hash().to_string(),
              version: 0,
              created_at: at,
              updated_at: at })
  }

  pub fn from_parts(parts: ContractParts) -> Result<Self, DomainError> {
    ensure_unique_ids(&parts.fields)?;
    if parts.status_history.current_state(WorkflowState::Created) != parts.status {
      return Err(DomainError::ValidationError(format!("El historial del contrato {} no termina en {}",
                                                      parts.id, parts.status)));
    }
    Ok(Self { id: parts.id,
              name: parts.name,
              blueprint_id: parts.blueprint_id,
              owner: parts.owner,
              status: parts.status,
              fields: parts.fields,
              status_history: parts.status_history,
              schema_hash: parts.schema_hash,
              version: parts.version,
              created_at: parts.created_at,
              updated_at: parts.updated_at })
  }

  /// Aplica una transición validándola contra la tabla. Si la arista no
  /// existe el contrato queda intacto.
  pub fn apply_transition(&mut self,
                          to: WorkflowState,
                          actor: UserId,
                          at: DateTime<Utc>)
                          -> Result<TransitionRecord, DomainError> {
    self.status.check_transition(to)?;
    let record = TransitionRecord { from: self.status, to, at, actor };
    self.status_history.append(record.clone());
    self.status = to;
    self.updated_at = at;
    Ok(record)
  }

  pub fn ensure_editable(&self) -> Result<(), DomainError> {
    if self.status.is_terminal() {
      return Err(DomainError::Immutable(self.status));
    }
    Ok(())
  }

  /// Reemplaza el conjunto completo de campos (last-write-wins).
  ///
  /// Con `enforce_kinds` el conjunto enviado debe tener exactamente los
  /// mismos ids que el almacenado y con el mismo tipo.
  pub fn replace_fields(&mut self,
                        fields: Vec<FieldDefinition>,
                        enforce_kinds: bool,
                        at: DateTime<Utc>)
                        -> Result<(), DomainError> {
    self.ensure_editable()?;
    ensure_unique_ids(&fields)?;
    for f in &fields {
      f.value().validate()?;
    }
    if enforce_kinds {
      self.check_kind_integrity(&fields)?;
    }
    self.fields = fields;
    self.updated_at = at;
    Ok(())
  }

  fn check_kind_integrity(&self, submitted: &[FieldDefinition]) -> Result<(), DomainError> {
    let mut stored: IndexMap<&str, FieldKind> = self.fields.iter().map(|f| (f.id(), f.kind())).collect();
    for f in submitted {
      match stored.shift_remove(f.id()) {
        Some(kind) if kind == f.kind() => {}
        Some(kind) => {
          return Err(DomainError::ValidationError(format!("El campo '{}' es de tipo {} y no puede cambiar a {}",
                                                          f.id(),
                                                          kind,
                                                          f.kind())));
        }
        None => {
          return Err(DomainError::ValidationError(format!("El campo '{}' no existe en el contrato", f.id())));
        }
      }
    }
    if let Some((missing, _)) = stored.first() {
      return Err(DomainError::ValidationError(format!("Falta el campo '{}' en la actualización", missing)));
    }
    Ok(())
  }

  /// La huella de los campos actuales coincide con la del blueprint de
  /// origen.
  pub fn verify_schema(&self) -> bool {
    schema_hash(&self.fields) == self.schema_hash
  }

  pub fn set_version(&mut self, version: i64) {
    self.version = version;
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn blueprint_id(&self) -> Option<Uuid> {
    self.blueprint_id
  }

  pub fn status(&self) -> WorkflowState {
    self.status
  }

  pub fn is_editable(&self) -> bool {
    !self.status.is_terminal()
  }

  pub fn fields(&self) -> &[FieldDefinition] {
    &self.fields
  }

  pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
    self.fields.iter().find(|f| f.id() == id)
  }

  pub fn status_history(&self) -> &AuditTrail {
    &self.status_history
  }

  pub fn schema_hash(&self) -> &str {
    &self.schema_hash
  }

  pub fn version(&self) -> i64 {
    self.version
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn updated_at(&self) -> DateTime<Utc> {
    self.updated_at
  }
}

impl Owned for Contract {
  fn owner(&self) -> UserId {
    self.owner
  }
}

impl fmt::Display for Contract {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Contract(id: {}, name: {}, status: {}, fields: {})",
           self.id,
           self.name,
           self.status,
           self.fields.len())
  }
}

impl TryFrom<ContractParts> for Contract {
  type Error = DomainError;

  fn try_from(parts: ContractParts) -> Result<Self, Self::Error> {
    Contract::from_parts(parts)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Actor, FieldInput, FieldValue};
  use serde_json::json;

  fn setup() -> (Actor, Blueprint) {
    let actor = Actor::new(UserId::new(), "Ana");
    let bp = Blueprint::from_inputs("Servicios",
                                    vec![FieldInput::new("text", "Cliente").with_id("client").with_value(json!("ACME")),
                                         FieldInput::new("date", "Inicio").with_id("start"),
                                         FieldInput::new("signature", "Firma").with_id("sig")],
                                    &actor).unwrap();
    (actor, bp)
  }

  #[test]
  fn test_instantiate_resets_values() -> Result<(), DomainError> {
    let (actor, bp) = setup();
    let c = Contract::instantiate(&bp, "Servicios 2025", actor.id, false, Utc::now())?;
    assert_eq!(c.status(), WorkflowState::Created);
    assert!(c.status_history().is_empty());
    assert_eq!(c.field("client").unwrap().value(), &FieldValue::Text(String::new()));
    assert_eq!(c.blueprint_id(), Some(bp.id()));
    assert!(c.verify_schema());

    let seeded = Contract::instantiate(&bp, "Servicios 2025", actor.id, true, Utc::now())?;
    assert_eq!(seeded.field("client").unwrap().value(), &FieldValue::Text("ACME".into()));
    Ok(())
  }

  #[test]
  fn test_illegal_transition_leaves_contract_untouched() -> Result<(), DomainError> {
    let (actor, bp) = setup();
    let mut c = Contract::instantiate(&bp, "X", actor.id, false, Utc::now())?;
    let before = c.clone();
    let err = c.apply_transition(WorkflowState::Signed, actor.id, Utc::now()).unwrap_err();
    assert_eq!(err, DomainError::IllegalTransition { from: WorkflowState::Created, to: WorkflowState::Signed });
    assert_eq!(c, before);
    Ok(())
  }

  #[test]
  fn test_transition_chain_records_history() -> Result<(), DomainError> {
    let (actor, bp) = setup();
    let mut c = Contract::instantiate(&bp, "X", actor.id, false, Utc::now())?;
    for to in [WorkflowState::Approved, WorkflowState::Sent, WorkflowState::Signed, WorkflowState::Locked] {
      c.apply_transition(to, actor.id, Utc::now())?;
    }
    assert_eq!(c.status_history().len(), 4);
    assert!(c.status_history().is_consistent(WorkflowState::Created));
    assert_eq!(c.ensure_editable(), Err(DomainError::Immutable(WorkflowState::Locked)));
    Ok(())
  }

  #[test]
  fn test_replace_fields_kind_integrity() -> Result<(), DomainError> {
    let (actor, bp) = setup();
    let mut c = Contract::instantiate(&bp, "X", actor.id, false, Utc::now())?;

    let mut good: Vec<FieldDefinition> = c.fields().to_vec();
    good[0].set_value(FieldValue::Text("Globex".into()))?;
    good.reverse();
    c.replace_fields(good.clone(), true, Utc::now())?;
    assert_eq!(c.field("client").unwrap().value(), &FieldValue::Text("Globex".into()));

    let retyped = vec![FieldDefinition::new("client", FieldKind::Checkbox, "Cliente")?,
                       FieldDefinition::new("start", FieldKind::Date, "Inicio")?,
                       FieldDefinition::new("sig", FieldKind::Signature, "Firma")?];
    assert!(c.replace_fields(retyped.clone(), true, Utc::now()).is_err());
    assert!(c.replace_fields(good[..2].to_vec(), true, Utc::now()).is_err());

    // Sin la comprobación se acepta el reemplazo completo.
    c.replace_fields(retyped, false, Utc::now())?;
    assert_eq!(c.field("client").unwrap().kind(), FieldKind::Checkbox);
    assert!(!c.verify_schema());
    Ok(())
  }

  #[test]
  fn test_from_parts_rejects_inconsistent_status() {
    let (actor, bp) = setup();
    let c = Contract::instantiate(&bp, "X", actor.id, false, Utc::now()).unwrap();
    let parts = ContractParts { id: c.id(),
                                name: c.name().to_string(),
                                blueprint_id: c.blueprint_id(),
                                owner: c.owner(),
                                status: WorkflowState::Signed,
                                fields: c.fields().to_vec(),
                                status_history: AuditTrail::new(),
                                schema_hash: c.schema_hash().to_string(),
                                version: 0,
                                created_at: c.created_at(),
                                updated_at: c.updated_at() };
    assert!(Contract::from_parts(parts).is_err());
  }

  #[test]
  fn test_deserialize_checks_history() -> Result<(), DomainError> {
    let (actor, bp) = setup();
    let mut c = Contract::instantiate(&bp, "X", actor.id, false, Utc::now())?;
    c.apply_transition(WorkflowState::Approved, actor.id, Utc::now())?;
    let v = serde_json::to_value(&c)?;
    let back: Contract = serde_json::from_value(v.clone())?;
    assert_eq!(back, c);

    let mut tampered = v;
    tampered["status"] = json!("SIGNED");
    assert!(serde_json::from_value::<Contract>(tampered.clone()).is_err());
    tampered["status"] = json!("APPROVED");
    tampered["status_history"] = json!([]);
    assert!(serde_json::from_value::<Contract>(tampered).is_err());
    Ok(())
  }
}
