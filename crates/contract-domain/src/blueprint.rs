// blueprint.rs
use crate::{Actor, DomainError, FieldDefinition, FieldInput, Owned, UserId};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Plantilla reutilizable de campos tipados. Una vez creada no se edita:
/// los contratos copian sus campos al instanciarse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
  id: Uuid,
  name: String,
  fields: Vec<FieldDefinition>,
  owner: UserId,
  created_at: DateTime<Utc>,
  schema_hash: String,
}

impl Blueprint {
  pub fn new<I>(name: &str, fields: I, owner: UserId) -> Result<Self, DomainError>
    where I: IntoIterator<Item = FieldDefinition>
  {
    Self::restore(Uuid::new_v4(), name, fields, owner, Utc::now().trunc_subsecs(6))
  }

  /// Punto de entrada de `createBlueprint`: valida entradas sin tipar
  /// (tipo fuera del enum, etiqueta vacía, valores incompatibles).
  pub fn from_inputs(name: &str, inputs: Vec<FieldInput>, actor: &Actor) -> Result<Self, DomainError> {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre del blueprint no puede estar vacío".to_string()));
    }
    let fields = inputs.into_iter().map(FieldInput::into_definition).collect::<Result<Vec<_>, _>>()?;
    Self::new(name, fields, actor.id)
  }

  /// Reconstruye un blueprint existente (por ejemplo desde la base de datos).
  pub fn restore<I>(id: Uuid,
                    name: &str,
                    fields: I,
                    owner: UserId,
                    created_at: DateTime<Utc>)
                    -> Result<Self, DomainError>
    where I: IntoIterator<Item = FieldDefinition>
  {
    if name.trim().is_empty() {
      return Err(DomainError::ValidationError("El nombre del blueprint no puede estar vacío".to_string()));
    }
    let fields: Vec<FieldDefinition> = fields.into_iter().collect();
    if fields.is_empty() {
      return Err(DomainError::ValidationError("Un blueprint debe tener al menos un campo".to_string()));
    }
    ensure_unique_ids(&fields)?;
    let schema_hash = schema_hash(&fields);
    Ok(Self { id, name: name.trim().to_string(), fields, owner, created_at, schema_hash })
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn fields(&self) -> &[FieldDefinition] {
    &self.fields
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn schema_hash(&self) -> &str {
    &self.schema_hash
  }
}

impl Owned for Blueprint {
  fn owner(&self) -> UserId {
    self.owner
  }
}

impl fmt::Display for Blueprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Blueprint(id: {}, name: {}, fields: {})", self.id, self.name, self.fields.len())
  }
}

/// Huella SHA-256 de los pares `(id, kind)` ordenados por id. Dos conjuntos
/// de campos con los mismos ids y tipos producen la misma huella aunque
/// cambien etiquetas, valores u orden.
pub fn schema_hash(fields: &[FieldDefinition]) -> String {
  let mut pairs: Vec<(&str, &str)> = fields.iter().map(|f| (f.id(), f.kind().as_str())).collect();
  pairs.sort();
  let mut hasher = Sha256::new();
  for (id, kind) in pairs {
    hasher.update(id.as_bytes());
    hasher.update([0u8]);
    hasher.update(kind.as_bytes());
    hasher.update([0xffu8]);
  }
  format!("{:x}", hasher.finalize())
}

pub(crate) fn ensure_unique_ids(fields: &[FieldDefinition]) -> Result<(), DomainError> {
  let mut seen = HashSet::new();
  for f in fields {
    if !seen.insert(f.id()) {
      return Err(DomainError::ValidationError(format!("Id de campo duplicado: '{}'", f.id())));
    }
  }
  Ok(())
}
