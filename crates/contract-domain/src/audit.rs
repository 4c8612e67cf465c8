// audit.rs
use crate::{UserId, WorkflowState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registro inmutable de una transición de estado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
  pub from: WorkflowState,
  pub to: WorkflowState,
  pub at: DateTime<Utc>,
  pub actor: UserId,
}

/// Historial de estados de un contrato (append-only).
///
/// No tiene identidad propia ni API de borrado o edición: sólo el agregado
/// `Contract` puede añadir registros. El orden de almacenamiento es el de
/// creación (el más antiguo primero).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail {
  records: Vec<TransitionRecord>,
}

impl AuditTrail {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reconstruye el historial desde almacenamiento.
  pub fn from_records(records: Vec<TransitionRecord>) -> Self {
    Self { records }
  }

  pub(crate) fn append(&mut self, record: TransitionRecord) {
    self.records.push(record);
  }

  pub fn records(&self) -> &[TransitionRecord] {
    &self.records
  }

  pub fn iter(&self) -> std::slice::Iter<'_, TransitionRecord> {
    self.records.iter()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn last(&self) -> Option<&TransitionRecord> {
    self.records.last()
  }

  /// Estado actual según el historial partiendo de `initial`.
  pub fn current_state(&self, initial: WorkflowState) -> WorkflowState {
    self.last().map(|r| r.to).unwrap_or(initial)
  }

  /// Comprueba que la cadena sea continua (`from` de cada registro igual al
  /// `to` del anterior) y que cada arista exista en la tabla.
  pub fn is_consistent(&self, initial: WorkflowState) -> bool {
    let mut expected = initial;
    for r in &self.records {
      if r.from != expected || !r.from.can_transition_to(r.to) {
        return false;
      }
      expected = r.to;
    }
    true
  }
}

impl<'a> IntoIterator for &'a AuditTrail {
  type Item = &'a TransitionRecord;
  type IntoIter = std::slice::Iter<'a, TransitionRecord>;

  fn into_iter(self) -> Self::IntoIter {
    self.records.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(from: WorkflowState, to: WorkflowState, actor: UserId) -> TransitionRecord {
    TransitionRecord { from, to, at: Utc::now(), actor }
  }

  #[test]
  fn test_consistency_checks_chain_and_table() {
    let actor = UserId::new();
    let mut trail = AuditTrail::new();
    assert!(trail.is_consistent(WorkflowState::Created));
    trail.append(record(WorkflowState::Created, WorkflowState::Approved, actor));
    trail.append(record(WorkflowState::Approved, WorkflowState::Sent, actor));
    assert!(trail.is_consistent(WorkflowState::Created));
    assert_eq!(trail.current_state(WorkflowState::Created), WorkflowState::Sent);

    let broken = AuditTrail::from_records(vec![record(WorkflowState::Created, WorkflowState::Signed, actor)]);
    assert!(!broken.is_consistent(WorkflowState::Created));
  }

  #[test]
  fn test_serializes_as_plain_list() {
    let actor = UserId::new();
    let trail = AuditTrail::from_records(vec![record(WorkflowState::Created, WorkflowState::Revoked, actor)]);
    let v = serde_json::to_value(&trail).unwrap();
    assert!(v.is_array());
    assert_eq!(v[0]["to"], serde_json::json!("REVOKED"));
  }
}
