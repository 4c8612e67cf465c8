// workflow_state.rs
use crate::DomainError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Estados del ciclo de vida de un contrato.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum WorkflowState {
  Created,
  Approved,
  Sent,
  Signed,
  Locked,
  Revoked,
}

/// Acción con nombre asociada a cada arista de la tabla.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TransitionAction {
  Approve,
  Send,
  Sign,
  Lock,
  Revoke,
}

/// Tabla de transiciones legales `(desde, hacia, acción)`. Cualquier par que
/// no aparezca aquí es ilegal.
pub const TRANSITIONS: [(WorkflowState, WorkflowState, TransitionAction); 6] =
  [(WorkflowState::Created, WorkflowState::Approved, TransitionAction::Approve),
   (WorkflowState::Created, WorkflowState::Revoked, TransitionAction::Revoke),
   (WorkflowState::Approved, WorkflowState::Sent, TransitionAction::Send),
   (WorkflowState::Sent, WorkflowState::Signed, TransitionAction::Sign),
   (WorkflowState::Sent, WorkflowState::Revoked, TransitionAction::Revoke),
   (WorkflowState::Signed, WorkflowState::Locked, TransitionAction::Lock)];

static EDGES: Lazy<HashMap<(WorkflowState, WorkflowState), TransitionAction>> =
  Lazy::new(|| TRANSITIONS.iter().map(|(from, to, action)| ((*from, *to), *action)).collect());

impl WorkflowState {
  pub const ALL: [WorkflowState; 6] = [WorkflowState::Created,
                                       WorkflowState::Approved,
                                       WorkflowState::Sent,
                                       WorkflowState::Signed,
                                       WorkflowState::Locked,
                                       WorkflowState::Revoked];

  pub fn as_str(&self) -> &'static str {
    match self {
      WorkflowState::Created => "CREATED",
      WorkflowState::Approved => "APPROVED",
      WorkflowState::Sent => "SENT",
      WorkflowState::Signed => "SIGNED",
      WorkflowState::Locked => "LOCKED",
      WorkflowState::Revoked => "REVOKED",
    }
  }

  /// `LOCKED` y `REVOKED` no tienen aristas de salida.
  pub fn is_terminal(&self) -> bool {
    matches!(self, WorkflowState::Locked | WorkflowState::Revoked)
  }

  pub fn can_transition_to(&self, to: WorkflowState) -> bool {
    EDGES.contains_key(&(*self, to))
  }

  /// Acción que lleva de `self` a `to`, si la arista existe.
  pub fn action_to(&self, to: WorkflowState) -> Option<TransitionAction> {
    EDGES.get(&(*self, to)).copied()
  }

  /// Valida la arista contra la tabla.
  pub fn check_transition(&self, to: WorkflowState) -> Result<TransitionAction, DomainError> {
    self.action_to(to).ok_or(DomainError::IllegalTransition { from: *self, to })
  }

  /// Destinos alcanzables desde este estado, en el orden de la tabla.
  pub fn next_states(&self) -> Vec<WorkflowState> {
    TRANSITIONS.iter().filter(|(from, _, _)| from == self).map(|(_, to, _)| *to).collect()
  }

  /// Resuelve una acción con nombre desde este estado.
  pub fn target_of(&self, action: TransitionAction) -> Option<WorkflowState> {
    TRANSITIONS.iter().find(|(from, _, a)| from == self && *a == action).map(|(_, to, _)| *to)
  }
}

impl Default for WorkflowState {
  fn default() -> Self {
    WorkflowState::Created
  }
}

impl fmt::Display for WorkflowState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for WorkflowState {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_uppercase().as_str() {
      "CREATED" => Ok(WorkflowState::Created),
      "APPROVED" => Ok(WorkflowState::Approved),
      "SENT" => Ok(WorkflowState::Sent),
      "SIGNED" => Ok(WorkflowState::Signed),
      "LOCKED" => Ok(WorkflowState::Locked),
      "REVOKED" => Ok(WorkflowState::Revoked),
      other => Err(DomainError::ValidationError(format!("Estado desconocido: '{}'", other))),
    }
  }
}

impl TryFrom<String> for WorkflowState {
  type Error = DomainError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl TransitionAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransitionAction::Approve => "approve",
      TransitionAction::Send => "send",
      TransitionAction::Sign => "sign",
      TransitionAction::Lock => "lock",
      TransitionAction::Revoke => "revoke",
    }
  }

  /// Estado al que lleva la acción, sea cual sea el origen.
  pub fn target(&self) -> WorkflowState {
    match self {
      TransitionAction::Approve => WorkflowState::Approved,
      TransitionAction::Send => WorkflowState::Sent,
      TransitionAction::Sign => WorkflowState::Signed,
      TransitionAction::Lock => WorkflowState::Locked,
      TransitionAction::Revoke => WorkflowState::Revoked,
    }
  }
}

impl fmt::Display for TransitionAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for TransitionAction {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "approve" => Ok(TransitionAction::Approve),
      "send" => Ok(TransitionAction::Send),
      "sign" => Ok(TransitionAction::Sign),
      "lock" => Ok(TransitionAction::Lock),
      "revoke" => Ok(TransitionAction::Revoke),
      other => Err(DomainError::ValidationError(format!("Acción desconocida: '{}'", other))),
    }
  }
}

impl TryFrom<String> for TransitionAction {
  type Error = DomainError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_table_has_exactly_six_edges() {
    let legal: usize = WorkflowState::ALL.iter()
                                         .map(|from| WorkflowState::ALL.iter().filter(|to| from.can_transition_to(**to)).count())
                                         .sum();
    assert_eq!(legal, 6);
  }

  #[test]
  fn test_terminal_states_have_no_exits() {
    for s in WorkflowState::ALL {
      assert_eq!(s.is_terminal(), s.next_states().is_empty(), "estado {}", s);
    }
  }

  #[test]
  fn test_no_edge_returns_to_created_or_self() {
    for s in WorkflowState::ALL {
      assert!(!s.can_transition_to(s));
      assert!(!s.can_transition_to(WorkflowState::Created));
    }
  }

  #[test]
  fn test_check_transition_errors() {
    assert_eq!(WorkflowState::Created.check_transition(WorkflowState::Approved), Ok(TransitionAction::Approve));
    assert_eq!(WorkflowState::Approved.check_transition(WorkflowState::Signed),
               Err(DomainError::IllegalTransition { from: WorkflowState::Approved, to: WorkflowState::Signed }));
  }

  #[test]
  fn test_actions_resolve_per_state() {
    assert_eq!(WorkflowState::Sent.target_of(TransitionAction::Revoke), Some(WorkflowState::Revoked));
    assert_eq!(WorkflowState::Approved.target_of(TransitionAction::Revoke), None);
    assert_eq!(WorkflowState::Signed.target_of(TransitionAction::Lock), Some(WorkflowState::Locked));
    for (from, to, action) in TRANSITIONS {
      assert_eq!(action.target(), to, "arista {} -> {}", from, to);
    }
  }

  #[test]
  fn test_parse_and_display() {
    assert_eq!("signed".parse::<WorkflowState>().unwrap(), WorkflowState::Signed);
    assert_eq!(WorkflowState::Locked.to_string(), "LOCKED");
    assert_eq!(serde_json::to_string(&WorkflowState::Revoked).unwrap(), "\"REVOKED\"");
    assert!("archived".parse::<WorkflowState>().is_err());
  }

  #[test]
  fn test_deserialize_ignores_case() {
    assert_eq!(serde_json::from_str::<WorkflowState>("\"signed\"").unwrap(), WorkflowState::Signed);
    assert_eq!(serde_json::from_str::<WorkflowState>("\"Locked\"").unwrap(), WorkflowState::Locked);
    assert_eq!(serde_json::from_str::<TransitionAction>("\"REVOKE\"").unwrap(), TransitionAction::Revoke);
    assert!(serde_json::from_str::<WorkflowState>("\"archived\"").is_err());
  }
}
