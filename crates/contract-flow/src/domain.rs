// Archivo: domain.rs
// Propósito: tipos ligeros que intercambian el motor, los repositorios y la
// capa de presentación (resultado de persistencia, resúmenes y conteos).
use chrono::{DateTime, Utc};
use contract_domain::{Contract, Owned, UserId, WorkflowState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resultado de una escritura con control optimista de versiones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistResult {
    /// Escritura aplicada; `new_version` es la versión resultante.
    Ok { new_version: i64 },
    /// La versión almacenada no coincide con la esperada; nada se escribió.
    Conflict { expected: i64, actual: i64 },
}

impl PersistResult {
    pub fn is_conflict(&self) -> bool {
        matches!(self, PersistResult::Conflict { .. })
    }
}

/// Fila de la tabla de contratos que consume la capa de presentación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub id: Uuid,
    pub name: String,
    /// Nombre del blueprint de origen si todavía existe.
    pub blueprint_name: Option<String>,
    pub owner: UserId,
    pub status: WorkflowState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContractSummary {
    pub fn from_contract(contract: &Contract, blueprint_name: Option<String>) -> Self {
        Self { id: contract.id(),
               name: contract.name().to_string(),
               blueprint_name,
               owner: contract.owner(),
               status: contract.status(),
               created_at: contract.created_at(),
               updated_at: contract.updated_at() }
    }
}

/// Conteos del panel principal.
///
/// `active` es todo contrato no revocado (incluye `LOCKED`);
/// `pending_signature` agrupa `SENT` y `completed` agrupa `LOCKED`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub active: usize,
    pub pending_signature: usize,
    pub completed: usize,
    pub revoked: usize,
}

impl StatusCounts {
    pub fn tally<I>(statuses: I) -> Self
        where I: IntoIterator<Item = WorkflowState>
    {
        let mut counts = StatusCounts::default();
        for s in statuses {
            counts.total += 1;
            if s == WorkflowState::Revoked {
                counts.revoked += 1;
                continue;
            }
            counts.active += 1;
            match s {
                WorkflowState::Sent => counts.pending_signature += 1,
                WorkflowState::Locked => counts.completed += 1,
                _ => {}
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_groups_by_lifecycle_phase() {
        let counts = StatusCounts::tally(vec![WorkflowState::Created,
                                              WorkflowState::Sent,
                                              WorkflowState::Sent,
                                              WorkflowState::Locked,
                                              WorkflowState::Revoked]);
        assert_eq!(counts,
                   StatusCounts { total: 5, active: 4, pending_signature: 2, completed: 1, revoked: 1 });
    }

    #[test]
    fn locked_contracts_stay_active() {
        let counts = StatusCounts::tally(vec![WorkflowState::Locked, WorkflowState::Revoked]);
        assert_eq!(counts.active, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.revoked, 1);
    }
}
