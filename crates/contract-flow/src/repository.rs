// Archivo: repository.rs
// Propósito: definir el trait `ContractRepository`, el contrato que deben
// implementar las persistencias de contratos (SQLite, in-memory, etc.).
use crate::domain::PersistResult;
use crate::errors::Result;
use chrono::{DateTime, Utc};
use contract_domain::{Contract, FieldDefinition, TransitionRecord, UserId};
use uuid::Uuid;

/// Persistencia de contratos con control optimista de versiones.
///
/// Todas las escrituras reciben `expected_version`; si la versión guardada no
/// coincide devuelven `PersistResult::Conflict` sin escribir nada. Una
/// escritura aplicada incrementa la versión en uno.
pub trait ContractRepository: Send + Sync {
    /// Inserta un contrato recién instanciado (versión 0).
    fn insert_contract(&self, contract: &Contract) -> Result<()>;

    /// Carga el contrato completo con su historial, sin comprobar propietario.
    fn get_contract(&self, id: &Uuid) -> Result<Option<Contract>>;

    /// Contratos de `owner`, el más reciente primero.
    fn list_contracts(&self, owner: &UserId) -> Result<Vec<Contract>>;

    /// Persiste el cambio de estado y el registro de auditoría de forma
    /// atómica: o se escriben ambos o ninguno.
    fn commit_transition(&self, id: &Uuid, record: &TransitionRecord, expected_version: i64) -> Result<PersistResult>;

    /// Reemplaza el conjunto de campos completo.
    fn replace_fields(&self,
                      id: &Uuid,
                      fields: &[FieldDefinition],
                      updated_at: DateTime<Utc>,
                      expected_version: i64)
                      -> Result<PersistResult>;
}
