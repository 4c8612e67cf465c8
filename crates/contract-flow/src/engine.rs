// Archivo: engine.rs
// Propósito: implementar `WorkflowEngine`, el motor del ciclo de vida de los
// contratos: instanciación, transiciones de estado y edición de campos.
//
// Cada operación de lectura-modificación-escritura se serializa por contrato
// con una tabla de locks y además se persiste con `expected_version`, de modo
// que dos escritores sobre el mismo contrato nunca se pisan en silencio.
use crate::access::authorize;
use crate::domain::PersistResult;
use crate::errors::{FlowError, Result};
use crate::repository::ContractRepository;
use chrono::{DateTime, SubsecRound, Utc};
use contract_domain::{Actor, BlueprintRepository, Contract, DomainError, FieldDefinition, FieldValue, TransitionAction,
                      TransitionRecord, WorkflowState};
use dashmap::DashMap;
use log::{debug, info, warn};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Configuración del motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Copiar los valores configurados en el blueprint al instanciar. Por
    /// defecto los valores se reinician al vacío de su tipo.
    pub seed_blueprint_defaults: bool,
    /// Exigir en `update_fields` los mismos ids y tipos que ya tiene el
    /// contrato.
    pub enforce_field_kinds: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { seed_blueprint_defaults: false, enforce_field_kinds: true }
    }
}

impl EngineConfig {
    /// Lee `CONTRACTS_SEED_DEFAULTS` y `CONTRACTS_ENFORCE_FIELD_KINDS`
    /// (cargando `.env` si existe). Valores ausentes o ilegibles conservan el
    /// default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self { seed_blueprint_defaults: env_flag("CONTRACTS_SEED_DEFAULTS", defaults.seed_blueprint_defaults),
               enforce_field_kinds: env_flag("CONTRACTS_ENFORCE_FIELD_KINDS", defaults.enforce_field_kinds) }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw).unwrap_or_else(|| {
                                       warn!("valor no reconocido para {}: '{}', se usa {}", key, raw, default);
                                       default
                                   }),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Marca temporal truncada a microsegundos, la resolución que guardan los
/// backends persistentes.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Motor del flujo de contratos.
///
/// Responsabilidades:
/// - instanciar contratos a partir de blueprints (sin exigir propiedad del
///   blueprint)
/// - validar cada transición contra la tabla y persistir estado y auditoría
///   de forma atómica
/// - reemplazar campos mientras el contrato no esté en un estado terminal
///
/// Toda operación recibe el `Actor` explícitamente; un contrato ajeno se
/// reporta como `FlowError::NotFound`.
pub struct WorkflowEngine {
    contracts: Arc<dyn ContractRepository>,
    templates: Arc<dyn BlueprintRepository>,
    config: EngineConfig,
    /// Lock por contrato para las operaciones de lectura-modificación-escritura.
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl WorkflowEngine {
    pub fn new(contracts: Arc<dyn ContractRepository>,
               templates: Arc<dyn BlueprintRepository>,
               config: EngineConfig)
               -> Self {
        Self { contracts, templates, config, locks: DashMap::new() }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Crea un contrato a partir del blueprint `blueprint_id`.
    ///
    /// `NotFound` si el blueprint no existe. Cualquier usuario autenticado
    /// puede instanciar cualquier blueprint; el contrato pertenece a `actor`.
    pub fn instantiate(&self, blueprint_id: &Uuid, name: &str, actor: &Actor) -> Result<Contract> {
        let blueprint = self.templates
                            .get_blueprint(blueprint_id)?
                            .ok_or_else(|| FlowError::NotFound(format!("blueprint {}", blueprint_id)))?;
        let contract = Contract::instantiate(&blueprint, name, actor.id, self.config.seed_blueprint_defaults, now())?;
        self.contracts.insert_contract(&contract)?;
        info!("contrato {} creado desde blueprint {} por {}", contract.id(), blueprint_id, actor.id);
        Ok(contract)
    }

    /// Lleva el contrato a `to` si la arista existe en la tabla.
    ///
    /// Estado y registro de auditoría se persisten en una sola escritura. En
    /// caso de error el contrato almacenado queda intacto.
    pub fn transition(&self, id: &Uuid, to: WorkflowState, actor: &Actor) -> Result<Contract> {
        self.with_contract_lock(id, || {
                let mut contract = self.load_owned(id, actor)?;
                let expected = contract.version();
                let record = contract.apply_transition(to, actor.id, now()).map_err(|e| {
                                                                                debug!("transición rechazada en {}: {}", id, e);
                                                                                e
                                                                            })?;
                let new_version = self.settle(id, self.contracts.commit_transition(id, &record, expected)?)?;
                contract.set_version(new_version);
                info!("contrato {}: {} -> {} por {}", id, record.from, record.to, actor.id);
                Ok(contract)
            })
    }

    /// Variante de `transition` que recibe la acción con nombre (`approve`,
    /// `send`, `sign`, `lock`, `revoke`).
    pub fn transition_by_action(&self, id: &Uuid, action: TransitionAction, actor: &Actor) -> Result<Contract> {
        self.transition(id, action.target(), actor)
    }

    /// Reemplaza el conjunto completo de campos (last-write-wins).
    ///
    /// Errores, en este orden: `NotFound` si el contrato no es de `actor`,
    /// `Immutable` si está en `LOCKED`/`REVOKED`, `ValidationError` si algún
    /// valor no corresponde a su tipo o, con `enforce_field_kinds`, si el
    /// conjunto no coincide con el almacenado.
    pub fn update_fields(&self, id: &Uuid, fields: Vec<FieldDefinition>, actor: &Actor) -> Result<Contract> {
        self.write_fields(id, actor, |_| Ok(fields))
    }

    /// Cambia sólo los valores indicados por id de campo, conservando el
    /// resto. Es la forma en que el editor guarda un formulario.
    pub fn update_field_values(&self, id: &Uuid, values: &[(String, JsonValue)], actor: &Actor) -> Result<Contract> {
        self.write_fields(id, actor, |contract| {
                let mut fields = contract.fields().to_vec();
                for (field_id, raw) in values {
                    let field = fields.iter_mut().find(|f| f.id() == field_id).ok_or_else(|| {
                                    DomainError::ValidationError(format!("El campo '{}' no existe en el contrato", field_id))
                                })?;
                    let value = FieldValue::from_json(field.kind(), raw)?;
                    field.set_value(value)?;
                }
                Ok(fields)
            })
    }

    fn write_fields<F>(&self, id: &Uuid, actor: &Actor, build: F) -> Result<Contract>
        where F: FnOnce(&Contract) -> std::result::Result<Vec<FieldDefinition>, DomainError>
    {
        self.with_contract_lock(id, || {
                let mut contract = self.load_owned(id, actor)?;
                let expected = contract.version();
                let applied =
                    contract.ensure_editable()
                            .and_then(|_| build(&contract))
                            .and_then(|fields| contract.replace_fields(fields, self.config.enforce_field_kinds, now()));
                if let Err(e) = applied {
                    debug!("edición rechazada en {}: {}", id, e);
                    return Err(e.into());
                }
                let result = self.contracts
                                 .replace_fields(id, contract.fields(), contract.updated_at(), expected)?;
                let new_version = self.settle(id, result)?;
                contract.set_version(new_version);
                info!("contrato {}: {} campos guardados por {}", id, contract.fields().len(), actor.id);
                Ok(contract)
            })
    }

    pub fn get_contract(&self, id: &Uuid, actor: &Actor) -> Result<Contract> {
        self.load_owned(id, actor)
    }

    /// Contratos de `actor`, el más reciente primero.
    pub fn list_contracts(&self, actor: &Actor) -> Result<Vec<Contract>> {
        self.contracts.list_contracts(&actor.id)
    }

    /// Historial de transiciones, el más antiguo primero.
    pub fn history(&self, id: &Uuid, actor: &Actor) -> Result<Vec<TransitionRecord>> {
        Ok(self.load_owned(id, actor)?.status_history().records().to_vec())
    }

    fn load_owned(&self, id: &Uuid, actor: &Actor) -> Result<Contract> {
        authorize(self.contracts.get_contract(id)?, actor, "contrato", id)
    }

    /// Ejecuta `f` con el lock del contrato tomado. La entrada se retira de
    /// la tabla cuando nadie más la está usando.
    fn with_contract_lock<T, F>(&self, id: &Uuid, f: F) -> Result<T>
        where F: FnOnce() -> Result<T>
    {
        let lock = self.locks.entry(*id).or_insert_with(|| Arc::new(Mutex::new(()))).value().clone();
        let result = {
            let _guard = lock.lock()
                             .map_err(|e| FlowError::Storage(format!("mutex poisoned: {:?}", e)))?;
            f()
        };
        drop(lock);
        self.locks.remove_if(id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    fn settle(&self, id: &Uuid, result: PersistResult) -> Result<i64> {
        match result {
            PersistResult::Ok { new_version } => Ok(new_version),
            PersistResult::Conflict { expected, actual } => {
                warn!("conflicto de versión en contrato {}: esperada {}, actual {}", id, expected, actual);
                Err(FlowError::Conflict(format!("contrato {} modificado concurrentemente (versión {} != {})",
                                                id, actual, expected)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("quizás"), None);
    }

    #[test]
    fn default_config_resets_values_and_checks_kinds() {
        let c = EngineConfig::default();
        assert!(!c.seed_blueprint_defaults);
        assert!(c.enforce_field_kinds);
    }

    #[test]
    fn now_has_microsecond_resolution() {
        assert_eq!(now().timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn lock_table_is_emptied_after_each_write() {
        let ana = Actor::new(contract_domain::UserId::new(), "Ana");
        let templates = Arc::new(contract_domain::InMemoryBlueprintRepository::new());
        let bp_id = templates.save_blueprint(contract_domain::DomainStubs::nda_blueprint(&ana).unwrap()).unwrap();
        let engine = WorkflowEngine::new(Arc::new(crate::InMemoryContractRepository::new()), templates, EngineConfig::default());

        let contract = engine.instantiate(&bp_id, "NDA", &ana).unwrap();
        engine.transition(&contract.id(), WorkflowState::Approved, &ana).unwrap();
        assert!(engine.transition(&contract.id(), WorkflowState::Locked, &ana).is_err());
        engine.update_field_values(&contract.id(), &[("start_date".to_string(), serde_json::json!("2025-03-01"))], &ana)
              .unwrap();
        assert!(engine.transition(&Uuid::new_v4(), WorkflowState::Approved, &ana).is_err());
        assert!(engine.locks.is_empty());
    }
}
