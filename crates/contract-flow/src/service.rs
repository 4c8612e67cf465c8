// Archivo: service.rs
// Propósito: implementar `ContractService`, la fachada que usa la capa de
// presentación. Combina el proveedor de identidad, el almacén de blueprints y
// el `WorkflowEngine`.
use crate::access::authorize;
use crate::domain::{ContractSummary, StatusCounts};
use crate::engine::{EngineConfig, WorkflowEngine};
use crate::errors::{FlowError, Result};
use crate::identity::{Credentials, IdentityProvider, Session, SessionToken};
use crate::repository::ContractRepository;
use contract_domain::{Actor, Blueprint, BlueprintRepository, Contract, FieldDefinition, FieldInput, TransitionAction,
                      TransitionRecord, WorkflowState};
use log::info;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Servicio de alto nivel sobre blueprints y contratos.
pub struct ContractService {
    identity: Arc<dyn IdentityProvider>,
    templates: Arc<dyn BlueprintRepository>,
    engine: WorkflowEngine,
}

impl ContractService {
    /// Crea el servicio inyectando los colaboradores. El `WorkflowEngine` se
    /// construye internamente con el mismo almacén de blueprints.
    pub fn new(identity: Arc<dyn IdentityProvider>,
               templates: Arc<dyn BlueprintRepository>,
               contracts: Arc<dyn ContractRepository>,
               config: EngineConfig)
               -> Self {
        let engine = WorkflowEngine::new(contracts, templates.clone(), config);
        Self { identity, templates, engine }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    // --- identidad

    pub fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.identity.authenticate(credentials)
    }

    pub fn resolve(&self, token: &SessionToken) -> Result<Actor> {
        self.identity.resolve(token)
    }

    // --- blueprints

    /// Valida y guarda un blueprint propiedad de `actor`.
    pub fn create_blueprint(&self, name: &str, fields: Vec<FieldInput>, actor: &Actor) -> Result<Blueprint> {
        let blueprint = Blueprint::from_inputs(name, fields, actor)?;
        self.templates.save_blueprint(blueprint.clone())?;
        info!("blueprint {} '{}' creado por {}", blueprint.id(), blueprint.name(), actor.id);
        Ok(blueprint)
    }

    pub fn list_blueprints(&self, actor: &Actor) -> Result<Vec<Blueprint>> {
        Ok(self.templates.list_blueprints(&actor.id)?)
    }

    pub fn get_blueprint(&self, id: &Uuid, actor: &Actor) -> Result<Blueprint> {
        authorize(self.templates.get_blueprint(id)?, actor, "blueprint", id)
    }

    /// Borra un blueprint propio. Los contratos creados desde él no cambian.
    pub fn delete_blueprint(&self, id: &Uuid, actor: &Actor) -> Result<()> {
        if self.templates.delete_blueprint(id, &actor.id)? {
            info!("blueprint {} borrado por {}", id, actor.id);
            Ok(())
        } else {
            Err(FlowError::NotFound(format!("blueprint {}", id)))
        }
    }

    // --- contratos

    pub fn instantiate(&self, blueprint_id: &Uuid, name: &str, actor: &Actor) -> Result<Contract> {
        self.engine.instantiate(blueprint_id, name, actor)
    }

    /// Tabla de contratos de `actor`, con el nombre del blueprint de origen
    /// cuando todavía existe.
    pub fn list_contracts(&self, actor: &Actor) -> Result<Vec<ContractSummary>> {
        let contracts = self.engine.list_contracts(actor)?;
        let mut names: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut out = Vec::with_capacity(contracts.len());
        for c in &contracts {
            let blueprint_name = match c.blueprint_id() {
                Some(bid) => match names.get(&bid) {
                    Some(cached) => cached.clone(),
                    None => {
                        let name = self.templates.get_blueprint(&bid)?.map(|b| b.name().to_string());
                        names.insert(bid, name.clone());
                        name
                    }
                },
                None => None,
            };
            out.push(ContractSummary::from_contract(c, blueprint_name));
        }
        Ok(out)
    }

    pub fn get_contract(&self, id: &Uuid, actor: &Actor) -> Result<Contract> {
        self.engine.get_contract(id, actor)
    }

    pub fn transition(&self, id: &Uuid, to: WorkflowState, actor: &Actor) -> Result<Contract> {
        self.engine.transition(id, to, actor)
    }

    pub fn transition_by_action(&self, id: &Uuid, action: TransitionAction, actor: &Actor) -> Result<Contract> {
        self.engine.transition_by_action(id, action, actor)
    }

    pub fn update_fields(&self, id: &Uuid, fields: Vec<FieldDefinition>, actor: &Actor) -> Result<Contract> {
        self.engine.update_fields(id, fields, actor)
    }

    /// Guarda los valores de un formulario: pares `(id de campo, valor JSON)`.
    pub fn set_field_values(&self, id: &Uuid, values: &[(String, JsonValue)], actor: &Actor) -> Result<Contract> {
        self.engine.update_field_values(id, values, actor)
    }

    pub fn history(&self, id: &Uuid, actor: &Actor) -> Result<Vec<TransitionRecord>> {
        self.engine.history(id, actor)
    }

    /// Conteos del panel principal de `actor`.
    pub fn status_counts(&self, actor: &Actor) -> Result<StatusCounts> {
        let contracts = self.engine.list_contracts(actor)?;
        Ok(StatusCounts::tally(contracts.iter().map(|c| c.status())))
    }
}
