mod access;
mod audit;
mod blueprint;
mod contract;
mod domain_repository;
mod domain_stubs;
mod errors;
mod field;
mod workflow_state;

pub use access::{Actor, Owned, UserId};
pub use audit::{AuditTrail, TransitionRecord};
pub use blueprint::{schema_hash, Blueprint};
pub use contract::{Contract, ContractParts};
pub use domain_repository::{BlueprintRepository, InMemoryBlueprintRepository};
pub use domain_stubs::DomainStubs;
pub use errors::DomainError;
pub use field::{FieldDefinition, FieldInput, FieldKind, FieldValue, Position};
pub use workflow_state::{TransitionAction, WorkflowState, TRANSITIONS};
