//! Crate `contract-flow`: motor del ciclo de vida de contratos.
//!
//! Define el contrato de persistencia `ContractRepository`, el motor
//! `WorkflowEngine`, el proveedor de identidad `IdentityProvider`, la fachada
//! `ContractService` y las implementaciones en memoria útiles para pruebas
//! (`InMemoryContractRepository`, `InMemoryIdentityProvider`).
//!
//! Diseño resumido:
//! - La tabla de transiciones vive en `contract-domain` y se consulta en cada
//!   llamada; una arista ausente deja el contrato intacto.
//! - Locking optimista: las escrituras llevan `expected_version` y un
//!   desajuste se devuelve como `PersistResult::Conflict`.
//! - El `Actor` se pasa explícitamente; un recurso ajeno es `NotFound`.
//!
//! Ejemplo rápido:
//! ```rust
//! use contract_domain::{DomainStubs, InMemoryBlueprintRepository};
//! use contract_flow::{ContractService, EngineConfig, InMemoryContractRepository, InMemoryIdentityProvider};
//! use std::sync::Arc;
//! let service = ContractService::new(Arc::new(InMemoryIdentityProvider::new()),
//!                                    Arc::new(InMemoryBlueprintRepository::new()),
//!                                    Arc::new(InMemoryContractRepository::new()),
//!                                    EngineConfig::default());
//! let _ = (service, DomainStubs::nda_fields());
//! ```
pub mod access;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod identity;
pub mod repository;
pub mod service;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use identity::*;
pub use repository::*;
pub use service::*;
pub use stubs::*;
