//! Persistencia SQLite (Diesel) para los repositorios de blueprints y de
//! contratos. Expone el módulo `schema` y el repositorio `DieselRepository`,
//! que implementa `BlueprintRepository` y `ContractRepository`.

mod blueprint_persistence;
mod contract_persistence;
pub mod schema;
mod store;

pub use store::{database_url_from_env, new_from_env, new_sqlite_for_test, DieselRepository, MIGRATIONS};
