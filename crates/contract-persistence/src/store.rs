// Archivo: store.rs
// Propósito: pool de conexiones SQLite, migraciones embebidas, conversión de
// errores de Diesel y constructores a partir del entorno.
use contract_domain::DomainError;
use contract_flow::FlowError;
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub(crate) type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Errores internos del almacenamiento. Nunca salen del crate: se convierten
/// en `FlowError::Storage` o `DomainError::ExternalError`.
#[derive(Error, Debug)]
pub(crate) enum StoreError {
  #[error("pool: {0}")]
  Pool(#[from] r2d2::Error),
  #[error("db: {0}")]
  Db(#[from] DieselError),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
  #[error("migraciones: {0}")]
  Migration(String),
  #[error("fila inválida: {0}")]
  Corrupt(String),
}

impl From<StoreError> for FlowError {
  fn from(e: StoreError) -> Self {
    FlowError::Storage(e.to_string())
  }
}

impl From<StoreError> for DomainError {
  fn from(e: StoreError) -> Self {
    DomainError::ExternalError(e.to_string())
  }
}

/// Pragmas aplicados a cada conexión nueva del pool.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
        .map_err(diesel::r2d2::Error::QueryError)
  }
}

/// Repositorio Diesel sobre SQLite que implementa `BlueprintRepository` y
/// `ContractRepository` compartiendo un mismo pool.
#[derive(Clone)]
pub struct DieselRepository {
  pool: Arc<DbPool>,
}

impl DieselRepository {
  /// Abre (o crea) la base de datos en `database_url` y aplica las
  /// migraciones pendientes.
  pub fn new(database_url: &str) -> Result<Self, FlowError> {
    Ok(Self::open(database_url)?)
  }

  fn open(database_url: &str) -> Result<Self, StoreError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(4)
                              .connection_timeout(Duration::from_secs(5))
                              .connection_customizer(Box::new(SqlitePragmas))
                              .build(manager)?;
    let repo = DieselRepository { pool: Arc::new(pool) };
    let mut conn = repo.conn()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)
                      .map_err(|e| StoreError::Migration(e.to_string()))?;
    debug!("sqlite {} listo ({} migraciones aplicadas)", database_url, applied.len());
    Ok(repo)
  }

  pub(crate) fn conn(&self) -> Result<DbConn, StoreError> {
    Ok(self.pool.get()?)
  }
}

/// Crea el repositorio desde `CONTRACTS_DB_URL` o, en su defecto,
/// `DATABASE_URL` (cargando `.env` si existe).
pub fn new_from_env() -> Result<DieselRepository, FlowError> {
  dotenvy::dotenv().ok();
  let url = database_url_from_env().ok_or_else(|| {
                                     FlowError::Storage("CONTRACTS_DB_URL / DATABASE_URL no definida".to_string())
                                   })?;
  DieselRepository::new(&url)
}

/// URL configurada en el entorno, si la hay.
pub fn database_url_from_env() -> Option<String> {
  std::env::var("CONTRACTS_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                   .ok()
                                   .filter(|u| !u.trim().is_empty())
}

/// Helper de pruebas: repositorio sobre un fichero SQLite explícito, sin
/// leer el entorno.
pub fn new_sqlite_for_test(database_url: &str) -> Result<DieselRepository, FlowError> {
  DieselRepository::new(database_url)
}

pub(crate) fn to_micros(at: DateTime<Utc>) -> i64 {
  at.timestamp_micros()
}

pub(crate) fn from_micros(ts: i64) -> Result<DateTime<Utc>, StoreError> {
  DateTime::<Utc>::from_timestamp_micros(ts).ok_or_else(|| StoreError::Corrupt(format!("timestamp fuera de rango: {}", ts)))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<uuid::Uuid, StoreError> {
  uuid::Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("uuid '{}': {}", raw, e)))
}
