// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: PERSISTENCE LIBRARY BARREL (V3.0)
 * CLASIFICACIÓN: INFRASTRUCTURE LIB (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN PÚBLICA DE CLIENTE Y REPOSITORIOS
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::LedgerClient;
pub use errors::DbError;
