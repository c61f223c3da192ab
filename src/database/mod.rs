/*!
 * SQLite persistence for jobs and credentials.
 *
 * The in-memory queue stays authoritative while a drain is running; this
 * layer re-hydrates pending jobs and stored keys across process restarts
 * and records every terminal state.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::DatabaseConnection;
pub use repository::Repository;
