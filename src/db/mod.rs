mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::StripeClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state threaded into every handler.
///
/// Holds the database pool and the processor client constructed once from
/// configuration at startup - handlers never read ambient environment state,
/// so tests can build this with fake collaborators.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Payment processor client (checkout creation, session lookup,
    /// webhook signature verification)
    pub processor: StripeClient,
    /// Base URL this service is reachable at (e.g. https://api.example.com)
    pub base_url: String,
    /// Default redirect after a completed checkout
    pub success_page_url: String,
    /// Default redirect after an abandoned checkout
    pub cancel_page_url: String,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
