//! Shared application state.

use crate::auth::JwtManager;
use chai_db::Database;

/// State handed to every handler.
///
/// `Database` is a thin wrapper over a cloned pool, so cloning the whole
/// state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        AppState { db, jwt }
    }
}
