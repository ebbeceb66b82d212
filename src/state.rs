use crate::auth::{PasswordHasher, TokenService};
use crate::store::Store;

/// Everything handlers and the auth middleware need, built once in `main` (or a test)
/// and registered as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(store: Store, tokens: TokenService, passwords: PasswordHasher) -> Self {
        Self {
            store,
            tokens,
            passwords,
        }
    }
}
