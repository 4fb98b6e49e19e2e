/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - drinks: Arc<dyn DrinkStore> (postgres / memory)
 *   - auth: Arc<AuthService> (JWKS cache を内部に持つ)
 * - Clone 前提で持つ (内部は Arc なので cheap)
 */
use std::sync::Arc;

use crate::repos::DrinkStore;
use crate::services::auth::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub drinks: Arc<dyn DrinkStore>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(drinks: Arc<dyn DrinkStore>, auth: Arc<AuthService>) -> Self {
        Self { drinks, auth }
    }
}
