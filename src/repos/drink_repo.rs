/*
 * Responsibility
 * - Drink entity and the store interface the handlers talk to
 * - One method per logical data operation
 */
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::repos::error::RepoResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

#[derive(Debug, Clone)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct DrinkChanges {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

/// Row written by `DrinkStore::reset`.
pub fn seed_drink() -> NewDrink {
    NewDrink {
        title: "water".to_string(),
        recipe: vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }],
    }
}

/// Implementations must be cheap to share (`Arc<dyn DrinkStore>` in `AppState`).
#[async_trait]
pub trait DrinkStore: Send + Sync + 'static {
    // Backend name, for logging.
    fn backend_name(&self) -> &'static str;

    // All drinks ordered by id.
    async fn list(&self) -> RepoResult<Vec<Drink>>;

    async fn get(&self, id: i64) -> RepoResult<Option<Drink>>;

    async fn create(&self, new: NewDrink) -> RepoResult<Drink>;

    // Returns `Ok(None)` when no drink has `id`.
    async fn update(&self, id: i64, changes: DrinkChanges) -> RepoResult<Option<Drink>>;

    // Returns `Ok(false)` when no drink has `id`.
    async fn delete(&self, id: i64) -> RepoResult<bool>;

    // Drop every drink and insert the seed row.
    async fn reset(&self) -> RepoResult<()>;

    // Release connections on shutdown.
    async fn close(&self) {}
}
