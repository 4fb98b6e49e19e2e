/*
 * Responsibility
 * - In-process drink store (development without DATABASE_URL, tests)
 * - Mirrors the table constraints: unique title, title <= 80 chars
 */
use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::repos::drink_repo::{Drink, DrinkChanges, DrinkStore, NewDrink, seed_drink};
use crate::repos::error::{RepoError, RepoResult};

const TITLE_MAX_CHARS: usize = 80;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, Drink>,
}

impl Inner {
    fn check_title(&self, title: &str, except: Option<i64>) -> RepoResult<()> {
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(RepoError::Constraint(format!(
                "title longer than {TITLE_MAX_CHARS} characters"
            )));
        }
        if self
            .rows
            .values()
            .any(|d| d.title == title && Some(d.id) != except)
        {
            return Err(RepoError::Constraint(format!(
                "duplicate title: {title}"
            )));
        }
        Ok(())
    }

    fn insert(&mut self, new: NewDrink) -> RepoResult<Drink> {
        self.check_title(&new.title, None)?;

        self.next_id += 1;
        let drink = Drink {
            id: self.next_id,
            title: new.title,
            recipe: new.recipe,
        };
        self.rows.insert(drink.id, drink.clone());
        Ok(drink)
    }
}

#[derive(Debug, Default)]
pub struct MemoryDrinkStore {
    inner: RwLock<Inner>,
}

impl MemoryDrinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DrinkStore for MemoryDrinkStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> RepoResult<Vec<Drink>> {
        Ok(self.inner.read().rows.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> RepoResult<Option<Drink>> {
        Ok(self.inner.read().rows.get(&id).cloned())
    }

    async fn create(&self, new: NewDrink) -> RepoResult<Drink> {
        self.inner.write().insert(new)
    }

    async fn update(&self, id: i64, changes: DrinkChanges) -> RepoResult<Option<Drink>> {
        let mut inner = self.inner.write();

        if !inner.rows.contains_key(&id) {
            return Ok(None);
        }
        if let Some(title) = &changes.title {
            inner.check_title(title, Some(id))?;
        }

        let Some(drink) = inner.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            drink.title = title;
        }
        if let Some(recipe) = changes.recipe {
            drink.recipe = recipe;
        }
        Ok(Some(drink.clone()))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        Ok(self.inner.write().rows.remove(&id).is_some())
    }

    async fn reset(&self) -> RepoResult<()> {
        let mut inner = self.inner.write();
        *inner = Inner::default();
        inner.insert(seed_drink())?;
        Ok(())
    }
}
