/*
 * Responsibility
 * - drinks CRUD on PostgreSQL (SQLx)
 * - every statement is bounded by `timeout`; expiry is reported as Unavailable
 * - recipe is stored as JSONB
 */
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions, types::Json};

use crate::repos::drink_repo::{Drink, DrinkChanges, DrinkStore, Ingredient, NewDrink, seed_drink};
use crate::repos::error::{RepoError, RepoResult};

#[derive(Debug, sqlx::FromRow)]
struct DrinkRow {
    id: i64,
    title: String,
    recipe: Json<Vec<Ingredient>>,
}

impl From<DrinkRow> for Drink {
    fn from(row: DrinkRow) -> Self {
        Drink {
            id: row.id,
            title: row.title,
            recipe: row.recipe.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgDrinkStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgDrinkStore {
    /// Connect and apply pending migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        timeout: Duration,
    ) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await
            .map_err(RepoError::from_sqlx)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepoError::unavailable(format!("migration failed: {e}")))?;

        Ok(Self::new(pool, timeout))
    }

    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T, sqlx::Error>>) -> RepoResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(RepoError::from_sqlx),
            Err(_) => Err(RepoError::unavailable(format!(
                "database operation timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl DrinkStore for PgDrinkStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn list(&self) -> RepoResult<Vec<Drink>> {
        let rows = self
            .bounded(
                sqlx::query_as::<_, DrinkRow>(
                    r#"
                    SELECT id, title, recipe
                    FROM drinks
                    ORDER BY id
                    "#,
                )
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows.into_iter().map(Drink::from).collect())
    }

    async fn get(&self, id: i64) -> RepoResult<Option<Drink>> {
        let row = self
            .bounded(
                sqlx::query_as::<_, DrinkRow>(
                    r#"
                    SELECT id, title, recipe
                    FROM drinks
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.map(Drink::from))
    }

    async fn create(&self, new: NewDrink) -> RepoResult<Drink> {
        let row = self
            .bounded(
                sqlx::query_as::<_, DrinkRow>(
                    r#"
                    INSERT INTO drinks (title, recipe)
                    VALUES ($1, $2)
                    RETURNING id, title, recipe
                    "#,
                )
                .bind(&new.title)
                .bind(Json(&new.recipe))
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(row.into())
    }

    async fn update(&self, id: i64, changes: DrinkChanges) -> RepoResult<Option<Drink>> {
        let row = self
            .bounded(
                sqlx::query_as::<_, DrinkRow>(
                    r#"
                    UPDATE drinks
                    SET
                        title = COALESCE($2, title),
                        recipe = COALESCE($3, recipe)
                    WHERE id = $1
                    RETURNING id, title, recipe
                    "#,
                )
                .bind(id)
                .bind(changes.title.as_deref())
                .bind(changes.recipe.as_ref().map(Json))
                .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.map(Drink::from))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    DELETE FROM drinks
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset(&self) -> RepoResult<()> {
        let seed = seed_drink();
        let mut tx = self.pool.begin().await.map_err(RepoError::from_sqlx)?;

        self.bounded(sqlx::query("TRUNCATE drinks RESTART IDENTITY").execute(&mut *tx))
            .await?;
        self.bounded(
            sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
                .bind(&seed.title)
                .bind(Json(&seed.recipe))
                .execute(&mut *tx),
        )
        .await?;

        tx.commit().await.map_err(RepoError::from_sqlx)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
