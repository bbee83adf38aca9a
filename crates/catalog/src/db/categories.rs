//! Category queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use reve_essence_core::{
    CatalogResult, Category, CategoryId, CategoryRemoval, CategoryStore, NewCategory, Slug,
};

use super::products::{PRODUCT_COLUMNS, ProductRow};
use super::{PgCatalogStore, RepositoryError, is_unique_violation};

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RepositoryError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        // A stored slug must be a fixed point of slug derivation
        let slug = Slug::from_name(&row.slug)
            .ok()
            .filter(|derived| derived.as_str() == row.slug)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "invalid slug '{}' for category {}",
                    row.slug, row.id
                ))
            })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            slug,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl CategoryStore for PgCatalogStore {
    #[instrument(skip(self))]
    async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug, created_at
            FROM catalog.categories
            ORDER BY name ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self), fields(category_id = %id))]
    async fn find_category(&self, id: CategoryId) -> CatalogResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug, created_at
            FROM catalog.categories
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(Category::try_from).transpose()?)
    }

    #[instrument(skip(self), fields(slug = %new.slug))]
    async fn insert_category(&self, new: NewCategory) -> CatalogResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO catalog.categories (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, created_at
            ",
        )
        .bind(&new.name)
        .bind(new.slug.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return RepositoryError::Conflict(format!(
                    "a category with slug '{}' already exists",
                    new.slug
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(Category::try_from(row)?)
    }

    #[instrument(skip(self), fields(category_id = %id))]
    async fn count_products_in(&self, id: CategoryId) -> CatalogResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM catalog.products WHERE category_id = $1
            ",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self), fields(category_id = %id))]
    async fn delete_category(&self, id: CategoryId) -> CatalogResult<Option<CategoryRemoval>> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        // Row lock blocks concurrent product inserts into this category
        // (their FK check needs a KEY SHARE lock) until we commit.
        let locked = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, slug, created_at
            FROM catalog.categories
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        let Some(row) = locked else {
            return Ok(None);
        };
        let category = Category::try_from(row)?;

        let product_rows = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM catalog.products WHERE category_id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        sqlx::query("DELETE FROM catalog.categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;

        let cascaded_products = product_rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(CategoryRemoval {
            category,
            cascaded_products,
        }))
    }
}
