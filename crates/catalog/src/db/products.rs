//! Product queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;

use reve_essence_core::{
    CatalogResult, CategoryId, ImageLocator, LabelSet, Price, Product, ProductFields, ProductId,
    ProductListing, ProductStore, Slug, ValidationError,
};

use super::{PgCatalogStore, RepositoryError, is_foreign_key_violation};

/// Columns selected for a product, in [`ProductRow`] order.
pub(super) const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category_id, material, sizes, colors, image_paths, created_at";

/// Internal row type for database queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    category_id: CategoryId,
    material: String,
    sizes: Vec<String>,
    colors: Vec<String>,
    image_paths: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        if row.image_paths.is_empty() {
            return Err(RepositoryError::DataCorruption(format!(
                "product {} has no images",
                row.id
            )));
        }

        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price,
            category_id: row.category_id,
            material: row.material,
            sizes: LabelSet::from(row.sizes),
            colors: LabelSet::from(row.colors),
            image_paths: row.image_paths.into_iter().map(ImageLocator::from).collect(),
            created_at: row.created_at,
        })
    }
}

/// Product joined with its category's display fields.
#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    product: ProductRow,
    category_name: String,
    category_slug: String,
}

impl TryFrom<ListingRow> for ProductListing {
    type Error = RepositoryError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product: row.product.try_into()?,
            category_name: row.category_name,
            category_slug: Slug::from_stored(row.category_slug),
        })
    }
}

fn locator_strings(fields: &ProductFields) -> Vec<&str> {
    fields.image_paths.iter().map(ImageLocator::as_str).collect()
}

/// Map a write error, turning a vanished category into a validation failure.
fn map_write_error(err: sqlx::Error) -> reve_essence_core::CatalogError {
    if is_foreign_key_violation(&err) {
        return ValidationError::new("category_id", "category does not exist").into();
    }
    RepositoryError::Database(err).into()
}

#[async_trait]
impl ProductStore for PgCatalogStore {
    #[instrument(skip(self))]
    async fn list_products(&self) -> CatalogResult<Vec<ProductListing>> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r"
            SELECT p.id, p.name, p.description, p.price, p.category_id, p.material,
                   p.sizes, p.colors, p.image_paths, p.created_at,
                   c.name AS category_name, c.slug AS category_slug
            FROM catalog.products p
            JOIN catalog.categories c ON c.id = p.category_id
            ORDER BY p.created_at DESC, p.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows
            .into_iter()
            .map(ProductListing::try_from)
            .collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn find_product(&self, id: ProductId) -> CatalogResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(Product::try_from).transpose()?)
    }

    #[instrument(skip(self, fields), fields(category_id = %fields.category_id))]
    async fn insert_product(&self, fields: ProductFields) -> CatalogResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO catalog.products
                (name, description, price, category_id, material, sizes, colors, image_paths)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.category_id)
        .bind(&fields.material)
        .bind(fields.sizes.as_slice())
        .bind(fields.colors.as_slice())
        .bind(locator_strings(&fields))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(Product::try_from(row)?)
    }

    #[instrument(skip(self, fields), fields(product_id = %id))]
    async fn replace_product(
        &self,
        id: ProductId,
        fields: ProductFields,
    ) -> CatalogResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE catalog.products
            SET name = $2, description = $3, price = $4, category_id = $5,
                material = $6, sizes = $7, colors = $8, image_paths = $9
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.category_id)
        .bind(&fields.material)
        .bind(fields.sizes.as_slice())
        .bind(fields.colors.as_slice())
        .bind(locator_strings(&fields))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.map(Product::try_from).transpose()?)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> CatalogResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM catalog.products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(Product::try_from).transpose()?)
    }
}
