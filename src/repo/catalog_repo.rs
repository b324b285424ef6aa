use crate::domain::catalog::{Banner, Collection, Product, ProductFilter};
use crate::repo::CatalogStore;
use anyhow::Result;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct CatalogRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl CatalogStore for CatalogRepo {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM products
            WHERE ($1::text IS NULL OR lower(category) = lower($1))
              AND ($2::text IS NULL OR lower(collection) = lower($2))
              AND ($3::boolean IS NULL OR on_sale = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.category.as_deref())
        .bind(filter.collection.as_deref())
        .bind(filter.sale)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| r.get::<Json<Product>, _>("document").0)
            .collect())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT document FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Json<Product>, _>("document").0))
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, category, collection, on_sale, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (id) DO UPDATE SET
                category = EXCLUDED.category,
                collection = EXCLUDED.collection,
                on_sale = EXCLUDED.on_sale,
                document = EXCLUDED.document,
                updated_at = now()
            "#,
        )
        .bind(&product.id)
        .bind(&product.category)
        .bind(product.collection.as_deref())
        .bind(product.on_sale)
        .bind(Json(product))
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_product(&self, id: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_banners(&self) -> Result<Vec<Banner>> {
        let rows = sqlx::query("SELECT document FROM banners WHERE active = true ORDER BY position ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| r.get::<Json<Banner>, _>("document").0)
            .collect())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let rows = sqlx::query("SELECT document FROM collections ORDER BY slug ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| r.get::<Json<Collection>, _>("document").0)
            .collect())
    }
}
