use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::chats_config::ChatsConfig;
use crate::common::CategoryId;

/// A user-facing grouping of source chats, mirrored from the chats file.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub chats_count: i32,
    pub last_parsed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySync {
    pub upserted: usize,
    pub deactivated: u64,
}

// =============================================================================
// Category Queries
// =============================================================================

impl Category {
    pub async fn find_active(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM categories WHERE is_active = TRUE ORDER BY name, slug",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_slug(slug: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Upsert every configured category and deactivate the ones the file no
    /// longer lists. Runs in a single transaction.
    pub async fn sync_from_config(config: &ChatsConfig, pool: &PgPool) -> Result<CategorySync> {
        let mut tx = pool.begin().await?;

        for category in &config.categories {
            sqlx::query(
                r#"
                INSERT INTO categories (id, slug, name, description, is_active, chats_count)
                VALUES ($1, $2, $3, $4, TRUE, $5)
                ON CONFLICT (slug) DO UPDATE SET
                    name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    chats_count = EXCLUDED.chats_count,
                    is_active = TRUE
                "#,
            )
            .bind(CategoryId::new())
            .bind(&category.slug)
            .bind(&category.name)
            .bind(category.description.as_deref())
            .bind(i32::try_from(category.chats.len()).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        let slugs: Vec<String> = config.categories.iter().map(|c| c.slug.clone()).collect();
        let deactivated = sqlx::query(
            "UPDATE categories SET is_active = FALSE WHERE is_active = TRUE AND slug <> ALL($1)",
        )
        .bind(&slugs)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(
            upserted = slugs.len(),
            deactivated = deactivated,
            "Synced categories from config"
        );

        Ok(CategorySync {
            upserted: slugs.len(),
            deactivated,
        })
    }

    pub async fn touch_last_parsed(slug: &str, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE categories SET last_parsed_at = NOW() WHERE slug = $1")
            .bind(slug)
            .execute(pool)
            .await?;
        Ok(())
    }
}
