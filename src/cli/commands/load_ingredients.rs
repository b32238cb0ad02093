use anyhow::{Context, Result};
use model::entities::ingredient;
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
struct IngredientRow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    measurement_unit: String,
}

/// Import ingredient reference data from a JSON array. Existing rows are
/// matched by name and get their measurement unit refreshed.
pub async fn load_ingredients(database_url: &str, path: &Path) -> Result<()> {
    info!("Loading ingredients from {}", path.display());

    let db = match Database::connect(database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let rows: Vec<IngredientRow> =
        serde_json::from_str(&raw).context("ingredients file is not a JSON array")?;

    let mut created = 0usize;
    let mut updated = 0usize;
    let mut skipped = 0usize;

    for (row_num, row) in rows.into_iter().enumerate() {
        let name = row.name.trim();
        let unit = row.measurement_unit.trim();

        if name.is_empty() {
            warn!("Row {}: empty name, skipping", row_num + 1);
            skipped += 1;
            continue;
        }

        let existing = ingredient::Entity::find()
            .filter(ingredient::Column::Name.eq(name))
            .one(&db)
            .await?;

        match existing {
            Some(model) => {
                let mut active: ingredient::ActiveModel = model.into();
                active.measurement_unit = Set(unit.to_string());
                active.update(&db).await?;
                updated += 1;
            }
            None => {
                ingredient::ActiveModel {
                    name: Set(name.to_string()),
                    measurement_unit: Set(unit.to_string()),
                    ..Default::default()
                }
                .insert(&db)
                .await?;
                created += 1;
            }
        }
    }

    info!(
        "Ingredients loaded. Created: {}, updated: {}, skipped: {}",
        created, updated, skipped
    );
    Ok(())
}
