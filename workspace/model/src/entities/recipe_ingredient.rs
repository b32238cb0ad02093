use super::{ingredient, recipe};
use sea_orm::entity::prelude::*;

/// The quantified association between a recipe and one ingredient.
/// The composite primary key enforces that an ingredient appears at most
/// once per recipe.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recipe_ingredients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub recipe_id: i32,
    #[sea_orm(primary_key)]
    pub ingredient_id: i32,
    /// Quantity of the ingredient in this recipe, at least 1.
    pub quantity: f64,
    /// Per-recipe unit label. Shopping-list aggregation uses the
    /// ingredient's own measurement unit, not this field.
    pub unit: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "recipe::Entity",
        from = "Column::RecipeId",
        to = "recipe::Column::Id"
    )]
    Recipe,
    #[sea_orm(
        belongs_to = "ingredient::Entity",
        from = "Column::IngredientId",
        to = "ingredient::Column::Id"
    )]
    Ingredient,
}

impl Related<recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
