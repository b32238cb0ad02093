use chrono::NaiveDate;
use model::entities::{ingredient, recipe, recipe_ingredient, shopping_cart};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};

/// One aggregated row of the shopping list: all cart recipes' quantities of
/// the same ingredient summed together.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: Option<f64>,
}

/// The single aggregation query: join the user's cart recipes to their
/// ingredient rows, group by (ingredient name, measurement unit), sum the
/// quantities and order by name.
pub async fn shopping_list_items(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<ShoppingListItem>, DbErr> {
    recipe_ingredient::Entity::find()
        .join(JoinType::InnerJoin, recipe_ingredient::Relation::Ingredient.def())
        .join(JoinType::InnerJoin, recipe_ingredient::Relation::Recipe.def())
        .join(JoinType::InnerJoin, recipe::Relation::ShoppingCart.def())
        .filter(shopping_cart::Column::UserId.eq(user_id))
        .select_only()
        .column_as(ingredient::Column::Name, "name")
        .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
        .column_as(recipe_ingredient::Column::Quantity.sum(), "total_amount")
        .group_by(ingredient::Column::Name)
        .group_by(ingredient::Column::MeasurementUnit)
        .order_by_asc(ingredient::Column::Name)
        .into_model::<ShoppingListItem>()
        .all(db)
        .await
}

/// Format an amount without a trailing ".0" for whole values.
fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{amount}")
    }
}

/// Render the aggregated items as the plain-text attachment body.
pub fn render_shopping_list(username: &str, date: NaiveDate, items: &[ShoppingListItem]) -> String {
    let mut lines = vec![
        format!("Shopping list for: {username}\n"),
        format!("Date: {}\n\n", date.format("%d-%m-%Y")),
    ];
    for item in items {
        lines.push(format!(
            "{} ({}) - {}\n",
            item.name,
            item.measurement_unit,
            format_amount(item.total_amount.unwrap_or(0.0)),
        ));
    }
    lines.concat()
}
