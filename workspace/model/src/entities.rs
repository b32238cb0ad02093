//! This file serves as the root for all SeaORM entity modules.
//! We define the data models for the recipe-sharing application here.
//! The structure mirrors the relational schema: reference data (tags,
//! ingredients), user-owned rows (recipes) and join rows carrying the
//! pair-uniqueness invariants (favorites, carts, follows).

pub mod auth_token;
pub mod favorite;
pub mod follow;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod shopping_cart;
pub mod tag;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::auth_token::Entity as AuthToken;
    pub use super::favorite::Entity as Favorite;
    pub use super::follow::Entity as Follow;
    pub use super::ingredient::Entity as Ingredient;
    pub use super::recipe::Entity as Recipe;
    pub use super::recipe_ingredient::Entity as RecipeIngredient;
    pub use super::recipe_tag::Entity as RecipeTag;
    pub use super::shopping_cart::Entity as ShoppingCart;
    pub use super::tag::Entity as Tag;
    pub use super::user::Entity as User;
}
