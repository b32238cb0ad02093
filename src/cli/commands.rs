pub mod initdb;
pub mod load_ingredients;
pub mod serve;

pub use initdb::init_database;
pub use load_ingredients::load_ingredients;
pub use serve::serve;
