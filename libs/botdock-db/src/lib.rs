pub mod db;
pub mod models;
pub mod repositories;
pub mod utils;

pub use sqlx;

pub use db::{create_schema, init_db};
