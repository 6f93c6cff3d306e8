//! Persistence layer for tricoach: row models, PostgreSQL queries, embedded
//! migrations, and the [`store::TrainingStore`] interface.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use store::{PgStore, TrainingStore};
