pub mod connect;
pub mod decimal;
pub mod repository;

pub use connect::{open_seeded, seeds_dir};
pub use repository::SqliteRepository;
