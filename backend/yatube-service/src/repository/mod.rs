mod memory_repository;
mod postgres_repository;
mod r#trait;

pub use memory_repository::MemoryContentRepository;
pub use postgres_repository::PostgresContentRepository;
pub use r#trait::ContentRepository;
