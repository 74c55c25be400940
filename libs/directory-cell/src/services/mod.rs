pub mod directory;
pub mod repository;

pub use directory::{normalize_cpf, DirectoryService};
pub use repository::{
    DirectoryRepository, InMemoryDirectoryRepository, SupabaseDirectoryRepository,
};
