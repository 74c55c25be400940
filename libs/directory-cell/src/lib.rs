// Directory Cell - read-only doctor and patient lookups used at the front desk
pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{Doctor, DirectoryError, Patient};
pub use router::{directory_routes, directory_routes_with_repository};
pub use services::{
    normalize_cpf, DirectoryRepository, DirectoryService, InMemoryDirectoryRepository,
    SupabaseDirectoryRepository,
};
