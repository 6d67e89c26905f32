pub mod memory;
pub mod principal;

pub use memory::InMemoryCredentialStore;
pub use principal::PostgresCredentialStore;
