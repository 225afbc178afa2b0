// Persistence: the document and brand-kit store traits, their Postgres
// implementations, and in-memory implementations for tests and local runs.

pub mod brand_kits;
pub mod postgres;
pub mod store;

pub use brand_kits::{load_brand_kit, BrandKitStore, MemoryBrandKitStore, PgBrandKitStore};
pub use postgres::PgDocumentStore;
pub use store::{load, DocumentStore, DocumentSummary, MemoryDocumentStore};
