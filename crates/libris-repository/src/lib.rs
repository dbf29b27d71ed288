//! # Libris Repository
//!
//! Data access for books.
//!
//! ```text
//! BookService
//!   ↓  Arc<R: BookRepository>
//! PostgresBookRepository   (SQLx / PostgreSQL)
//! InMemoryBookRepository   (tests, `memory://` mode)
//! ```

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod traits;

pub use memory::InMemoryBookRepository;
pub use pool::*;
pub use postgres::*;
pub use traits::*;
