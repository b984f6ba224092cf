pub mod connection;
pub mod errors;
pub mod memory;
pub mod postgres;
pub mod queries;
pub mod store;


pub use connection::*;
pub use errors::*;
pub use memory::MemoryReputationStore;
pub use postgres::PgReputationStore;
pub use store::{ReputationStore, ReputationTx};
