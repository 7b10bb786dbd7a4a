//! Adapters implementing the removal ports.
//!
//! - `in_memory`: every storage port plus a recording remover, for tests/dev
//! - `logging_remover`: stand-in for the messaging platform client
//! - `seed`: JSON seed data for the in-memory backend

pub mod in_memory;
pub mod logging_remover;
pub mod seed;

pub use in_memory::{
    InMemoryBackend, InMemoryDirectory, InMemoryMemberships, InMemoryRemovalHistory,
    InMemoryRemovalQueue, InMemoryWhitelist, RecordingRemover, RemoveCall,
};
pub use logging_remover::LoggingMemberRemover;
pub use seed::{Seed, SeedError, SeedGroup, SeedMember};
