//! Directory implementations.
//!
//! The host application normally implements [`EntityDirectory`] and
//! [`PushTargetStore`] over its own database. [`memory::InMemoryDirectory`]
//! is a self-contained implementation for development and tests.
//!
//! [`EntityDirectory`]: herald_core::traits::directory::EntityDirectory
//! [`PushTargetStore`]: herald_core::traits::directory::PushTargetStore

pub mod memory;

pub use memory::InMemoryDirectory;
