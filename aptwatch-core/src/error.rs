//! Re-export of the unified error type.
//!
//! The engine uses a single error taxonomy end to end; `aptwatch-core` does
//! not define its own variant set, it just re-exports the one living in
//! `aptwatch-types` so both the DTOs and the runtime traits share it.

pub use aptwatch_types::IngestError;
