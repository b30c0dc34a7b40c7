//! Mailcast domain logic.
//!
//! Everything in this crate is pure: no I/O, no async runtime. The API
//! crate wires these pieces to HTTP, the relay, and the job store.

pub mod campaign;
pub mod csv;
pub mod error;
pub mod relay;
pub mod rows;
pub mod submission;
pub mod template;
pub mod types;
