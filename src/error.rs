//! Crate-wide error aliases.
//!
//! Mirrors the teacher's `argan_core` convention of aliasing [`thiserror::Error`]
//! as a local derive name, so every module defines its own small error enum
//! instead of funneling everything through one catch-all type.

// ----------

pub use std::error::Error as StdError;

pub(crate) use thiserror::Error as ImplError;

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Used when a branch is unreachable by construction and a clear panic message
/// is more useful than an `unwrap()` with no context.
pub(crate) const SCOPE_VALIDITY: &str = "scope validity";
