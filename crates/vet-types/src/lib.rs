//! # Vet Types
//!
//! Validated value types shared by the matching engine and its command-line front end.
//!
//! - [`Species`]: the closed set of species the knowledge base covers
//! - [`Urgency`]: the ordinal triage classification attached to every disease profile
//! - [`DiseaseName`]: a trimmed, non-empty disease label with case-insensitive comparison helpers

mod name;
mod species;
mod urgency;

pub use name::{DiseaseName, NameError};
pub use species::{Species, SpeciesError};
pub use urgency::{Urgency, UrgencyError};
