//! stammtisch-core – Gemeinsame Grundtypen
//!
//! Enthaelt die Identifikations- und Autoritaetstypen sowie den zentralen
//! Fehler-Enum. Alle anderen Crates bauen hierauf auf.

pub mod error;
pub mod types;

pub use error::{Result, StammtischError};
pub use types::{Authority, SessionId, TypingState};
