//! Fehlertypen des Auth-Crates

use thiserror::Error;

/// Result-Alias fuer Auth-Operationen
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Fehler bei Passphrasen-Pruefung und Token-Verarbeitung
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Passphrasen-Hashing fehlgeschlagen: {0}")]
    PassphraseHashing(String),

    #[error("Ungueltiges Token")]
    UngueltigesToken,

    #[error("Token abgelaufen")]
    TokenAbgelaufen,
}
