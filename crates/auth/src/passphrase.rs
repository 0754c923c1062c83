//! Passphrasen-Pruefung mit Argon2id
//!
//! Die privilegierten Passphrasen (King-/Pope-Wort) liegen als
//! Argon2id-PHC-Strings in der Konfiguration. Clients senden die Passphrase
//! im Klartext ueber den Event-Kanal; der Vergleich laeuft serverseitig
//! gegen den Hash. Argon2id gemaess OWASP-Richtlinien.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

use crate::error::AuthError;

/// Argon2id-Parameter
///
/// - Speicher: 64 MiB
/// - Iterationen: 3
/// - Parallelismus: 1
fn argon2_instanz() -> Argon2<'static> {
    let params = Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 Iterationen
        1,         // p_cost: 1 Thread
        None,      // output_len: Standard (32 Bytes)
    )
    .expect("Argon2-Parameter ungueltig");

    Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params)
}

/// Hasht eine Passphrase mit Argon2id und zufaelligem Salt
///
/// Gibt den PHC-String fuer die Konfigurationsdatei zurueck.
pub fn passphrase_hashen(passphrase: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2_instanz()
        .hash_password(passphrase.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PassphraseHashing(e.to_string()))
}

/// Verifiziert eine Passphrase gegen einen gespeicherten PHC-Hash.
///
/// Ein leerer oder fehlender Hash lehnt grundsaetzlich ab – eine nicht
/// konfigurierte Passphrase darf keine Stufe freischalten. Ungueltig
/// formatierte Hashes werden ebenfalls als Ablehnung behandelt, nicht als
/// Fehler: der Client darf aus der Antwort nichts ueber die Konfiguration
/// lernen.
pub fn passphrase_verifizieren(passphrase: &str, hash: Option<&str>) -> bool {
    let hash = match hash {
        Some(h) if !h.is_empty() => h,
        _ => return false,
    };

    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(fehler = %e, "Passphrasen-Hash in der Konfiguration unlesbar");
            return false;
        }
    };

    argon2_instanz()
        .verify_password(passphrase.as_bytes(), &parsed)
        .is_ok()
}
