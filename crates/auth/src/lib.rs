//! stammtisch-auth – Privilegierte Passphrasen und Erhebungs-Tokens
//!
//! Zwei Mechanismen erhoehen die Autoritaetsstufe einer Session:
//! - `passphrase`: Argon2id-Verifikation der konfigurierten King/Pope-Worte
//! - `elevation`: HMAC-signierte, zeitlich begrenzte Erhebungs-Tokens
//!   (rabbify), die einen Reconnect ohne Server-Persistenz ueberleben

pub mod elevation;
pub mod error;
pub mod passphrase;

pub use elevation::ElevationToken;
pub use error::{AuthError, AuthResult};
pub use passphrase::{passphrase_hashen, passphrase_verifizieren};
