//! stammtisch-guard – Missbrauchs-Schutz
//!
//! Alle Schutzschichten vor und waehrend einer Verbindung:
//! - `admission`: Zulassungspruefung neuer Verbindungen (Bans, Alt-Limit,
//!   Verbindungsrate)
//! - `rate_limit`: Sliding-Window-Zaehler pro Adresse und Kategorie
//! - `ban_list`: temporaere In-Memory-Bans mit Ablauf
//! - `flood`: Inhalts-Heuristik gegen bekannte Flood-Signaturen
//!
//! Saemtlicher Zustand lebt in expliziten Objekten die per Referenz in die
//! Konstruktoren gereicht werden – keine globalen Registries. Tests koennen
//! dadurch isolierte Instanzen anlegen.

pub mod admission;
pub mod ban_list;
pub mod flood;
pub mod rate_limit;

pub use admission::{AdmissionGate, AdmissionKonfig, Zulassung};
pub use ban_list::{BanEintrag, BanListe};
pub use flood::FloodHeuristik;
pub use rate_limit::{Kategorie, RateLimitKonfig, RateLimiter};
