//! Fehlertypen fuer Stammtisch
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Die Fehlerbehandlungs-Politik folgt vier Klassen:
//! - Fehlgeformte Eingaben und Autorisierungsfehler werden STILL verworfen
//!   (kein Fingerprinting-Orakel fuer sondierende Clients)
//! - Rate-/Missbrauchsverstoesse werden still gedrosselt oder mit
//!   Ban-Hinweis getrennt
//! - Nicht gefundene Ressourcen werden NUR dem Ausloeser gemeldet
//! - Interne Fehler werden geloggt und duerfen den Prozess nie beenden

use thiserror::Error;

/// Globaler Result-Alias fuer Stammtisch
pub type Result<T> = std::result::Result<T, StammtischError>;

/// Alle moeglichen Fehler im Stammtisch-System
#[derive(Debug, Error)]
pub enum StammtischError {
    // --- Eingabe & Autorisierung (stille Verwerfung) ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Zugriff verweigert")]
    ZugriffVerweigert,

    // --- Rate / Missbrauch ---
    #[error("Gedrosselt")]
    Gedrosselt,

    #[error("Gebannt: {grund}")]
    Gebannt { grund: String },

    // --- Ressourcen (Rueckmeldung nur an den Ausloeser) ---
    #[error("Raum nicht gefunden: {0}")]
    RaumNichtGefunden(String),

    #[error("Session nicht gefunden: {0}")]
    SessionNichtGefunden(String),

    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl StammtischError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler ohne Rueckmeldung an den Client
    /// verworfen wird
    pub fn wird_still_verworfen(&self) -> bool {
        matches!(
            self,
            Self::UngueltigeNachricht(_) | Self::ZugriffVerweigert | Self::Gedrosselt
        )
    }

    /// Gibt true zurueck wenn der Fehler nur dem Ausloeser gemeldet wird
    pub fn nur_an_ausloeser(&self) -> bool {
        matches!(
            self,
            Self::RaumNichtGefunden(_) | Self::SessionNichtGefunden(_)
        )
    }
}
