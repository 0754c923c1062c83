//! Identifikations- und Autoritaetstypen fuer Stammtisch
//!
//! Session-IDs verwenden das Newtype-Pattern um Verwechslungen mit anderen
//! ID-Arten zur Compilezeit auszuschliessen. Die Autoritaetsstufen bilden
//! eine totale Ordnung; jeder Befehl deklariert seine Mindeststufe.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Session-ID
///
/// Stabil fuer die Lebensdauer einer Verbindung. Wird als oeffentliche
/// Kennung (`guid`) an alle Raummitglieder verteilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Erstellt eine neue zufaellige SessionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Autoritaetsstufe einer Session
///
/// Totale Ordnung: `Anonymous < RoomOwner < Blessed < Rabbi < King < Pope`.
/// Privilegierte Befehle pruefen `stufe >= mindeststufe` und verwerfen die
/// Anfrage bei Unterschreitung still – fehlgeschlagene Pruefungen duerfen
/// nicht verraten welche Befehle existieren.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// Frisch verbundene Session ohne besondere Rechte
    #[default]
    Anonymous,
    /// Ersteller eines Raums (wird beim Anlegen automatisch vergeben)
    RoomOwner,
    /// Von einem King/Pope gesegnete Session
    Blessed,
    /// Zeitlich begrenzte Erhebung (siehe rabbify)
    Rabbi,
    /// Per Passphrase erhobene Verwaltungsstufe
    King,
    /// Hoechste Stufe
    Pope,
}

impl Authority {
    /// Numerische Stufe fuer das `authlv`-Event (0..=5)
    pub fn stufe(&self) -> u8 {
        match self {
            Authority::Anonymous => 0,
            Authority::RoomOwner => 1,
            Authority::Blessed => 2,
            Authority::Rabbi => 3,
            Authority::King => 4,
            Authority::Pope => 5,
        }
    }

    /// Das zur Stufe gehoerende privilegierte Farb-Token (None fuer die
    /// nicht-privilegierten Stufen)
    pub fn farb_token(&self) -> Option<&'static str> {
        match self {
            Authority::Anonymous => None,
            Authority::RoomOwner => Some("king"),
            Authority::Blessed => Some("bless"),
            Authority::Rabbi => Some("rabbi"),
            Authority::King => Some("king"),
            Authority::Pope => Some("pope"),
        }
    }

    /// Standard-Tag-Beschriftung der Stufe
    pub fn tag_beschriftung(&self) -> Option<&'static str> {
        match self {
            Authority::Anonymous => None,
            Authority::RoomOwner => Some("Room Owner"),
            Authority::Blessed => Some("Blessed"),
            Authority::Rabbi => Some("Rabbi"),
            Authority::King => Some("King"),
            Authority::Pope => Some("Pope"),
        }
    }
}

/// Tipp-Indikator einer Session (Teil des oeffentlichen Profils)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TypingState {
    /// Kein Hinweis
    #[default]
    Idle,
    /// Schreibt eine Nachricht
    Typing,
    /// Tippt einen Befehl
    Commanding,
}

impl TypingState {
    /// Dekodiert den numerischen Zustand aus dem `typing`-Event
    ///
    /// Unbekannte Werte fallen auf `Idle` zurueck.
    pub fn aus_zahl(state: u8) -> Self {
        match state {
            1 => TypingState::Typing,
            2 => TypingState::Commanding,
            _ => TypingState::Idle,
        }
    }

    /// Anzeige-Suffix fuer den Namen im Roster
    pub fn suffix(&self) -> &'static str {
        match self {
            TypingState::Idle => "",
            TypingState::Typing => " (typing)",
            TypingState::Commanding => " (commanding)",
        }
    }
}
