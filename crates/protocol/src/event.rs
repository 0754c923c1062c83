//! Chat-Kanal-Events
//!
//! Tagged Enums fuer alle Nachrichten des Chat-/Befehls-Kanals. Die
//! Wire-Namen (`type`-Feld und Feldnamen) sind Teil des Protokolls und
//! duerfen nicht umbenannt werden.
//!
//! ## Design
//! - `ClientEvent`: Client -> Server
//! - `ServerEvent`: Server -> Client
//! - `SessionProfile`: unveraenderlicher oeffentlicher Profil-Schnappschuss.
//!   Jede Mutation baut einen neuen Schnappschuss; private Session-Felder
//!   koennen dadurch strukturell nicht an Clients gelangen.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use stammtisch_core::SessionId;

// ---------------------------------------------------------------------------
// Oeffentliches Profil
// ---------------------------------------------------------------------------

/// Oeffentlicher Profil-Schnappschuss einer Session
///
/// Das ist der EINZIGE Teil des Session-Zustands der an Mitbewohner eines
/// Raums verteilt wird.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    /// Oeffentliche Kennung der Session
    pub guid: SessionId,
    /// Anzeigename
    pub name: String,
    /// Farb-Token oder (whitelist-geprueft) eine Bild-URL
    pub color: String,
    /// Tag-Beschriftung
    pub tag: String,
    /// Ob der Tag angezeigt wird
    pub tagged: bool,
    /// Tipp-Indikator-Suffix ("", " (typing)", " (commanding)")
    pub typing: String,
    /// Text-Stummschaltung
    pub muted: bool,
    /// Sprach-Stummschaltung
    #[serde(rename = "voiceMuted")]
    pub voice_muted: bool,
    /// Spricht gerade
    pub speaking: bool,
    /// Stimmen-Tonhoehe (kosmetisch)
    pub pitch: i32,
    /// Sprechgeschwindigkeit (kosmetisch)
    pub speed: i32,
    /// Muenzstand des Wirtschaftssystems
    pub coins: i64,
    /// Freigeschaltete Faehigkeiten (Wirtschaftssystem)
    pub lock: bool,
    pub boltcutters: bool,
    pub doorbell: bool,
    pub veto: bool,
    pub selfdefense: bool,
}

impl SessionProfile {
    /// Erstellt das Profil einer frisch verbundenen Session
    pub fn neu(guid: SessionId, name: String, color: String) -> Self {
        Self {
            guid,
            name,
            color,
            tag: String::new(),
            tagged: false,
            typing: String::new(),
            muted: false,
            voice_muted: false,
            speaking: false,
            pitch: 100,
            speed: 100,
            coins: 0,
            lock: false,
            boltcutters: false,
            doorbell: false,
            veto: false,
            selfdefense: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Eingehende Events vom Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Einmaliger Login; Wiederholungen werden ignoriert
    Login {
        name: String,
        room: String,
        #[serde(default)]
        credential: Option<String>,
        #[serde(default, rename = "elevationToken")]
        elevation_token: Option<String>,
    },
    /// Chat-Nachricht
    Talk { text: String },
    /// Text-Befehl, bereits in Verb + Argumente zerlegt
    Command { verb: String, args: Vec<String> },
    /// Tipp-Indikator (0=idle, 1=typing, 2=commanding)
    Typing { state: u8 },
    /// Sprech-Status
    Speaking { speaking: bool },
    /// Rohes Audio-Payload (Durchreichung, uninterpretiert)
    Voice { data: String },
    /// Selbst-Bearbeitung des Profils (statlock-geschuetzt)
    Useredit {
        #[serde(rename = "targetId")]
        target_id: SessionId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        color: Option<String>,
    },
    /// Abstimmung zur aktiven Umfrage
    Vote { vote: bool },
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Ausgehende Events an den Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Vollstaendiger Roster-Schnappschuss (nur an die neue Session)
    #[serde(rename = "updateAll")]
    UpdateAll {
        #[serde(rename = "usersPublic")]
        users_public: HashMap<SessionId, SessionProfile>,
    },
    /// Profil-Aenderung einer einzelnen Session
    Update {
        guid: SessionId,
        #[serde(rename = "userPublic")]
        user_public: SessionProfile,
    },
    /// Session hat den Raum verlassen
    Leave { guid: SessionId },
    /// Raum-Informationen nach dem Login
    Room {
        room: String,
        #[serde(rename = "isOwner")]
        is_owner: bool,
        #[serde(rename = "isPublic")]
        is_public: bool,
    },
    /// Aufgeloeste Autoritaetsstufe der Session
    Authlv { level: u8 },
    /// Chat-Nachricht im Raum
    Talk { guid: SessionId, text: String },
    /// Mitgliederzahl des Raums
    Serverdata { count: usize },
    /// Ban-Hinweis (vor dem Trennen gesendet)
    Ban {
        reason: String,
        #[serde(rename = "endTimestamp")]
        end_timestamp: i64,
    },
    /// Kick-Hinweis (vor dem Trennen gesendet)
    Kick { reason: String },
    /// Text-Stummschaltungs-Status an den Betroffenen
    Muted { muted: bool },
    /// Sprach-Stummschaltungs-Status an den Betroffenen
    #[serde(rename = "voiceMuted")]
    VoiceMuted { muted: bool },
    /// Ansage an den ganzen Raum
    Announcement { from: String, msg: String },
    /// Neue Umfrage wird angezeigt
    Pollshow { prompt: String },
    /// Zwischenstand der Umfrage (Prozentwerte)
    #[serde(rename = "pollUpdate")]
    PollUpdate {
        #[serde(rename = "yesPct")]
        yes_pct: f32,
        #[serde(rename = "noPct")]
        no_pct: f32,
        #[serde(rename = "totalVotes")]
        total_votes: u32,
    },
    /// Zeitlich begrenzte Erhebung: Token zum Aufbewahren (None = loeschen)
    Elevation {
        token: Option<String>,
        expires: Option<i64>,
    },
    /// Rueckmeldung nur an den Ausloeser (unbekanntes Ziel, Kontostand, ...)
    Notice { text: String },
    /// Audio-Durchreichung an die Raummitglieder
    Voice { guid: SessionId, data: String },

    // Kosmetische Broadcasts – der Server prueft nur die Berechtigung,
    // die Darstellung ist Sache des Clients.
    Joke { guid: SessionId, rng: f64 },
    Fact { guid: SessionId, rng: f64 },
    Backflip { guid: SessionId, swag: bool },
    Youtube { guid: SessionId, vid: String },
    Dm { from: SessionId, msg: String },
    Quote { from: SessionId, msg: String },
}
