//! Gemeinsamer Hub-Zustand
//!
//! Haelt alle geteilten Zustandsobjekte als Arc-Referenzen die sicher
//! zwischen tokio-Tasks geteilt werden koennen. Saemtliche Registries
//! (Sessions, Raeume, Bans, Rate-Limits) sind explizite Objekte die hier
//! per Konstruktor injiziert werden – Tests bauen sich isolierte
//! Instanzen.

use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;

use stammtisch_guard::{AdmissionGate, BanListe, FloodHeuristik, RateLimiter};

use crate::broadcast::Broadcaster;
use crate::registry::RoomRegistry;
use crate::session::{Artikel, SessionRegistry};

/// Konfiguration des Hubs
#[derive(Debug, Clone)]
pub struct HubKonfig {
    /// Name des nie geloeschten Standard-Raums
    pub standard_raum: String,
    /// Ersatzname fuer ungueltige Login-Namen
    pub standard_name: String,
    /// Maximale Namenslaenge
    pub namens_limit: usize,
    /// Cool-down nach akzeptiertem Talk/Befehl
    pub slowmode: Duration,
    /// Laufzeit einer Umfrage bis zum automatischen Ende
    pub umfrage_dauer: Duration,
    /// Nicht-privilegierte Farbpalette fuer die Zufallsauswahl
    pub farben: Vec<String>,
    /// Verbotene Substrings fuer Namen, Chat-Text und Befehls-Parameter
    pub blacklist: Vec<String>,
    /// Erlaubte Hosts fuer Bild-URLs als Farbe (Crosscolor-Filter)
    pub bild_host_whitelist: Vec<String>,
    /// Muenzen pro `work`
    pub arbeitslohn: i64,
    /// Cool-down zwischen zwei `work`-Aufrufen
    pub arbeits_pause: Duration,
    /// Argon2-Hash der King-Passphrase (None = deaktiviert)
    pub king_passphrase_hash: Option<String>,
    /// Argon2-Hash der Pope-Passphrase (None = deaktiviert)
    pub pope_passphrase_hash: Option<String>,
    /// HMAC-Secret fuer Erhebungs-Tokens
    pub erhebungs_secret: String,
}

impl Default for HubKonfig {
    fn default() -> Self {
        Self {
            standard_raum: "default".into(),
            standard_name: "Anonymous".into(),
            namens_limit: 32,
            slowmode: Duration::from_millis(1500),
            umfrage_dauer: Duration::from_secs(5 * 60),
            farben: ["purple", "red", "blue", "green", "brown", "black", "pink"]
                .map(String::from)
                .to_vec(),
            blacklist: Vec::new(),
            bild_host_whitelist: Vec::new(),
            arbeitslohn: 25,
            arbeits_pause: Duration::from_secs(60),
            king_passphrase_hash: None,
            pope_passphrase_hash: None,
            erhebungs_secret: String::new(),
        }
    }
}

impl HubKonfig {
    /// Zieht eine zufaellige nicht-privilegierte Farbe.
    ///
    /// Die privilegierten Tokens (pope/king/bless/rabbi) stehen nie in der
    /// Palette und koennen deshalb nicht zufaellig vergeben werden.
    pub fn zufaellige_farbe(&self) -> String {
        if self.farben.is_empty() {
            return "purple".into();
        }
        let index = rand::rng().random_range(0..self.farben.len());
        self.farben[index].clone()
    }

    /// Preis eines Wirtschafts-Artikels
    pub fn artikel_preis(&self, artikel: Artikel) -> i64 {
        match artikel {
            Artikel::Lock => 100,
            Artikel::Boltcutters => 150,
            Artikel::Doorbell => 50,
            Artikel::Veto => 500,
            Artikel::Selfdefense => 250,
        }
    }

    /// Prueft einen Text gegen die Blacklist (case-insensitiv).
    ///
    /// Leere Eintraege werden ignoriert – eine leere Zeile in der
    /// Konfiguration wuerde sonst alles treffen.
    pub fn blacklist_getroffen(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.blacklist
            .iter()
            .filter(|e| !e.is_empty())
            .any(|e| text.contains(&e.to_lowercase()))
    }
}

/// Gemeinsamer Hub-Zustand (thread-safe, Arc-geteilt)
pub struct HubState {
    pub konfig: Arc<HubKonfig>,
    pub sessions: SessionRegistry,
    pub raeume: RoomRegistry,
    pub broadcaster: Broadcaster,
    pub limiter: Arc<RateLimiter>,
    pub bans: Arc<BanListe>,
    pub admission: Arc<AdmissionGate>,
    pub flood: FloodHeuristik,
}

impl HubState {
    pub fn neu(
        konfig: HubKonfig,
        limiter: Arc<RateLimiter>,
        bans: Arc<BanListe>,
        admission: Arc<AdmissionGate>,
        flood: FloodHeuristik,
    ) -> Arc<Self> {
        let raeume = RoomRegistry::neu(konfig.standard_raum.clone());
        Arc::new(Self {
            konfig: Arc::new(konfig),
            sessions: SessionRegistry::neu(),
            raeume,
            broadcaster: Broadcaster::neu(),
            limiter,
            bans,
            admission,
            flood,
        })
    }
}
