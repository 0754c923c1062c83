//! Session – serverseitiger Zustand einer verbundenen Client-Verbindung
//!
//! Eine Session durchlaeuft die Zustandsmaschine
//! `Unauthentifiziert -> Authentifiziert -> Beendet`. Der oeffentliche
//! Profil-Schnappschuss wird bei JEDER Abfrage frisch aus den Rohfeldern
//! gebaut – private Felder (Slowmode, Statlock, Sanitize, Zeitstempel)
//! koennen so strukturell nicht in Broadcasts gelangen.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use stammtisch_core::{Authority, SessionId, TypingState};
use stammtisch_protocol::SessionProfile;

/// Login-Zustandsmaschine einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginZustand {
    /// Verbunden, noch kein Login-Event
    Unauthentifiziert,
    /// Login akzeptiert, Mitglied eines Raums
    Authentifiziert,
    /// Verbindung wird abgebaut
    Beendet,
}

/// Freischaltbare Faehigkeiten des Wirtschaftssystems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artikel {
    Lock,
    Boltcutters,
    Doorbell,
    Veto,
    Selfdefense,
}

impl Artikel {
    /// Parst einen Artikelnamen aus dem `buy`-Befehl
    pub fn aus_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "lock" => Some(Artikel::Lock),
            "boltcutters" => Some(Artikel::Boltcutters),
            "doorbell" => Some(Artikel::Doorbell),
            "veto" => Some(Artikel::Veto),
            "selfdefense" => Some(Artikel::Selfdefense),
            _ => None,
        }
    }

    /// Wire-Name des Artikels
    pub fn name(&self) -> &'static str {
        match self {
            Artikel::Lock => "lock",
            Artikel::Boltcutters => "boltcutters",
            Artikel::Doorbell => "doorbell",
            Artikel::Veto => "veto",
            Artikel::Selfdefense => "selfdefense",
        }
    }
}

/// Serverseitiger Zustand einer Verbindung
pub struct Session {
    /// Stabile oeffentliche Kennung
    pub id: SessionId,
    /// Netzwerkadresse (Rate-Limits, Bans, Alt-Zaehlung)
    pub adresse: String,
    /// Login-Zustand
    pub zustand: LoginZustand,
    /// Aktuelle Autoritaetsstufe
    pub autoritaet: Authority,
    /// Name des beigetretenen Raums
    pub raum: Option<String>,

    // --- Oeffentliche Profil-Rohfelder ---
    basis_name: String,
    farbe: String,
    tag: String,
    getaggt: bool,
    typing: TypingState,
    stumm: bool,
    sprach_stumm: bool,
    spricht: bool,
    pitch: i32,
    speed: i32,
    muenzen: i64,
    lock: bool,
    boltcutters: bool,
    doorbell: bool,
    veto: bool,
    selfdefense: bool,

    // --- Privater Zustand (nie im Schnappschuss) ---
    /// Slowmode-Sperre nach akzeptiertem Talk/Befehl
    pub slowmode_aktiv: bool,
    /// Name/Farbe nur noch durch Senior-Befehle aenderbar
    pub stat_gesperrt: bool,
    /// HTML-Escaping und Blacklist-Filter aktiv
    pub sanitize: bool,
    /// Zeitpunkt des letzten Befehls
    pub letzter_befehl: Option<Instant>,
    /// Zeitpunkt der letzten Arbeit (work-Cooldown)
    pub letzte_arbeit: Option<Instant>,
    /// Generation der zeitlich begrenzten Erhebung; ein Timer feuert nur
    /// wenn seine Generation noch die aktuelle ist
    pub erhebungs_generation: u64,
}

impl Session {
    /// Erstellt eine frische, noch nicht eingeloggte Session
    pub fn neu(id: SessionId, adresse: String) -> Self {
        Self {
            id,
            adresse,
            zustand: LoginZustand::Unauthentifiziert,
            autoritaet: Authority::Anonymous,
            raum: None,
            basis_name: "Anonymous".to_string(),
            farbe: "purple".to_string(),
            tag: String::new(),
            getaggt: false,
            typing: TypingState::Idle,
            stumm: false,
            sprach_stumm: false,
            spricht: false,
            pitch: 100,
            speed: 100,
            muenzen: 0,
            lock: false,
            boltcutters: false,
            doorbell: false,
            veto: false,
            selfdefense: false,
            slowmode_aktiv: false,
            stat_gesperrt: false,
            sanitize: true,
            letzter_befehl: None,
            letzte_arbeit: None,
            erhebungs_generation: 0,
        }
    }

    /// Baut den oeffentlichen Profil-Schnappschuss.
    ///
    /// Anzeige-Suffixe (typing/speaking/muted) werden hier abgeleitet
    /// statt destruktiv in den Namen geschrieben.
    pub fn schnappschuss(&self) -> SessionProfile {
        let mut name = self.basis_name.clone();
        if self.spricht {
            name.push_str(" (speaking)");
        }
        if self.stumm {
            name.push_str(" (muted)");
        }
        if self.sprach_stumm {
            name.push_str(" (voice muted)");
        }

        SessionProfile {
            guid: self.id,
            name,
            color: self.farbe.clone(),
            tag: self.tag.clone(),
            tagged: self.getaggt,
            typing: self.typing.suffix().to_string(),
            muted: self.stumm,
            voice_muted: self.sprach_stumm,
            speaking: self.spricht,
            pitch: self.pitch,
            speed: self.speed,
            coins: self.muenzen,
            lock: self.lock,
            boltcutters: self.boltcutters,
            doorbell: self.doorbell,
            veto: self.veto,
            selfdefense: self.selfdefense,
        }
    }

    // --- Profil-Mutationen ---

    pub fn name_setzen(&mut self, name: String) {
        self.basis_name = name;
    }

    pub fn name(&self) -> &str {
        &self.basis_name
    }

    pub fn farbe_setzen(&mut self, farbe: String) {
        self.farbe = farbe;
    }

    pub fn farbe(&self) -> &str {
        &self.farbe
    }

    pub fn tag_setzen(&mut self, tag: String) {
        self.getaggt = !tag.is_empty();
        self.tag = tag;
    }

    pub fn typing_setzen(&mut self, typing: TypingState) {
        self.typing = typing;
    }

    pub fn pitch_setzen(&mut self, pitch: i32) {
        self.pitch = pitch;
    }

    pub fn speed_setzen(&mut self, speed: i32) {
        self.speed = speed;
    }

    /// Schaltet die Text-Stummschaltung um, gibt den neuen Zustand zurueck
    pub fn stumm_umschalten(&mut self) -> bool {
        self.stumm = !self.stumm;
        self.stumm
    }

    pub fn ist_stumm(&self) -> bool {
        self.stumm
    }

    /// Schaltet die Sprach-Stummschaltung um, gibt den neuen Zustand
    /// zurueck. Ein aktiver Sprech-Status wird dabei beendet.
    pub fn sprach_stumm_umschalten(&mut self) -> bool {
        self.sprach_stumm = !self.sprach_stumm;
        if self.sprach_stumm {
            self.spricht = false;
        }
        self.sprach_stumm
    }

    pub fn ist_sprach_stumm(&self) -> bool {
        self.sprach_stumm
    }

    pub fn sprechen_setzen(&mut self, spricht: bool) {
        self.spricht = spricht;
    }

    // --- Wirtschaft ---

    pub fn muenzen(&self) -> i64 {
        self.muenzen
    }

    pub fn muenzen_gutschreiben(&mut self, betrag: i64) {
        self.muenzen += betrag;
    }

    /// Kauft einen Artikel: zieht den Preis ab und setzt das Flag.
    ///
    /// Gibt `false` zurueck (und aendert nichts) wenn das Guthaben nicht
    /// reicht oder der Artikel bereits freigeschaltet ist.
    pub fn artikel_kaufen(&mut self, artikel: Artikel, preis: i64) -> bool {
        if self.muenzen < preis || self.hat_artikel(artikel) {
            return false;
        }
        self.muenzen -= preis;
        match artikel {
            Artikel::Lock => self.lock = true,
            Artikel::Boltcutters => self.boltcutters = true,
            Artikel::Doorbell => self.doorbell = true,
            Artikel::Veto => self.veto = true,
            Artikel::Selfdefense => self.selfdefense = true,
        }
        true
    }

    pub fn hat_artikel(&self, artikel: Artikel) -> bool {
        match artikel {
            Artikel::Lock => self.lock,
            Artikel::Boltcutters => self.boltcutters,
            Artikel::Doorbell => self.doorbell,
            Artikel::Veto => self.veto,
            Artikel::Selfdefense => self.selfdefense,
        }
    }
}

/// Registry aller verbundenen Sessions
///
/// Thread-safe via Arc + DashMap; die Session selbst liegt hinter einem
/// parking_lot-Mutex mit kurzen Lock-Fenstern.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<DashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    pub fn einfuegen(&self, session: Session) -> Arc<Mutex<Session>> {
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.inner.insert(id, Arc::clone(&handle));
        handle
    }

    pub fn holen(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.inner.get(id).map(|e| Arc::clone(e.value()))
    }

    /// Entfernt eine Session (idempotent)
    pub fn entfernen(&self, id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.inner.remove(id).map(|(_, v)| v)
    }

    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }
}
