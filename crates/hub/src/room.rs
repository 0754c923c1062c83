//! Room – die Broadcast-Domaene
//!
//! Ein Raum haelt die Mitgliederliste (Beitritts-Reihenfolge = Iterations-
//! und Broadcast-Reihenfolge), die gespiegelte Profiltabelle und den
//! Umfrage-Zustand.
//!
//! Invariante: eine Session steht ENTWEDER in `mitglieder` UND `profile`
//! oder in keinem von beiden – `beitreten`/`verlassen` mutieren beide
//! unter demselben Lock.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use stammtisch_core::SessionId;
use stammtisch_protocol::{ServerEvent, SessionProfile};

use crate::broadcast::Broadcaster;

/// Umfrage-Zustand eines Raums (hoechstens eine aktive Umfrage)
#[derive(Debug, Default)]
struct Umfrage {
    aktiv: bool,
    prompt: String,
    ja: u32,
    nein: u32,
    abgestimmt: HashSet<SessionId>,
    /// Laufende Nummer; der Auto-Ende-Timer beendet nur "seine" Umfrage
    generation: u64,
}

/// Ergebnis einer Stimmabgabe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UmfrageStand {
    pub ja_prozent: f32,
    pub nein_prozent: f32,
    pub stimmen: u32,
}

struct RoomInner {
    mitglieder: Vec<SessionId>,
    profile: HashMap<SessionId, SessionProfile>,
    umfrage: Umfrage,
}

/// Eine Broadcast-Domaene mit Mitglieder- und Profiltabelle
pub struct Room {
    pub name: String,
    inner: Mutex<RoomInner>,
}

impl Room {
    pub fn neu(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(RoomInner {
                mitglieder: Vec::new(),
                profile: HashMap::new(),
                umfrage: Umfrage::default(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Mitgliedschaft
    // -----------------------------------------------------------------------

    /// Fuegt eine Session samt Profil hinzu (atomar bezueglich der
    /// Mitgliedschafts-Invariante)
    pub fn beitreten(&self, id: SessionId, profil: SessionProfile) {
        let mut inner = self.inner.lock();
        if !inner.mitglieder.contains(&id) {
            inner.mitglieder.push(id);
        }
        inner.profile.insert(id, profil);
    }

    /// Entfernt eine Session samt Profil. Idempotent; gibt `true` zurueck
    /// wenn der Raum danach leer ist.
    pub fn verlassen(&self, id: &SessionId) -> bool {
        let mut inner = self.inner.lock();
        inner.mitglieder.retain(|m| m != id);
        inner.profile.remove(id);
        inner.mitglieder.is_empty()
    }

    /// Ersetzt den veroeffentlichten Profil-Schnappschuss einer Session
    ///
    /// No-op fuer Nicht-Mitglieder – die Invariante laesst keine
    /// Profil-Eintraege ohne Mitgliedschaft zu.
    pub fn profil_veroeffentlichen(&self, id: SessionId, profil: SessionProfile) {
        let mut inner = self.inner.lock();
        if inner.mitglieder.contains(&id) {
            inner.profile.insert(id, profil);
        }
    }

    /// Vollstaendiger Roster-Schnappschuss
    pub fn roster(&self) -> HashMap<SessionId, SessionProfile> {
        self.inner.lock().profile.clone()
    }

    /// Mitglieder in Beitritts-Reihenfolge
    pub fn mitglieder(&self) -> Vec<SessionId> {
        self.inner.lock().mitglieder.clone()
    }

    pub fn mitglied_anzahl(&self) -> usize {
        self.inner.lock().mitglieder.len()
    }

    pub fn ist_mitglied(&self, id: &SessionId) -> bool {
        self.inner.lock().mitglieder.contains(id)
    }

    pub fn ist_leer(&self) -> bool {
        self.inner.lock().mitglieder.is_empty()
    }

    /// Sucht ein Mitglied per case-insensitivem Namensvergleich
    pub fn finde_nach_name(&self, name: &str) -> Option<SessionId> {
        let gesucht = name.to_lowercase();
        let inner = self.inner.lock();
        inner
            .mitglieder
            .iter()
            .find(|id| {
                inner
                    .profile
                    .get(id)
                    .is_some_and(|p| p.name.to_lowercase() == gesucht)
            })
            .copied()
    }

    // -----------------------------------------------------------------------
    // Broadcast (in Mitglieder-Reihenfolge)
    // -----------------------------------------------------------------------

    /// Sendet ein Event an alle Mitglieder in Beitritts-Reihenfolge
    pub fn senden_an_alle(&self, broadcaster: &Broadcaster, event: ServerEvent) {
        for id in self.mitglieder() {
            broadcaster.an_session_senden(&id, event.clone());
        }
    }

    /// Sendet ein Event an alle Mitglieder ausser dem Ausloeser
    pub fn senden_an_alle_ausser(
        &self,
        broadcaster: &Broadcaster,
        ausser: &SessionId,
        event: ServerEvent,
    ) {
        for id in self.mitglieder() {
            if id != *ausser {
                broadcaster.an_session_senden(&id, event.clone());
            }
        }
    }

    /// Verteilt die aktuelle Mitgliederzahl an den Raum
    pub fn mitgliederzahl_verteilen(&self, broadcaster: &Broadcaster) {
        let count = self.mitglied_anzahl();
        self.senden_an_alle(broadcaster, ServerEvent::Serverdata { count });
    }

    // -----------------------------------------------------------------------
    // Umfrage
    // -----------------------------------------------------------------------

    /// Startet eine Umfrage; schlaegt fehl wenn bereits eine aktiv ist.
    ///
    /// Gibt die Generation zurueck, mit der der Auto-Ende-Timer spaeter
    /// re-validiert dass er noch die richtige Umfrage beendet.
    pub fn umfrage_starten(&self, prompt: &str) -> Option<u64> {
        let mut inner = self.inner.lock();
        if inner.umfrage.aktiv {
            return None;
        }
        let generation = inner.umfrage.generation + 1;
        inner.umfrage = Umfrage {
            aktiv: true,
            prompt: prompt.to_string(),
            ja: 0,
            nein: 0,
            abgestimmt: HashSet::new(),
            generation,
        };
        Some(generation)
    }

    /// Verbucht eine Stimme. Zweitstimmen derselben Session und Stimmen
    /// ohne aktive Umfrage werden ignoriert (None).
    pub fn abstimmen(&self, id: SessionId, ja: bool) -> Option<UmfrageStand> {
        let mut inner = self.inner.lock();
        if !inner.umfrage.aktiv || inner.umfrage.abgestimmt.contains(&id) {
            return None;
        }
        inner.umfrage.abgestimmt.insert(id);
        if ja {
            inner.umfrage.ja += 1;
        } else {
            inner.umfrage.nein += 1;
        }

        let stimmen = inner.umfrage.ja + inner.umfrage.nein;
        Some(UmfrageStand {
            ja_prozent: (inner.umfrage.ja as f32 / stimmen as f32) * 100.0,
            nein_prozent: (inner.umfrage.nein as f32 / stimmen as f32) * 100.0,
            stimmen,
        })
    }

    /// Beendet die Umfrage der gegebenen Generation.
    ///
    /// Gibt `false` zurueck wenn inzwischen keine oder eine andere Umfrage
    /// laeuft (Re-Validierung fuer den Timer).
    pub fn umfrage_beenden(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if !inner.umfrage.aktiv || inner.umfrage.generation != generation {
            return false;
        }
        inner.umfrage.aktiv = false;
        inner.umfrage.abgestimmt.clear();
        inner.umfrage.ja = 0;
        inner.umfrage.nein = 0;
        inner.umfrage.prompt.clear();
        true
    }

    pub fn umfrage_aktiv(&self) -> bool {
        self.inner.lock().umfrage.aktiv
    }
}
