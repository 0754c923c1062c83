//! Voice-Zustand – Teilnehmer, Raeume, Praesentator-Flag
//!
//! Haelt den ephemeren Zustand des Signalisierungs-Namensraums: wer ist in
//! welchem Voice-Raum, wer praesentiert gerade. Voice-Raeume sind
//! unabhaengig von den Chat-Raeumen und verschwinden sobald sie leer sind.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use stammtisch_core::SessionId;
use stammtisch_protocol::{SignalServerEvent, VoiceParticipant};

/// Groesse der Send-Queue pro Teilnehmer
const SEND_QUEUE_GROESSE: usize = 64;

/// Ein verbundener Signalisierungs-Teilnehmer
#[derive(Debug, Clone)]
struct Teilnehmer {
    username: String,
    raum: String,
    is_muted: bool,
    is_speaking: bool,
    is_screensharing: bool,
    tx: mpsc::Sender<SignalServerEvent>,
}

impl Teilnehmer {
    fn info(&self, id: SessionId) -> VoiceParticipant {
        VoiceParticipant {
            user_id: id,
            username: self.username.clone(),
            is_muted: self.is_muted,
            is_speaking: self.is_speaking,
            is_screensharing: self.is_screensharing,
        }
    }
}

/// Ergebnis eines Screenshare-Start-Versuchs
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenshareStart {
    /// Praesentator-Flag gesetzt
    Gestartet,
    /// Abgelehnt: ein anderes Mitglied praesentiert bereits
    Abgelehnt { praesentator: SessionId },
}

/// Geteilter Zustand des Voice-Namensraums
#[derive(Clone)]
pub struct VoiceState {
    inner: Arc<VoiceStateInner>,
}

struct VoiceStateInner {
    teilnehmer: DashMap<SessionId, Teilnehmer>,
    /// Raum -> Teilnehmer in Beitritts-Reihenfolge
    raeume: DashMap<String, Vec<SessionId>>,
    /// Raum -> aktueller Praesentator
    praesentatoren: DashMap<String, SessionId>,
}

impl VoiceState {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(VoiceStateInner {
                teilnehmer: DashMap::new(),
                raeume: DashMap::new(),
                praesentatoren: DashMap::new(),
            }),
        }
    }

    /// Registriert einen Teilnehmer in einem Voice-Raum.
    ///
    /// Gibt die Empfangs-Queue und das Teilnehmer-Roster (inklusive des
    /// Beitretenden) zurueck.
    pub fn beitreten(
        &self,
        id: SessionId,
        username: String,
        raum: String,
    ) -> (mpsc::Receiver<SignalServerEvent>, Vec<VoiceParticipant>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner.teilnehmer.insert(
            id,
            Teilnehmer {
                username,
                raum: raum.clone(),
                is_muted: false,
                is_speaking: false,
                is_screensharing: false,
                tx,
            },
        );
        self.inner.raeume.entry(raum.clone()).or_default().push(id);

        tracing::debug!(session_id = %id, raum = %raum, "Voice-Teilnehmer beigetreten");
        (rx, self.teilnehmer_in(&raum))
    }

    /// Entfernt einen Teilnehmer.
    ///
    /// Gibt `(raum, war_praesentator)` zurueck; leere Raeume werden sofort
    /// aufgeraeumt. Idempotent.
    pub fn verlassen(&self, id: &SessionId) -> Option<(String, bool)> {
        let (_, teilnehmer) = self.inner.teilnehmer.remove(id)?;
        let raum = teilnehmer.raum;

        if let Some(mut mitglieder) = self.inner.raeume.get_mut(&raum) {
            mitglieder.retain(|m| m != id);
        }
        self.inner.raeume.remove_if(&raum, |_, m| m.is_empty());

        let war_praesentator = self
            .inner
            .praesentatoren
            .remove_if(&raum, |_, p| p == id)
            .is_some();

        tracing::debug!(session_id = %id, raum = %raum, "Voice-Teilnehmer gegangen");
        Some((raum, war_praesentator))
    }

    /// Teilnehmer-Roster eines Raums in Beitritts-Reihenfolge
    pub fn teilnehmer_in(&self, raum: &str) -> Vec<VoiceParticipant> {
        let ids = match self.inner.raeume.get(raum) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        ids.iter()
            .filter_map(|id| self.inner.teilnehmer.get(id).map(|t| t.info(*id)))
            .collect()
    }

    /// Raum eines Teilnehmers
    pub fn raum_von(&self, id: &SessionId) -> Option<String> {
        self.inner.teilnehmer.get(id).map(|t| t.raum.clone())
    }

    /// Username eines Teilnehmers
    pub fn username_von(&self, id: &SessionId) -> Option<String> {
        self.inner.teilnehmer.get(id).map(|t| t.username.clone())
    }

    pub fn ist_verbunden(&self, id: &SessionId) -> bool {
        self.inner.teilnehmer.contains_key(id)
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Sendet ein Event an einen einzelnen Teilnehmer.
    ///
    /// Unbekannte Ziele werden still ignoriert (kein Orakel fuer
    /// sondierende Clients).
    pub fn senden_an(&self, id: &SessionId, event: SignalServerEvent) -> bool {
        match self.inner.teilnehmer.get(id) {
            Some(t) => match t.tx.try_send(event) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(session_id = %id, "Voice-Send-Queue voll – Event verworfen");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            },
            None => false,
        }
    }

    /// Sendet ein Event an alle Raummitglieder ausser einem
    pub fn an_raum_senden_ausser(
        &self,
        raum: &str,
        ausser: &SessionId,
        event: SignalServerEvent,
    ) {
        let ids = match self.inner.raeume.get(raum) {
            Some(ids) => ids.clone(),
            None => return,
        };
        for id in ids {
            if id != *ausser {
                self.senden_an(&id, event.clone());
            }
        }
    }

    /// Sendet ein Event an alle Raummitglieder
    pub fn an_raum_senden(&self, raum: &str, event: SignalServerEvent) {
        let ids = match self.inner.raeume.get(raum) {
            Some(ids) => ids.clone(),
            None => return,
        };
        for id in ids {
            self.senden_an(&id, event.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    pub fn mute_setzen(&self, id: &SessionId, is_muted: bool) {
        if let Some(mut t) = self.inner.teilnehmer.get_mut(id) {
            t.is_muted = is_muted;
        }
    }

    pub fn speaking_setzen(&self, id: &SessionId, is_speaking: bool) {
        if let Some(mut t) = self.inner.teilnehmer.get_mut(id) {
            t.is_speaking = is_speaking;
        }
    }

    // -----------------------------------------------------------------------
    // Screenshare (genau ein Praesentator pro Raum)
    // -----------------------------------------------------------------------

    /// Versucht das Praesentator-Flag fuer `id` zu setzen.
    ///
    /// Schlaegt fehl wenn ein ANDERES Mitglied bereits praesentiert; der
    /// bestehende Praesentator bleibt dabei voellig unberuehrt.
    pub fn screenshare_starten(&self, raum: &str, id: SessionId) -> ScreenshareStart {
        let eintrag = self
            .inner
            .praesentatoren
            .entry(raum.to_string())
            .or_insert(id);
        let praesentator = *eintrag.value();
        drop(eintrag);

        if praesentator != id {
            return ScreenshareStart::Abgelehnt { praesentator };
        }

        if let Some(mut t) = self.inner.teilnehmer.get_mut(&id) {
            t.is_screensharing = true;
        }
        ScreenshareStart::Gestartet
    }

    /// Loescht das Praesentator-Flag wenn `id` der Praesentator ist.
    ///
    /// Gibt `true` zurueck wenn tatsaechlich beendet wurde.
    pub fn screenshare_beenden(&self, raum: &str, id: &SessionId) -> bool {
        let beendet = self
            .inner
            .praesentatoren
            .remove_if(raum, |_, p| p == id)
            .is_some();
        if beendet {
            if let Some(mut t) = self.inner.teilnehmer.get_mut(id) {
                t.is_screensharing = false;
            }
        }
        beendet
    }

    /// Aktueller Praesentator eines Raums
    pub fn praesentator_von(&self, raum: &str) -> Option<SessionId> {
        self.inner.praesentatoren.get(raum).map(|e| *e.value())
    }
}

impl Default for VoiceState {
    fn default() -> Self {
        Self::neu()
    }
}
