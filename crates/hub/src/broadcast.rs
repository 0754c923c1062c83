//! Event-Broadcaster – Sendet Events an verbundene Sessions
//!
//! Der Broadcaster verwaltet die Send-Queues aller verbundenen Sessions.
//! Raumweite Fan-Outs laufen ueber `Room`, das die Mitglieder in
//! Beitritts-Reihenfolge iteriert und pro Mitglied hier einliefert.
//!
//! Zusaetzlich haelt der Broadcaster pro Session ein Trenn-Signal, mit dem
//! Moderations-Befehle (kick, ban) die Verbindungs-Schleife beenden.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use stammtisch_core::SessionId;
use stammtisch_protocol::ServerEvent;

/// Groesse der Send-Queue pro Session
const SEND_QUEUE_GROESSE: usize = 64;

/// Handle auf die Send-Queue einer verbundenen Session
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub session_id: SessionId,
    tx: mpsc::Sender<ServerEvent>,
    trennen_tx: watch::Sender<bool>,
}

impl ClientSender {
    /// Sendet ein Event nicht-blockierend an die Session
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, event: ServerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(session_id = %self.session_id, "Send-Queue voll – Event verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    "Send-Queue geschlossen (Session getrennt)"
                );
                false
            }
        }
    }
}

/// Zentraler Event-Broadcaster fuer alle verbundenen Sessions
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    clients: DashMap<SessionId, ClientSender>,
}

impl Broadcaster {
    /// Erstellt einen neuen Broadcaster
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                clients: DashMap::new(),
            }),
        }
    }

    /// Registriert eine neue Session.
    ///
    /// Gibt die Empfangs-Queue und den Trenn-Empfaenger zurueck; die
    /// Verbindungs-Schleife liest aus der Queue und beendet sich wenn das
    /// Trenn-Signal feuert.
    pub fn client_registrieren(
        &self,
        session_id: SessionId,
    ) -> (mpsc::Receiver<ServerEvent>, watch::Receiver<bool>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        let (trennen_tx, trennen_rx) = watch::channel(false);
        self.inner.clients.insert(
            session_id,
            ClientSender {
                session_id,
                tx,
                trennen_tx,
            },
        );
        tracing::debug!(session_id = %session_id, "Session im Broadcaster registriert");
        (rx, trennen_rx)
    }

    /// Entfernt eine Session aus dem Broadcaster (idempotent)
    pub fn client_entfernen(&self, session_id: &SessionId) {
        self.inner.clients.remove(session_id);
    }

    /// Sendet ein Event an eine einzelne Session
    ///
    /// Unbekannte Ziele sind kein Fehler – die Session kann sich zwischen
    /// Aufloesung und Senden getrennt haben.
    pub fn an_session_senden(&self, session_id: &SessionId, event: ServerEvent) -> bool {
        match self.inner.clients.get(session_id) {
            Some(sender) => sender.senden(event),
            None => false,
        }
    }

    /// Signalisiert der Verbindungs-Schleife einer Session sich zu beenden
    /// (kick/ban). Zuvor eingereihte Events werden noch ausgeliefert.
    pub fn trennen(&self, session_id: &SessionId) {
        if let Some(sender) = self.inner.clients.get(session_id) {
            let _ = sender.trennen_tx.send(true);
        }
    }

    /// Anzahl registrierter Sessions
    pub fn client_anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob eine Session registriert ist
    pub fn ist_registriert(&self, session_id: &SessionId) -> bool {
        self.inner.clients.contains_key(session_id)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::neu()
    }
}
