//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task (LocalSet). Ablauf:
//! 1. Admission-Gate: Ban-Hinweis oder stilles Trennen noch VOR der
//!    Session-Erstellung
//! 2. Session + Broadcaster-Queue registrieren
//! 3. Select-Schleife: eingehende Frames -> Dispatcher, ausgehende Queue
//!    -> Socket, Trenn-Signal (kick/ban), Shutdown
//! 4. Abbau: Session trennen, Verbindungszaehler dekrementieren
//!
//! Der Abbau ist idempotent – ein Abbruch mitten in der Verarbeitung
//! hinterlaesst keine haengenden Raum-Eintraege.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use stammtisch_guard::Zulassung;
use stammtisch_protocol::{ClientEvent, FrameCodec, ServerEvent};

use crate::dispatcher::Dispatcher;

/// Dekodiert Frames als rohes JSON; die typisierte Event-Pruefung laeuft
/// in der Schleife. Fehlgeformte Payloads werden so STILL verworfen statt
/// die Verbindung zu beenden – sondierende Clients bekommen kein Orakel.
type RawCodec = FrameCodec<serde_json::Value>;

/// Verarbeitet eine einzelne TCP-Verbindung des Chat-Kanals
pub struct ClientConnection {
    dispatcher: Arc<Dispatcher>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    pub fn neu(dispatcher: Arc<Dispatcher>, peer_addr: SocketAddr) -> Self {
        Self {
            dispatcher,
            peer_addr,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let adresse = self.peer_addr.ip().to_string();
        let state = Arc::clone(self.dispatcher.state());
        let mut framed = Framed::new(stream, RawCodec::new());

        // Zulassungspruefung VOR der Session-Erstellung
        match state.admission.verbindung_pruefen(&adresse) {
            Zulassung::Akzeptiert => {}
            Zulassung::Gebannt(eintrag) => {
                let _ = framed
                    .send(ServerEvent::Ban {
                        reason: eintrag.grund,
                        end_timestamp: eintrag.endet_am.timestamp(),
                    })
                    .await;
                return;
            }
            Zulassung::StillAbgelehnt => {
                return;
            }
        }

        tracing::info!(peer = %self.peer_addr, "Neue Verbindung");

        let id = self.dispatcher.session_erstellen(adresse.clone());
        let (mut sende_rx, mut trennen_rx) = state.broadcaster.client_registrieren(id);

        loop {
            tokio::select! {
                // Eingehendes Event vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(wert)) => {
                            match serde_json::from_value::<ClientEvent>(wert) {
                                Ok(event) => self.dispatcher.event_verarbeiten(id, event),
                                Err(e) => {
                                    // Falsche Payload-Form: still verwerfen
                                    tracing::trace!(
                                        peer = %self.peer_addr,
                                        fehler = %e,
                                        "Fehlgeformtes Event verworfen"
                                    );
                                }
                            }
                        }
                        Some(Err(e)) => {
                            // Kaputtes Framing ist ein Transportfehler
                            tracing::warn!(peer = %self.peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %self.peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehendes Event aus dem Broadcaster
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(peer = %self.peer_addr, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Trenn-Signal (kick/ban): restliche Queue noch ausliefern
                Ok(()) = trennen_rx.changed() => {
                    if *trennen_rx.borrow() {
                        while let Ok(ausgehend) = sende_rx.try_recv() {
                            if framed.send(ausgehend).await.is_err() {
                                break;
                            }
                        }
                        tracing::info!(peer = %self.peer_addr, "Verbindung serverseitig getrennt");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %self.peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Abbau: Raum-Zustand konsistent halten, Zaehler dekrementieren
        self.dispatcher.session_trennen(id);
        state.admission.verbindung_beendet(&adresse);

        tracing::debug!(peer = %self.peer_addr, "Verbindungs-Task beendet");
    }
}
