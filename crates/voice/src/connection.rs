//! Voice-Connection – eine Verbindung des Signalisierungs-Namensraums
//!
//! Gebannte Adressen werden still getrennt (die Ban-Ansprache uebernimmt
//! der Chat-Kanal). Die Empfangs-Queue existiert erst nach einem
//! erfolgreichen `join-voice-room`.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use stammtisch_core::SessionId;
use stammtisch_guard::BanListe;
use stammtisch_protocol::{FrameCodec, SignalClientEvent, SignalServerEvent};

use crate::dispatcher::VoiceDispatcher;

/// Roh-JSON-Codec: fehlgeformte Payloads werden still verworfen
type RawCodec = FrameCodec<serde_json::Value>;

/// Verarbeitet eine einzelne Verbindung des Voice-Namensraums
pub struct VoiceConnection {
    dispatcher: Arc<VoiceDispatcher>,
    bans: Arc<BanListe>,
    peer_addr: SocketAddr,
}

impl VoiceConnection {
    pub fn neu(
        dispatcher: Arc<VoiceDispatcher>,
        bans: Arc<BanListe>,
        peer_addr: SocketAddr,
    ) -> Self {
        Self {
            dispatcher,
            bans,
            peer_addr,
        }
    }

    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let adresse = self.peer_addr.ip().to_string();
        if self.bans.ist_gebannt(&adresse).is_some() {
            tracing::debug!(peer = %self.peer_addr, "Voice-Verbindung von gebannter Adresse");
            return;
        }

        tracing::debug!(peer = %self.peer_addr, "Neue Voice-Verbindung");

        let id = SessionId::new();
        let mut framed = Framed::new(stream, RawCodec::new());
        let mut sende_rx: Option<mpsc::Receiver<SignalServerEvent>> = None;

        loop {
            tokio::select! {
                frame = framed.next() => {
                    match frame {
                        Some(Ok(wert)) => {
                            match serde_json::from_value::<SignalClientEvent>(wert) {
                                Ok(event) => {
                                    if let Some(rx) = self.dispatcher.event_verarbeiten(id, event) {
                                        sende_rx = Some(rx);
                                    }
                                }
                                Err(e) => {
                                    tracing::trace!(
                                        peer = %self.peer_addr,
                                        fehler = %e,
                                        "Fehlgeformtes Event verworfen"
                                    );
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %self.peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => break,
                    }
                }

                // Ausgehende Events gibt es erst nach dem Join
                Some(ausgehend) = empfangen(&mut sende_rx) => {
                    if framed.send(ausgehend).await.is_err() {
                        break;
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.dispatcher.trennen(id);
        tracing::debug!(peer = %self.peer_addr, "Voice-Verbindung beendet");
    }
}

/// Wartet auf der Queue falls vorhanden, sonst fuer immer
async fn empfangen(
    rx: &mut Option<mpsc::Receiver<SignalServerEvent>>,
) -> Option<SignalServerEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
