//! TCP-Listener des Voice-Namensraums

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::LocalSet;

use stammtisch_core::StammtischError;
use stammtisch_guard::BanListe;

use crate::connection::VoiceConnection;
use crate::dispatcher::VoiceDispatcher;

/// TCP-Server des Voice-/Screenshare-Signalisierungs-Kanals
pub struct VoiceServer {
    dispatcher: Arc<VoiceDispatcher>,
    bans: Arc<BanListe>,
    bind_addr: SocketAddr,
}

impl VoiceServer {
    pub fn neu(dispatcher: Arc<VoiceDispatcher>, bans: Arc<BanListe>, bind_addr: SocketAddr) -> Self {
        Self {
            dispatcher,
            bans,
            bind_addr,
        }
    }

    /// Startet den Listener; laeuft bis zum Shutdown-Signal
    pub async fn starten(
        self,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> stammtisch_core::Result<()> {
        let local = LocalSet::new();
        local
            .run_until(self.accept_loop(shutdown_rx))
            .await
            .map_err(|e| StammtischError::Verbindung(e.to_string()))
    }

    async fn accept_loop(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        tracing::info!(adresse = %listener.local_addr()?, "Voice-Kanal-Listener gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let verbindung = VoiceConnection::neu(
                                Arc::clone(&self.dispatcher),
                                Arc::clone(&self.bans),
                                peer_addr,
                            );
                            let shutdown_rx_clone = shutdown_rx.clone();
                            tokio::task::spawn_local(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Voice-Kanal-Listener gestoppt");
        Ok(())
    }
}
