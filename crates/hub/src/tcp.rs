//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `HubServer` bindet den Chat-Kanal-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen Task mit einer `ClientConnection`.
//!
//! ## Concurrency-Modell
//! Alle Verbindungs-Tasks laufen in einer `tokio::task::LocalSet` auf
//! einem single-threaded Executor: Handler laufen ohne Praeemption bis zum
//! Ende, interne Locks dienen nur den kurzen Zustands-Zugriffen.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::LocalSet;

use stammtisch_core::StammtischError;

use crate::connection::ClientConnection;
use crate::dispatcher::Dispatcher;

/// TCP-Server des Chat-Kanals
pub struct HubServer {
    dispatcher: Arc<Dispatcher>,
    bind_addr: SocketAddr,
}

impl HubServer {
    pub fn neu(dispatcher: Arc<Dispatcher>, bind_addr: SocketAddr) -> Self {
        Self {
            dispatcher,
            bind_addr,
        }
    }

    /// Startet den TCP-Listener und akzeptiert Verbindungen.
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
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
        let lokale_addr = listener.local_addr()?;

        tracing::info!(adresse = %lokale_addr, "Chat-Kanal-Listener gestartet");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let verbindung = ClientConnection::neu(
                                Arc::clone(&self.dispatcher),
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
                        tracing::info!("Chat-Kanal-Listener: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Chat-Kanal-Listener gestoppt");
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
