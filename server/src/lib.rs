//! stammtisch-server – Bibliotheks-Root
//!
//! Baut aus der Konfiguration alle Zustandsobjekte zusammen und startet
//! die beiden Listener (Chat-Kanal, Voice-Signalisierung) auf einer
//! single-threaded Runtime.

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use stammtisch_guard::{
    AdmissionGate, AdmissionKonfig, BanListe, FloodHeuristik, RateLimitKonfig, RateLimiter,
};
use stammtisch_hub::{Dispatcher, HubKonfig, HubServer, HubState};
use stammtisch_voice::{VoiceDispatcher, VoiceServer, VoiceState};

use config::ServerConfig;

/// Aufraeum-Intervall fuer abgelaufene Bans und inaktive Rate-Zaehler
const CLEANUP_INTERVALL: Duration = Duration::from_secs(60);

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Guard-Objekte bauen (Rate-Limiter, Banliste, Admission-Gate)
    /// 2. Hub-Zustand und Dispatcher erstellen
    /// 3. Chat- und Voice-Listener starten
    /// 4. Auf Ctrl-C warten, Shutdown an alle Verbindungen signalisieren
    pub async fn starten(self) -> Result<()> {
        let chat_addr = self.config.chat_bind_adresse().parse()?;
        let voice_addr = self.config.voice_bind_adresse().parse()?;

        tracing::info!(
            chat = %self.config.chat_bind_adresse(),
            voice = %self.config.voice_bind_adresse(),
            standard_raum = %self.config.server.standard_raum,
            "Server startet"
        );

        // Guard-Schicht
        let guard = &self.config.guard;
        let limiter = RateLimiter::neu(RateLimitKonfig {
            fenster: Duration::from_secs(guard.fenster_sek),
            limit_nachricht: guard.limit_nachricht,
            limit_befehl: guard.limit_befehl,
            limit_verbindung: guard.limit_verbindung,
            drossel_dauer: Duration::from_secs(guard.drossel_dauer_sek),
        });
        let bans = BanListe::neu(Duration::from_secs(guard.ban_dauer_sek));
        let admission = AdmissionGate::neu(
            AdmissionKonfig {
                alt_limit: guard.alt_limit,
                ban_schwelle: guard.ban_schwelle,
            },
            Arc::clone(&bans),
            Arc::clone(&limiter),
        );
        let flood = FloodHeuristik::neu(guard.flood_signaturen.clone());

        // Hub
        let server_cfg = &self.config.server;
        let hub_state = HubState::neu(
            HubKonfig {
                standard_raum: server_cfg.standard_raum.clone(),
                standard_name: server_cfg.standard_name.clone(),
                namens_limit: server_cfg.namens_limit,
                slowmode: Duration::from_millis(server_cfg.slowmode_ms),
                umfrage_dauer: Duration::from_secs(server_cfg.umfrage_dauer_sek),
                farben: server_cfg.farben.clone(),
                blacklist: server_cfg.blacklist.clone(),
                bild_host_whitelist: server_cfg.bild_host_whitelist.clone(),
                arbeitslohn: server_cfg.arbeitslohn,
                arbeits_pause: Duration::from_secs(server_cfg.arbeits_pause_sek),
                king_passphrase_hash: self.config.auth.king_passphrase_hash.clone(),
                pope_passphrase_hash: self.config.auth.pope_passphrase_hash.clone(),
                erhebungs_secret: self.config.auth.erhebungs_secret.clone(),
            },
            Arc::clone(&limiter),
            Arc::clone(&bans),
            admission,
            flood,
        );
        let dispatcher = Dispatcher::neu(Arc::clone(&hub_state));

        // Voice-Namensraum
        let voice_dispatcher = Arc::new(VoiceDispatcher::neu(VoiceState::neu()));

        // Periodischer Sweep fuer abgelaufene Bans und inaktive Zaehler
        {
            let bans = Arc::clone(&bans);
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                let mut intervall = tokio::time::interval(CLEANUP_INTERVALL);
                loop {
                    intervall.tick().await;
                    let bereinigt = bans.abgelaufene_bereinigen();
                    if bereinigt > 0 {
                        tracing::debug!(anzahl = bereinigt, "Abgelaufene Bans bereinigt");
                    }
                    limiter.cleanup();
                }
            });
        }

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let hub_server = HubServer::neu(dispatcher, chat_addr);
        let voice_server = VoiceServer::neu(voice_dispatcher, Arc::clone(&bans), voice_addr);

        let hub_lauf = hub_server.starten(shutdown_rx.clone());
        let voice_lauf = voice_server.starten(shutdown_rx.clone());

        tokio::select! {
            ergebnis = async { tokio::try_join!(hub_lauf, voice_lauf) } => {
                ergebnis?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                let _ = shutdown_tx.send(true);
            }
        }

        Ok(())
    }
}
