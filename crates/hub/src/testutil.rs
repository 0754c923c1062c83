//! Test-Hilfen: isolierte HubState-/Dispatcher-Instanzen
//!
//! Alle Zustandsobjekte werden frisch gebaut – Tests teilen sich nie
//! Registries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use stammtisch_core::SessionId;
use stammtisch_guard::{
    AdmissionGate, AdmissionKonfig, BanListe, FloodHeuristik, RateLimitKonfig, RateLimiter,
};
use stammtisch_protocol::{ClientEvent, ServerEvent};

use crate::dispatcher::Dispatcher;
use crate::server_state::{HubKonfig, HubState};

pub(crate) fn test_state() -> Arc<HubState> {
    test_state_mit(HubKonfig::default(), Vec::new())
}

pub(crate) fn test_state_mit_konfig(konfig: HubKonfig) -> Arc<HubState> {
    test_state_mit(konfig, Vec::new())
}

pub(crate) fn test_state_mit(konfig: HubKonfig, flood_signaturen: Vec<String>) -> Arc<HubState> {
    let limiter = RateLimiter::neu(RateLimitKonfig::default());
    let bans = BanListe::neu(Duration::from_secs(3600));
    let admission = AdmissionGate::neu(
        AdmissionKonfig::default(),
        Arc::clone(&bans),
        Arc::clone(&limiter),
    );
    HubState::neu(
        konfig,
        limiter,
        bans,
        admission,
        FloodHeuristik::neu(flood_signaturen),
    )
}

pub(crate) fn test_dispatcher() -> Arc<Dispatcher> {
    Dispatcher::neu(test_state())
}

pub(crate) fn test_dispatcher_mit_konfig(konfig: HubKonfig) -> Arc<Dispatcher> {
    Dispatcher::neu(test_state_mit_konfig(konfig))
}

pub(crate) fn test_dispatcher_mit_flood(signaturen: Vec<String>) -> Arc<Dispatcher> {
    Dispatcher::neu(test_state_mit(HubKonfig::default(), signaturen))
}

/// Legt eine Session an, registriert sie im Broadcaster und loggt sie ein.
///
/// Gibt die SessionId und die Empfangs-Queue zurueck (wie sie sonst die
/// Verbindungs-Schleife halten wuerde).
pub(crate) fn einloggen(
    dispatcher: &Arc<Dispatcher>,
    adresse: &str,
    name: &str,
    raum: &str,
) -> (SessionId, mpsc::Receiver<ServerEvent>) {
    let id = dispatcher.session_erstellen(adresse.to_string());
    let (rx, _trennen) = dispatcher.state().broadcaster.client_registrieren(id);
    dispatcher.event_verarbeiten(
        id,
        ClientEvent::Login {
            name: name.to_string(),
            room: raum.to_string(),
            credential: None,
            elevation_token: None,
        },
    );
    (id, rx)
}
