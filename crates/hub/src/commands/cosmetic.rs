//! Kosmetische Befehle
//!
//! Der Server prueft nur die Berechtigung und verteilt ein generisches
//! Broadcast-Event; Witze, Animationen und Darstellung sind komplett
//! Sache des Clients.

use std::sync::Arc;

use rand::RngExt;

use stammtisch_core::SessionId;
use stammtisch_protocol::ServerEvent;

use super::raum_von;
use crate::server_state::HubState;

pub fn joke(state: &Arc<HubState>, ausloeser: SessionId, _param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Joke {
            guid: ausloeser,
            rng: rand::rng().random::<f64>(),
        },
    );
}

pub fn fact(state: &Arc<HubState>, ausloeser: SessionId, _param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Fact {
            guid: ausloeser,
            rng: rand::rng().random::<f64>(),
        },
    );
}

pub fn backflip(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Backflip {
            guid: ausloeser,
            swag: param.trim().eq_ignore_ascii_case("swag"),
        },
    );
}

pub fn youtube(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Youtube {
            guid: ausloeser,
            vid: param.replace('"', "&quot;"),
        },
    );
}

pub fn dm(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Dm {
            from: ausloeser,
            msg: param.to_string(),
        },
    );
}

pub fn quote(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Quote {
            from: ausloeser,
            msg: param.to_string(),
        },
    );
}
