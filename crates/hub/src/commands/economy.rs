//! Wirtschafts-Befehle: work, buy
//!
//! Generisches Muster "Zustands-Mutation + Broadcast": Muenzen verdienen,
//! Faehigkeiten freischalten. Fehlschlaege (Cool-down, Kontostand) werden
//! NUR dem Ausloeser gemeldet.

use std::sync::Arc;
use std::time::Instant;

use stammtisch_core::SessionId;

use super::{notice, profil_verteilen, raum_von};
use crate::server_state::HubState;
use crate::session::Artikel;

/// `work` – Muenzen verdienen (mit Cool-down)
pub fn work(state: &Arc<HubState>, ausloeser: SessionId, _param: &str) {
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };

    let lohn = state.konfig.arbeitslohn;
    let verdient = {
        let mut session = handle.lock();
        let bereit = session
            .letzte_arbeit
            .map(|t| t.elapsed() >= state.konfig.arbeits_pause)
            .unwrap_or(true);
        if bereit {
            session.letzte_arbeit = Some(Instant::now());
            session.muenzen_gutschreiben(lohn);
            true
        } else {
            false
        }
    };

    if !verdient {
        notice(state, &ausloeser, "You need to rest before working again");
        return;
    }

    notice(state, &ausloeser, format!("You earned {} coins", lohn));
    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}

/// `buy <artikel>` – Faehigkeit freischalten
pub fn buy(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(artikel) = Artikel::aus_name(param) else {
        notice(state, &ausloeser, "Unknown item");
        return;
    };
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };

    let preis = state.konfig.artikel_preis(artikel);
    let (bereits_vorhanden, gekauft) = {
        let mut session = handle.lock();
        if session.hat_artikel(artikel) {
            (true, false)
        } else {
            (false, session.artikel_kaufen(artikel, preis))
        }
    };

    // Fehlschlaege nur an den Kaeufer, nie als Broadcast
    if bereits_vorhanden {
        notice(state, &ausloeser, format!("You already own {}", artikel.name()));
        return;
    }
    if !gekauft {
        notice(state, &ausloeser, "Not enough coins");
        return;
    }

    notice(
        state,
        &ausloeser,
        format!("You bought {} for {} coins", artikel.name(), preis),
    );
    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}
