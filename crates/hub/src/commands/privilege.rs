//! Privilegien-Befehle: Passphrasen, Segnung, zeitlich begrenzte Erhebung
//!
//! Grundsaetze:
//! - Stufen-Vergaben senken NIE: eine Vergabe ist no-op wenn das Ziel
//!   bereits auf gleicher oder hoeherer Stufe steht
//! - Fehlgeschlagene Passphrasen und fehlende Ziele bleiben still bzw.
//!   melden sich nur beim Ausloeser

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use stammtisch_auth::elevation::token_praegen;
use stammtisch_auth::passphrase_verifizieren;
use stammtisch_core::{Authority, SessionId};
use stammtisch_protocol::ServerEvent;

use super::{notice, profil_verteilen, raum_von, ziel_aufloesen};
use crate::server_state::HubState;

/// `godmode <passphrase>` – erhebt bei korrekter Pope-Passphrase
pub fn godmode(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    if passphrase_verifizieren(param, state.konfig.pope_passphrase_hash.as_deref()) {
        stufe_gewaehren(state, ausloeser, Authority::Pope);
    }
}

/// `kingmode <passphrase>` – erhebt bei korrekter King-Passphrase
pub fn kingmode(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    if passphrase_verifizieren(param, state.konfig.king_passphrase_hash.as_deref()) {
        stufe_gewaehren(state, ausloeser, Authority::King);
    }
}

/// `pope` – eigenes Profil mit Pope-Farbe/-Tag schmuecken
pub fn pope(state: &Arc<HubState>, ausloeser: SessionId, _param: &str) {
    stufen_schmuck_anlegen(state, ausloeser, Authority::Pope);
}

/// `king` – eigenes Profil mit King-Farbe/-Tag schmuecken
pub fn king(state: &Arc<HubState>, ausloeser: SessionId, _param: &str) {
    stufen_schmuck_anlegen(state, ausloeser, Authority::King);
}

/// `rabbi` – eigenes Profil mit Rabbi-Farbe/-Tag schmuecken
pub fn rabbi(state: &Arc<HubState>, ausloeser: SessionId, _param: &str) {
    stufen_schmuck_anlegen(state, ausloeser, Authority::Rabbi);
}

/// `bless <ziel>` – erhebt das Ziel auf Blessed (senkt nie)
pub fn bless(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    let Some(ziel) = ziel_aufloesen(&raum, param) else {
        notice(state, &ausloeser, "No such user");
        return;
    };
    stufe_gewaehren(state, ziel, Authority::Blessed);
}

/// `rabbify <ziel> <minuten>` – zeitlich begrenzte Rabbi-Erhebung
pub fn rabbify(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    let mut teile = param.splitn(2, ' ');
    let ziel_param = teile.next().unwrap_or("");
    let Some(minuten) = teile.next().and_then(|m| m.trim().parse::<u64>().ok()) else {
        return;
    };
    if minuten == 0 {
        return;
    }
    let Some(ziel) = ziel_aufloesen(&raum, ziel_param) else {
        notice(state, &ausloeser, "No such user");
        return;
    };

    erhebung_gewaehren(state, ziel, Duration::from_secs(minuten * 60));
}

/// `tagsom <ziel> <tag>` – fremden Tag setzen
pub fn tagsom(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    let mut teile = param.splitn(2, ' ');
    let ziel_param = teile.next().unwrap_or("");
    let tag = teile.next().unwrap_or("").trim();
    if tag.is_empty() {
        return;
    }
    let Some(ziel) = ziel_aufloesen(&raum, ziel_param) else {
        notice(state, &ausloeser, "No such user");
        return;
    };
    let Some(handle) = state.sessions.holen(&ziel) else {
        return;
    };
    handle.lock().tag_setzen(tag.to_string());
    profil_verteilen(state, &raum, ziel);
}

/// `statlock <ziel>` – Namens-/Farbsperre umschalten
pub fn statlock(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    let Some(ziel) = ziel_aufloesen(&raum, param) else {
        notice(state, &ausloeser, "No such user");
        return;
    };
    let Some(handle) = state.sessions.holen(&ziel) else {
        return;
    };
    {
        let mut session = handle.lock();
        session.stat_gesperrt = !session.stat_gesperrt;
    }
    profil_verteilen(state, &raum, ziel);
}

/// `statcustom <ziel> <name> [farbe]` – Senior-Override, umgeht Statlock
pub fn statcustom(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    let mut teile = param.split_whitespace();
    let ziel_param = teile.next().unwrap_or("");
    let Some(name) = teile.next() else {
        return;
    };
    let farbe = teile.next();

    let Some(ziel) = ziel_aufloesen(&raum, ziel_param) else {
        notice(state, &ausloeser, "No such user");
        return;
    };
    let Some(handle) = state.sessions.holen(&ziel) else {
        return;
    };
    {
        let mut session = handle.lock();
        session.name_setzen(name.to_string());
        if let Some(farbe) = farbe {
            session.farbe_setzen(farbe.to_string());
        }
    }
    profil_verteilen(state, &raum, ziel);
}

// ---------------------------------------------------------------------------
// Gemeinsame Stufen-Mechanik
// ---------------------------------------------------------------------------

/// Erhebt eine Session auf `stufe` (inklusive Farbe/Tag und `authlv`).
///
/// No-op wenn das Ziel bereits auf gleicher oder hoeherer Stufe steht –
/// Vergaben senken nie.
pub(crate) fn stufe_gewaehren(state: &Arc<HubState>, ziel: SessionId, stufe: Authority) -> bool {
    let Some(handle) = state.sessions.holen(&ziel) else {
        return false;
    };
    {
        let mut session = handle.lock();
        if session.autoritaet >= stufe {
            return false;
        }
        session.autoritaet = stufe;
        if let Some(farbe) = stufe.farb_token() {
            session.farbe_setzen(farbe.to_string());
        }
        if let Some(tag) = stufe.tag_beschriftung() {
            session.tag_setzen(tag.to_string());
        }
    }

    state.broadcaster.an_session_senden(
        &ziel,
        ServerEvent::Authlv {
            level: stufe.stufe(),
        },
    );
    if let Some(raum) = raum_von(state, &ziel) {
        profil_verteilen(state, &raum, ziel);
    }

    tracing::info!(session_id = %ziel, stufe = ?stufe, "Autoritaetsstufe gewaehrt");
    true
}

/// Legt Farbe und Tag der eigenen Stufe an (pope/king/rabbi-Befehle)
fn stufen_schmuck_anlegen(state: &Arc<HubState>, ausloeser: SessionId, stufe: Authority) {
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };
    {
        let mut session = handle.lock();
        if let Some(farbe) = stufe.farb_token() {
            session.farbe_setzen(farbe.to_string());
        }
        if let Some(tag) = stufe.tag_beschriftung() {
            session.tag_setzen(tag.to_string());
        }
    }
    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}

/// Gewaehrt eine zeitlich begrenzte Rabbi-Erhebung.
///
/// Das Ziel erhaelt ein HMAC-signiertes Token mit dem es die Erhebung nach
/// einem Reconnect zurueckfordern kann (keine Server-Persistenz). Ein
/// Timer setzt die Erhebung nach Ablauf zurueck – er re-validiert vorher,
/// dass die Session noch verbunden ist und keine neuere Erhebung laeuft.
pub(crate) fn erhebung_gewaehren(state: &Arc<HubState>, ziel: SessionId, dauer: Duration) {
    let Some(handle) = state.sessions.holen(&ziel) else {
        return;
    };

    let generation = {
        let mut session = handle.lock();
        if session.autoritaet >= Authority::Rabbi {
            return;
        }
        session.autoritaet = Authority::Rabbi;
        session.farbe_setzen("rabbi".into());
        session.tag_setzen("Rabbi".into());
        session.erhebungs_generation += 1;
        session.erhebungs_generation
    };

    let laeuft_ab_am = Utc::now() + chrono::Duration::seconds(dauer.as_secs() as i64);
    let token = token_praegen(state.konfig.erhebungs_secret.as_bytes(), laeuft_ab_am);

    state.broadcaster.an_session_senden(
        &ziel,
        ServerEvent::Authlv {
            level: Authority::Rabbi.stufe(),
        },
    );
    state.broadcaster.an_session_senden(
        &ziel,
        ServerEvent::Elevation {
            token: Some(token),
            expires: Some(laeuft_ab_am.timestamp()),
        },
    );
    if let Some(raum) = raum_von(state, &ziel) {
        profil_verteilen(state, &raum, ziel);
    }

    tracing::info!(session_id = %ziel, dauer_sek = dauer.as_secs(), "Zeitweilige Erhebung gewaehrt");

    // Automatische Rueckstufung nach Ablauf
    let state = Arc::clone(state);
    tokio::spawn(async move {
        tokio::time::sleep(dauer).await;
        erhebung_zuruecksetzen(&state, ziel, generation);
    });
}

/// Setzt eine abgelaufene Erhebung zurueck.
///
/// Feuert nur wenn die Session noch verbunden ist UND die Generation noch
/// stimmt – eine neuere Erhebung oder ein Reconnect macht den alten Timer
/// wirkungslos.
pub(crate) fn erhebung_zuruecksetzen(state: &Arc<HubState>, ziel: SessionId, generation: u64) {
    let Some(handle) = state.sessions.holen(&ziel) else {
        return;
    };
    {
        let mut session = handle.lock();
        if session.erhebungs_generation != generation || session.autoritaet != Authority::Rabbi {
            return;
        }
        session.autoritaet = Authority::Anonymous;
        session.farbe_setzen(state.konfig.zufaellige_farbe());
        session.tag_setzen(String::new());
    }

    state.broadcaster.an_session_senden(
        &ziel,
        ServerEvent::Authlv {
            level: Authority::Anonymous.stufe(),
        },
    );
    // Client soll das gespeicherte Token loeschen
    state.broadcaster.an_session_senden(
        &ziel,
        ServerEvent::Elevation {
            token: None,
            expires: None,
        },
    );
    if let Some(raum) = raum_von(state, &ziel) {
        profil_verteilen(state, &raum, ziel);
    }

    tracing::debug!(session_id = %ziel, "Zeitweilige Erhebung zurueckgesetzt");
}
