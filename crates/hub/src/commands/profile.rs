//! Profil-Befehle: name, color, pitch, speed, tag
//!
//! Name und Farbe respektieren die Statlock-Sperre; der Crosscolor-Filter
//! laesst Bild-URLs nur von Hosts der Whitelist zu.

use std::sync::Arc;

use stammtisch_core::SessionId;

use super::{profil_verteilen, raum_von};
use crate::server_state::HubState;

/// `name <neuer name>` – eigenen Anzeigenamen setzen
pub fn name(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    if param.is_empty() || param.len() > state.konfig.namens_limit {
        return;
    }
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };
    {
        let mut session = handle.lock();
        if session.stat_gesperrt {
            return;
        }
        session.name_setzen(param.to_string());
    }
    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}

/// `color <token|bild-url>` – eigene Farbe setzen (Crosscolor-Filter)
pub fn color(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };
    if handle.lock().stat_gesperrt {
        return;
    }

    let farbe = farbe_aufloesen(state, param);
    handle.lock().farbe_setzen(farbe);

    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}

/// Wendet den Crosscolor-Filter an: URLs nur von Whitelist-Hosts,
/// Token nur aus der Palette; alles andere wird zu einer Zufallsfarbe.
pub(crate) fn farbe_aufloesen(state: &Arc<HubState>, param: &str) -> String {
    let param = param.trim();
    if param.starts_with("http://") || param.starts_with("https://") {
        match bild_host(param) {
            Some(host)
                if state
                    .konfig
                    .bild_host_whitelist
                    .iter()
                    .any(|erlaubt| erlaubt == host) =>
            {
                param.to_string()
            }
            _ => state.konfig.zufaellige_farbe(),
        }
    } else if state.konfig.farben.iter().any(|f| f == &param.to_lowercase()) {
        param.to_lowercase()
    } else {
        state.konfig.zufaellige_farbe()
    }
}

/// Extrahiert den Host-Anteil einer http(s)-URL
fn bild_host(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split(['/', '?', '#']).next()?;
    // Port abschneiden
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// `pitch <zahl>` – Tonhoehe (kosmetisch)
pub fn pitch(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Ok(wert) = param.trim().parse::<i32>() else {
        return;
    };
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };
    handle.lock().pitch_setzen(wert);
    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}

/// `speed <zahl>` – Sprechgeschwindigkeit (kosmetisch, max. 400)
pub fn speed(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Ok(wert) = param.trim().parse::<i32>() else {
        return;
    };
    if wert > 400 {
        return;
    }
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };
    handle.lock().speed_setzen(wert);
    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}

/// `tag <text>` – eigenen Tag setzen (Rabbi+)
pub fn tag(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };
    handle.lock().tag_setzen(param.to_string());
    if let Some(raum) = raum_von(state, &ausloeser) {
        profil_verteilen(state, &raum, ausloeser);
    }
}
