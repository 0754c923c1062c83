//! Moderations-Befehle: mute, voicemute, kick, ban, announce, poll

use std::sync::Arc;

use stammtisch_core::SessionId;
use stammtisch_protocol::ServerEvent;

use super::{notice, profil_verteilen, raum_von, ziel_aufloesen};
use crate::server_state::HubState;

/// `mute <ziel>` – Text-Stummschaltung umschalten
pub fn mute(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
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
    let stumm = handle.lock().stumm_umschalten();

    state
        .broadcaster
        .an_session_senden(&ziel, ServerEvent::Muted { muted: stumm });
    profil_verteilen(state, &raum, ziel);
}

/// `voicemute <ziel>` – Sprach-Stummschaltung umschalten
pub fn voicemute(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
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
    let stumm = handle.lock().sprach_stumm_umschalten();

    state
        .broadcaster
        .an_session_senden(&ziel, ServerEvent::VoiceMuted { muted: stumm });
    profil_verteilen(state, &raum, ziel);
}

/// `kick <ziel>` – Hinweis senden und Verbindung beenden
pub fn kick(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    let Some(ziel) = ziel_aufloesen(&raum, param) else {
        notice(state, &ausloeser, "No such user");
        return;
    };

    state.broadcaster.an_session_senden(
        &ziel,
        ServerEvent::Kick {
            reason: "Kicked by an admin".into(),
        },
    );
    state.broadcaster.trennen(&ziel);
    tracing::info!(session_id = %ziel, von = %ausloeser, "Session gekickt");
}

/// `ban <ziel>` – Adresse temporaer bannen und Verbindung beenden
///
/// Das Admission-Gate lehnt die Adresse bis zum Ablauf ab.
pub fn ban(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
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
    let adresse = handle.lock().adresse.clone();

    let eintrag = state.bans.bannen(&adresse, "Banned by Pope");
    state.broadcaster.an_session_senden(
        &ziel,
        ServerEvent::Ban {
            reason: eintrag.grund.clone(),
            end_timestamp: eintrag.endet_am.timestamp(),
        },
    );
    state.broadcaster.trennen(&ziel);
    tracing::info!(session_id = %ziel, adresse = %adresse, von = %ausloeser, "Session gebannt");
}

/// `announce <text>` – Ansage an den ganzen Raum
pub fn announce(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };
    let Some(handle) = state.sessions.holen(&ausloeser) else {
        return;
    };
    let from = handle.lock().name().to_string();

    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Announcement {
            from,
            msg: param.to_string(),
        },
    );
}

/// `poll <frage>` – Umfrage starten (hoechstens eine aktive pro Raum)
///
/// Die Umfrage endet automatisch nach der konfigurierten Laufzeit; der
/// Timer re-validiert ueber die Generation, dass er nicht versehentlich
/// eine Nachfolge-Umfrage beendet.
pub fn poll(state: &Arc<HubState>, ausloeser: SessionId, param: &str) {
    let Some(raum) = raum_von(state, &ausloeser) else {
        return;
    };

    let Some(generation) = raum.umfrage_starten(param) else {
        notice(state, &ausloeser, "A poll is already active!");
        return;
    };

    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Pollshow {
            prompt: param.to_string(),
        },
    );
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::PollUpdate {
            yes_pct: 0.0,
            no_pct: 0.0,
            total_votes: 0,
        },
    );

    let state = Arc::clone(state);
    let raumname = raum.name.clone();
    let dauer = state.konfig.umfrage_dauer;
    tokio::spawn(async move {
        tokio::time::sleep(dauer).await;
        // Der Raum kann inzwischen geloescht worden sein
        if let Some(raum) = state.raeume.holen(&raumname) {
            raum.umfrage_beenden(generation);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{einloggen, test_dispatcher};
    use stammtisch_core::Authority;
    use stammtisch_guard::Zulassung;
    use stammtisch_protocol::ClientEvent;
    use tokio::sync::mpsc;

    fn empfangene(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn stufe_setzen(
        dispatcher: &std::sync::Arc<crate::dispatcher::Dispatcher>,
        id: &stammtisch_core::SessionId,
        stufe: Authority,
    ) {
        dispatcher.state().sessions.holen(id).unwrap().lock().autoritaet = stufe;
    }

    #[tokio::test]
    async fn ban_trennt_und_sperrt_die_adresse() {
        let dispatcher = test_dispatcher();
        let (a, _rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");
        let (b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "default");
        let _ = empfangene(&mut rx_b);

        stufe_setzen(&dispatcher, &a, Authority::Pope);
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "ban".into(),
                args: vec![b.inner().to_string()],
            },
        );

        // B bekommt den Ban-Hinweis mit Grund und Endzeitpunkt
        let events_b = empfangene(&mut rx_b);
        let ende = events_b
            .iter()
            .find_map(|ev| match ev {
                ServerEvent::Ban {
                    reason,
                    end_timestamp,
                } => {
                    assert_eq!(reason, "Banned by Pope");
                    Some(*end_timestamp)
                }
                _ => None,
            })
            .expect("ban-Event erwartet");
        assert!(ende > chrono::Utc::now().timestamp());

        // Reconnect vor Ablauf wird vom Admission-Gate abgewiesen
        assert!(matches!(
            dispatcher.state().admission.verbindung_pruefen("10.0.0.2"),
            Zulassung::Gebannt(_)
        ));
    }

    #[tokio::test]
    async fn kick_sendet_hinweis_und_trenn_signal() {
        let dispatcher = test_dispatcher();
        let (a, _rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");

        let b = dispatcher.session_erstellen("10.0.0.2".into());
        let (mut rx_b, mut trennen_b) = dispatcher.state().broadcaster.client_registrieren(b);
        dispatcher.event_verarbeiten(
            b,
            ClientEvent::Login {
                name: "Bernd".into(),
                room: "default".into(),
                credential: None,
                elevation_token: None,
            },
        );
        let _ = empfangene(&mut rx_b);

        stufe_setzen(&dispatcher, &a, Authority::Pope);
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "kick".into(),
                args: vec![b.inner().to_string()],
            },
        );

        assert!(empfangene(&mut rx_b)
            .iter()
            .any(|ev| matches!(ev, ServerEvent::Kick { .. })));
        assert!(trennen_b.has_changed().unwrap());

        // Kick bannt NICHT
        assert!(dispatcher.state().bans.ist_gebannt("10.0.0.2").is_none());
    }

    #[tokio::test]
    async fn mute_umschalten_mit_hinweis() {
        let dispatcher = test_dispatcher();
        let (a, _rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");
        let (b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "default");
        let _ = empfangene(&mut rx_b);

        stufe_setzen(&dispatcher, &a, Authority::Pope);
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "mute".into(),
                args: vec![b.inner().to_string()],
            },
        );

        let events_b = empfangene(&mut rx_b);
        assert!(events_b.iter().any(|ev| matches!(ev, ServerEvent::Muted { muted: true })));
        assert!(events_b.iter().any(|ev| matches!(ev,
            ServerEvent::Update { user_public, .. } if user_public.muted)));

        // Zweiter mute hebt wieder auf
        {
            let handle = dispatcher.state().sessions.holen(&a).unwrap();
            handle.lock().slowmode_aktiv = false;
        }
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "mute".into(),
                args: vec![b.inner().to_string()],
            },
        );
        assert!(empfangene(&mut rx_b)
            .iter()
            .any(|ev| matches!(ev, ServerEvent::Muted { muted: false })));
    }

    #[tokio::test]
    async fn announce_geht_an_den_ganzen_raum() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");
        let (_b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "default");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        stufe_setzen(&dispatcher, &a, Authority::Blessed);
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "announce".into(),
                args: vec!["Feierabend!".into()],
            },
        );

        for rx in [&mut rx_a, &mut rx_b] {
            assert!(empfangene(rx).iter().any(|ev| matches!(ev,
                ServerEvent::Announcement { from, msg } if from == "Anna" && msg == "Feierabend!")));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poll_startet_und_endet_automatisch() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");
        let _ = empfangene(&mut rx_a);

        stufe_setzen(&dispatcher, &a, Authority::Blessed);
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "poll".into(),
                args: vec!["Pizza?".into()],
            },
        );

        let events = empfangene(&mut rx_a);
        assert!(events.iter().any(|ev| matches!(ev,
            ServerEvent::Pollshow { prompt } if prompt == "Pizza?")));
        assert!(events.iter().any(|ev| matches!(ev,
            ServerEvent::PollUpdate { total_votes: 0, .. })));

        let raum = dispatcher.state().raeume.holen("default").unwrap();
        assert!(raum.umfrage_aktiv());

        // Nach Ablauf der Laufzeit beendet der Timer die Umfrage
        tokio::time::sleep(dispatcher.state().konfig.umfrage_dauer + std::time::Duration::from_secs(1)).await;
        assert!(!raum.umfrage_aktiv());
    }

    #[tokio::test]
    async fn zweite_umfrage_meldet_nur_dem_ausloeser() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");
        let (b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "default");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        stufe_setzen(&dispatcher, &a, Authority::Blessed);
        stufe_setzen(&dispatcher, &b, Authority::Blessed);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "poll".into(),
                args: vec!["Erste?".into()],
            },
        );
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        dispatcher.event_verarbeiten(
            b,
            ClientEvent::Command {
                verb: "poll".into(),
                args: vec!["Zweite?".into()],
            },
        );

        assert!(empfangene(&mut rx_b)
            .iter()
            .any(|ev| matches!(ev, ServerEvent::Notice { .. })));
        assert!(empfangene(&mut rx_a).is_empty(), "A sieht vom Fehlversuch nichts");
    }
}
