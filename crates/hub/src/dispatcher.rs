//! Event-Dispatcher – Routet Client-Events an die richtigen Handler
//!
//! Der Dispatcher empfaengt die bereits dekodierten `ClientEvent`s einer
//! Verbindung und setzt die komplette Event-Politik um:
//! - Login-Zustandsmaschine (Login nur einmal, Wiederholungen ignoriert)
//! - Sanitize-Politik und Blacklist-Filter
//! - Slowmode nach jedem akzeptierten Talk/Befehl
//! - Rate-Limits pro Adresse und Kategorie
//! - Flood-Heuristik mit Sofort-Ban
//! - einheitliche Autoritaetspruefung vor jedem Befehls-Handler
//!
//! Fehlerpolitik: fehlgeformte Eingaben, Autorisierungsfehler und
//! Drosselungen werden STILL verworfen; nur Ressourcen-Fehler melden sich
//! beim Ausloeser.

use std::sync::Arc;

use stammtisch_core::{Authority, SessionId, TypingState};
use stammtisch_guard::Kategorie;
use stammtisch_protocol::{ClientEvent, ServerEvent};

use crate::commands::{self, CommandRegistry};
use crate::server_state::HubState;
use crate::session::{LoginZustand, Session};

/// Zentraler Event-Dispatcher
pub struct Dispatcher {
    state: Arc<HubState>,
    befehle: CommandRegistry,
}

impl Dispatcher {
    /// Erstellt einen neuen Dispatcher mit der kanonischen Befehls-Tabelle
    pub fn neu(state: Arc<HubState>) -> Arc<Self> {
        Arc::new(Self {
            state,
            befehle: CommandRegistry::standard(),
        })
    }

    pub fn state(&self) -> &Arc<HubState> {
        &self.state
    }

    /// Legt eine frische Session fuer eine akzeptierte Verbindung an
    pub fn session_erstellen(&self, adresse: String) -> SessionId {
        let id = SessionId::new();
        self.state.sessions.einfuegen(Session::neu(id, adresse));
        id
    }

    /// Verarbeitet ein einzelnes Client-Event
    pub fn event_verarbeiten(&self, id: SessionId, event: ClientEvent) {
        match event {
            ClientEvent::Login {
                name,
                room,
                credential,
                elevation_token,
            } => self.login(id, name, room, credential, elevation_token),
            ClientEvent::Talk { text } => self.talk(id, text),
            ClientEvent::Command { verb, args } => self.befehl(id, verb, args),
            ClientEvent::Typing { state } => self.typing(id, state),
            ClientEvent::Speaking { speaking } => self.speaking(id, speaking),
            ClientEvent::Voice { data } => self.voice(id, data),
            ClientEvent::Useredit {
                target_id,
                name,
                color,
            } => self.useredit(id, target_id, name, color),
            ClientEvent::Vote { vote } => self.vote(id, vote),
        }
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    fn login(
        &self,
        id: SessionId,
        name: String,
        room: String,
        credential: Option<String>,
        elevation_token: Option<String>,
    ) {
        let Some(handle) = self.state.sessions.holen(&id) else {
            return;
        };

        // Wiederholter Login: Zustandsmaschine ignoriert ihn, aber die
        // Info-Events werden erneut gesendet
        if handle.lock().zustand != LoginZustand::Unauthentifiziert {
            self.raum_info_senden(&id);
            return;
        }

        // Flood-Heuristik auf den rohen Namen: Treffer = Sofort-Ban
        if self.state.flood.verdaechtig(&name) {
            let adresse = handle.lock().adresse.clone();
            self.sofort_bannen(&id, &adresse, "Flood signature detected");
            return;
        }

        // Namens-Validierung: Fallback auf den Standard-Namen
        let name = self.name_validieren(&name);
        let raumname = if room.trim().is_empty() {
            self.state.konfig.standard_raum.clone()
        } else {
            room
        };

        let (raum, neu_erstellt) = self.state.raeume.aufloesen_oder_erstellen(&raumname);

        {
            let mut session = handle.lock();
            session.zustand = LoginZustand::Authentifiziert;
            session.name_setzen(name);
            session.farbe_setzen(self.state.konfig.zufaellige_farbe());
            session.raum = Some(raumname.clone());

            // Der Ersteller eines Raums wird Room Owner
            if neu_erstellt {
                session.autoritaet = Authority::RoomOwner;
                session.farbe_setzen("king".into());
                session.tag_setzen("Room Owner".into());
            }
        }

        // Credential kann unabhaengig von der Raum-Eigentuemerschaft
        // erheben; eine Vergabe senkt nie
        if let Some(ref credential) = credential {
            if stammtisch_auth::passphrase_verifizieren(
                credential,
                self.state.konfig.pope_passphrase_hash.as_deref(),
            ) {
                let mut session = handle.lock();
                if session.autoritaet < Authority::Pope {
                    session.autoritaet = Authority::Pope;
                    session.farbe_setzen("pope".into());
                    session.tag_setzen("Pope".into());
                }
            } else if stammtisch_auth::passphrase_verifizieren(
                credential,
                self.state.konfig.king_passphrase_hash.as_deref(),
            ) {
                let mut session = handle.lock();
                if session.autoritaet < Authority::King {
                    session.autoritaet = Authority::King;
                    session.farbe_setzen("king".into());
                    session.tag_setzen("King".into());
                }
            }
        }

        let profil = handle.lock().schnappschuss();
        raum.beitreten(id, profil.clone());

        // Roster an die neue Session, Update an die Bestandsmitglieder
        self.state.broadcaster.an_session_senden(
            &id,
            ServerEvent::UpdateAll {
                users_public: raum.roster(),
            },
        );
        raum.senden_an_alle_ausser(
            &self.state.broadcaster,
            &id,
            ServerEvent::Update {
                guid: id,
                user_public: profil,
            },
        );
        raum.mitgliederzahl_verteilen(&self.state.broadcaster);

        self.raum_info_senden(&id);

        // Erhebungs-Token NACH dem Beitritt einloesen, damit der Raum das
        // Profil-Update sieht
        if credential.is_none() {
            if let Some(token) = elevation_token {
                self.erhebungs_token_einloesen(&id, &token);
            }
        }

        tracing::info!(
            session_id = %id,
            raum = %raumname,
            neu_erstellt,
            "Session eingeloggt"
        );
    }

    /// Sendet `room` und `authlv` an die Session
    fn raum_info_senden(&self, id: &SessionId) {
        let Some(handle) = self.state.sessions.holen(id) else {
            return;
        };
        let (raumname, stufe) = {
            let session = handle.lock();
            (session.raum.clone(), session.autoritaet)
        };
        let Some(raumname) = raumname else {
            return;
        };

        self.state.broadcaster.an_session_senden(
            id,
            ServerEvent::Room {
                is_owner: stufe >= Authority::RoomOwner,
                is_public: raumname == self.state.konfig.standard_raum,
                room: raumname,
            },
        );
        self.state.broadcaster.an_session_senden(
            id,
            ServerEvent::Authlv {
                level: stufe.stufe(),
            },
        );
    }

    /// Validiert einen Login-Namen, faellt auf den Standard-Namen zurueck
    fn name_validieren(&self, name: &str) -> String {
        let konfig = &self.state.konfig;
        if name.is_empty()
            || name.trim().is_empty()
            || name.len() > konfig.namens_limit
            || konfig.blacklist_getroffen(name)
        {
            konfig.standard_name.clone()
        } else {
            name.to_string()
        }
    }

    /// Loest ein vom Client vorgelegtes Erhebungs-Token ein
    fn erhebungs_token_einloesen(&self, id: &SessionId, token: &str) {
        let secret = self.state.konfig.erhebungs_secret.as_bytes();
        match stammtisch_auth::elevation::token_verifizieren(secret, token, chrono::Utc::now()) {
            Ok(verifiziert) => {
                if let Some(rest) = verifiziert.restlaufzeit(chrono::Utc::now()) {
                    commands::privilege::erhebung_gewaehren(&self.state, *id, rest);
                }
            }
            Err(e) => {
                // Ungueltige/abgelaufene Tokens werden still ignoriert
                tracing::debug!(session_id = %id, fehler = %e, "Erhebungs-Token abgelehnt");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    fn talk(&self, id: SessionId, text: String) {
        let Some(handle) = self.state.sessions.holen(&id) else {
            return;
        };
        let (adresse, raumname, sanitize, stumm, gedrosselt) = {
            let session = handle.lock();
            if session.zustand != LoginZustand::Authentifiziert {
                return;
            }
            (
                session.adresse.clone(),
                session.raum.clone(),
                session.sanitize,
                session.ist_stumm(),
                session.slowmode_aktiv,
            )
        };
        let Some(raumname) = raumname else {
            return;
        };

        if stumm {
            return;
        }
        if !self.state.limiter.pruefen(&adresse, Kategorie::Nachricht) {
            return;
        }

        // Flood-Heuristik: Treffer = Sofort-Ban, vorbei an der Drossel
        if self.state.flood.verdaechtig(&text) {
            self.sofort_bannen(&id, &adresse, "Flood signature detected");
            return;
        }

        let mut text = text;
        if sanitize {
            text = html_escapen(&text);
            if self.state.konfig.blacklist_getroffen(&text) {
                return;
            }
        }

        if gedrosselt {
            return;
        }
        self.slowmode_starten(id);

        if let Some(raum) = self.state.raeume.holen(&raumname) {
            raum.senden_an_alle(&self.state.broadcaster, ServerEvent::Talk { guid: id, text });
        }
    }

    // -----------------------------------------------------------------------
    // Befehle
    // -----------------------------------------------------------------------

    fn befehl(&self, id: SessionId, verb: String, args: Vec<String>) {
        let Some(handle) = self.state.sessions.holen(&id) else {
            return;
        };
        let (adresse, sanitize, gedrosselt, stufe) = {
            let session = handle.lock();
            if session.zustand != LoginZustand::Authentifiziert {
                return;
            }
            (
                session.adresse.clone(),
                session.sanitize,
                session.slowmode_aktiv,
                session.autoritaet,
            )
        };

        if !self.state.limiter.pruefen(&adresse, Kategorie::Befehl) {
            return;
        }

        // Argumente zu EINEM Parameter-String zusammenfuegen (bewusste
        // Vereinfachung: Argumente werden nicht einzeln escaped)
        let mut param = args.join(" ");
        if sanitize {
            param = html_escapen(&param);
            // Blacklist-Treffer verwerfen den ganzen Befehl
            if self.state.konfig.blacklist_getroffen(&param) {
                return;
            }
        }

        if gedrosselt {
            return;
        }

        // Unbekannte Verben still ignorieren (kein Orakel)
        let Some(eintrag) = self.befehle.finden(&verb) else {
            return;
        };

        // Einheitliche Autoritaetspruefung: Unterschreitung bleibt still
        if stufe < eintrag.mindeststufe {
            return;
        }

        self.slowmode_starten(id);
        {
            let mut session = handle.lock();
            session.letzter_befehl = Some(std::time::Instant::now());
        }

        (eintrag.handler)(&self.state, id, &param);
    }

    // -----------------------------------------------------------------------
    // Praesenz-Events
    // -----------------------------------------------------------------------

    fn typing(&self, id: SessionId, state: u8) {
        let Some(handle) = self.state.sessions.holen(&id) else {
            return;
        };
        if handle.lock().zustand != LoginZustand::Authentifiziert {
            return;
        }
        handle.lock().typing_setzen(TypingState::aus_zahl(state));
        if let Some(raum) = commands::raum_von(&self.state, &id) {
            commands::profil_verteilen(&self.state, &raum, id);
        }
    }

    fn speaking(&self, id: SessionId, spricht: bool) {
        let Some(handle) = self.state.sessions.holen(&id) else {
            return;
        };
        {
            let mut session = handle.lock();
            if session.zustand != LoginZustand::Authentifiziert || session.ist_sprach_stumm() {
                return;
            }
            session.sprechen_setzen(spricht);
        }
        if let Some(raum) = commands::raum_von(&self.state, &id) {
            commands::profil_verteilen(&self.state, &raum, id);
        }
    }

    fn voice(&self, id: SessionId, data: String) {
        let Some(handle) = self.state.sessions.holen(&id) else {
            return;
        };
        {
            let session = handle.lock();
            if session.zustand != LoginZustand::Authentifiziert || session.ist_sprach_stumm() {
                return;
            }
        }
        if let Some(raum) = commands::raum_von(&self.state, &id) {
            raum.senden_an_alle_ausser(
                &self.state.broadcaster,
                &id,
                ServerEvent::Voice { guid: id, data },
            );
        }
    }

    fn useredit(
        &self,
        id: SessionId,
        ziel: SessionId,
        name: Option<String>,
        color: Option<String>,
    ) {
        let Some(handle) = self.state.sessions.holen(&id) else {
            return;
        };
        let (zustand, stufe) = {
            let session = handle.lock();
            (session.zustand, session.autoritaet)
        };
        if zustand != LoginZustand::Authentifiziert {
            return;
        }

        // Fremd-Bearbeitung ist ein Senior-Override (wie statcustom)
        let fremd = ziel != id;
        if fremd && stufe < Authority::King {
            return;
        }

        let Some(ziel_handle) = self.state.sessions.holen(&ziel) else {
            return;
        };
        {
            let mut session = ziel_handle.lock();
            // Statlock blockiert Selbst-Bearbeitung, nicht den Override
            if !fremd && session.stat_gesperrt {
                return;
            }
            if let Some(name) = name {
                if !name.is_empty() && name.len() <= self.state.konfig.namens_limit {
                    session.name_setzen(name);
                }
            }
            if let Some(color) = color {
                let farbe = commands::profile::farbe_aufloesen(&self.state, &color);
                session.farbe_setzen(farbe);
            }
        }

        if let Some(raum) = commands::raum_von(&self.state, &ziel) {
            commands::profil_verteilen(&self.state, &raum, ziel);
        }
    }

    fn vote(&self, id: SessionId, ja: bool) {
        let Some(raum) = commands::raum_von(&self.state, &id) else {
            return;
        };
        if let Some(stand) = raum.abstimmen(id, ja) {
            raum.senden_an_alle(
                &self.state.broadcaster,
                ServerEvent::PollUpdate {
                    yes_pct: stand.ja_prozent,
                    no_pct: stand.nein_prozent,
                    total_votes: stand.stimmen,
                },
            );
        }
    }

    // -----------------------------------------------------------------------
    // Abbau & Hilfen
    // -----------------------------------------------------------------------

    /// Baut eine Session vollstaendig ab (Verbindungsende, kick, ban).
    ///
    /// Idempotent und defensiv: fehlende Eintraege werden toleriert, der
    /// Raum bleibt in jedem Fall konsistent (keine haengenden
    /// Mitgliedschafts-Eintraege).
    pub fn session_trennen(&self, id: SessionId) {
        let Some(handle) = self.state.sessions.entfernen(&id) else {
            return;
        };
        let (raumname, eingeloggt) = {
            let mut session = handle.lock();
            let eingeloggt = session.zustand == LoginZustand::Authentifiziert;
            session.zustand = LoginZustand::Beendet;
            (session.raum.take(), eingeloggt)
        };

        if eingeloggt {
            if let Some(raumname) = raumname {
                if let Some(raum) = self.state.raeume.holen(&raumname) {
                    let leer = raum.verlassen(&id);
                    raum.senden_an_alle(&self.state.broadcaster, ServerEvent::Leave { guid: id });
                    raum.mitgliederzahl_verteilen(&self.state.broadcaster);
                    if leer {
                        self.state.raeume.entfernen_wenn_leer(&raumname);
                    }
                }
            }
        }

        self.state.broadcaster.client_entfernen(&id);
        tracing::debug!(session_id = %id, "Session abgebaut");
    }

    /// Bannt eine Adresse sofort (Flood-Heuristik) und trennt die Session
    fn sofort_bannen(&self, id: &SessionId, adresse: &str, grund: &str) {
        let eintrag = self.state.bans.bannen(adresse, grund);
        self.state.broadcaster.an_session_senden(
            id,
            ServerEvent::Ban {
                reason: eintrag.grund,
                end_timestamp: eintrag.endet_am.timestamp(),
            },
        );
        self.state.broadcaster.trennen(id);
        tracing::warn!(session_id = %id, adresse = %adresse, "Sofort-Ban durch Flood-Heuristik");
    }

    /// Aktiviert den Slowmode und plant die Entdrosselung.
    ///
    /// Der Timer re-validiert dass die Session noch existiert – sie kann
    /// sich bis dahin getrennt haben.
    fn slowmode_starten(&self, id: SessionId) {
        if let Some(handle) = self.state.sessions.holen(&id) {
            handle.lock().slowmode_aktiv = true;
        }
        let state = Arc::clone(&self.state);
        let dauer = self.state.konfig.slowmode;
        tokio::spawn(async move {
            tokio::time::sleep(dauer).await;
            if let Some(handle) = state.sessions.holen(&id) {
                handle.lock().slowmode_aktiv = false;
            }
        });
    }
}

/// HTML-Escaping der Sanitize-Politik: nur `<` und `>`
fn html_escapen(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::HubKonfig;
    use crate::testutil::{einloggen, test_dispatcher, test_dispatcher_mit_konfig};
    use stammtisch_protocol::SessionProfile;
    use std::collections::HashMap;
    use tokio::sync::mpsc;

    fn empfangene(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn roster_von(events: &[ServerEvent]) -> Option<HashMap<SessionId, SessionProfile>> {
        events.iter().find_map(|ev| match ev {
            ServerEvent::UpdateAll { users_public } => Some(users_public.clone()),
            _ => None,
        })
    }

    #[tokio::test]
    async fn erster_login_erstellt_raum_und_macht_owner() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");

        let events = empfangene(&mut rx_a);

        // Roster enthaelt genau die eigene Session
        let roster = roster_von(&events).expect("updateAll erwartet");
        assert_eq!(roster.len(), 1);
        assert!(roster.contains_key(&a));

        // room{isOwner:true} und authlv mit Owner-Stufe
        assert!(events.iter().any(|ev| matches!(ev,
            ServerEvent::Room { room, is_owner: true, is_public: false } if room == "lobby")));
        assert!(events.iter().any(|ev| matches!(ev,
            ServerEvent::Authlv { level } if *level == Authority::RoomOwner.stufe())));
    }

    #[tokio::test]
    async fn zweiter_login_bekommt_roster_und_owner_ein_update() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        let (b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "lobby");

        // B sieht A im Roster
        let events_b = empfangene(&mut rx_b);
        let roster = roster_von(&events_b).expect("updateAll erwartet");
        assert!(roster.contains_key(&a));
        assert!(roster.contains_key(&b));

        // B ist kein Owner
        assert!(events_b.iter().any(|ev| matches!(ev,
            ServerEvent::Room { is_owner: false, .. })));

        // A bekommt update fuer B (kein erneutes updateAll)
        let events_a = empfangene(&mut rx_a);
        assert!(events_a.iter().any(|ev| matches!(ev,
            ServerEvent::Update { guid, .. } if *guid == b)));
        assert!(roster_von(&events_a).is_none());
    }

    #[tokio::test]
    async fn wiederholter_login_wird_ignoriert() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Login {
                name: "Neuer Name".into(),
                room: "anderswo".into(),
                credential: None,
                elevation_token: None,
            },
        );

        // Kein Raumwechsel, kein Profil-Reset – nur die Info-Events
        let handle = dispatcher.state().sessions.holen(&a).unwrap();
        {
            let session = handle.lock();
            assert_eq!(session.raum.as_deref(), Some("lobby"));
            assert_eq!(session.name(), "Anna");
        }
        let events = empfangene(&mut rx_a);
        assert!(events.iter().any(|ev| matches!(ev, ServerEvent::Room { .. })));
        assert!(dispatcher.state().raeume.holen("anderswo").is_none());
    }

    #[tokio::test]
    async fn ungueltiger_name_faellt_auf_standard() {
        let dispatcher = test_dispatcher_mit_konfig(HubKonfig {
            blacklist: vec!["verboten".into()],
            ..HubKonfig::default()
        });

        for schlecht in ["", "   ", "ein verbotener name", &"x".repeat(100)] {
            let (id, _rx) = einloggen(&dispatcher, "10.0.0.1", schlecht, "lobby");
            let handle = dispatcher.state().sessions.holen(&id).unwrap();
            assert_eq!(handle.lock().name(), "Anonymous", "Eingabe: {schlecht:?}");
        }
    }

    #[tokio::test]
    async fn leerer_raumname_faellt_auf_standard() {
        let dispatcher = test_dispatcher();
        let (id, _rx) = einloggen(&dispatcher, "10.0.0.1", "Anna", "");
        let handle = dispatcher.state().sessions.holen(&id).unwrap();
        assert_eq!(handle.lock().raum.as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn talk_wird_an_den_raum_verteilt() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let (_b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "lobby");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Talk {
                text: "hallo".into(),
            },
        );

        // Beide Mitglieder (inklusive Sender) sehen die Nachricht
        for rx in [&mut rx_a, &mut rx_b] {
            let events = empfangene(rx);
            assert!(events.iter().any(|ev| matches!(ev,
                ServerEvent::Talk { guid, text } if *guid == a && text == "hallo")));
        }
    }

    #[tokio::test]
    async fn talk_wird_html_escaped() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Talk {
                text: "<script>boese()</script>".into(),
            },
        );

        let events = empfangene(&mut rx_a);
        assert!(events.iter().any(|ev| matches!(ev,
            ServerEvent::Talk { text, .. } if text == "&lt;script&gt;boese()&lt;/script&gt;")));
    }

    #[tokio::test]
    async fn slowmode_verwirft_folgenachrichten() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(a, ClientEvent::Talk { text: "eins".into() });
        dispatcher.event_verarbeiten(a, ClientEvent::Talk { text: "zwei".into() });

        let talks: Vec<_> = empfangene(&mut rx_a)
            .into_iter()
            .filter(|ev| matches!(ev, ServerEvent::Talk { .. }))
            .collect();
        assert_eq!(talks.len(), 1, "Zweite Nachricht faellt in den Slowmode");
    }

    #[tokio::test]
    async fn rate_limit_drosselt_nachrichtenflut() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        // Slowmode pro Event umgehen, um nur den Limiter zu testen
        for i in 0..25 {
            {
                let handle = dispatcher.state().sessions.holen(&a).unwrap();
                handle.lock().slowmode_aktiv = false;
            }
            dispatcher.event_verarbeiten(
                a,
                ClientEvent::Talk {
                    text: format!("msg{}", i),
                },
            );
        }

        let talks = empfangene(&mut rx_a)
            .into_iter()
            .filter(|ev| matches!(ev, ServerEvent::Talk { .. }))
            .count();
        // Standard-Limit: 20 Nachrichten pro Fenster; genau so viele kommen an
        assert_eq!(talks, 20);
    }

    #[tokio::test]
    async fn stummgeschaltete_session_kann_nicht_reden() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        {
            let handle = dispatcher.state().sessions.holen(&a).unwrap();
            handle.lock().stumm_umschalten();
        }
        dispatcher.event_verarbeiten(a, ClientEvent::Talk { text: "hallo".into() });

        assert!(!empfangene(&mut rx_a)
            .iter()
            .any(|ev| matches!(ev, ServerEvent::Talk { .. })));
    }

    #[tokio::test]
    async fn befehl_unter_mindeststufe_ist_stiller_noop() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");
        let (b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "default");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        // Anna (Anonymous im Standard-Raum) versucht Bernd zu bannen
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "ban".into(),
                args: vec![b.inner().to_string()],
            },
        );

        // Keinerlei Events, keine Zustandsaenderung, kein Ban
        assert!(empfangene(&mut rx_a).is_empty());
        assert!(empfangene(&mut rx_b).is_empty());
        assert!(dispatcher.state().bans.ist_gebannt("10.0.0.2").is_none());
    }

    #[tokio::test]
    async fn unbekanntes_verb_bleibt_still() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "selfdestruct".into(),
                args: vec![],
            },
        );
        assert!(empfangene(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn blacklist_verwirft_ganzen_befehl() {
        let dispatcher = test_dispatcher_mit_konfig(HubKonfig {
            blacklist: vec!["verboten".into()],
            ..HubKonfig::default()
        });
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "name".into(),
                args: vec!["total".into(), "verboten".into()],
            },
        );

        let handle = dispatcher.state().sessions.holen(&a).unwrap();
        assert_eq!(handle.lock().name(), "Anna", "Befehl muss verworfen sein");
    }

    #[tokio::test]
    async fn statlock_blockiert_selbstbearbeitung() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        {
            let handle = dispatcher.state().sessions.holen(&a).unwrap();
            handle.lock().stat_gesperrt = true;
        }

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Useredit {
                target_id: a,
                name: Some("Neu".into()),
                color: None,
            },
        );
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "name".into(),
                args: vec!["Neu".into()],
            },
        );

        let handle = dispatcher.state().sessions.holen(&a).unwrap();
        assert_eq!(handle.lock().name(), "Anna");
    }

    #[tokio::test]
    async fn fremde_useredits_brauchen_king() {
        let dispatcher = test_dispatcher();
        let (a, _rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "default");
        let (b, _rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "default");

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Useredit {
                target_id: b,
                name: Some("Opfer".into()),
                color: None,
            },
        );
        let handle = dispatcher.state().sessions.holen(&b).unwrap();
        assert_eq!(handle.lock().name(), "Bernd", "Anonymous darf nicht fremd-editieren");

        {
            let handle = dispatcher.state().sessions.holen(&a).unwrap();
            handle.lock().autoritaet = Authority::King;
        }
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Useredit {
                target_id: b,
                name: Some("Umbenannt".into()),
                color: None,
            },
        );
        let handle = dispatcher.state().sessions.holen(&b).unwrap();
        assert_eq!(handle.lock().name(), "Umbenannt");
    }

    #[tokio::test]
    async fn doppelte_stimmen_zaehlen_nicht() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let (b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "lobby");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        let raum = dispatcher.state().raeume.holen("lobby").unwrap();
        raum.umfrage_starten("Pizza?").unwrap();

        for _ in 0..2 {
            dispatcher.event_verarbeiten(a, ClientEvent::Vote { vote: true });
            dispatcher.event_verarbeiten(b, ClientEvent::Vote { vote: false });
        }

        let stand = empfangene(&mut rx_a)
            .into_iter()
            .filter_map(|ev| match ev {
                ServerEvent::PollUpdate { total_votes, .. } => Some(total_votes),
                _ => None,
            })
            .last()
            .expect("pollupdate erwartet");
        assert_eq!(stand, 2, "Zweitstimmen werden ignoriert");
    }

    #[tokio::test]
    async fn trennen_raeumt_raum_und_registry_auf() {
        let dispatcher = test_dispatcher();
        let (a, _rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let (b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "lobby");
        let _ = empfangene(&mut rx_b);

        dispatcher.session_trennen(a);

        // B sieht das leave-Event
        let events = empfangene(&mut rx_b);
        assert!(events.iter().any(|ev| matches!(ev,
            ServerEvent::Leave { guid } if *guid == a)));

        // Raum konsistent: A weder Mitglied noch im Roster
        let raum = dispatcher.state().raeume.holen("lobby").unwrap();
        assert!(!raum.ist_mitglied(&a));
        assert!(!raum.roster().contains_key(&a));

        // Letztes Mitglied geht -> Raum verschwindet, default bleibt
        dispatcher.session_trennen(b);
        assert!(dispatcher.state().raeume.holen("lobby").is_none());
        assert!(dispatcher.state().raeume.holen("default").is_some());
    }

    #[tokio::test]
    async fn doppeltes_trennen_ist_idempotent() {
        let dispatcher = test_dispatcher();
        let (a, _rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        dispatcher.session_trennen(a);
        dispatcher.session_trennen(a);
        assert_eq!(dispatcher.state().sessions.anzahl(), 0);
    }

    #[tokio::test]
    async fn flood_signatur_fuehrt_zu_sofort_ban() {
        let dispatcher = crate::testutil::test_dispatcher_mit_flood(vec!["spambot".into()]);
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Talk {
                text: "SPAMBOT says hi".into(),
            },
        );

        assert!(dispatcher.state().bans.ist_gebannt("10.0.0.1").is_some());
        let events = empfangene(&mut rx_a);
        assert!(events.iter().any(|ev| matches!(ev, ServerEvent::Ban { .. })));
    }

    #[tokio::test]
    async fn typing_aktualisiert_profil() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(a, ClientEvent::Typing { state: 1 });

        let events = empfangene(&mut rx_a);
        assert!(events.iter().any(|ev| matches!(ev,
            ServerEvent::Update { user_public, .. } if user_public.typing == " (typing)")));
    }

    #[tokio::test]
    async fn voice_passthrough_ohne_sender() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = einloggen(&dispatcher, "10.0.0.1", "Anna", "lobby");
        let (_b, mut rx_b) = einloggen(&dispatcher, "10.0.0.2", "Bernd", "lobby");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Voice {
                data: "YWJj".into(),
            },
        );

        assert!(!empfangene(&mut rx_a)
            .iter()
            .any(|ev| matches!(ev, ServerEvent::Voice { .. })));
        assert!(empfangene(&mut rx_b)
            .iter()
            .any(|ev| matches!(ev, ServerEvent::Voice { guid, data } if *guid == a && data == "YWJj")));
    }

    #[tokio::test]
    async fn events_vor_login_werden_verworfen() {
        let dispatcher = test_dispatcher();
        let a = dispatcher.session_erstellen("10.0.0.1".into());
        let (mut rx, _trennen) = dispatcher.state().broadcaster.client_registrieren(a);

        dispatcher.event_verarbeiten(a, ClientEvent::Talk { text: "zu frueh".into() });
        dispatcher.event_verarbeiten(
            a,
            ClientEvent::Command {
                verb: "joke".into(),
                args: vec![],
            },
        );

        assert!(empfangene(&mut rx).is_empty());
    }
}
