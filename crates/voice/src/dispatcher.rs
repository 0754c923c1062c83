//! Signalisierungs-Dispatcher – blindes Weiterreichen der Handshakes
//!
//! Offer/Answer/ICE-Payloads werden byte-identisch an das Ziel
//! weitergereicht und nur mit der Absender-ID (`from`) neu etikettiert –
//! hoechstens eine Zustellung, unbekannte Ziele bleiben still.
//!
//! Beitritts-Richtung des Voice-Mesh: der Neuankoemmling bekommt das
//! Roster, die BESTEHENDEN Mitglieder bekommen `user-joined-voice` und
//! erstellen die Offers Richtung Neuankoemmling. So entsteht pro Paar
//! genau ein Link.

use tokio::sync::mpsc;

use stammtisch_core::SessionId;
use stammtisch_protocol::{SignalClientEvent, SignalServerEvent};

use crate::state::{ScreenshareStart, VoiceState};

/// Maximale Username-Laenge im Voice-Namensraum
const USERNAME_LIMIT: usize = 25;

/// Dispatcher des Voice-Namensraums
pub struct VoiceDispatcher {
    state: VoiceState,
}

impl VoiceDispatcher {
    pub fn neu(state: VoiceState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    /// Verarbeitet ein Event.
    ///
    /// Beim ersten erfolgreichen `join-voice-room` wird die Empfangs-Queue
    /// der Verbindung zurueckgegeben; alle anderen Events liefern `None`.
    pub fn event_verarbeiten(
        &self,
        id: SessionId,
        event: SignalClientEvent,
    ) -> Option<mpsc::Receiver<SignalServerEvent>> {
        match event {
            SignalClientEvent::JoinVoiceRoom { username, room_id } => {
                return self.beitreten(id, username, room_id);
            }

            // --- Voice-Relay (volles Mesh, keine Exklusivitaet) ---
            SignalClientEvent::VoiceOffer { to, payload } => {
                self.weiterleiten(id, &to, SignalServerEvent::VoiceOffer { from: id, payload });
            }
            SignalClientEvent::VoiceAnswer { to, payload } => {
                self.weiterleiten(id, &to, SignalServerEvent::VoiceAnswer { from: id, payload });
            }
            SignalClientEvent::VoiceIceCandidate { to, payload } => {
                self.weiterleiten(
                    id,
                    &to,
                    SignalServerEvent::VoiceIceCandidate { from: id, payload },
                );
            }

            // --- Status ---
            SignalClientEvent::SpeakingState { is_speaking } => {
                if let Some(raum) = self.state.raum_von(&id) {
                    self.state.speaking_setzen(&id, is_speaking);
                    self.state.an_raum_senden_ausser(
                        &raum,
                        &id,
                        SignalServerEvent::UserSpeaking {
                            user_id: id,
                            is_speaking,
                        },
                    );
                }
            }
            SignalClientEvent::ToggleMute { is_muted } => {
                if let Some(raum) = self.state.raum_von(&id) {
                    self.state.mute_setzen(&id, is_muted);
                    self.state.an_raum_senden_ausser(
                        &raum,
                        &id,
                        SignalServerEvent::UserMuted {
                            user_id: id,
                            is_muted,
                        },
                    );
                }
            }

            // --- Screenshare (genau ein Praesentator pro Raum) ---
            SignalClientEvent::StartScreenshare => self.screenshare_starten(id),
            SignalClientEvent::StopScreenshare => self.screenshare_beenden(id),
            SignalClientEvent::ScreenshareOffer { to, payload } => {
                self.weiterleiten(
                    id,
                    &to,
                    SignalServerEvent::ScreenshareOffer { from: id, payload },
                );
            }
            SignalClientEvent::ScreenshareAnswer { to, payload } => {
                self.weiterleiten(
                    id,
                    &to,
                    SignalServerEvent::ScreenshareAnswer { from: id, payload },
                );
            }
            SignalClientEvent::ScreenshareIceCandidate { to, payload } => {
                self.weiterleiten(
                    id,
                    &to,
                    SignalServerEvent::ScreenshareIceCandidate { from: id, payload },
                );
            }
        }
        None
    }

    fn beitreten(
        &self,
        id: SessionId,
        username: String,
        room_id: String,
    ) -> Option<mpsc::Receiver<SignalServerEvent>> {
        // Doppelte Joins derselben Verbindung werden ignoriert
        if self.state.ist_verbunden(&id) {
            return None;
        }

        let username = {
            let username = username.trim();
            if username.is_empty() || username.len() > USERNAME_LIMIT {
                "Anonymous".to_string()
            } else {
                username.to_string()
            }
        };
        let raum = if room_id.trim().is_empty() {
            "default".to_string()
        } else {
            room_id
        };

        let (rx, roster) = self.state.beitreten(id, username.clone(), raum.clone());

        // Roster an den Neuankoemmling, Join-Hinweis an die Bestehenden
        self.state.senden_an(
            &id,
            SignalServerEvent::JoinedVoiceRoom {
                participants: roster,
            },
        );
        self.state.an_raum_senden_ausser(
            &raum,
            &id,
            SignalServerEvent::UserJoinedVoice {
                user_id: id,
                username,
            },
        );

        Some(rx)
    }

    /// Reicht ein Handshake-Event an das Ziel weiter.
    ///
    /// Nur verbundene Absender duerfen senden; unbekannte Ziele werden
    /// still verworfen.
    fn weiterleiten(&self, von: SessionId, ziel: &SessionId, event: SignalServerEvent) {
        if !self.state.ist_verbunden(&von) {
            return;
        }
        self.state.senden_an(ziel, event);
    }

    fn screenshare_starten(&self, id: SessionId) {
        let Some(raum) = self.state.raum_von(&id) else {
            return;
        };
        match self.state.screenshare_starten(&raum, id) {
            ScreenshareStart::Gestartet => {
                let username = self.state.username_von(&id).unwrap_or_default();
                self.state.an_raum_senden(
                    &raum,
                    SignalServerEvent::ScreenshareStarted {
                        user_id: id,
                        username,
                    },
                );
                tracing::debug!(session_id = %id, raum = %raum, "Screenshare gestartet");
            }
            ScreenshareStart::Abgelehnt { praesentator } => {
                // Ablehnung NUR an den Anfragenden; der Praesentator und
                // der Raum bleiben unberuehrt
                self.state.senden_an(
                    &id,
                    SignalServerEvent::ScreenshareDenied {
                        reason: "Another user is already screensharing".into(),
                    },
                );
                tracing::debug!(
                    session_id = %id,
                    praesentator = %praesentator,
                    "Screenshare abgelehnt"
                );
            }
        }
    }

    fn screenshare_beenden(&self, id: SessionId) {
        let Some(raum) = self.state.raum_von(&id) else {
            return;
        };
        if self.state.screenshare_beenden(&raum, &id) {
            self.state
                .an_raum_senden(&raum, SignalServerEvent::ScreenshareStopped { user_id: id });
        }
    }

    /// Baut einen Teilnehmer ab (Verbindungsende).
    ///
    /// Ein aktiver Praesentator hinterlaesst `screenshare-stopped`, damit
    /// die Zuschauer ihre Empfangs-Links abbauen.
    pub fn trennen(&self, id: SessionId) {
        let Some((raum, war_praesentator)) = self.state.verlassen(&id) else {
            return;
        };
        if war_praesentator {
            self.state
                .an_raum_senden(&raum, SignalServerEvent::ScreenshareStopped { user_id: id });
        }
        self.state
            .an_raum_senden(&raum, SignalServerEvent::UserLeftVoice { user_id: id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_dispatcher() -> VoiceDispatcher {
        VoiceDispatcher::neu(VoiceState::neu())
    }

    fn join(
        dispatcher: &VoiceDispatcher,
        name: &str,
        raum: &str,
    ) -> (SessionId, mpsc::Receiver<SignalServerEvent>) {
        let id = SessionId::new();
        let rx = dispatcher
            .event_verarbeiten(
                id,
                SignalClientEvent::JoinVoiceRoom {
                    username: name.into(),
                    room_id: raum.into(),
                },
            )
            .expect("Join muss eine Queue liefern");
        (id, rx)
    }

    fn empfangene(rx: &mut mpsc::Receiver<SignalServerEvent>) -> Vec<SignalServerEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn join_liefert_roster_und_benachrichtigt_bestehende() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = join(&dispatcher, "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        let (b, mut rx_b) = join(&dispatcher, "Bernd", "lobby");

        // B bekommt das Roster mit A und sich selbst
        let events_b = empfangene(&mut rx_b);
        let roster = events_b
            .iter()
            .find_map(|ev| match ev {
                SignalServerEvent::JoinedVoiceRoom { participants } => Some(participants.clone()),
                _ => None,
            })
            .expect("joined-voice-room erwartet");
        assert_eq!(roster.len(), 2);
        assert!(roster.iter().any(|p| p.user_id == a));

        // A (bestehendes Mitglied) bekommt den Join-Hinweis und offeriert
        // daraufhin Richtung B – nicht umgekehrt
        let events_a = empfangene(&mut rx_a);
        assert!(events_a.iter().any(|ev| matches!(ev,
            SignalServerEvent::UserJoinedVoice { user_id, username }
                if *user_id == b && username == "Bernd")));
    }

    #[tokio::test]
    async fn relay_laesst_payload_unangetastet() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = join(&dispatcher, "Anna", "lobby");
        let (b, mut rx_b) = join(&dispatcher, "Bernd", "lobby");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        let payload = json!({"sdp": "v=0\r\no=- 4611731400430051336", "type": "offer"});
        dispatcher.event_verarbeiten(
            a,
            SignalClientEvent::VoiceOffer {
                to: b,
                payload: payload.clone(),
            },
        );

        let events_b = empfangene(&mut rx_b);
        match &events_b[..] {
            [SignalServerEvent::VoiceOffer { from, payload: p }] => {
                assert_eq!(*from, a, "from muss die Absender-ID sein");
                assert_eq!(*p, payload, "Payload muss identisch ankommen");
            }
            andere => panic!("Genau ein voice-offer erwartet, war {:?}", andere.len()),
        }
        // Der Absender selbst bekommt nichts
        assert!(empfangene(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn relay_an_unbekanntes_ziel_ist_still() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = join(&dispatcher, "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        dispatcher.event_verarbeiten(
            a,
            SignalClientEvent::VoiceOffer {
                to: SessionId::new(),
                payload: json!({}),
            },
        );
        assert!(empfangene(&mut rx_a).is_empty(), "Keinerlei Rueckmeldung");
    }

    #[tokio::test]
    async fn screenshare_exklusivitaet() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = join(&dispatcher, "Anna", "lobby");
        let (b, mut rx_b) = join(&dispatcher, "Bernd", "lobby");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        dispatcher.event_verarbeiten(a, SignalClientEvent::StartScreenshare);
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        // B versucht es auch: Ablehnung NUR an B
        dispatcher.event_verarbeiten(b, SignalClientEvent::StartScreenshare);

        let events_b = empfangene(&mut rx_b);
        assert!(events_b.iter().any(|ev| matches!(ev, SignalServerEvent::ScreenshareDenied { .. })));
        assert!(empfangene(&mut rx_a).is_empty(), "A sieht von der Ablehnung nichts");
        assert_eq!(dispatcher.state().praesentator_von("lobby"), Some(a));
    }

    #[tokio::test]
    async fn screenshare_stop_benachrichtigt_zuschauer() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = join(&dispatcher, "Anna", "lobby");
        let (_b, mut rx_b) = join(&dispatcher, "Bernd", "lobby");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        dispatcher.event_verarbeiten(a, SignalClientEvent::StartScreenshare);
        let _ = empfangene(&mut rx_b);
        dispatcher.event_verarbeiten(a, SignalClientEvent::StopScreenshare);

        let events_b = empfangene(&mut rx_b);
        assert!(events_b.iter().any(|ev| matches!(ev,
            SignalServerEvent::ScreenshareStopped { user_id } if *user_id == a)));
        assert_eq!(dispatcher.state().praesentator_von("lobby"), None);
    }

    #[tokio::test]
    async fn praesentator_disconnect_raeumt_auf() {
        let dispatcher = test_dispatcher();
        let (a, _rx_a) = join(&dispatcher, "Anna", "lobby");
        let (_b, mut rx_b) = join(&dispatcher, "Bernd", "lobby");
        let _ = empfangene(&mut rx_b);

        dispatcher.event_verarbeiten(a, SignalClientEvent::StartScreenshare);
        let _ = empfangene(&mut rx_b);

        dispatcher.trennen(a);

        let events_b = empfangene(&mut rx_b);
        assert!(events_b.iter().any(|ev| matches!(ev,
            SignalServerEvent::ScreenshareStopped { user_id } if *user_id == a)));
        assert!(events_b.iter().any(|ev| matches!(ev,
            SignalServerEvent::UserLeftVoice { user_id } if *user_id == a)));
        assert_eq!(dispatcher.state().praesentator_von("lobby"), None);
    }

    #[tokio::test]
    async fn mute_und_speaking_gehen_an_den_raum() {
        let dispatcher = test_dispatcher();
        let (a, mut rx_a) = join(&dispatcher, "Anna", "lobby");
        let (_b, mut rx_b) = join(&dispatcher, "Bernd", "lobby");
        let _ = empfangene(&mut rx_a);
        let _ = empfangene(&mut rx_b);

        dispatcher.event_verarbeiten(a, SignalClientEvent::ToggleMute { is_muted: true });
        dispatcher.event_verarbeiten(a, SignalClientEvent::SpeakingState { is_speaking: true });

        let events_b = empfangene(&mut rx_b);
        assert!(events_b.iter().any(|ev| matches!(ev,
            SignalServerEvent::UserMuted { user_id, is_muted: true } if *user_id == a)));
        assert!(events_b.iter().any(|ev| matches!(ev,
            SignalServerEvent::UserSpeaking { user_id, is_speaking: true } if *user_id == a)));
        // Der Ausloeser bekommt seine eigenen Status-Events nicht zurueck
        assert!(empfangene(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn events_vor_dem_join_werden_verworfen() {
        let dispatcher = test_dispatcher();
        let fremd = SessionId::new();
        let (_a, mut rx_a) = join(&dispatcher, "Anna", "lobby");
        let _ = empfangene(&mut rx_a);

        // Nicht beigetretene Verbindung darf nichts weiterleiten
        dispatcher.event_verarbeiten(
            fremd,
            SignalClientEvent::VoiceOffer {
                to: _a,
                payload: json!({"x": 1}),
            },
        );
        assert!(empfangene(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn doppelter_join_wird_ignoriert() {
        let dispatcher = test_dispatcher();
        let (a, _rx) = join(&dispatcher, "Anna", "lobby");

        let nochmal = dispatcher.event_verarbeiten(
            a,
            SignalClientEvent::JoinVoiceRoom {
                username: "Anna2".into(),
                room_id: "anderswo".into(),
            },
        );
        assert!(nochmal.is_none());
        assert_eq!(dispatcher.state().raum_von(&a).as_deref(), Some("lobby"));
    }
}
