//! Voice-/Screenshare-Signalisierungs-Kanal
//!
//! Eigener Namensraum getrennt vom Chat-Kanal. Der Server ist hier ein
//! blinder Vermittler: Offer/Answer/ICE-Payloads werden unveraendert als
//! `serde_json::Value` weitergereicht – keinerlei Interpretation.
//!
//! Voice und Screenshare sind zwei unabhaengige Peer-Verbindungs-Ebenen:
//! Voice ist ein volles Mesh ohne Exklusivitaet, Screenshare hat genau
//! einen Praesentator pro Raum.

use serde::{Deserialize, Serialize};
use stammtisch_core::SessionId;

/// Teilnehmer-Info fuer die Roster-Antwort und Join-Benachrichtigungen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParticipant {
    #[serde(rename = "userId")]
    pub user_id: SessionId,
    pub username: String,
    #[serde(rename = "isMuted")]
    pub is_muted: bool,
    #[serde(rename = "isSpeaking")]
    pub is_speaking: bool,
    #[serde(rename = "isScreensharing")]
    pub is_screensharing: bool,
}

/// Eingehende Signalisierungs-Events vom Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalClientEvent {
    #[serde(rename = "join-voice-room")]
    JoinVoiceRoom {
        username: String,
        #[serde(rename = "roomId")]
        room_id: String,
    },
    #[serde(rename = "voice-offer")]
    VoiceOffer {
        to: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "voice-answer")]
    VoiceAnswer {
        to: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "voice-ice-candidate")]
    VoiceIceCandidate {
        to: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "speaking-state")]
    SpeakingState {
        #[serde(rename = "isSpeaking")]
        is_speaking: bool,
    },
    #[serde(rename = "toggle-mute")]
    ToggleMute {
        #[serde(rename = "isMuted")]
        is_muted: bool,
    },
    #[serde(rename = "start-screenshare")]
    StartScreenshare,
    #[serde(rename = "stop-screenshare")]
    StopScreenshare,
    #[serde(rename = "screenshare-offer")]
    ScreenshareOffer {
        to: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "screenshare-answer")]
    ScreenshareAnswer {
        to: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "screenshare-ice-candidate")]
    ScreenshareIceCandidate {
        to: SessionId,
        payload: serde_json::Value,
    },
}

/// Ausgehende Signalisierungs-Events an den Client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalServerEvent {
    /// Antwort auf join-voice-room mit dem aktuellen Teilnehmer-Roster.
    /// Bestehende Mitglieder erstellen daraufhin Offers RICHTUNG des
    /// Neuankoemmlings (nie umgekehrt – vermeidet doppelte Links).
    #[serde(rename = "joined-voice-room")]
    JoinedVoiceRoom { participants: Vec<VoiceParticipant> },
    #[serde(rename = "user-joined-voice")]
    UserJoinedVoice {
        #[serde(rename = "userId")]
        user_id: SessionId,
        username: String,
    },
    #[serde(rename = "user-left-voice")]
    UserLeftVoice {
        #[serde(rename = "userId")]
        user_id: SessionId,
    },
    #[serde(rename = "voice-offer")]
    VoiceOffer {
        from: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "voice-answer")]
    VoiceAnswer {
        from: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "voice-ice-candidate")]
    VoiceIceCandidate {
        from: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "user-speaking")]
    UserSpeaking {
        #[serde(rename = "userId")]
        user_id: SessionId,
        #[serde(rename = "isSpeaking")]
        is_speaking: bool,
    },
    #[serde(rename = "user-muted")]
    UserMuted {
        #[serde(rename = "userId")]
        user_id: SessionId,
        #[serde(rename = "isMuted")]
        is_muted: bool,
    },
    #[serde(rename = "screenshare-started")]
    ScreenshareStarted {
        #[serde(rename = "userId")]
        user_id: SessionId,
        username: String,
    },
    #[serde(rename = "screenshare-stopped")]
    ScreenshareStopped {
        #[serde(rename = "userId")]
        user_id: SessionId,
    },
    /// Ablehnung NUR an den Anfragenden – der aktive Praesentator sieht
    /// davon nichts
    #[serde(rename = "screenshare-denied")]
    ScreenshareDenied { reason: String },
    #[serde(rename = "screenshare-offer")]
    ScreenshareOffer {
        from: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "screenshare-answer")]
    ScreenshareAnswer {
        from: SessionId,
        payload: serde_json::Value,
    },
    #[serde(rename = "screenshare-ice-candidate")]
    ScreenshareIceCandidate {
        from: SessionId,
        payload: serde_json::Value,
    },
}
