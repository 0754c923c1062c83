//! stammtisch-voice – Signalisierungs-Relay fuer Voice und Screenshare
//!
//! Eigener Namensraum (eigener TCP-Port) getrennt vom Chat-Kanal. Der
//! Server vermittelt hier ausschliesslich Offer/Answer/ICE-Handshakes
//! zwischen Peers und beruehrt die Medien selbst nie (kein SFU/Relay).
//!
//! Voice ist ein volles Mesh ohne Exklusivitaet; Screenshare hat genau
//! einen Praesentator pro Raum.

pub mod connection;
pub mod dispatcher;
pub mod state;
pub mod tcp;

pub use dispatcher::VoiceDispatcher;
pub use state::VoiceState;
pub use tcp::VoiceServer;
