//! stammtisch-protocol – Wire-Format und Event-Definitionen
//!
//! Zwei getrennte Event-Kanaele teilen sich dasselbe Frame-Format:
//! - `event`: der Chat-/Befehls-Kanal (Login, Talk, Commands, Roster)
//! - `signal`: der dedizierte Voice-/Screenshare-Signalisierungs-Kanal
//!
//! Beide Kanaele verwenden laengen-praefixierte JSON-Frames (`wire`).

pub mod event;
pub mod signal;
pub mod wire;

pub use event::{ClientEvent, ServerEvent, SessionProfile};
pub use signal::{SignalClientEvent, SignalServerEvent, VoiceParticipant};
pub use wire::FrameCodec;
