//! stammtisch-hub – Der Raum-Session-Manager
//!
//! Kernstueck des Servers: Sessions mit Login-Zustandsmaschine, Raeume mit
//! Mitglieder- und Profiltabelle, die Raum-Registry, der Event-Dispatcher
//! mit Befehls-Tabelle sowie Broadcast- und Verbindungsschicht.
//!
//! ## Nebenlaeufigkeits-Modell
//! Alle Verbindungs-Tasks laufen in einer `tokio::task::LocalSet` auf einem
//! single-threaded Executor; Handler laufen bis zum Ende bevor das naechste
//! Event verarbeitet wird. Timer (Slowmode, Erhebungs-Ablauf,
//! Umfrage-Ende) re-validieren ihren Zustand beim Feuern, da sich die Welt
//! bis dahin geaendert haben kann.

pub mod broadcast;
pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod registry;
pub mod room;
pub mod server_state;
pub mod session;
pub mod tcp;

#[cfg(test)]
pub(crate) mod testutil;

pub use broadcast::Broadcaster;
pub use dispatcher::Dispatcher;
pub use registry::RoomRegistry;
pub use room::Room;
pub use server_state::{HubKonfig, HubState};
pub use session::{LoginZustand, Session, SessionRegistry};
pub use tcp::HubServer;
