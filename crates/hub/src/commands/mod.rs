//! Befehls-Registry und gemeinsame Handler-Hilfen
//!
//! Jeder Befehl ist ein Deskriptor `{verb, mindeststufe, handler}`. Die
//! Autoritaetspruefung laeuft EINMAL einheitlich im Dispatcher bevor der
//! Handler aufgerufen wird; Handler kuemmern sich nur noch um
//! Zielaufloesung, Mutation und Broadcast. Die Tabelle ist aufzaehlbar,
//! damit Tests jede Stufen-Schranke einzeln pruefen koennen.

pub mod cosmetic;
pub mod economy;
pub mod moderation;
pub mod privilege;
pub mod profile;

use std::sync::Arc;
use uuid::Uuid;

use stammtisch_core::{Authority, SessionId};
use stammtisch_protocol::ServerEvent;

use crate::room::Room;
use crate::server_state::HubState;

/// Signatur eines Befehls-Handlers
pub type CommandHandler = fn(&Arc<HubState>, SessionId, &str);

/// Ein Eintrag der Befehls-Tabelle
pub struct CommandDescriptor {
    pub verb: &'static str,
    pub mindeststufe: Authority,
    pub handler: CommandHandler,
}

/// Die Befehls-Tabelle des Dispatchers
pub struct CommandRegistry {
    eintraege: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    /// Baut die kanonische Befehls-Tabelle
    pub fn standard() -> Self {
        use Authority::*;

        let eintraege = vec![
            // Profil
            eintrag("name", Anonymous, profile::name),
            eintrag("color", Anonymous, profile::color),
            eintrag("pitch", Anonymous, profile::pitch),
            eintrag("speed", Anonymous, profile::speed),
            eintrag("tag", Rabbi, profile::tag),
            // Kosmetik (nur Berechtigungspruefung, Darstellung beim Client)
            eintrag("joke", Anonymous, cosmetic::joke),
            eintrag("fact", Anonymous, cosmetic::fact),
            eintrag("backflip", Anonymous, cosmetic::backflip),
            eintrag("youtube", Anonymous, cosmetic::youtube),
            eintrag("dm", Anonymous, cosmetic::dm),
            eintrag("quote", Anonymous, cosmetic::quote),
            // Privilegien
            eintrag("godmode", Anonymous, privilege::godmode),
            eintrag("kingmode", Anonymous, privilege::kingmode),
            eintrag("pope", Pope, privilege::pope),
            eintrag("king", King, privilege::king),
            eintrag("rabbi", Rabbi, privilege::rabbi),
            eintrag("bless", King, privilege::bless),
            eintrag("rabbify", Pope, privilege::rabbify),
            eintrag("tagsom", Pope, privilege::tagsom),
            eintrag("statlock", King, privilege::statlock),
            eintrag("statcustom", King, privilege::statcustom),
            // Moderation
            eintrag("mute", Pope, moderation::mute),
            eintrag("voicemute", King, moderation::voicemute),
            eintrag("kick", Pope, moderation::kick),
            eintrag("ban", Pope, moderation::ban),
            eintrag("announce", Blessed, moderation::announce),
            eintrag("poll", Blessed, moderation::poll),
            // Wirtschaft
            eintrag("work", Anonymous, economy::work),
            eintrag("buy", Anonymous, economy::buy),
        ];

        Self { eintraege }
    }

    /// Schlaegt ein Verb nach; unbekannte Verben sind still zu ignorieren
    pub fn finden(&self, verb: &str) -> Option<&CommandDescriptor> {
        self.eintraege.iter().find(|e| e.verb == verb)
    }

    /// Alle Deskriptoren (fuer Tests und Aufzaehlung)
    pub fn alle(&self) -> &[CommandDescriptor] {
        &self.eintraege
    }
}

fn eintrag(
    verb: &'static str,
    mindeststufe: Authority,
    handler: CommandHandler,
) -> CommandDescriptor {
    CommandDescriptor {
        verb,
        mindeststufe,
        handler,
    }
}

// ---------------------------------------------------------------------------
// Gemeinsame Handler-Hilfen
// ---------------------------------------------------------------------------

/// Der Raum in dem die Session gerade Mitglied ist
pub(crate) fn raum_von(state: &Arc<HubState>, id: &SessionId) -> Option<Arc<Room>> {
    let handle = state.sessions.holen(id)?;
    let raumname = handle.lock().raum.clone()?;
    state.raeume.holen(&raumname)
}

/// Loest ein Befehls-Ziel innerhalb eines Raums auf: zuerst per
/// oeffentlicher ID, dann per case-insensitivem Namensvergleich.
pub(crate) fn ziel_aufloesen(raum: &Room, param: &str) -> Option<SessionId> {
    let param = param.trim();
    if let Ok(uuid) = Uuid::parse_str(param) {
        let id = SessionId(uuid);
        if raum.ist_mitglied(&id) {
            return Some(id);
        }
    }
    raum.finde_nach_name(param)
}

/// Veroeffentlicht den aktuellen Profil-Schnappschuss einer Session im
/// Raum und verteilt das `update`-Event an alle Mitglieder.
pub(crate) fn profil_verteilen(state: &Arc<HubState>, raum: &Room, id: SessionId) {
    let Some(handle) = state.sessions.holen(&id) else {
        return;
    };
    let profil = handle.lock().schnappschuss();
    raum.profil_veroeffentlichen(id, profil.clone());
    raum.senden_an_alle(
        &state.broadcaster,
        ServerEvent::Update {
            guid: id,
            user_public: profil,
        },
    );
}

/// Rueckmeldung NUR an den Ausloeser (nie Broadcast)
pub(crate) fn notice(state: &Arc<HubState>, id: &SessionId, text: impl Into<String>) {
    state
        .broadcaster
        .an_session_senden(id, ServerEvent::Notice { text: text.into() });
}
