//! Room-Registry – Abbildung von Raumname auf Raum
//!
//! Raeume entstehen beim ersten Beitritt und verschwinden in dem Moment,
//! in dem das letzte Mitglied geht. Ausnahme: der Standard-Raum wird beim
//! Start angelegt und nie geloescht.

use dashmap::DashMap;
use std::sync::Arc;

use crate::room::Room;

/// Prozess-weite Raum-Tabelle (explizites Zustandsobjekt, kein Global)
#[derive(Clone)]
pub struct RoomRegistry {
    raeume: Arc<DashMap<String, Arc<Room>>>,
    standard_raum: String,
}

impl RoomRegistry {
    /// Erstellt die Registry und legt den Standard-Raum an
    pub fn neu(standard_raum: impl Into<String>) -> Self {
        let standard_raum = standard_raum.into();
        let raeume = Arc::new(DashMap::new());
        raeume.insert(
            standard_raum.clone(),
            Arc::new(Room::neu(standard_raum.clone())),
        );
        Self {
            raeume,
            standard_raum,
        }
    }

    /// Name des Standard-Raums
    pub fn standard_raum(&self) -> &str {
        &self.standard_raum
    }

    /// Loest einen Raumnamen auf, legt den Raum bei Bedarf an.
    ///
    /// Gibt `(raum, neu_erstellt)` zurueck; `neu_erstellt` steuert die
    /// Room-Owner-Befoerderung des Beitretenden.
    pub fn aufloesen_oder_erstellen(&self, name: &str) -> (Arc<Room>, bool) {
        if let Some(raum) = self.raeume.get(name) {
            return (Arc::clone(raum.value()), false);
        }
        let raum = Arc::new(Room::neu(name));
        // entry() statt insert() – zwei gleichzeitige Beitritte duerfen
        // nicht zwei Raum-Instanzen erzeugen
        let eintrag = self
            .raeume
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&raum));
        let existierte = !Arc::ptr_eq(eintrag.value(), &raum);
        (Arc::clone(eintrag.value()), !existierte)
    }

    /// Holt einen existierenden Raum
    pub fn holen(&self, name: &str) -> Option<Arc<Room>> {
        self.raeume.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Entfernt einen leeren Raum aus der Registry.
    ///
    /// Der Standard-Raum wird nie entfernt; nicht-leere Raeume bleiben
    /// ebenfalls bestehen (Re-Validierung: zwischen Verlassen und Aufruf
    /// kann jemand beigetreten sein).
    pub fn entfernen_wenn_leer(&self, name: &str) -> bool {
        if name == self.standard_raum {
            return false;
        }
        let entfernt = self
            .raeume
            .remove_if(name, |_, raum| raum.ist_leer())
            .is_some();
        if entfernt {
            tracing::debug!(raum = %name, "Leerer Raum entfernt");
        }
        entfernt
    }

    /// Anzahl existierender Raeume
    pub fn anzahl(&self) -> usize {
        self.raeume.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stammtisch_core::SessionId;
    use stammtisch_protocol::SessionProfile;

    fn test_registry() -> RoomRegistry {
        RoomRegistry::neu("default")
    }

    #[test]
    fn standard_raum_existiert_ab_start() {
        let registry = test_registry();
        assert!(registry.holen("default").is_some());
        assert_eq!(registry.anzahl(), 1);
    }

    #[test]
    fn erster_beitritt_erstellt_raum() {
        let registry = test_registry();
        let (_, neu) = registry.aufloesen_oder_erstellen("lobby");
        assert!(neu, "Erster Beitritt muss den Raum anlegen");

        let (_, neu) = registry.aufloesen_oder_erstellen("lobby");
        assert!(!neu, "Zweiter Beitritt findet den bestehenden Raum");
    }

    #[test]
    fn leerer_raum_wird_entfernt() {
        let registry = test_registry();
        let (raum, _) = registry.aufloesen_oder_erstellen("lobby");
        let id = SessionId::new();
        raum.beitreten(id, SessionProfile::neu(id, "Anna".into(), "purple".into()));

        raum.verlassen(&id);
        assert!(registry.entfernen_wenn_leer("lobby"));
        assert!(registry.holen("lobby").is_none());
    }

    #[test]
    fn standard_raum_wird_nie_entfernt() {
        let registry = test_registry();
        assert!(registry.holen("default").unwrap().ist_leer());
        assert!(!registry.entfernen_wenn_leer("default"));
        assert!(registry.holen("default").is_some());
    }

    #[test]
    fn nicht_leerer_raum_bleibt() {
        let registry = test_registry();
        let (raum, _) = registry.aufloesen_oder_erstellen("lobby");
        let id = SessionId::new();
        raum.beitreten(id, SessionProfile::neu(id, "Anna".into(), "purple".into()));

        // Re-Validierung: der Raum ist nicht leer, Entfernen schlaegt fehl
        assert!(!registry.entfernen_wenn_leer("lobby"));
        assert!(registry.holen("lobby").is_some());
    }
}
