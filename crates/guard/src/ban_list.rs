//! Temporaere Bans fuer Stammtisch
//!
//! In-Memory-Banliste pro Netzwerkadresse mit Ablaufzeitpunkt. Abgelaufene
//! Eintraege werden beim Lesen re-validiert und durch einen periodischen
//! Sweep bereinigt. Es wird nichts persistiert: ein Neustart setzt alle
//! Bans zurueck.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Ein aktiver Ban-Eintrag
#[derive(Debug, Clone, PartialEq)]
pub struct BanEintrag {
    /// Dem Betroffenen mitgeteilter Grund
    pub grund: String,
    /// Ablaufzeitpunkt
    pub endet_am: DateTime<Utc>,
}

/// Temporaere Banliste, indiziert nach Netzwerkadresse
pub struct BanListe {
    eintraege: Mutex<HashMap<String, BanEintrag>>,
    standard_dauer: Duration,
}

impl BanListe {
    pub fn neu(standard_dauer: Duration) -> Arc<Self> {
        Arc::new(Self {
            eintraege: Mutex::new(HashMap::new()),
            standard_dauer,
        })
    }

    /// Bannt eine Adresse fuer die Standard-Dauer
    pub fn bannen(&self, adresse: &str, grund: &str) -> BanEintrag {
        self.bannen_mit_dauer(adresse, grund, self.standard_dauer)
    }

    /// Bannt eine Adresse fuer eine explizite Dauer
    pub fn bannen_mit_dauer(&self, adresse: &str, grund: &str, dauer: Duration) -> BanEintrag {
        let eintrag = BanEintrag {
            grund: grund.to_string(),
            endet_am: Utc::now() + chrono::Duration::seconds(dauer.as_secs() as i64),
        };
        self.eintraege
            .lock()
            .insert(adresse.to_string(), eintrag.clone());

        tracing::info!(
            adresse = %adresse,
            grund = %grund,
            endet_am = %eintrag.endet_am,
            "Adresse gebannt"
        );
        eintrag
    }

    /// Prueft ob eine Adresse aktuell gebannt ist.
    ///
    /// Abgelaufene Eintraege werden dabei entfernt (Re-Validierung beim
    /// Lesen).
    pub fn ist_gebannt(&self, adresse: &str) -> Option<BanEintrag> {
        let mut eintraege = self.eintraege.lock();
        match eintraege.get(adresse) {
            Some(eintrag) if eintrag.endet_am > Utc::now() => Some(eintrag.clone()),
            Some(_) => {
                eintraege.remove(adresse);
                None
            }
            None => None,
        }
    }

    /// Hebt einen Ban manuell auf
    pub fn aufheben(&self, adresse: &str) -> bool {
        let entfernt = self.eintraege.lock().remove(adresse).is_some();
        if entfernt {
            tracing::info!(adresse = %adresse, "Ban aufgehoben");
        }
        entfernt
    }

    /// Entfernt alle abgelaufenen Eintraege, gibt die Anzahl zurueck
    pub fn abgelaufene_bereinigen(&self) -> usize {
        let jetzt = Utc::now();
        let mut eintraege = self.eintraege.lock();
        let vorher = eintraege.len();
        eintraege.retain(|_, e| e.endet_am > jetzt);
        vorher - eintraege.len()
    }

    /// Anzahl aktiver Eintraege (inklusive eventuell abgelaufener bis zum
    /// naechsten Sweep)
    pub fn anzahl(&self) -> usize {
        self.eintraege.lock().len()
    }
}
