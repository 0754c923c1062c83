//! Admission-Gate – Zulassungspruefung neuer Verbindungen
//!
//! Prueft jede eingehende Verbindung BEVOR eine Session entsteht:
//! 1. Temporaerer Ban -> Ban-Hinweis senden, dann trennen
//! 2. Alt-Limit (gleichzeitige Verbindungen pro Adresse) -> still trennen
//! 3. Verbindungsraten-Drossel -> still trennen; wiederholte Verstoesse
//!    eskalieren zu einem temporaeren Ban
//!
//! Bei Annahme wird der Gleichzeitigkeits-Zaehler der Adresse erhoeht;
//! beim Session-Abbau wieder verringert (Null-Eintraege werden geloescht).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ban_list::{BanEintrag, BanListe};
use crate::rate_limit::{Kategorie, RateLimiter};

/// Ergebnis der Zulassungspruefung
#[derive(Debug, Clone, PartialEq)]
pub enum Zulassung {
    /// Verbindung annehmen; der Zaehler wurde bereits erhoeht
    Akzeptiert,
    /// Gebannt: Ban-Hinweis senden, dann trennen
    Gebannt(BanEintrag),
    /// Still trennen, keinerlei Rueckmeldung
    StillAbgelehnt,
}

/// Konfiguration des Admission-Gates
#[derive(Debug, Clone)]
pub struct AdmissionKonfig {
    /// Maximale gleichzeitige Verbindungen pro Adresse
    pub alt_limit: u32,
    /// Verbindungs-Verstoesse bis zum automatischen Ban
    pub ban_schwelle: u32,
}

impl Default for AdmissionKonfig {
    fn default() -> Self {
        Self {
            alt_limit: 3,
            ban_schwelle: 3,
        }
    }
}

/// Zulassungspruefung neuer Verbindungen
pub struct AdmissionGate {
    konfig: AdmissionKonfig,
    ban_liste: Arc<BanListe>,
    limiter: Arc<RateLimiter>,
    gleichzeitig: Mutex<HashMap<String, u32>>,
}

impl AdmissionGate {
    pub fn neu(
        konfig: AdmissionKonfig,
        ban_liste: Arc<BanListe>,
        limiter: Arc<RateLimiter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            konfig,
            ban_liste,
            limiter,
            gleichzeitig: Mutex::new(HashMap::new()),
        })
    }

    /// Prueft eine eingehende Verbindung der gegebenen Adresse.
    ///
    /// Bei `Akzeptiert` ist der Gleichzeitigkeits-Zaehler bereits erhoeht;
    /// der Aufrufer MUSS beim Abbau `verbindung_beendet` rufen.
    pub fn verbindung_pruefen(&self, adresse: &str) -> Zulassung {
        // 1. Ban-Pruefung – der Betroffene bekommt den Grund mitgeteilt
        if let Some(eintrag) = self.ban_liste.ist_gebannt(adresse) {
            tracing::debug!(adresse = %adresse, "Verbindung von gebannter Adresse abgelehnt");
            return Zulassung::Gebannt(eintrag);
        }

        // 2. Alt-Limit – stilles Ablehnen
        {
            let gleichzeitig = self.gleichzeitig.lock();
            let aktuell = gleichzeitig.get(adresse).copied().unwrap_or(0);
            if aktuell >= self.konfig.alt_limit {
                tracing::debug!(
                    adresse = %adresse,
                    aktuell,
                    limit = self.konfig.alt_limit,
                    "Alt-Limit erreicht, Verbindung still abgelehnt"
                );
                return Zulassung::StillAbgelehnt;
            }
        }

        // 3. Verbindungsrate – stilles Ablehnen, eskaliert zu Ban
        if !self.limiter.pruefen(adresse, Kategorie::Verbindung) {
            if self.limiter.verbindungs_verstoesse(adresse) >= self.konfig.ban_schwelle {
                self.ban_liste
                    .bannen(adresse, "Zu viele Verbindungsversuche");
                self.limiter.verstoesse_zuruecksetzen(adresse);
            }
            return Zulassung::StillAbgelehnt;
        }

        let mut gleichzeitig = self.gleichzeitig.lock();
        *gleichzeitig.entry(adresse.to_string()).or_insert(0) += 1;
        Zulassung::Akzeptiert
    }

    /// Meldet den Abbau einer zuvor akzeptierten Verbindung.
    ///
    /// Idempotent gegenueber fehlenden Eintraegen (defensive Bereinigung).
    pub fn verbindung_beendet(&self, adresse: &str) {
        let mut gleichzeitig = self.gleichzeitig.lock();
        if let Some(zaehler) = gleichzeitig.get_mut(adresse) {
            *zaehler = zaehler.saturating_sub(1);
            if *zaehler == 0 {
                gleichzeitig.remove(adresse);
            }
        }
    }

    /// Aktuelle Verbindungsanzahl einer Adresse
    pub fn verbindungs_anzahl(&self, adresse: &str) -> u32 {
        self.gleichzeitig.lock().get(adresse).copied().unwrap_or(0)
    }
}
