//! Rate Limiter fuer Stammtisch
//!
//! Sliding-Window-Zaehler pro Netzwerkadresse und Kategorie (Nachricht,
//! Befehl, Verbindung). Ueberschreitet eine Adresse das Fenster-Limit,
//! wird sie fuer die konfigurierte Drossel-Dauer gesperrt; Events in
//! dieser Zeit werden ohne Rueckmeldung verworfen.
//!
//! Die Entdrosselung erfolgt durch Re-Validierung beim naechsten Zugriff
//! (die Welt kann sich zwischen zwei Events beliebig aendern), nicht durch
//! einen separaten Timer pro Adresse.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// Kategorien der Rate-Limitierung, jeweils mit eigenem Fenster-Limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kategorie {
    /// Chat-Nachrichten (`talk`)
    Nachricht,
    /// Text-Befehle (`command`)
    Befehl,
    /// Verbindungsversuche
    Verbindung,
}

/// Konfiguration fuer den Rate Limiter
#[derive(Debug, Clone)]
pub struct RateLimitKonfig {
    /// Fensterlaenge
    pub fenster: Duration,
    /// Maximale Nachrichten pro Fenster
    pub limit_nachricht: u32,
    /// Maximale Befehle pro Fenster
    pub limit_befehl: u32,
    /// Maximale Verbindungsversuche pro Fenster
    pub limit_verbindung: u32,
    /// Sperr-Dauer nach Limit-Ueberschreitung
    pub drossel_dauer: Duration,
}

impl Default for RateLimitKonfig {
    fn default() -> Self {
        Self {
            fenster: Duration::from_secs(10),
            limit_nachricht: 20,
            limit_befehl: 10,
            limit_verbindung: 5,
            drossel_dauer: Duration::from_secs(30),
        }
    }
}

impl RateLimitKonfig {
    fn limit(&self, kategorie: Kategorie) -> u32 {
        match kategorie {
            Kategorie::Nachricht => self.limit_nachricht,
            Kategorie::Befehl => self.limit_befehl,
            Kategorie::Verbindung => self.limit_verbindung,
        }
    }
}

/// Zaehler eines einzelnen (Adresse, Kategorie)-Paars
#[derive(Debug)]
struct FensterZaehler {
    count: u32,
    fenster_start: Instant,
    gedrosselt_bis: Option<Instant>,
}

impl FensterZaehler {
    fn neu(jetzt: Instant) -> Self {
        Self {
            count: 0,
            fenster_start: jetzt,
            gedrosselt_bis: None,
        }
    }
}

/// Rate Limiter mit festem Sliding-Window pro Adresse und Kategorie
///
/// Verbindungs-Verstoesse werden zusaetzlich gezaehlt und speisen die
/// Ban-Kandidaten-Eskalation des Admission-Gates.
pub struct RateLimiter {
    konfig: RateLimitKonfig,
    zaehler: Mutex<HashMap<(String, Kategorie), FensterZaehler>>,
    verbindungs_verstoesse: Mutex<HashMap<String, u32>>,
}

impl RateLimiter {
    pub fn neu(konfig: RateLimitKonfig) -> Arc<Self> {
        Arc::new(Self {
            konfig,
            zaehler: Mutex::new(HashMap::new()),
            verbindungs_verstoesse: Mutex::new(HashMap::new()),
        })
    }

    /// Prueft ein Event der gegebenen Kategorie fuer eine Adresse.
    ///
    /// Gibt `true` zurueck wenn das Event zugelassen ist. Genau `limit`
    /// Events pro Fenster kommen durch; das `limit+1`-te und alle weiteren
    /// werden bis zum Ablauf der Drossel verworfen.
    pub fn pruefen(&self, adresse: &str, kategorie: Kategorie) -> bool {
        self.pruefen_zum_zeitpunkt(adresse, kategorie, Instant::now())
    }

    /// Wie `pruefen`, mit injizierbarem Zeitpunkt (fuer Tests)
    fn pruefen_zum_zeitpunkt(&self, adresse: &str, kategorie: Kategorie, jetzt: Instant) -> bool {
        let abgelehnt = {
            let mut zaehler = self.zaehler.lock();
            let eintrag = zaehler
                .entry((adresse.to_string(), kategorie))
                .or_insert_with(|| FensterZaehler::neu(jetzt));
            Self::eintrag_pruefen(eintrag, self.konfig.limit(kategorie), &self.konfig, jetzt)
        };

        if abgelehnt {
            // Abgelehnte Verbindungsversuche speisen die Ban-Kandidaten
            if kategorie == Kategorie::Verbindung {
                let mut verstoesse = self.verbindungs_verstoesse.lock();
                *verstoesse.entry(adresse.to_string()).or_insert(0) += 1;
            }
            tracing::debug!(
                adresse = %adresse,
                kategorie = ?kategorie,
                "Rate-Limit ueberschritten, Event verworfen"
            );
            return false;
        }

        true
    }

    /// Aktualisiert einen Zaehler, gibt `true` bei Ablehnung zurueck
    fn eintrag_pruefen(
        eintrag: &mut FensterZaehler,
        limit: u32,
        konfig: &RateLimitKonfig,
        jetzt: Instant,
    ) -> bool {
        // Drossel-Pruefung mit Re-Validierung: abgelaufene Drossel aufheben
        if let Some(bis) = eintrag.gedrosselt_bis {
            if jetzt < bis {
                return true;
            }
            eintrag.gedrosselt_bis = None;
            eintrag.count = 0;
            eintrag.fenster_start = jetzt;
        }

        // Fenster-Reset wenn das Fenster abgelaufen ist
        if jetzt.duration_since(eintrag.fenster_start) > konfig.fenster {
            eintrag.count = 0;
            eintrag.fenster_start = jetzt;
        }

        eintrag.count += 1;
        if eintrag.count > limit {
            eintrag.gedrosselt_bis = Some(jetzt + konfig.drossel_dauer);
            return true;
        }
        false
    }

    /// Anzahl der Verbindungs-Verstoesse einer Adresse (Ban-Kandidaten)
    pub fn verbindungs_verstoesse(&self, adresse: &str) -> u32 {
        self.verbindungs_verstoesse
            .lock()
            .get(adresse)
            .copied()
            .unwrap_or(0)
    }

    /// Setzt die Verstoss-Zaehlung einer Adresse zurueck (nach einem Ban)
    pub fn verstoesse_zuruecksetzen(&self, adresse: &str) {
        self.verbindungs_verstoesse.lock().remove(adresse);
    }

    /// Bereinigt Zaehler die seit mehr als 5 Minuten inaktiv sind
    /// (Speicher-Management)
    pub fn cleanup(&self) {
        let schwellwert = Duration::from_secs(5 * 60);
        let jetzt = Instant::now();

        let mut zaehler = self.zaehler.lock();
        zaehler.retain(|_, z| {
            let aktiv_bis = z
                .gedrosselt_bis
                .unwrap_or(z.fenster_start + self.konfig.fenster);
            jetzt.duration_since(z.fenster_start) < schwellwert || jetzt < aktiv_bis
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_konfig(limit: u32) -> RateLimitKonfig {
        RateLimitKonfig {
            fenster: Duration::from_secs(10),
            limit_nachricht: limit,
            limit_befehl: limit,
            limit_verbindung: limit,
            drossel_dauer: Duration::from_secs(30),
        }
    }

    #[test]
    fn genau_limit_events_kommen_durch() {
        let limiter = RateLimiter::neu(test_konfig(5));
        let mut zugelassen = 0;
        for _ in 0..6 {
            if limiter.pruefen("10.0.0.1", Kategorie::Nachricht) {
                zugelassen += 1;
            }
        }
        assert_eq!(zugelassen, 5, "Genau `limit` Events duerfen durch");
    }

    #[test]
    fn nach_ueberschreitung_bleibt_gedrosselt() {
        let limiter = RateLimiter::neu(test_konfig(2));
        assert!(limiter.pruefen("10.0.0.1", Kategorie::Nachricht));
        assert!(limiter.pruefen("10.0.0.1", Kategorie::Nachricht));
        assert!(!limiter.pruefen("10.0.0.1", Kategorie::Nachricht));
        // Auch weitere Events innerhalb der Drossel-Dauer werden verworfen
        assert!(!limiter.pruefen("10.0.0.1", Kategorie::Nachricht));
        assert!(!limiter.pruefen("10.0.0.1", Kategorie::Nachricht));
    }

    #[test]
    fn drossel_laeuft_ab() {
        let limiter = RateLimiter::neu(RateLimitKonfig {
            fenster: Duration::from_secs(10),
            limit_nachricht: 1,
            drossel_dauer: Duration::from_secs(30),
            ..test_konfig(1)
        });
        let start = Instant::now();
        assert!(limiter.pruefen_zum_zeitpunkt("a", Kategorie::Nachricht, start));
        assert!(!limiter.pruefen_zum_zeitpunkt("a", Kategorie::Nachricht, start));

        // Nach Ablauf der Drossel-Dauer ist die Adresse wieder frei
        let spaeter = start + Duration::from_secs(31);
        assert!(limiter.pruefen_zum_zeitpunkt("a", Kategorie::Nachricht, spaeter));
    }

    #[test]
    fn fenster_reset_nach_ablauf() {
        let limiter = RateLimiter::neu(test_konfig(3));
        let start = Instant::now();
        for _ in 0..3 {
            assert!(limiter.pruefen_zum_zeitpunkt("a", Kategorie::Befehl, start));
        }
        // Neues Fenster: Zaehler beginnt von vorn
        let spaeter = start + Duration::from_secs(11);
        assert!(limiter.pruefen_zum_zeitpunkt("a", Kategorie::Befehl, spaeter));
    }

    #[test]
    fn kategorien_unabhaengig() {
        let limiter = RateLimiter::neu(test_konfig(1));
        assert!(limiter.pruefen("a", Kategorie::Nachricht));
        assert!(!limiter.pruefen("a", Kategorie::Nachricht));
        // Befehls-Kategorie ist davon unberuehrt
        assert!(limiter.pruefen("a", Kategorie::Befehl));
    }

    #[test]
    fn adressen_unabhaengig() {
        let limiter = RateLimiter::neu(test_konfig(1));
        assert!(limiter.pruefen("192.168.1.1", Kategorie::Nachricht));
        assert!(!limiter.pruefen("192.168.1.1", Kategorie::Nachricht));
        assert!(limiter.pruefen("192.168.1.2", Kategorie::Nachricht));
    }

    #[test]
    fn verbindungs_verstoesse_werden_gezaehlt() {
        let limiter = RateLimiter::neu(test_konfig(1));
        assert_eq!(limiter.verbindungs_verstoesse("a"), 0);
        assert!(limiter.pruefen("a", Kategorie::Verbindung));
        assert!(!limiter.pruefen("a", Kategorie::Verbindung));
        assert_eq!(limiter.verbindungs_verstoesse("a"), 1);

        limiter.verstoesse_zuruecksetzen("a");
        assert_eq!(limiter.verbindungs_verstoesse("a"), 0);
    }

    #[test]
    fn nachrichten_verstoesse_zaehlen_nicht_als_ban_kandidat() {
        let limiter = RateLimiter::neu(test_konfig(1));
        assert!(limiter.pruefen("a", Kategorie::Nachricht));
        assert!(!limiter.pruefen("a", Kategorie::Nachricht));
        assert_eq!(limiter.verbindungs_verstoesse("a"), 0);
    }
}
