//! Inhalts-Heuristik gegen bekannte Flood-Signaturen
//!
//! Leichtgewichtige Substring-Pruefung gegen Login-Namen und Chat-Text.
//! Ein Treffer fuehrt direkt zu einem temporaeren Ban der Adresse und
//! Zwangstrennung – unter Umgehung der normalen Drossel-Eskalation.

/// Substring-Heuristik fuer bekannte Flood-Muster
#[derive(Debug, Clone, Default)]
pub struct FloodHeuristik {
    signaturen: Vec<String>,
}

impl FloodHeuristik {
    /// Erstellt die Heuristik aus den konfigurierten Signaturen.
    ///
    /// Leere Signaturen werden verworfen – eine leere Zeile in der
    /// Konfiguration wuerde sonst jeden Text treffen.
    pub fn neu(signaturen: Vec<String>) -> Self {
        Self {
            signaturen: signaturen
                .into_iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Prueft einen Text gegen alle Signaturen (case-insensitiv)
    pub fn verdaechtig(&self, text: &str) -> bool {
        if self.signaturen.is_empty() {
            return false;
        }
        let text = text.to_lowercase();
        self.signaturen.iter().any(|s| text.contains(s))
    }

    /// Anzahl geladener Signaturen
    pub fn anzahl(&self) -> usize {
        self.signaturen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_heuristik() -> FloodHeuristik {
        FloodHeuristik::neu(vec!["spambot".into(), "free coins".into()])
    }

    #[test]
    fn treffer_auf_signatur() {
        let h = test_heuristik();
        assert!(h.verdaechtig("SPAMBOT 3000"));
        assert!(h.verdaechtig("get free coins now"));
    }

    #[test]
    fn kein_treffer_auf_normalen_text() {
        let h = test_heuristik();
        assert!(!h.verdaechtig("hallo zusammen"));
        assert!(!h.verdaechtig(""));
    }

    #[test]
    fn case_insensitiv() {
        let h = test_heuristik();
        assert!(h.verdaechtig("SpAmBoT"));
    }

    #[test]
    fn leere_signaturen_treffen_nie() {
        let h = FloodHeuristik::neu(vec!["".into(), "   x".into()]);
        assert_eq!(h.anzahl(), 1, "Leere Signatur muss verworfen werden");
        assert!(!h.verdaechtig("beliebiger text"));
    }

    #[test]
    fn ohne_signaturen_alles_erlaubt() {
        let h = FloodHeuristik::neu(vec![]);
        assert!(!h.verdaechtig("spambot"));
    }
}
