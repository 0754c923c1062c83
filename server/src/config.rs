//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Raum-, Namens- und Chat-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Missbrauchs-Schutz (Rate-Limits, Bans, Alt-Limit, Flood)
    pub guard: GuardEinstellungen,
    /// Passphrasen und Erhebungs-Secret
    pub auth: AuthEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Raum-, Namens- und Chat-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Name des nie geloeschten Standard-Raums
    pub standard_raum: String,
    /// Ersatzname fuer ungueltige Login-Namen
    pub standard_name: String,
    /// Maximale Namenslaenge
    pub namens_limit: usize,
    /// Slowmode-Dauer in Millisekunden
    pub slowmode_ms: u64,
    /// Umfrage-Laufzeit in Sekunden
    pub umfrage_dauer_sek: u64,
    /// Muenzen pro `work`
    pub arbeitslohn: i64,
    /// `work`-Cooldown in Sekunden
    pub arbeits_pause_sek: u64,
    /// Nicht-privilegierte Farbpalette
    pub farben: Vec<String>,
    /// Verbotene Substrings fuer Namen und Texte
    pub blacklist: Vec<String>,
    /// Erlaubte Hosts fuer Bild-URLs als Farbe
    pub bild_host_whitelist: Vec<String>,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            standard_raum: "default".into(),
            standard_name: "Anonymous".into(),
            namens_limit: 32,
            slowmode_ms: 1500,
            umfrage_dauer_sek: 5 * 60,
            arbeitslohn: 25,
            arbeits_pause_sek: 60,
            farben: ["purple", "red", "blue", "green", "brown", "black", "pink"]
                .map(String::from)
                .to_vec(),
            blacklist: vec![],
            bild_host_whitelist: vec![],
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer beide Kanaele
    pub bind_adresse: String,
    /// Port des Chat-/Befehls-Kanals
    pub chat_port: u16,
    /// Port des Voice-Signalisierungs-Kanals
    pub voice_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            chat_port: 9400,
            voice_port: 9401,
        }
    }
}

/// Missbrauchs-Schutz-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardEinstellungen {
    /// Fensterlaenge der Rate-Limits in Sekunden
    pub fenster_sek: u64,
    /// Maximale Nachrichten pro Fenster
    pub limit_nachricht: u32,
    /// Maximale Befehle pro Fenster
    pub limit_befehl: u32,
    /// Maximale Verbindungsversuche pro Fenster
    pub limit_verbindung: u32,
    /// Drossel-Dauer nach Limit-Ueberschreitung in Sekunden
    pub drossel_dauer_sek: u64,
    /// Standard-Dauer temporaerer Bans in Sekunden
    pub ban_dauer_sek: u64,
    /// Maximale gleichzeitige Verbindungen pro Adresse
    pub alt_limit: u32,
    /// Verbindungs-Verstoesse bis zum automatischen Ban
    pub ban_schwelle: u32,
    /// Flood-Signaturen (Substring-Heuristik)
    pub flood_signaturen: Vec<String>,
}

impl Default for GuardEinstellungen {
    fn default() -> Self {
        Self {
            fenster_sek: 10,
            limit_nachricht: 20,
            limit_befehl: 10,
            limit_verbindung: 5,
            drossel_dauer_sek: 30,
            ban_dauer_sek: 24 * 60 * 60,
            alt_limit: 3,
            ban_schwelle: 3,
            flood_signaturen: vec![],
        }
    }
}

/// Passphrasen und Erhebungs-Secret
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthEinstellungen {
    /// Argon2-Hash der King-Passphrase (leer = deaktiviert)
    pub king_passphrase_hash: Option<String>,
    /// Argon2-Hash der Pope-Passphrase (leer = deaktiviert)
    pub pope_passphrase_hash: Option<String>,
    /// HMAC-Secret fuer Erhebungs-Tokens
    pub erhebungs_secret: String,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse des Chat-Kanals zurueck
    pub fn chat_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.chat_port)
    }

    /// Gibt die vollstaendige Bind-Adresse des Voice-Kanals zurueck
    pub fn voice_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.voice_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.standard_raum, "default");
        assert_eq!(cfg.netzwerk.chat_port, 9400);
        assert_eq!(cfg.guard.limit_nachricht, 20);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adressen() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.chat_bind_adresse(), "0.0.0.0:9400");
        assert_eq!(cfg.voice_bind_adresse(), "0.0.0.0:9401");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            standard_raum = "treffpunkt"
            namens_limit = 16

            [netzwerk]
            chat_port = 10000

            [guard]
            alt_limit = 1
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.standard_raum, "treffpunkt");
        assert_eq!(cfg.server.namens_limit, 16);
        assert_eq!(cfg.netzwerk.chat_port, 10000);
        assert_eq!(cfg.guard.alt_limit, 1);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.voice_port, 9401);
        assert_eq!(cfg.server.standard_name, "Anonymous");
    }

    #[test]
    fn leere_auth_sektion_deaktiviert_passphrasen() {
        let cfg = ServerConfig::default();
        assert!(cfg.auth.king_passphrase_hash.is_none());
        assert!(cfg.auth.pope_passphrase_hash.is_none());
    }
}
