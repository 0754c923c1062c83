//! Zeitlich begrenzte Erhebungs-Tokens (rabbify)
//!
//! Ein Pope kann eine Session fuer N Minuten auf Rabbi erheben. Damit die
//! Erhebung einen Reconnect ueberlebt OHNE serverseitige Persistenz,
//! bekommt der Client ein signiertes Token ausgehaendigt: den
//! Ablaufzeitpunkt plus HMAC-SHA256 ueber diesen Zeitpunkt. Beim Login
//! legt der Client das Token vor; der Server verifiziert Signatur und
//! Restlaufzeit gegen die aktuelle Uhrzeit.
//!
//! Token-Format: `<unix_sekunden>.<base64url(hmac)>`

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// Ein erfolgreich verifiziertes Erhebungs-Token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevationToken {
    /// Ablaufzeitpunkt der Erhebung
    pub laeuft_ab_am: DateTime<Utc>,
}

impl ElevationToken {
    /// Restlaufzeit relativ zu `jetzt` (None wenn abgelaufen)
    pub fn restlaufzeit(&self, jetzt: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.laeuft_ab_am > jetzt)
            .then(|| (self.laeuft_ab_am - jetzt).to_std().unwrap_or_default())
    }
}

fn mac_berechnen(secret: &[u8], ablauf_sekunden: i64) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC akzeptiert jede Schluessellaenge");
    mac.update(ablauf_sekunden.to_string().as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Praegt ein Token fuer den gegebenen Ablaufzeitpunkt
pub fn token_praegen(secret: &[u8], laeuft_ab_am: DateTime<Utc>) -> String {
    let sekunden = laeuft_ab_am.timestamp();
    let mac = mac_berechnen(secret, sekunden);
    format!("{}.{}", sekunden, URL_SAFE_NO_PAD.encode(mac))
}

/// Verifiziert ein vom Client vorgelegtes Token.
///
/// Prueft zuerst die Signatur (konstante Zeit via `verify_slice`), dann
/// die Restlaufzeit gegen `jetzt`.
pub fn token_verifizieren(
    secret: &[u8],
    token: &str,
    jetzt: DateTime<Utc>,
) -> AuthResult<ElevationToken> {
    let (sekunden_teil, mac_teil) = token.split_once('.').ok_or(AuthError::UngueltigesToken)?;

    let sekunden: i64 = sekunden_teil
        .parse()
        .map_err(|_| AuthError::UngueltigesToken)?;
    let mac_bytes = URL_SAFE_NO_PAD
        .decode(mac_teil)
        .map_err(|_| AuthError::UngueltigesToken)?;

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC akzeptiert jede Schluessellaenge");
    mac.update(sekunden_teil.as_bytes());
    mac.verify_slice(&mac_bytes)
        .map_err(|_| AuthError::UngueltigesToken)?;

    let laeuft_ab_am = Utc
        .timestamp_opt(sekunden, 0)
        .single()
        .ok_or(AuthError::UngueltigesToken)?;

    if laeuft_ab_am <= jetzt {
        return Err(AuthError::TokenAbgelaufen);
    }

    Ok(ElevationToken { laeuft_ab_am })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-geheimnis";

    #[test]
    fn praegen_und_verifizieren() {
        let ablauf = Utc::now() + chrono::Duration::minutes(10);
        let token = token_praegen(SECRET, ablauf);

        let verifiziert =
            token_verifizieren(SECRET, &token, Utc::now()).expect("Token muss gueltig sein");
        assert_eq!(verifiziert.laeuft_ab_am.timestamp(), ablauf.timestamp());
    }

    #[test]
    fn abgelaufenes_token_wird_abgelehnt() {
        let ablauf = Utc::now() - chrono::Duration::minutes(1);
        let token = token_praegen(SECRET, ablauf);

        let fehler = token_verifizieren(SECRET, &token, Utc::now()).unwrap_err();
        assert!(matches!(fehler, AuthError::TokenAbgelaufen));
    }

    #[test]
    fn falsches_secret_wird_abgelehnt() {
        let ablauf = Utc::now() + chrono::Duration::minutes(10);
        let token = token_praegen(SECRET, ablauf);

        let fehler = token_verifizieren(b"anderes-geheimnis", &token, Utc::now()).unwrap_err();
        assert!(matches!(fehler, AuthError::UngueltigesToken));
    }

    #[test]
    fn manipulierter_ablauf_wird_abgelehnt() {
        let ablauf = Utc::now() + chrono::Duration::minutes(10);
        let token = token_praegen(SECRET, ablauf);

        // Ablaufzeitpunkt im Token nach hinten schieben
        let (_, mac) = token.split_once('.').unwrap();
        let manipuliert = format!("{}.{}", ablauf.timestamp() + 999_999, mac);

        assert!(token_verifizieren(SECRET, &manipuliert, Utc::now()).is_err());
    }

    #[test]
    fn kaputtes_format_wird_abgelehnt() {
        assert!(token_verifizieren(SECRET, "", Utc::now()).is_err());
        assert!(token_verifizieren(SECRET, "ohne-punkt", Utc::now()).is_err());
        assert!(token_verifizieren(SECRET, "abc.def", Utc::now()).is_err());
    }

    #[test]
    fn restlaufzeit_berechnung() {
        let jetzt = Utc::now();
        let token = ElevationToken {
            laeuft_ab_am: jetzt + chrono::Duration::minutes(5),
        };
        let rest = token.restlaufzeit(jetzt).expect("Restlaufzeit erwartet");
        assert!(rest.as_secs() >= 299 && rest.as_secs() <= 300);

        let abgelaufen = ElevationToken {
            laeuft_ab_am: jetzt - chrono::Duration::seconds(1),
        };
        assert!(abgelaufen.restlaufzeit(jetzt).is_none());
    }
}
