//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Laenge (u32 big-endian) + JSON-Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4
//! Laengen-Bytes). Der Codec ist generisch ueber den Nachrichtentyp, damit
//! Chat-Kanal und Signalisierungs-Kanal jeweils einen typisierten
//! `Framed`-Stream bekommen. Zu grosse Frames sind ein Dekodier-Fehler und
//! beenden die Verbindung.

use bytes::{Buf, BufMut, BytesMut};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

/// Standard-maximale Frame-Groesse (256 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 256 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

/// tokio-util Codec fuer frame-basierte TCP-Verbindungen
///
/// Implementiert `Encoder<T>` und `Decoder` fuer nahtlose Integration mit
/// `tokio_util::codec::Framed`. `T` ist der serde-Nachrichtentyp des
/// jeweiligen Kanals.
#[derive(Debug)]
pub struct FrameCodec<T> {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FrameCodec<T> {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            _marker: PhantomData,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler
    /// Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _marker: PhantomData,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl<T> Default for FrameCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FrameCodec<T> {
    fn clone(&self) -> Self {
        Self {
            max_frame_size: self.max_frame_size,
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Decoder for FrameCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen (big-endian u32) ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        // Laengen-Feld verbrauchen, Payload extrahieren
        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length);

        let message: T = serde_json::from_slice(&payload).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Deserialisierung fehlgeschlagen: {}", e),
            )
        })?;

        Ok(Some(message))
    }
}

// Encoder ist ueber den Nachrichtentyp M generisch: eine Verbindung
// dekodiert Client-Events, sendet aber Server-Events ueber denselben Codec.
impl<T, M: Serialize> Encoder<M> for FrameCodec<T> {
    type Error = io::Error;

    fn encode(&mut self, item: M, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}
