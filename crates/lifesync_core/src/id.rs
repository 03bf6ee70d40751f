//! Entity id generation strategies.
//!
//! # Responsibility
//! - Provide a pluggable id source for every entity created by core.
//! - Prefer random UUIDs and degrade to time + pseudo-random ids when the OS
//!   random source is unavailable.
//!
//! # Invariants
//! - `IdGenerator::next_id` never fails and never panics.
//! - Fallback ids combine wall-clock millis, a per-generator counter and a
//!   random fragment, so collisions within one session need a counter wrap in
//!   the same millisecond plus a 32-bit fragment match.

use log::warn;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Source of fresh entity ids.
pub trait IdGenerator {
    fn next_id(&self) -> String;
}

/// Strong id source is unavailable.
#[derive(Debug)]
pub struct IdSourceUnavailable(rand::Error);

impl Display for IdSourceUnavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "secure random source unavailable: {}", self.0)
    }
}

impl Error for IdSourceUnavailable {}

/// UUID v4 ids from the operating system random source.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUuidIds;

impl RandomUuidIds {
    /// Returns a hyphenated UUID v4, or an error when OS randomness fails.
    pub fn try_next_id(&self) -> Result<String, IdSourceUnavailable> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(IdSourceUnavailable)?;
        Ok(uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .hyphenated()
            .to_string())
    }
}

/// Time-based ids with a pseudo-random fragment; never touches OS randomness.
#[derive(Debug)]
pub struct TimestampIds {
    counter: AtomicU64,
    rng: Mutex<StdRng>,
}

impl TimestampIds {
    pub fn new() -> Self {
        let nanos = epoch_nanos();
        let seed = (nanos as u64) ^ (u64::from(std::process::id()) << 32);
        Self {
            counter: AtomicU64::new(0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for TimestampIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for TimestampIds {
    fn next_id(&self) -> String {
        let millis = epoch_nanos() / 1_000_000;
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) & 0xffff;
        let fragment: u32 = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .gen();
        format!("{millis:x}-{sequence:04x}-{fragment:08x}")
    }
}

/// Default strategy: random UUIDs with a logged, sticky fallback.
#[derive(Debug, Default)]
pub struct FallbackIds {
    primary: RandomUuidIds,
    fallback: TimestampIds,
    degraded: AtomicBool,
}

impl FallbackIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the generator has switched to fallback ids.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

impl IdGenerator for FallbackIds {
    fn next_id(&self) -> String {
        if !self.is_degraded() {
            match self.primary.try_next_id() {
                Ok(id) => return id,
                Err(err) => {
                    warn!(
                        "event=id_source_degraded module=id status=fallback error={}",
                        err
                    );
                    self.degraded.store(true, Ordering::Relaxed);
                }
            }
        }
        self.fallback.next_id()
    }
}

/// Deterministic ids (`<prefix>-1`, `<prefix>-2`, ...) for tests and fixtures.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{value}", self.prefix)
    }
}

/// Returns the default id strategy used by services.
pub fn default_id_generator() -> Box<dyn IdGenerator + Send> {
    Box::new(FallbackIds::new())
}

/// Whether `id` parses as a UUID. Informational only; ids are opaque.
pub fn is_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

fn epoch_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
}
