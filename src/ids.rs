use crate::config::IdScheme;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Hands out request ids. Timestamp ids look like `1712345678.123456` and
/// are bumped by a microsecond when the clock has not advanced, so ids are
/// unique within the process.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    scheme: IdScheme,
    last_micros: Arc<AtomicU64>,
}

impl IdGenerator {
    pub fn new(scheme: IdScheme) -> Self {
        Self {
            scheme,
            last_micros: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn next_id(&self) -> String {
        match self.scheme {
            IdScheme::Timestamp => format_micros(self.next_micros()),
            IdScheme::Uuid => Uuid::new_v4().to_string(),
        }
    }

    fn next_micros(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        let mut last = self.last_micros.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

fn format_micros(micros: u64) -> String {
    format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
}
