use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::SchedulingError;

/// Idle per-doctor entries are swept once the registry grows past this.
const PRUNE_THRESHOLD: usize = 1024;

/// One FIFO mutex per doctor. Work for different doctors never contends;
/// work for the same doctor is serialized and waits at most a bounded time.
#[derive(Default)]
pub struct DoctorLockRegistry {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

/// Held for the duration of a doctor's critical section; released on drop.
#[derive(Debug)]
pub struct DoctorLockGuard {
    doctor_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl DoctorLockGuard {
    pub fn doctor_id(&self) -> Uuid {
        self.doctor_id
    }
}

impl DoctorLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid, wait: Duration) -> Result<DoctorLockGuard, SchedulingError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= PRUNE_THRESHOLD {
                // Only the registry references an idle entry
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks
                .entry(doctor_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let started = Instant::now();
        match tokio::time::timeout(wait, lock.lock_owned()).await {
            Ok(guard) => {
                debug!("Acquired schedule lock for doctor {} after {:?}", doctor_id, started.elapsed());
                Ok(DoctorLockGuard {
                    doctor_id,
                    _guard: guard,
                })
            }
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                warn!("Timed out after {} ms waiting for doctor {} schedule lock", waited_ms, doctor_id);
                Err(SchedulingError::Busy { doctor_id, waited_ms })
            }
        }
    }

    pub async fn tracked_doctors(&self) -> usize {
        self.locks.lock().await.len()
    }
}
