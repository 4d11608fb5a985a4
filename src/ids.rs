use chrono::Utc;

/// Allocates the human-facing student identifier for a single-entry
/// submission.
pub trait IdAllocator {
    fn student_id(&self, year: u32) -> String;
}

/// `Y{year}_{unix millis}`; not checked for uniqueness.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampIds;

impl IdAllocator for TimestampIds {
    fn student_id(&self, year: u32) -> String {
        format!("Y{}_{}", year, Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
pub struct SequentialIds(std::sync::atomic::AtomicU64);

#[cfg(test)]
impl SequentialIds {
    pub fn starting_at(first: u64) -> Self {
        Self(std::sync::atomic::AtomicU64::new(first))
    }
}

#[cfg(test)]
impl IdAllocator for SequentialIds {
    fn student_id(&self, year: u32) -> String {
        let next = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("Y{year}_{next}")
    }
}
