use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Enrollment, EnrollmentId, EnrollmentStatus, Section, SectionId, StudentId};

/// One staged status transition. All writes handed to [`EnrollmentStore::apply`]
/// in a single call commit together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusWrite {
    pub enrollment: EnrollmentId,
    pub status: EnrollmentStatus,
    pub updated_at: DateTime<Utc>,
}

/// Storage abstraction so the service layer can be exercised in isolation.
///
/// The store offers read/write primitives only; the capacity, uniqueness, and
/// ordering invariants are enforced by callers holding the per-section
/// critical section around the read-then-write sequence.
pub trait EnrollmentStore: Send + Sync {
    fn put_section(&self, section: Section) -> Result<(), StoreError>;
    fn section(&self, id: &SectionId) -> Result<Option<Section>, StoreError>;
    /// Update a section's seat count, returning the stored section.
    fn set_seats(&self, id: &SectionId, seats: u32) -> Result<Section, StoreError>;

    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, StoreError>;
    /// The non-cancelled row for the pair, if one exists.
    fn find_active(
        &self,
        student: &StudentId,
        section: &SectionId,
    ) -> Result<Option<Enrollment>, StoreError>;
    fn enrolled_count(&self, section: &SectionId) -> Result<u32, StoreError>;
    /// Waitlisted rows for the section, ordered by `(created_at, id)`.
    fn waitlisted(&self, section: &SectionId) -> Result<Vec<Enrollment>, StoreError>;
    /// Applies every write or none of them.
    fn apply(&self, writes: &[StatusWrite]) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook invoked after a promotion commits, e.g. the mail adapter
/// that tells a student they received a seat. Fire-and-forget from the
/// core's perspective.
pub trait PromotionNotifier: Send + Sync {
    fn notify(&self, notice: PromotionNotice) -> Result<(), NotifyError>;
}

/// Payload handed to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionNotice {
    pub enrollment_id: EnrollmentId,
    pub student_id: StudentId,
    pub section_id: SectionId,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// In-memory store used by the service binary, the demo, and the tests. A
/// relational backend slots in behind the same trait; `apply` corresponds to
/// its transaction commit.
#[derive(Default, Clone)]
pub struct MemoryEnrollmentStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    sections: HashMap<SectionId, Section>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
}

impl EnrollmentStore for MemoryEnrollmentStore {
    fn put_section(&self, section: Section) -> Result<(), StoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if state.sections.contains_key(&section.id) {
            return Err(StoreError::Conflict);
        }
        state.sections.insert(section.id.clone(), section);
        Ok(())
    }

    fn section(&self, id: &SectionId) -> Result<Option<Section>, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state.sections.get(id).cloned())
    }

    fn set_seats(&self, id: &SectionId, seats: u32) -> Result<Section, StoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        let section = state.sections.get_mut(id).ok_or(StoreError::NotFound)?;
        section.seats = seats;
        Ok(section.clone())
    }

    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, StoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if state.enrollments.contains_key(&enrollment.id) {
            return Err(StoreError::Conflict);
        }
        state.enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }

    fn find_active(
        &self,
        student: &StudentId,
        section: &SectionId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        Ok(state
            .enrollments
            .values()
            .find(|row| {
                row.status.is_active() && &row.student == student && &row.section == section
            })
            .cloned())
    }

    fn enrolled_count(&self, section: &SectionId) -> Result<u32, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        let count = state
            .enrollments
            .values()
            .filter(|row| row.status == EnrollmentStatus::Enrolled && &row.section == section)
            .count();
        Ok(count as u32)
    }

    fn waitlisted(&self, section: &SectionId) -> Result<Vec<Enrollment>, StoreError> {
        let state = self.inner.lock().expect("store mutex poisoned");
        let mut rows: Vec<Enrollment> = state
            .enrollments
            .values()
            .filter(|row| row.status == EnrollmentStatus::Waitlisted && &row.section == section)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.created_at, row.id));
        Ok(rows)
    }

    fn apply(&self, writes: &[StatusWrite]) -> Result<(), StoreError> {
        let mut state = self.inner.lock().expect("store mutex poisoned");
        if writes
            .iter()
            .any(|write| !state.enrollments.contains_key(&write.enrollment))
        {
            return Err(StoreError::NotFound);
        }
        for write in writes {
            if let Some(row) = state.enrollments.get_mut(&write.enrollment) {
                row.status = write.status;
                row.updated_at = write.updated_at;
            }
        }
        Ok(())
    }
}
