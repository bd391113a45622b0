use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::RegistrationConfig;
use crate::workflows::enrollment::domain::{
    Enrollment, EnrollmentId, EnrollmentStatus, Section, SectionId, StudentId,
};
use crate::workflows::enrollment::router::enrollment_router;
use crate::workflows::enrollment::service::EnrollmentService;

pub(super) use crate::workflows::enrollment::store::{
    EnrollmentStore, MemoryEnrollmentStore, NotifyError, PromotionNotice, PromotionNotifier,
    StatusWrite, StoreError,
};

pub(super) fn registration_config() -> RegistrationConfig {
    RegistrationConfig {
        max_section_seats: 200,
    }
}

pub(super) fn section_id(raw: &str) -> SectionId {
    SectionId(raw.to_string())
}

pub(super) fn student(raw: &str) -> StudentId {
    StudentId(raw.to_string())
}

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Row constructor for the pure policy/engine tests, with an explicit
/// creation offset so ordering scenarios are deterministic.
pub(super) fn waitlisted_row(id: u64, student_ref: &str, offset_secs: i64) -> Enrollment {
    row_with_status(id, student_ref, offset_secs, EnrollmentStatus::Waitlisted)
}

pub(super) fn row_with_status(
    id: u64,
    student_ref: &str,
    offset_secs: i64,
    status: EnrollmentStatus,
) -> Enrollment {
    let created_at = base_time() + Duration::seconds(offset_secs);
    Enrollment {
        id: EnrollmentId(id),
        student: student(student_ref),
        section: section_id("CS-101-A"),
        status,
        created_at,
        updated_at: created_at,
    }
}

pub(super) fn build_service() -> (
    EnrollmentService<MemoryEnrollmentStore, RecordingNotifier>,
    Arc<MemoryEnrollmentStore>,
    Arc<RecordingNotifier>,
) {
    let store = Arc::new(MemoryEnrollmentStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = EnrollmentService::new(store.clone(), notifier.clone(), registration_config());
    (service, store, notifier)
}

/// Service with one open section, which is what most scenarios need.
pub(super) fn service_with_section(
    seats: u32,
) -> (
    EnrollmentService<MemoryEnrollmentStore, RecordingNotifier>,
    Arc<MemoryEnrollmentStore>,
    Arc<RecordingNotifier>,
    SectionId,
) {
    let (service, store, notifier) = build_service();
    let id = section_id("CS-101-A");
    service
        .open_section(id.clone(), seats)
        .expect("section opens");
    (service, store, notifier, id)
}

pub(super) fn router_with_section(seats: u32) -> axum::Router {
    let (service, _, _, _) = service_with_section(seats);
    enrollment_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    notices: Arc<Mutex<Vec<PromotionNotice>>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<PromotionNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl PromotionNotifier for RecordingNotifier {
    fn notify(&self, notice: PromotionNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

/// Notifier whose transport is down, for the fire-and-forget contract.
pub(super) struct FailingNotifier;

impl PromotionNotifier for FailingNotifier {
    fn notify(&self, _notice: PromotionNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay offline".to_string()))
    }
}

/// Store whose commit fails, leaving reads intact, for rollback scenarios.
pub(super) struct CommitFailStore {
    pub(super) inner: MemoryEnrollmentStore,
}

impl EnrollmentStore for CommitFailStore {
    fn put_section(&self, section: Section) -> Result<(), StoreError> {
        self.inner.put_section(section)
    }

    fn section(&self, id: &SectionId) -> Result<Option<Section>, StoreError> {
        self.inner.section(id)
    }

    fn set_seats(&self, id: &SectionId, seats: u32) -> Result<Section, StoreError> {
        self.inner.set_seats(id, seats)
    }

    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, StoreError> {
        self.inner.insert(enrollment)
    }

    fn find_active(
        &self,
        student: &StudentId,
        section: &SectionId,
    ) -> Result<Option<Enrollment>, StoreError> {
        self.inner.find_active(student, section)
    }

    fn enrolled_count(&self, section: &SectionId) -> Result<u32, StoreError> {
        self.inner.enrolled_count(section)
    }

    fn waitlisted(&self, section: &SectionId) -> Result<Vec<Enrollment>, StoreError> {
        self.inner.waitlisted(section)
    }

    fn apply(&self, _writes: &[StatusWrite]) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("commit failed".to_string()))
    }
}
