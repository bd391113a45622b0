use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::RegistrationConfig;

use super::capacity::SectionOccupancy;
use super::domain::{
    Enrollment, EnrollmentId, EnrollmentStatus, EnrollmentStatusView, Section, SectionId, StudentId,
};
use super::promotion;
use super::state::{self, EnrollmentEvent, TransitionError};
use super::store::{
    EnrollmentStore, PromotionNotice, PromotionNotifier, StatusWrite, StoreError,
};

/// Service composing the store, state machine, and promotion engine behind
/// per-section critical sections.
pub struct EnrollmentService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    config: RegistrationConfig,
    locks: SectionLocks,
}

static ENROLLMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_enrollment_id() -> EnrollmentId {
    EnrollmentId(ENROLLMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Registry of per-section mutexes. Every sequence that reads occupancy or
/// the waitlist head and then writes a status based on that read runs under
/// the section's mutex, so two callers can never both observe the same free
/// seat.
#[derive(Default)]
struct SectionLocks {
    handles: Mutex<HashMap<SectionId, Arc<Mutex<()>>>>,
}

impl SectionLocks {
    fn handle(&self, section: &SectionId) -> Arc<Mutex<()>> {
        let mut handles = self
            .handles
            .lock()
            .expect("section lock registry poisoned");
        handles.entry(section.clone()).or_default().clone()
    }
}

/// Result of a cancellation: the cancelled row plus the promotion performed
/// against the freed seat, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationOutcome {
    pub cancelled: Enrollment,
    pub promoted: Option<Enrollment>,
}

impl CancellationOutcome {
    pub fn view(&self) -> CancellationView {
        CancellationView {
            cancelled: self.cancelled.status_view(),
            promoted: self.promoted.as_ref().map(Enrollment::status_view),
        }
    }
}

/// Result of an administrative seat-count change.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityChange {
    pub section: Section,
    pub promoted: Vec<Enrollment>,
}

impl CapacityChange {
    pub fn view(&self) -> CapacityChangeView {
        CapacityChangeView {
            section: self.section.clone(),
            promoted: self.promoted.iter().map(Enrollment::status_view).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationView {
    pub cancelled: EnrollmentStatusView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<EnrollmentStatusView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapacityChangeView {
    pub section: Section,
    pub promoted: Vec<EnrollmentStatusView>,
}

/// Occupancy plus the ordered waitlist, for roster reads.
#[derive(Debug, Clone, Serialize)]
pub struct SectionRoster {
    pub section_id: SectionId,
    pub occupancy: SectionOccupancy,
    pub waitlist: Vec<EnrollmentStatusView>,
}

/// Error raised by the enrollment service.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("unknown section {0}")]
    UnknownSection(SectionId),
    #[error("student {student} already holds an active enrollment in section {section}")]
    DuplicateEnrollment {
        student: StudentId,
        section: SectionId,
    },
    #[error("no active enrollment for student {student} in section {section}")]
    NotFound {
        student: StudentId,
        section: SectionId,
    },
    #[error("section {section} would exceed its {seats} seats")]
    CapacityViolation { section: SectionId, seats: u32 },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S, N> EnrollmentService<S, N>
where
    S: EnrollmentStore + 'static,
    N: PromotionNotifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, config: RegistrationConfig) -> Self {
        Self {
            store,
            notifier,
            config,
            locks: SectionLocks::default(),
        }
    }

    /// Register a section and its seat count.
    pub fn open_section(&self, id: SectionId, seats: u32) -> Result<Section, EnrollmentError> {
        require_identifier("section_id", &id.0)?;
        self.check_seat_bound(seats)?;

        let handle = self.locks.handle(&id);
        let _section_guard = handle.lock().expect("section mutex poisoned");

        let section = Section {
            id: id.clone(),
            seats,
        };
        self.store.put_section(section.clone())?;
        info!(section = %id, seats, "section opened");
        Ok(section)
    }

    /// Enroll a student, admitting into a free seat or appending to the
    /// waitlist when the section is full. The capacity read and the insert
    /// share one critical section.
    pub fn enroll(
        &self,
        student: StudentId,
        section_id: SectionId,
    ) -> Result<Enrollment, EnrollmentError> {
        require_identifier("student_id", &student.0)?;
        require_identifier("section_id", &section_id.0)?;

        let handle = self.locks.handle(&section_id);
        let _section_guard = handle.lock().expect("section mutex poisoned");

        let section = self.require_section(&section_id)?;
        if self.store.find_active(&student, &section_id)?.is_some() {
            return Err(EnrollmentError::DuplicateEnrollment {
                student,
                section: section_id,
            });
        }

        let occupancy = self.occupancy_of(&section)?;
        let status = state::admission_status(occupancy);
        if status == EnrollmentStatus::Enrolled && occupancy.enrolled >= section.seats {
            // Not reachable while admissions hold the section mutex.
            error!(
                section = %section_id,
                enrolled = occupancy.enrolled,
                seats = section.seats,
                "capacity invariant violated during admission"
            );
            return Err(EnrollmentError::CapacityViolation {
                section: section_id,
                seats: section.seats,
            });
        }

        let now = Utc::now();
        let enrollment = Enrollment {
            id: next_enrollment_id(),
            student,
            section: section_id,
            status,
            created_at: now,
            updated_at: now,
        };
        let stored = self.store.insert(enrollment)?;
        info!(
            enrollment = %stored.id,
            section = %stored.section,
            status = stored.status.label(),
            "enrollment recorded"
        );
        Ok(stored)
    }

    /// Cancel the active enrollment for the pair. Freeing an occupied seat
    /// triggers exactly one promotion attempt; the cancellation and the
    /// promotion commit atomically. A waitlisted row never held a seat, so
    /// cancelling it promotes nobody.
    pub fn cancel(
        &self,
        student: &StudentId,
        section_id: &SectionId,
    ) -> Result<CancellationOutcome, EnrollmentError> {
        require_identifier("student_id", &student.0)?;
        require_identifier("section_id", &section_id.0)?;

        let handle = self.locks.handle(section_id);
        let outcome = {
            let _section_guard = handle.lock().expect("section mutex poisoned");

            let section = self.require_section(section_id)?;
            let current = self.store.find_active(student, section_id)?.ok_or_else(|| {
                EnrollmentError::NotFound {
                    student: student.clone(),
                    section: section_id.clone(),
                }
            })?;

            let now = Utc::now();
            let cancelled_status =
                state::next_status(current.id, current.status, EnrollmentEvent::Cancel)?;
            let mut writes = vec![StatusWrite {
                enrollment: current.id,
                status: cancelled_status,
                updated_at: now,
            }];

            let mut promoted = None;
            if current.status == EnrollmentStatus::Enrolled {
                let rows = self.store.waitlisted(section_id)?;
                // The freed seat is not visible in the store yet; subtract
                // the row being cancelled from the occupancy the engine sees.
                let occupancy = SectionOccupancy {
                    seats: section.seats,
                    enrolled: self.store.enrolled_count(section_id)?.saturating_sub(1),
                    waitlisted: rows.len() as u32,
                };
                if let Some(candidate) = promotion::promote_for_seat(occupancy, &rows) {
                    let promoted_status =
                        state::next_status(candidate.id, candidate.status, EnrollmentEvent::Promote)?;
                    writes.push(StatusWrite {
                        enrollment: candidate.id,
                        status: promoted_status,
                        updated_at: now,
                    });
                    let mut row = candidate.clone();
                    row.status = promoted_status;
                    row.updated_at = now;
                    promoted = Some(row);
                }
            }

            self.store.apply(&writes)?;

            let mut cancelled = current;
            cancelled.status = cancelled_status;
            cancelled.updated_at = now;
            CancellationOutcome {
                cancelled,
                promoted,
            }
        };

        info!(
            enrollment = %outcome.cancelled.id,
            section = %outcome.cancelled.section,
            promoted = outcome.promoted.is_some(),
            "enrollment cancelled"
        );
        if let Some(row) = &outcome.promoted {
            self.dispatch_notice(row);
        }
        Ok(outcome)
    }

    /// Apply a new seat count. Each newly freed seat gets one promotion
    /// attempt, in waitlist order, committed atomically with the resize.
    /// Shrinking below current occupancy leaves enrolled rows untouched and
    /// only blocks new admissions until occupancy drops.
    pub fn resize_section(
        &self,
        section_id: &SectionId,
        seats: u32,
    ) -> Result<CapacityChange, EnrollmentError> {
        require_identifier("section_id", &section_id.0)?;
        self.check_seat_bound(seats)?;

        let handle = self.locks.handle(section_id);
        let change = {
            let _section_guard = handle.lock().expect("section mutex poisoned");

            self.require_section(section_id)?;
            let section = self.store.set_seats(section_id, seats)?;

            let mut rows = self.store.waitlisted(section_id)?;
            let mut occupancy = SectionOccupancy {
                seats: section.seats,
                enrolled: self.store.enrolled_count(section_id)?,
                waitlisted: rows.len() as u32,
            };

            let now = Utc::now();
            let mut writes = Vec::new();
            let mut promoted = Vec::new();

            // One engine invocation per freed seat, until either runs out.
            loop {
                let Some(candidate) = promotion::promote_for_seat(occupancy, &rows).cloned() else {
                    break;
                };
                let promoted_status =
                    state::next_status(candidate.id, candidate.status, EnrollmentEvent::Promote)?;
                writes.push(StatusWrite {
                    enrollment: candidate.id,
                    status: promoted_status,
                    updated_at: now,
                });
                rows.retain(|row| row.id != candidate.id);
                occupancy.enrolled += 1;
                occupancy.waitlisted = occupancy.waitlisted.saturating_sub(1);

                let mut row = candidate;
                row.status = promoted_status;
                row.updated_at = now;
                promoted.push(row);
            }

            if !writes.is_empty() {
                self.store.apply(&writes)?;
            }

            CapacityChange { section, promoted }
        };

        info!(
            section = %change.section.id,
            seats,
            promotions = change.promoted.len(),
            "seat count updated"
        );
        for row in &change.promoted {
            self.dispatch_notice(row);
        }
        Ok(change)
    }

    /// Current occupancy snapshot for a section.
    pub fn occupancy(&self, section_id: &SectionId) -> Result<SectionOccupancy, EnrollmentError> {
        let handle = self.locks.handle(section_id);
        let _section_guard = handle.lock().expect("section mutex poisoned");
        let section = self.require_section(section_id)?;
        self.occupancy_of(&section)
    }

    /// Occupancy plus the ordered waitlist, for roster reads.
    pub fn roster(&self, section_id: &SectionId) -> Result<SectionRoster, EnrollmentError> {
        let handle = self.locks.handle(section_id);
        let _section_guard = handle.lock().expect("section mutex poisoned");
        let section = self.require_section(section_id)?;
        let occupancy = self.occupancy_of(&section)?;
        let waitlist = self
            .store
            .waitlisted(section_id)?
            .iter()
            .map(Enrollment::status_view)
            .collect();
        Ok(SectionRoster {
            section_id: section.id,
            occupancy,
            waitlist,
        })
    }

    /// The active enrollment for the pair, for status reads.
    pub fn status(
        &self,
        student: &StudentId,
        section_id: &SectionId,
    ) -> Result<Enrollment, EnrollmentError> {
        self.store
            .find_active(student, section_id)?
            .ok_or_else(|| EnrollmentError::NotFound {
                student: student.clone(),
                section: section_id.clone(),
            })
    }

    fn occupancy_of(&self, section: &Section) -> Result<SectionOccupancy, EnrollmentError> {
        let enrolled = self.store.enrolled_count(&section.id)?;
        let waitlisted = self.store.waitlisted(&section.id)?.len() as u32;
        Ok(SectionOccupancy {
            seats: section.seats,
            enrolled,
            waitlisted,
        })
    }

    fn require_section(&self, id: &SectionId) -> Result<Section, EnrollmentError> {
        self.store
            .section(id)?
            .ok_or_else(|| EnrollmentError::UnknownSection(id.clone()))
    }

    fn check_seat_bound(&self, seats: u32) -> Result<(), EnrollmentError> {
        if seats > self.config.max_section_seats {
            return Err(EnrollmentError::Validation {
                field: "seats",
                reason: format!(
                    "{seats} exceeds the configured maximum of {}",
                    self.config.max_section_seats
                ),
            });
        }
        Ok(())
    }

    /// Notification failures are logged and never unwind a committed
    /// promotion.
    fn dispatch_notice(&self, promoted: &Enrollment) {
        let notice = PromotionNotice {
            enrollment_id: promoted.id,
            student_id: promoted.student.clone(),
            section_id: promoted.section.clone(),
        };
        match self.notifier.notify(notice) {
            Ok(()) => info!(
                enrollment = %promoted.id,
                section = %promoted.section,
                "promotion notice dispatched"
            ),
            Err(err) => warn!(
                enrollment = %promoted.id,
                section = %promoted.section,
                %err,
                "promotion notice failed"
            ),
        }
    }
}

fn require_identifier(field: &'static str, value: &str) -> Result<(), EnrollmentError> {
    if value.trim().is_empty() {
        return Err(EnrollmentError::Validation {
            field,
            reason: "identifier must be non-empty".to_string(),
        });
    }
    Ok(())
}
