use super::capacity::SectionOccupancy;
use super::domain::{EnrollmentId, EnrollmentStatus};

/// Events that move an enrollment between statuses. Administrative and
/// student-initiated cancellations share the `Cancel` event; they differ only
/// in who asked, which the core does not track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentEvent {
    Cancel,
    Promote,
}

/// Lifecycle violations. `Terminal` covers cancelled rows; `Illegal` covers
/// everything else, e.g. promoting a row that already holds a seat.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("enrollment {id} is cancelled and cannot change status")]
    Terminal { id: EnrollmentId },
    #[error("cannot apply {event:?} to {from:?} enrollment {id}")]
    Illegal {
        id: EnrollmentId,
        from: EnrollmentStatus,
        event: EnrollmentEvent,
    },
}

/// Status assigned at creation time, decided by the capacity read performed
/// in the same critical section as the insert.
pub fn admission_status(occupancy: SectionOccupancy) -> EnrollmentStatus {
    if occupancy.has_free_seat() {
        EnrollmentStatus::Enrolled
    } else {
        EnrollmentStatus::Waitlisted
    }
}

/// The legal transition table. Promotion is reserved for the promotion
/// engine; nothing else moves a row out of the waitlist.
pub fn next_status(
    id: EnrollmentId,
    from: EnrollmentStatus,
    event: EnrollmentEvent,
) -> Result<EnrollmentStatus, TransitionError> {
    match (from, event) {
        (EnrollmentStatus::Cancelled, _) => Err(TransitionError::Terminal { id }),
        (_, EnrollmentEvent::Cancel) => Ok(EnrollmentStatus::Cancelled),
        (EnrollmentStatus::Waitlisted, EnrollmentEvent::Promote) => Ok(EnrollmentStatus::Enrolled),
        (from, event) => Err(TransitionError::Illegal { id, from, event }),
    }
}
