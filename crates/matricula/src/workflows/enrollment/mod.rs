//! Section enrollment with capacity tracking and waitlist promotion.
//!
//! A student enrolls into a section holding a fixed number of seats; once the
//! section is full, further students join an ordered waitlist. Whenever a
//! seat frees up (cancellation or an administrative seat-count change) the
//! promotion engine moves the earliest-waiting student into the seat, with
//! the freeing write and the promotion committing atomically. All
//! read-then-act sequences for one section are serialized through a
//! per-section critical section.

pub mod capacity;
pub mod domain;
pub mod promotion;
pub mod router;
pub mod service;
pub mod state;
pub mod store;
pub mod waitlist;

#[cfg(test)]
mod tests;

pub use capacity::SectionOccupancy;
pub use domain::{
    Enrollment, EnrollmentId, EnrollmentStatus, EnrollmentStatusView, Section, SectionId,
    StudentId,
};
pub use router::enrollment_router;
pub use service::{
    CancellationOutcome, CancellationView, CapacityChange, CapacityChangeView, EnrollmentError,
    EnrollmentService, SectionRoster,
};
pub use state::{EnrollmentEvent, TransitionError};
pub use store::{
    EnrollmentStore, MemoryEnrollmentStore, NotifyError, PromotionNotice, PromotionNotifier,
    StatusWrite, StoreError,
};
