use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for students. Identity itself (names, credentials) is
/// owned by the campus directory; the core only references the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for scheduled section offerings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(pub String);

/// Sequential identifier assigned when an enrollment row is first written.
/// Allocation order follows creation order, which keeps the waitlist
/// tie-break total even when two timestamps collide at clock resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnrollmentId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an enrollment row. `Cancelled` is terminal and doubles
/// as the deletion surrogate so audit history survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    Waitlisted,
    Cancelled,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Enrolled => "enrolled",
            EnrollmentStatus::Waitlisted => "waitlisted",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    /// Active rows count toward the one-active-row-per-pair constraint.
    pub const fn is_active(self) -> bool {
        !matches!(self, EnrollmentStatus::Cancelled)
    }
}

/// A student's relationship to a section. Rows are never physically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student: StudentId,
    pub section: SectionId,
    pub status: EnrollmentStatus,
    /// Set once at creation; defines waitlist order.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last status transition.
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn status_view(&self) -> EnrollmentStatusView {
        EnrollmentStatusView {
            enrollment_id: self.id,
            student_id: self.student.clone(),
            section_id: self.section.clone(),
            status: self.status.label(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A scheduled offering with a fixed seat count. Course/period metadata lives
/// with the catalog subsystem; only the seat count matters here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub seats: u32,
}

/// Sanitized representation of an enrollment exposed to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentStatusView {
    pub enrollment_id: EnrollmentId,
    pub student_id: StudentId,
    pub section_id: SectionId,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
