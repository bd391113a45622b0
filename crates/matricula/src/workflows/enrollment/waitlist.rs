use super::domain::{Enrollment, EnrollmentStatus};

/// Earliest-created waitlisted row, ties broken by enrollment id ascending.
/// Ids are allocated in creation order, so the order stays total when clock
/// resolution collapses two timestamps. Pure over the rows it is given.
pub fn next_candidate(rows: &[Enrollment]) -> Option<&Enrollment> {
    rows.iter()
        .filter(|row| row.status == EnrollmentStatus::Waitlisted)
        .min_by_key(|row| (row.created_at, row.id))
}
