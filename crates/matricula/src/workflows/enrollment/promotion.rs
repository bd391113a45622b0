use super::capacity::SectionOccupancy;
use super::domain::Enrollment;
use super::waitlist;

/// One promotion attempt for one freed seat.
///
/// Re-checks the occupancy it is handed before selecting anyone: a batch of
/// freed seats, or a section shrunk below its former size, may already have
/// satisfied capacity. An empty waitlist leaves the seat open; that is a
/// normal outcome, not an error. Callers wanting to fill several seats invoke
/// this once per seat with refreshed occupancy.
pub fn promote_for_seat<'a>(
    occupancy: SectionOccupancy,
    rows: &'a [Enrollment],
) -> Option<&'a Enrollment> {
    if !occupancy.has_free_seat() {
        return None;
    }
    waitlist::next_candidate(rows)
}
