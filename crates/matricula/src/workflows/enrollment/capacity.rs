use serde::Serialize;

/// Occupancy derived from the enrollment rows of one section. Always read
/// inside the same critical section as the write that depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionOccupancy {
    pub seats: u32,
    pub enrolled: u32,
    pub waitlisted: u32,
}

impl SectionOccupancy {
    /// Seats still open. Saturates at zero: a section shrunk below its
    /// occupancy keeps its enrolled rows and simply admits nobody new.
    pub const fn free_seats(&self) -> u32 {
        self.seats.saturating_sub(self.enrolled)
    }

    pub const fn has_free_seat(&self) -> bool {
        self.free_seats() > 0
    }
}
