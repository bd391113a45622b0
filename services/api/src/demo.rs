use std::sync::Arc;

use clap::Args;

use crate::infra::RecordingNotifier;
use matricula::config::RegistrationConfig;
use matricula::error::AppError;
use matricula::workflows::enrollment::{
    EnrollmentService, EnrollmentStatus, MemoryEnrollmentStore, SectionId, StudentId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Seat count for the demo section
    #[arg(long, default_value_t = 2)]
    pub(crate) seats: u32,
    /// Number of students pushed through intake
    #[arg(long, default_value_t = 5)]
    pub(crate) students: u32,
}

/// Walks one section through intake, a cancellation, and a capacity raise,
/// printing every status change and the notices that would go out by mail.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { seats, students } = args;

    println!("Section registration demo");
    println!("Section MATH-101-A with {seats} seats, {students} students arriving");

    let store = Arc::new(MemoryEnrollmentStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = EnrollmentService::new(store, notifier.clone(), RegistrationConfig::default());

    let section = SectionId("MATH-101-A".to_string());
    if let Err(err) = service.open_section(section.clone(), seats) {
        println!("  Could not open section: {err}");
        return Ok(());
    }

    let mut first_holder = None;
    for n in 1..=students {
        let student = StudentId(format!("s-{n:03}"));
        match service.enroll(student.clone(), section.clone()) {
            Ok(row) => {
                if row.status == EnrollmentStatus::Enrolled && first_holder.is_none() {
                    first_holder = Some(student.clone());
                }
                println!("- {student} -> {}", row.status.label());
            }
            Err(err) => println!("- {student} rejected: {err}"),
        }
    }

    if let Some(holder) = first_holder {
        println!("\n{holder} cancels their seat");
        match service.cancel(&holder, &section) {
            Ok(outcome) => match outcome.promoted {
                Some(row) => println!("- freed seat goes to {} ({})", row.student, row.status.label()),
                None => println!("- seat stays open, waitlist is empty"),
            },
            Err(err) => println!("- cancellation failed: {err}"),
        }
    }

    let raised = seats + 1;
    println!("\nRegistrar raises the section to {raised} seats");
    match service.resize_section(&section, raised) {
        Ok(change) => {
            if change.promoted.is_empty() {
                println!("- no one waiting, seats stay open");
            }
            for row in &change.promoted {
                println!("- {} promoted into the new seat", row.student);
            }
        }
        Err(err) => println!("- resize failed: {err}"),
    }

    match service.roster(&section) {
        Ok(roster) => {
            println!(
                "\nFinal occupancy: {}/{} seats, {} waitlisted",
                roster.occupancy.enrolled, roster.occupancy.seats, roster.occupancy.waitlisted
            );
            for view in &roster.waitlist {
                println!("- waiting: {}", view.student_id);
            }
        }
        Err(err) => println!("\nRoster unavailable: {err}"),
    }

    let notices = notifier.notices();
    if notices.is_empty() {
        println!("\nPromotion notices: none dispatched");
    } else {
        println!("\nPromotion notices");
        for notice in notices {
            println!("- {} gets a seat in {}", notice.student_id, notice.section_id);
        }
    }

    Ok(())
}
