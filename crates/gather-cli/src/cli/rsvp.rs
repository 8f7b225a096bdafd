use crate::cli::{Directory, RsvpArgs};
use anyhow::Result;
use gather_client::AttendanceStatus;

pub async fn run(args: RsvpArgs, directory: &Directory) -> Result<()> {
    let status: AttendanceStatus = args.status.parse()?;
    let attendance = directory
        .rsvp(&args.event_id, &args.viewer, status)
        .await?;

    println!(
        "{} is {} for event {}",
        attendance.user_email, attendance.status, attendance.event_id
    );
    Ok(())
}
