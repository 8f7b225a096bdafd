use crate::cli::{Directory, EventArgs};
use anyhow::Result;
use gather_client::EventPage;

pub async fn run(args: EventArgs, directory: &Directory) -> Result<()> {
    let page = directory
        .event_page(&args.id, args.viewer.as_deref())
        .await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&to_json(&page))?);
    } else {
        print_page(&page);
    }

    Ok(())
}

fn to_json(page: &EventPage) -> serde_json::Value {
    serde_json::json!({
        "event": page.event,
        "going": page.going_count(),
        "full": page.is_full(),
        "average_rating": page.average_rating(),
        "reviews": page.reviews,
        "attendees": page.attendees,
        "viewer_attendance": page.viewer_attendance,
    })
}

fn print_page(page: &EventPage) {
    let event = &page.event;
    println!("{} ({})", event.title, event.id);
    println!("  When:   {}", event.start_time.format("%Y-%m-%d %H:%M UTC"));
    if let Some(location) = &event.location {
        println!("  Where:  {}", location);
    }
    match event.capacity {
        Some(capacity) => println!("  Going:  {} / {}", page.going_count(), capacity),
        None => println!("  Going:  {}", page.going_count()),
    }
    if !event.tags.is_empty() {
        println!("  Tags:   {}", event.tags.join(", "));
    }
    if let Some(attendance) = &page.viewer_attendance {
        println!("  You:    {}", attendance.status);
    }
    if !event.description.is_empty() {
        println!();
        println!("{}", event.description);
    }

    println!();
    match page.average_rating() {
        Some(rating) => println!("Reviews ({}, avg {:.1}):", page.reviews.len(), rating),
        None => println!("No reviews yet."),
    }
    for review in &page.reviews {
        println!(
            "  {} {}  {}",
            "★".repeat(review.rating as usize),
            review.author_email,
            review.comment
        );
    }
}
