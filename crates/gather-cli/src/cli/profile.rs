use crate::cli::{Directory, ProfileArgs};
use anyhow::Result;

pub async fn run(args: ProfileArgs, directory: &Directory) -> Result<()> {
    let user = directory.profile(&args.id).await?;

    println!("{} <{}>", user.full_name, user.email);
    if let Some(bio) = &user.bio {
        println!("  {}", bio);
    }

    if args.albums {
        let albums = directory.user_albums(&args.id).await?;
        println!();
        if albums.is_empty() {
            println!("No albums.");
        }
        for album in &albums {
            match &album.event_id {
                Some(event_id) => println!(
                    "  {}  {} ({} photos, event {})",
                    album.id,
                    album.title,
                    album.photo_urls.len(),
                    event_id
                ),
                None => println!(
                    "  {}  {} ({} photos)",
                    album.id,
                    album.title,
                    album.photo_urls.len()
                ),
            }
        }
    }

    Ok(())
}
