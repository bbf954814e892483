use uuid::Uuid;

use crate::app::{AppContext, Result, RibbonError};
use crate::gateway::AuthEvent;
use crate::session::SessionController;

pub async fn login(ctx: &AppContext) -> Result<()> {
    let mut controller = ctx.controller();
    controller.initialize().await;

    if let Some(user) = controller.identity() {
        println!("Already signed in as {}", user);
        return Ok(());
    }

    println!("Opening your browser to sign in...");
    controller.sign_in();

    loop {
        match controller.next_auth_event().await {
            Some(AuthEvent::SignedIn(session)) => {
                let who = session.user.email.unwrap_or_else(|| session.user.id.to_string());
                println!("Signed in as {}", who);
                return Ok(());
            }
            Some(_) => continue,
            None => {
                return Err(RibbonError::AuthInitiation(
                    "sign-in was not completed".into(),
                ))
            }
        }
    }
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    let mut controller = ctx.controller();
    controller.initialize().await;

    if !controller.is_signed_in() {
        println!("Not signed in");
        return Ok(());
    }

    controller.sign_out().await;
    println!("Signed out");
    Ok(())
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let controller = signed_in_controller(ctx).await?;

    if controller.bookmarks().is_empty() {
        println!("No bookmarks yet.");
        return Ok(());
    }

    for bookmark in controller.bookmarks() {
        println!(
            "{}  {}  {}  ({})",
            bookmark.id,
            bookmark.created_at.format("%Y-%m-%d %H:%M"),
            bookmark.display_title(),
            bookmark.url
        );
    }
    Ok(())
}

pub async fn add(ctx: &AppContext, title: &str, url: &str) -> Result<()> {
    if title.trim().is_empty() || url.trim().is_empty() {
        return Err(RibbonError::Other("title and url must not be empty".into()));
    }

    let mut controller = signed_in_controller(ctx).await?;
    let before = controller.bookmarks().len();
    controller.add_bookmark(title, url).await;

    if controller.bookmarks().len() > before {
        println!("Added: {}", title);
    } else {
        println!("Bookmark was not added; see the log for details");
    }
    Ok(())
}

pub async fn remove(ctx: &AppContext, id: Uuid) -> Result<()> {
    let mut controller = signed_in_controller(ctx).await?;

    if !controller.bookmarks().iter().any(|b| b.id == id) {
        return Err(RibbonError::Other(format!("no bookmark with id {}", id)));
    }

    controller.remove_bookmark(id).await;
    println!("Removed {}", id);
    Ok(())
}

pub async fn status(ctx: &AppContext) -> Result<()> {
    let mut controller = ctx.controller();
    controller.initialize().await;

    match controller.identity() {
        Some(user) => println!(
            "Signed in as {} ({} bookmarks)",
            user,
            controller.bookmarks().len()
        ),
        None => println!("Not signed in"),
    }
    Ok(())
}

/// Initialize a controller and require an authenticated session.
async fn signed_in_controller(ctx: &AppContext) -> Result<SessionController> {
    let mut controller = ctx.controller();
    controller.initialize().await;

    if !controller.is_signed_in() {
        return Err(RibbonError::NotSignedIn);
    }
    Ok(controller)
}
