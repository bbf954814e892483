pub mod app;
pub mod event;
pub mod layout;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::app::{AppContext, Result};
use crate::session::SessionController;

use self::app::{AddField, TuiApp};
use self::event::{Action, AppEvent, EventHandler};

type Tui = Terminal<CrosstermBackend<Stdout>>;

pub async fn run(ctx: Arc<AppContext>) -> Result<()> {
    let mut controller = ctx.controller();
    controller.initialize().await;

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut controller).await;
    restore_terminal(&mut terminal)?;

    controller.teardown();
    result
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(terminal: &mut Tui, controller: &mut SessionController) -> Result<()> {
    let mut tui_app = TuiApp::new();
    let event_handler = EventHandler::new(Duration::from_millis(100));

    loop {
        // Apply auth and change notifications that arrived since the last
        // iteration before drawing, so the screen never shows data that
        // belongs to a previous session.
        while let Some(signal) = controller.try_signal() {
            controller.dispatch(signal).await;
        }
        tui_app.clamp_selection(controller.bookmarks().len());

        terminal.draw(|frame| layout::render(frame, &mut tui_app, controller))?;

        match event_handler.next()? {
            AppEvent::Key(key) => {
                // Add dialog captures all keystrokes while open
                if tui_app.add_dialog.is_some() {
                    handle_add_dialog_key(&mut tui_app, controller, key).await;
                    if tui_app.should_quit {
                        break;
                    }
                    continue;
                }

                // Handle pending delete confirmation
                if let Some((id, title)) = tui_app.pending_delete.take() {
                    match key.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') => {
                            controller.remove_bookmark(id).await;
                            tui_app.clamp_selection(controller.bookmarks().len());
                            tui_app.set_status(format!("Deleted: {}", title));
                        }
                        _ => {
                            tui_app.set_status("Delete cancelled");
                        }
                    }
                    continue;
                }

                match Action::from(key) {
                    Action::Quit => {
                        tui_app.should_quit = true;
                    }
                    Action::MoveUp => {
                        tui_app.move_up();
                    }
                    Action::MoveDown => {
                        tui_app.move_down(controller.bookmarks().len());
                    }
                    Action::AddBookmark => {
                        if controller.is_signed_in() {
                            tui_app.open_add_dialog();
                        }
                    }
                    Action::DeleteBookmark => {
                        let selected = controller.bookmarks().get(tui_app.selected);
                        if let Some(bookmark) = selected {
                            tui_app.pending_delete =
                                Some((bookmark.id, bookmark.display_title().to_string()));
                        }
                    }
                    Action::OpenInBrowser => {
                        let url = controller
                            .bookmarks()
                            .get(tui_app.selected)
                            .map(|b| b.url.clone());
                        if let Some(url) = url {
                            if let Err(e) = open::that(&url) {
                                tui_app.set_status(format!("Failed to open browser: {}", e));
                            }
                        }
                    }
                    Action::Refresh => {
                        controller.refresh().await;
                        tui_app.clamp_selection(controller.bookmarks().len());
                        tui_app.set_status("Refreshed");
                    }
                    Action::SignIn => {
                        if !controller.is_signed_in() {
                            controller.sign_in();
                            tui_app.set_status("Continue sign-in in your browser...");
                        }
                    }
                    Action::SignOut => {
                        if controller.is_signed_in() {
                            controller.sign_out().await;
                            tui_app.clamp_selection(0);
                            tui_app.set_status("Signed out");
                        }
                    }
                    Action::None => {}
                }
            }
            AppEvent::Tick => {}
        }

        if tui_app.should_quit {
            break;
        }
    }

    Ok(())
}

async fn handle_add_dialog_key(
    tui_app: &mut TuiApp,
    controller: &mut SessionController,
    key: KeyEvent,
) {
    // Ctrl-C still quits while the dialog is open; it is never text input.
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        tui_app.close_add_dialog();
        tui_app.should_quit = true;
        return;
    }

    let Some(dialog) = tui_app.add_dialog.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            tui_app.close_add_dialog();
        }
        KeyCode::Enter => match dialog.field {
            AddField::Title => {
                dialog.field = AddField::Url;
            }
            AddField::Url => {
                let title = dialog.title.clone();
                let url = dialog.url.clone();
                tui_app.close_add_dialog();
                if title.trim().is_empty() || url.trim().is_empty() {
                    tui_app.set_status("Title and URL are both required");
                } else {
                    controller.add_bookmark(&title, &url).await;
                    tui_app.clamp_selection(controller.bookmarks().len());
                    tui_app.set_status(format!("Added: {}", title.trim()));
                }
            }
        },
        KeyCode::Backspace => {
            match dialog.field {
                AddField::Title => dialog.title.pop(),
                AddField::Url => dialog.url.pop(),
            };
        }
        KeyCode::Char(c) => match dialog.field {
            AddField::Title => dialog.title.push(c),
            AddField::Url => dialog.url.push(c),
        },
        _ => {}
    }
}
