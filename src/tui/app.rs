use ratatui::widgets::ListState;
use uuid::Uuid;

/// Which field of the add dialog currently receives input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddField {
    Title,
    Url,
}

impl Default for AddField {
    fn default() -> Self {
        AddField::Title
    }
}

/// In-progress add dialog state.
#[derive(Debug, Default)]
pub struct AddDialog {
    pub title: String,
    pub url: String,
    pub field: AddField,
}

/// View state for the terminal interface. Bookmark data itself lives in
/// the session controller's store; this tracks only what the screen needs.
pub struct TuiApp {
    pub selected: usize,
    pub list_state: ListState,
    pub should_quit: bool,
    pub status_message: Option<String>,
    pub add_dialog: Option<AddDialog>,
    // Pending delete confirmation (bookmark id, title)
    pub pending_delete: Option<(Uuid, String)>,
}

impl TuiApp {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            selected: 0,
            list_state,
            should_quit: false,
            status_message: None,
            add_dialog: None,
            pending_delete: None,
        }
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
        self.list_state.select(Some(self.selected));
    }

    pub fn move_down(&mut self, len: usize) {
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
        }
        self.list_state.select(Some(self.selected));
    }

    /// Keep the selection inside the list after the collection is replaced
    /// by a refresh.
    pub fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
        self.list_state.select(Some(self.selected));
    }

    pub fn open_add_dialog(&mut self) {
        self.add_dialog = Some(AddDialog::default());
        self.status_message = None;
    }

    pub fn close_add_dialog(&mut self) {
        self.add_dialog = None;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }
}

impl Default for TuiApp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_up_stops_at_top() {
        let mut app = TuiApp::new();
        app.move_up();
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_move_down_stops_at_end() {
        let mut app = TuiApp::new();
        app.move_down(3);
        app.move_down(3);
        app.move_down(3);
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn test_move_down_on_empty_list() {
        let mut app = TuiApp::new();
        app.move_down(0);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_clamp_selection_after_shrink() {
        let mut app = TuiApp::new();
        app.selected = 5;
        app.clamp_selection(2);
        assert_eq!(app.selected, 1);
        app.clamp_selection(0);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_open_add_dialog_starts_on_title() {
        let mut app = TuiApp::new();
        app.open_add_dialog();
        let dialog = app.add_dialog.as_ref().unwrap();
        assert_eq!(dialog.field, AddField::Title);
        assert!(dialog.title.is_empty());
    }
}
