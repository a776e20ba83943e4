/// Outgoing "chat action" (typing indicator, etc).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

/// Inline keyboard attached to a message: rows of callback buttons.
///
/// Navigation buttons (Previous/Next) share a row; result buttons get a row
/// each, so the layout is a row list rather than a flat button list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of buttons; empty rows are dropped.
    pub fn push_row(&mut self, row: Vec<InlineButton>) {
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    /// Single-button row shorthand.
    pub fn push_button(&mut self, button: InlineButton) {
        self.rows.push(vec![button]);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_edit: bool,
    pub supports_inline_keyboards: bool,
    pub max_message_len: usize,
}
