use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the reader
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground color for chapter text
    pub text_fg: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the book and chapter title
    pub title_color: Color,

    /// Foreground color for the active selection
    pub selection_fg: Color,

    /// Background color for the active selection
    pub selection_bg: Color,

    /// Foreground color for the gloss popup
    pub popup_fg: Color,

    /// Background color for the gloss popup
    pub popup_bg: Color,

    /// Border color for the gloss popup
    pub popup_border: Color,

    /// Color for the selected word or phrase inside the popup
    pub popup_heading: Color,

    /// Color for secondary popup lines (sentence, pronunciation)
    pub muted_fg: Color,

    /// Color for gloss errors
    pub error_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text_fg: Color::Reset,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            title_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: Color::LightBlue,
            popup_fg: Color::White,
            popup_bg: Color::Black,
            popup_border: Color::LightBlue,
            popup_heading: Color::LightYellow,
            muted_fg: Color::DarkGray,
            error_fg: Color::LightRed,
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text_fg)
    }

    /// Get the style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title_color)
            .add_modifier(Modifier::BOLD)
    }

    /// Get the style for selected text
    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    /// Get the style for the popup body
    pub fn popup_style(&self) -> Style {
        Style::default().fg(self.popup_fg).bg(self.popup_bg)
    }

    pub fn popup_border_style(&self) -> Style {
        Style::default().fg(self.popup_border).bg(self.popup_bg)
    }

    pub fn popup_heading_style(&self) -> Style {
        Style::default()
            .fg(self.popup_heading)
            .bg(self.popup_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted_fg).bg(self.popup_bg)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error_fg).bg(self.popup_bg)
    }
}
