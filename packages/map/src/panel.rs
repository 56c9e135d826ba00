//! User-facing status reporting.
//!
//! Defines a [`StatusPanel`] trait that decouples what the map layers want
//! to tell the user (progress, errors, the route list) from how it is
//! shown: toast and sidebar in a browser, spinner and plain lines in a
//! terminal, or a recorder in tests.

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something worked.
    Info,
    /// Something failed but the map is still usable.
    Error,
}

/// A short transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Info or error.
    pub level: NoticeLevel,
    /// Message text, shown as-is.
    pub text: String,
}

impl Notice {
    /// An informational notice.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    /// An error notice.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// One row of the route list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteListEntry {
    /// One-based route number.
    pub number: usize,
    /// Safety score.
    pub safety_score: u8,
    /// Badge color (hex), same tier as the route line.
    pub color: &'static str,
    /// Safety label for the score tier.
    pub label: &'static str,
    /// Display distance.
    pub distance: String,
    /// Display duration.
    pub duration: String,
    /// Incidents near the route.
    pub crime_count: u32,
    /// Whether this is the backend's recommended route.
    pub is_best: bool,
    /// Whether this route is currently selected.
    pub is_selected: bool,
}

/// Where progress, notices and route summaries are shown.
pub trait StatusPanel {
    /// Shows or hides the non-blocking progress indicator.
    fn set_busy(&mut self, busy: bool);

    /// Replaces the one-line route status text (`None` clears it).
    fn set_status(&mut self, text: Option<&str>);

    /// Shows a transient notice.
    fn notify(&mut self, notice: Notice);

    /// Replaces the route list (an empty slice hides it).
    fn show_route_list(&mut self, entries: &[RouteListEntry]);

    /// Replaces the selected-route summary (`None` clears it).
    fn set_route_summary(&mut self, summary: Option<&str>);
}
