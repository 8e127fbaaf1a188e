//! Scroll tracking for the message list
//!
//! Decides when new messages should scroll the list, when a "new messages"
//! badge is shown, and when returning to the bottom counts as reading.

/// Scroll geometry of the message list, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_height: u32,
    pub scroll_top: u32,
    pub client_height: u32,
}

impl ScrollMetrics {
    pub fn distance_from_bottom(&self) -> u32 {
        self.scroll_height
            .saturating_sub(self.scroll_top)
            .saturating_sub(self.client_height)
    }
}

/// What the list should do in response to a viewport change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportUpdate {
    pub scroll_to_bottom: bool,
    pub mark_read: bool,
}

#[derive(Debug, Clone)]
pub struct Viewport {
    threshold_px: u32,
    near_bottom: bool,
    has_new_messages: bool,
}

impl Viewport {
    pub fn new(threshold_px: u32) -> Self {
        Self {
            threshold_px,
            near_bottom: true,
            has_new_messages: false,
        }
    }

    pub fn is_near_bottom(&self) -> bool {
        self.near_bottom
    }

    /// Whether the "new messages" badge is showing
    pub fn has_new_messages(&self) -> bool {
        self.has_new_messages
    }

    /// The user scrolled; reaching the bottom with pending messages reads them
    pub fn scrolled(&mut self, metrics: ScrollMetrics) -> ViewportUpdate {
        self.near_bottom = metrics.distance_from_bottom() < self.threshold_px;
        if self.near_bottom && self.has_new_messages {
            self.has_new_messages = false;
            return ViewportUpdate {
                scroll_to_bottom: false,
                mark_read: true,
            };
        }
        ViewportUpdate::default()
    }

    /// Messages were appended to the list
    pub fn messages_appended(&mut self) -> ViewportUpdate {
        if self.near_bottom {
            self.has_new_messages = false;
            ViewportUpdate {
                scroll_to_bottom: true,
                mark_read: false,
            }
        } else {
            self.has_new_messages = true;
            ViewportUpdate::default()
        }
    }

    /// The user asked to jump to the latest message
    pub fn jump_to_bottom(&mut self) -> ViewportUpdate {
        self.near_bottom = true;
        let mark_read = core::mem::take(&mut self.has_new_messages);
        ViewportUpdate {
            scroll_to_bottom: true,
            mark_read,
        }
    }

    pub(crate) fn clear_badge(&mut self) {
        self.has_new_messages = false;
    }
}
