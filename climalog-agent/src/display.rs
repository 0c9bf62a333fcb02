//! Display outputs

use climalog_core::DisplaySink;

/// Writes display text to the log at info level
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    last: Option<String>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

impl DisplaySink for ConsoleDisplay {
    fn show(&mut self, message: &str) {
        log::info!("display: {}", message);
        self.last = Some(message.to_string());
    }
}
