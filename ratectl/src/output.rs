//! Text or JSON output.

use serde::Serialize;

/// Where command results go.
pub struct Output {
    json: bool,
    locale: String,
}

impl Output {
    pub fn new(json: bool, locale: String) -> Self {
        Self { json, locale }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Print `value` as JSON, or run `text` to print it for humans.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }
}
