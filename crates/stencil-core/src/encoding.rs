/*
 * encoding.rs
 * Copyright (c) 2026 Stencil Contributors
 */

//! Output encoding strategies.
//!
//! Values written into a template through `write` pass through the
//! configured [`TextEncoding`] before landing in the output buffer;
//! literal markup written through `write_literal` bypasses it.

/// Strategy for encoding dynamic values before they reach the output.
pub trait TextEncoding: Send + Sync {
    /// Encode a raw string for safe inclusion in the output.
    fn encode(&self, raw: &str) -> String;

    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;
}

/// HTML entity encoding. The default for rendered output.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTextEncoding;

impl TextEncoding for HtmlTextEncoding {
    fn encode(&self, raw: &str) -> String {
        escape_html(raw)
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

/// Pass-through encoding for non-HTML output.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTextEncoding;

impl TextEncoding for RawTextEncoding {
    fn encode(&self, raw: &str) -> String {
        raw.to_string()
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}
