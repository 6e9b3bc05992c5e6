//! Host clipboard seam
//!
//! The copy action only counts as used once the host clipboard accepted the
//! text, so the write sits behind a trait the embedder implements.

use crate::errors::Result;

#[cfg_attr(test, mockall::automock)]
pub trait Clipboard: Send + Sync {
    /// Place `text` on the host clipboard
    fn set_text(&self, text: &str) -> Result<()>;
}

/// Accepts every write without doing anything; for headless embedders
pub struct NoopClipboard;

impl Clipboard for NoopClipboard {
    fn set_text(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}
