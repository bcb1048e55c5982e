use anyhow::{Context, Result};

/// System clipboard, opened on first use.
///
/// The handle is kept for the rest of the session: on X11 and Wayland the
/// copied text is only served while the owning handle is alive.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn copy(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().context("failed to open system clipboard")?);
        }
        if let Some(clipboard) = self.inner.as_mut() {
            clipboard
                .set_text(text.to_owned())
                .context("failed to copy shader source to clipboard")?;
        }
        Ok(())
    }
}
