//! Write-side digest tee.

use std::io::{self, Write};

use sha2::{Digest, Sha256};

/// Forwards every byte to the inner writer while feeding a SHA-256
/// hasher, so the digest covers exactly the bytes that reached the
/// destination. Sitting under the gzip encoder, it authenticates the
/// compressed artifact that ships, not its logical contents.
pub struct DigestWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Tear down into the destination writer and the hex-encoded digest.
    pub fn into_parts(self) -> (W, String) {
        (self.inner, hex::encode(self.hasher.finalize()))
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        // Only bytes the destination accepted count towards the digest.
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
