//! The PDF critical section (`Lp`), the correctness-critical piece of the
//! whole engine.
//!
//! The target site opens PDFs in a new tab belonging to the shared
//! browser context. Any listener that "awaits the next new tab in context
//! C" cannot tell its own click from a sibling worker's — two workers
//! clicking Create-PDF near-simultaneously can have worker A awaiting the
//! popup that is actually worker B's document, producing a swapped file.
//!
//! `PdfLock` serializes the whole sub-sequence — arm popup listener,
//! click, receive popup, download, close popup, quiescence delay, verify
//! no stray popups remain — behind one process-wide mutex, released only
//! after verification succeeds. Navigation and inventory filtering happen
//! outside the lock and remain concurrent across workers.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;

/// The empirically-required minimum wait between closing the popup and
/// releasing `Lp` — the browser's internal "new page" event for the
/// just-closed tab can still be in flight after `close()` returns.
pub const DEFAULT_QUIESCENCE_DELAY: Duration = Duration::from_millis(1000);

pub struct PdfLock {
    inner: Mutex<()>,
    quiescence_delay: Duration,
}

impl PdfLock {
    #[must_use]
    pub fn new(quiescence_delay: Duration) -> Self {
        Self {
            inner: Mutex::new(()),
            quiescence_delay,
        }
    }

    /// Run the critical section: acquire `Lp`, await `download` (which is
    /// expected to arm the popup listener, click, receive the popup,
    /// fetch bytes and close the popup internally), sleep the quiescence
    /// delay, then run `verify_no_stray_popups` before releasing `Lp`.
    ///
    /// `Lp` is held across the whole sequence, including the delay and
    /// verification — releasing it only after `verify_no_stray_popups`
    /// returns is what makes the verification meaningful.
    pub async fn run<Fut, T, VerifyFn, VerifyFut>(
        &self,
        download: Fut,
        verify_no_stray_popups: VerifyFn,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
        VerifyFn: FnOnce() -> VerifyFut,
        VerifyFut: Future<Output = Result<()>>,
    {
        let _guard = self.inner.lock().await;
        let result = download.await?;
        tokio::time::sleep(self.quiescence_delay).await;
        verify_no_stray_popups().await?;
        Ok(result)
    }

    /// Run an arbitrary operation under `Lp` without the quiescence delay
    /// or popup verification — used for re-authentication (spec.md §7),
    /// the only other shared-browser-state interaction the spec requires
    /// to be serialized through the same mutex as the popup critical
    /// section.
    pub async fn run_exclusive<Fut, T>(&self, operation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.inner.lock().await;
        operation.await
    }
}
