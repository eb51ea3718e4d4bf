//! Session-wide Ctrl-C routing.
//!
//! The handler is installed once. An interrupt that arrives while a step is
//! running kills that step; one that arrives between steps (at a prompt, say)
//! runs the idle action, which by default ends the process with status 130.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Standard exit code for SIGINT
pub const EXIT_INTERRUPTED: i32 = 130;

type IdleAction = Box<dyn Fn() + Send + Sync>;

struct Inner {
    active_steps: AtomicUsize,
    generation: AtomicU64,
    notify: Notify,
    on_idle: IdleAction,
}

#[derive(Clone)]
pub struct InterruptHandler {
    inner: Arc<Inner>,
}

impl fmt::Debug for InterruptHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptHandler")
            .field("active_steps", &self.inner.active_steps.load(Ordering::SeqCst))
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .finish()
    }
}

impl InterruptHandler {
    pub fn new(on_idle: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                active_steps: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
                notify: Notify::new(),
                on_idle: Box::new(on_idle),
            }),
        }
    }

    /// Handler whose idle action exits the process.
    pub fn exit_on_idle() -> Self {
        Self::new(|| {
            tracing::info!("Interrupted outside a step, exiting");
            std::process::exit(EXIT_INTERRUPTED);
        })
    }

    /// Register for SIGINT (Ctrl-C on Windows) and spawn the listener task.
    ///
    /// Registration happens before this returns, so a signal raised right
    /// afterwards is already routed here. Must be called inside a runtime.
    pub fn install(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        let mut signals =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
        #[cfg(windows)]
        let mut signals = tokio::signal::windows::ctrl_c()?;

        let handler = self.clone();
        tokio::spawn(async move {
            while signals.recv().await.is_some() {
                handler.interrupt();
            }
        });
        tracing::debug!("Interrupt handler installed");
        Ok(())
    }

    /// Deliver one interrupt.
    pub fn interrupt(&self) {
        if self.inner.active_steps.load(Ordering::SeqCst) > 0 {
            tracing::debug!("Interrupt routed to the running step");
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.inner.notify.notify_waiters();
        } else {
            (self.inner.on_idle)();
        }
    }

    /// Mark a step as running until the returned guard is dropped.
    pub fn begin_step(&self) -> StepGuard {
        self.inner.active_steps.fetch_add(1, Ordering::SeqCst);
        StepGuard {
            handler: self.clone(),
            started_at: self.inner.generation.load(Ordering::SeqCst),
        }
    }

    pub fn is_step_running(&self) -> bool {
        self.inner.active_steps.load(Ordering::SeqCst) > 0
    }
}

/// A step in flight. Resolves [`StepGuard::interrupted`] on the next interrupt.
pub struct StepGuard {
    handler: InterruptHandler,
    started_at: u64,
}

impl StepGuard {
    pub async fn interrupted(&self) {
        let inner = &self.handler.inner;
        loop {
            let notified = inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if inner.generation.load(Ordering::SeqCst) > self.started_at {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        self.handler.inner.active_steps.fetch_sub(1, Ordering::SeqCst);
    }
}
