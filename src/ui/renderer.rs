//! Periodic redraw of the status table

use super::terminal::TerminalRenderer;
use crate::downloader::BatchContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Suspend/resume switch for the renderer
///
/// Both operations return immediately and are idempotent: they report whether
/// the state actually changed. Clones control the same renderer.
#[derive(Clone, Debug)]
pub struct RenderControl {
    suspended: Arc<watch::Sender<bool>>,
}

impl Default for RenderControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderControl {
    /// A control in the running state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            suspended: Arc::new(tx),
        }
    }

    /// Pause redraws, e.g. while an interactive prompt owns the terminal
    pub fn suspend(&self) -> bool {
        self.set(true)
    }

    /// Continue redraws
    pub fn resume(&self) -> bool {
        self.set(false)
    }

    /// Whether redraws are paused
    pub fn is_suspended(&self) -> bool {
        *self.suspended.borrow()
    }

    fn set(&self, value: bool) -> bool {
        self.suspended.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.suspended.subscribe()
    }
}

/// Spawns the redraw task
pub struct ProgressRenderer;

impl ProgressRenderer {
    /// Redraw `ctx` on `terminal` every `interval` until the handle is finished
    pub fn spawn<T>(
        ctx: Arc<BatchContext>,
        mut terminal: T,
        control: RenderControl,
        interval: Duration,
    ) -> RendererHandle
    where
        T: TerminalRenderer + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let mut suspended = control.subscribe();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            if *suspended.borrow_and_update() {
                if let Err(e) = terminal.suspend() {
                    tracing::debug!(error = %e, "Terminal suspend failed");
                }
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = suspended.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let result = if *suspended.borrow_and_update() {
                            terminal.suspend()
                        } else {
                            terminal.resume()
                        };
                        if let Err(e) = result {
                            tracing::debug!(error = %e, "Terminal suspend/resume failed");
                        }
                    }
                    _ = ticker.tick() => {
                        if !*suspended.borrow() {
                            draw_frame(&ctx, &mut terminal).await;
                        }
                    }
                }
            }

            // Final frame so the table reflects every terminal state
            if !*suspended.borrow() {
                draw_frame(&ctx, &mut terminal).await;
            }
            // Keep the control alive for the task's lifetime
            drop(control);
        });

        RendererHandle { cancel, task }
    }
}

async fn draw_frame<T: TerminalRenderer>(ctx: &BatchContext, terminal: &mut T) {
    let width = terminal.width();
    let lines = ctx.render_lines(width).await;
    if lines.is_empty() {
        return;
    }

    if let Err(e) = write_frame(terminal, &lines) {
        tracing::debug!(error = %e, "Progress redraw failed");
    }
}

fn write_frame<T: TerminalRenderer>(terminal: &mut T, lines: &[String]) -> std::io::Result<()> {
    terminal.begin_frame(lines.len())?;
    for line in lines {
        terminal.draw_row(line)?;
    }
    terminal.end_frame()
}

/// Running renderer
pub struct RendererHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RendererHandle {
    /// Draw a final frame and stop the task
    pub async fn finish(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Progress renderer task failed");
        }
    }
}
