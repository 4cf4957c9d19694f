//! Async event loop over an [`EmbedRuntime`]
//!
//! One task owns the runtime. Host events are applied in receipt order and
//! the task sleeps until the runtime's next wakeup in between, so timers fire
//! without any polling.

use crate::runtime::{EmbedRuntime, HostEvent};
use blockframe_pool::{FrameHost, Millis};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Drive `runtime` until `events` closes, then hand it back
pub async fn run<H: FrameHost>(
    mut runtime: EmbedRuntime<H>,
    mut events: mpsc::UnboundedReceiver<HostEvent>,
) -> EmbedRuntime<H> {
    let origin = Instant::now();
    tracing::debug!("embed driver started");

    loop {
        let wakeup = runtime.next_wakeup();
        tokio::select! {
            biased;

            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                let now = elapsed(origin);
                runtime.advance(now);
                if let Err(err) = runtime.dispatch(event, now) {
                    tracing::warn!(error = %err, "host event rejected");
                }
            }
            () = sleep_until(origin, wakeup) => {
                runtime.advance(elapsed(origin));
            }
        }
    }

    tracing::debug!("embed driver stopped");
    runtime
}

fn elapsed(origin: Instant) -> Millis {
    Millis::new(u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX))
}

async fn sleep_until(origin: Instant, wakeup: Option<Millis>) {
    match wakeup {
        Some(at) => tokio::time::sleep_until(origin + Duration::from_millis(at.as_u64())).await,
        None => std::future::pending().await,
    }
}
