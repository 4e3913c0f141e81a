//! Render lifecycle controller for a single TikZ block.
//!
//! The controller owns the block's observable [`RenderState`] and is the only
//! writer of its cached markup. Every trigger performs a fresh render: there
//! is no deduplication or cancellation, so overlapping renders all run to
//! completion and whichever settles last determines the cache.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use tikz_render::{EndpointResolver, HttpTransport, RenderClient, RenderHooks, RenderOutcome};

use crate::block::TikzBlock;

/// Whether a render request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Rendering,
}

/// Drives renders for one block and caches their results.
///
/// Cloning yields another handle to the same block and state.
pub struct RenderController<T, E> {
    client: Arc<RenderClient<T, E>>,
    block: Arc<Mutex<TikzBlock>>,
    state: Arc<watch::Sender<RenderState>>,
    in_flight: Arc<AtomicUsize>,
    triggered: Arc<AtomicU64>,
    view: Arc<dyn RenderHooks>,
}

impl<T, E> Clone for RenderController<T, E> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            block: Arc::clone(&self.block),
            state: Arc::clone(&self.state),
            in_flight: Arc::clone(&self.in_flight),
            triggered: Arc::clone(&self.triggered),
            view: Arc::clone(&self.view),
        }
    }
}

impl<T: HttpTransport, E: EndpointResolver> RenderController<T, E> {
    /// Create a controller for `block`, rendering through `client`.
    pub fn new(block: TikzBlock, client: Arc<RenderClient<T, E>>) -> Self {
        let (state, _) = watch::channel(RenderState::Idle);
        Self {
            client,
            block: Arc::new(Mutex::new(block)),
            state: Arc::new(state),
            in_flight: Arc::new(AtomicUsize::new(0)),
            triggered: Arc::new(AtomicU64::new(0)),
            view: Arc::new(()),
        }
    }

    /// Attach presentation hooks, fired around each render request.
    #[must_use]
    pub fn with_view(mut self, view: Arc<dyn RenderHooks>) -> Self {
        self.view = view;
        self
    }

    /// Snapshot of the block.
    pub fn block(&self) -> TikzBlock {
        self.lock_block().clone()
    }

    pub fn state(&self) -> RenderState {
        *self.state.borrow()
    }

    /// Watch render state transitions.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.state.subscribe()
    }

    /// Render the block's current source and cache the result.
    ///
    /// The source is captured when this is called, not when the future is
    /// first polled. Used for block creation and explicit re-render requests.
    pub fn render(&self) -> impl Future<Output = RenderOutcome> + '_ {
        let trigger = self.trigger();
        async move { self.settle(trigger).await }
    }

    /// Replace the source text and render it.
    ///
    /// The stale cache is dropped immediately, before the returned future is
    /// first polled.
    pub fn edit(&self, content: impl Into<String>) -> impl Future<Output = RenderOutcome> + '_ {
        self.lock_block().set_content(content.into());
        self.render()
    }

    fn trigger(&self) -> Trigger {
        let source = self.lock_block().source().to_owned();
        let id = self.triggered.fetch_add(1, Ordering::Relaxed) + 1;
        let in_flight = (!source.trim().is_empty()).then(|| InFlight::enter(self));
        tracing::debug!(render = id, "TikZ render triggered");
        Trigger {
            id,
            source,
            in_flight,
        }
    }

    async fn settle(&self, trigger: Trigger) -> RenderOutcome {
        let Trigger {
            id,
            source,
            in_flight,
        } = trigger;

        let outcome = self.client.render_outcome(&source, &*self.view).await;
        self.lock_block()
            .set_rendered_markup(outcome.clone().into_markup());
        drop(in_flight);

        tracing::debug!(render = id, failed = outcome.is_failure(), "TikZ render settled");
        outcome
    }

    fn lock_block(&self) -> MutexGuard<'_, TikzBlock> {
        self.block.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> RenderController<T, E>
where
    T: HttpTransport + 'static,
    E: EndpointResolver + 'static,
{
    /// Render on the tokio runtime without waiting for the result.
    pub fn spawn_render(&self) -> JoinHandle<RenderOutcome> {
        let trigger = self.trigger();
        let controller = self.clone();
        tokio::spawn(async move { controller.settle(trigger).await })
    }
}

/// A render captured at trigger time.
struct Trigger {
    id: u64,
    source: String,
    in_flight: Option<InFlight>,
}

/// Marks one request in flight; the state returns to `Idle` when the last
/// outstanding request drops its marker.
struct InFlight {
    count: Arc<AtomicUsize>,
    state: Arc<watch::Sender<RenderState>>,
}

impl InFlight {
    fn enter<T, E>(controller: &RenderController<T, E>) -> Self {
        controller.in_flight.fetch_add(1, Ordering::SeqCst);
        controller.state.send_replace(RenderState::Rendering);
        Self {
            count: Arc::clone(&controller.in_flight),
            state: Arc::clone(&controller.state),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.send_replace(RenderState::Idle);
        }
    }
}
