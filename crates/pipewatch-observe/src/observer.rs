//! The change observer.
//!
//! [`ChangeObserver::attach`] hooks a [`Pipeline`] so that every node created
//! afterwards is instrumented exactly once. Instrumenting a node emits its
//! `create` event, allocates (or reuses) its handle, and installs the
//! translators from [`crate::translate`] on its fields and lists. From then
//! on every mutation of that node produces one event, inline, in order.
//!
//! # Lifecycle
//!
//! `Attached -> Finished`. [`ChangeObserver::finish`] closes the output
//! stream; the node traps stay installed, but whatever they report after
//! that point is dropped. Dropping the observer closes the stream too.

use std::cell::RefCell;
use std::rc::Rc;

use pipewatch_core::{Instrumentation, NodeId, NodeRef, Pipeline, RefList, SequenceChange};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{AttachStrategy, ObserverConfig};
use crate::error::ObserveError;
use crate::event::ChangeEvent;
use crate::registry::{Handle, IdentityRegistry};
use crate::stream::{self, EventStream};
use crate::translate;

/// State shared between the observer and every trap it installed.
pub(crate) type SharedState = Rc<RefCell<ObserverState>>;

pub(crate) struct ObserverState {
    pub(crate) registry: IdentityRegistry,
    /// `None` once finished.
    sink: Option<UnboundedSender<ChangeEvent>>,
    emitted: u64,
    dropped: u64,
}

impl ObserverState {
    fn new(sink: UnboundedSender<ChangeEvent>) -> Self {
        ObserverState {
            registry: IdentityRegistry::new(),
            sink: Some(sink),
            emitted: 0,
            dropped: 0,
        }
    }

    /// Appends `event` to the output, or drops it after finish.
    pub(crate) fn emit(&mut self, event: ChangeEvent) {
        let Some(sink) = self.sink.as_ref() else {
            self.dropped += 1;
            tracing::trace!(action = event.action(), "observer finished, event dropped");
            return;
        };
        let action = event.action();
        if sink.send(event).is_err() {
            // The consumer went away; keep going so the producer is unaffected.
            self.dropped += 1;
            tracing::trace!(action, "event stream closed by consumer, event dropped");
            return;
        }
        self.emitted += 1;
    }
}

/// Lifecycle phase of a [`ChangeObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverPhase {
    Attached,
    Finished,
}

/// Converts pipeline mutations into an ordered [`EventStream`].
pub struct ChangeObserver {
    state: SharedState,
    strategy: AttachStrategy,
}

impl ChangeObserver {
    /// Attaches to `pipeline` and returns the observer with its stream.
    ///
    /// Only nodes created after this call are observed. Fails if the
    /// pipeline's node collection already has a listener.
    pub fn attach(
        pipeline: &mut Pipeline,
        config: &ObserverConfig,
    ) -> Result<(Self, EventStream), ObserveError> {
        let (sink, events) = stream::channel();
        let state: SharedState = Rc::new(RefCell::new(ObserverState::new(sink)));

        let shared = state.clone();
        match config.strategy {
            AttachStrategy::Collection => {
                pipeline.observe_nodes(Box::new(move |change| {
                    if let SequenceChange::Add {
                        value: Some(node), ..
                    } = change
                    {
                        observe_node(&shared, node);
                    }
                }))?;
            }
            AttachStrategy::Factory => {
                pipeline.subscribe(Box::new(move |node| observe_node(&shared, node)));
            }
        }

        tracing::debug!(strategy = %config.strategy, "observer attached");
        Ok((
            ChangeObserver {
                state,
                strategy: config.strategy,
            },
            events,
        ))
    }

    pub fn strategy(&self) -> AttachStrategy {
        self.strategy
    }

    pub fn phase(&self) -> ObserverPhase {
        if self.state.borrow().sink.is_some() {
            ObserverPhase::Attached
        } else {
            ObserverPhase::Finished
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase() == ObserverPhase::Finished
    }

    /// Handle for `node`, allocated now if the node was never seen.
    pub fn handle_of(&self, node: NodeId) -> Handle {
        self.state.borrow_mut().registry.handle_of(node)
    }

    /// Handle for `node` if one was already allocated.
    pub fn handle(&self, node: NodeId) -> Option<Handle> {
        self.state.borrow().registry.get(node)
    }

    /// Number of events delivered to the stream so far.
    pub fn emitted(&self) -> u64 {
        self.state.borrow().emitted
    }

    /// Number of events discarded because the stream was closed.
    pub fn dropped(&self) -> u64 {
        self.state.borrow().dropped
    }

    /// Closes the event stream.
    ///
    /// Waits one scheduling step first so that anything already in flight
    /// reaches the stream before end-of-stream. Calling it again is a no-op.
    pub async fn finish(&self) {
        if self.is_finished() {
            return;
        }
        tokio::task::yield_now().await;

        let mut state = self.state.borrow_mut();
        if state.sink.take().is_some() {
            tracing::debug!(
                emitted = state.emitted,
                handles = state.registry.len(),
                "observer finished"
            );
        }
    }
}

impl Drop for ChangeObserver {
    /// The pipeline keeps the shared state alive through its hooks and
    /// traps, so the sender has to be released here for the stream to end.
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if state.sink.take().is_some() {
            tracing::debug!(
                emitted = state.emitted,
                "observer dropped without finish, stream closed"
            );
        }
    }
}

/// Emits `create` for `node` and installs its traps, unless some observer
/// already did.
fn observe_node(state: &SharedState, node: &NodeRef) {
    if node.is_instrumented() {
        tracing::debug!(node = %node.id(), "node already instrumented, skipping");
        return;
    }

    let owner = {
        let mut state = state.borrow_mut();
        state.emit(ChangeEvent::Create {
            node: node.index(),
            opcode: node.opcode(),
        });
        state.registry.handle_of(node.id())
    };

    let hooks = Instrumentation {
        fields: translate::field_trap(state.clone(), owner),
        inputs: translate::reference_listener(state.clone(), owner, RefList::Inputs),
        control: translate::reference_listener(state.clone(), owner, RefList::Control),
        literals: translate::literal_listener(state.clone(), owner),
    };
    if let Err(err) = node.instrument(hooks) {
        tracing::warn!(node = %node.id(), %err, "failed to instrument node");
    }
}
