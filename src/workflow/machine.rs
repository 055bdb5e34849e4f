//! Generic reducer-driven state machine runner.
//!
//! A [`Machine`] is two pure functions over `(state, context)`. The
//! [`Workflow`] runner owns one instance: it feeds events to `on_event`,
//! and every time a state is entered it runs `on_enter`, which doubles as
//! the automatic guard list: returning another target enters it before
//! control goes back to the caller.

use std::fmt;
use std::mem;

use tracing::{debug, warn};

use crate::records::EntityId;

/// Upper bound on automatic transitions chained from a single event.
pub const MAX_AUTOMATIC: usize = 16;

pub trait Machine {
    type State: Copy + Eq + fmt::Debug + fmt::Display;
    type Context: Default;
    type Event: fmt::Debug;
    type Output;

    /// Name used in logs.
    const NAME: &'static str;

    fn initial() -> Self::State;

    /// Reacts to an external event. Events with no transition in `state`
    /// should return [`Step::stay`] with the context untouched.
    fn on_event(state: Self::State, ctx: Self::Context, event: Self::Event) -> Step<Self>;

    /// Entry action and automatic guards for `state`.
    fn on_enter(state: Self::State, ctx: Self::Context) -> Step<Self>;
}

/// The result of one reducer call.
pub struct Step<M: Machine + ?Sized> {
    pub target: Option<M::State>,
    pub context: M::Context,
    pub outputs: Vec<M::Output>,
}

impl<M: Machine + ?Sized> Step<M> {
    pub fn stay(context: M::Context) -> Self {
        Self {
            target: None,
            context,
            outputs: Vec::new(),
        }
    }

    /// Enter `state`, running its entry action even if it is the current one.
    pub fn to(state: M::State, context: M::Context) -> Self {
        Self {
            target: Some(state),
            context,
            outputs: Vec::new(),
        }
    }

    pub fn emit(mut self, output: M::Output) -> Self {
        self.outputs.push(output);
        self
    }
}

/// A running machine instance with its own context.
pub struct Workflow<M: Machine> {
    id: EntityId,
    state: M::State,
    context: M::Context,
    history: Vec<M::State>,
}

impl<M: Machine> Workflow<M> {
    /// Starts a workflow in its initial state, running that state's entry.
    pub fn spawn(id: EntityId, context: M::Context) -> (Self, Vec<M::Output>) {
        let mut workflow = Self {
            id,
            state: M::initial(),
            context,
            history: Vec::new(),
        };
        debug!(workflow = M::NAME, id = %workflow.id, state = %workflow.state, "spawned");
        let outputs = workflow.settle();
        (workflow, outputs)
    }

    pub fn send(&mut self, event: M::Event) -> Vec<M::Output> {
        debug!(workflow = M::NAME, id = %self.id, state = %self.state, ?event, "event");
        let step = M::on_event(self.state, mem::take(&mut self.context), event);
        self.context = step.context;
        let mut outputs = step.outputs;
        if let Some(target) = step.target {
            self.transition(target);
            outputs.extend(self.settle());
        }
        outputs
    }

    fn transition(&mut self, target: M::State) {
        debug!(workflow = M::NAME, id = %self.id, from = %self.state, to = %target, "transition");
        self.history.push(self.state);
        self.state = target;
    }

    /// Runs entry actions until a state keeps control.
    fn settle(&mut self) -> Vec<M::Output> {
        let mut outputs = Vec::new();
        for _ in 0..MAX_AUTOMATIC {
            let step = M::on_enter(self.state, mem::take(&mut self.context));
            self.context = step.context;
            outputs.extend(step.outputs);
            match step.target {
                Some(next) => self.transition(next),
                None => return outputs,
            }
        }
        warn!(
            workflow = M::NAME,
            id = %self.id,
            state = %self.state,
            "automatic transition chain exceeded {MAX_AUTOMATIC} steps"
        );
        outputs
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn state(&self) -> M::State {
        self.state
    }

    pub fn context(&self) -> &M::Context {
        &self.context
    }

    /// States left so far, oldest first.
    pub fn history(&self) -> &[M::State] {
        &self.history
    }
}

impl<M: Machine> fmt::Debug for Workflow<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("machine", &M::NAME)
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
