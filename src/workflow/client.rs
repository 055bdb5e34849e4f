//! Client creation and editing. Owns the provider workflow for its client.

use std::fmt;

use super::machine::{Machine, Step, Workflow};
use super::provider::{ProviderEvent, ProviderFlow, ProviderOutput, ProviderStatus};
use crate::records::{ClientRecord, EntityId, ProviderKind};

pub struct ClientMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Initializing,
    Name,
    Provider,
    ProviderFork,
    FixedRate,
    Harvest,
    Review,
    Complete,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Initializing => "initializing",
            ClientState::Name => "name",
            ClientState::Provider => "provider",
            ClientState::ProviderFork => "providerFork",
            ClientState::FixedRate => "fixed_rate",
            ClientState::Harvest => "harvest",
            ClientState::Review => "review",
            ClientState::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct ClientContext {
    pub record: ClientRecord,
    pub provider: Option<ProviderFlow>,
    /// Terminal status captured when the provider finished.
    pub provider_status: Option<ProviderStatus>,
}

impl ClientContext {
    pub fn from_record(record: ClientRecord) -> Self {
        Self {
            record: ClientRecord::create(record),
            provider: None,
            provider_status: None,
        }
    }

    fn should_remove(&self) -> bool {
        self.record.provider_kind.is_none() || self.provider_status != Some(ProviderStatus::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Name(String),
    ChooseProvider(ProviderKind),
    /// Forwarded to the owned provider workflow.
    Provider(ProviderEvent),
    Confirm,
    Back,
    Discard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientOutput {
    Commit(ClientRecord),
    Discard { should_remove: bool },
    Provider(ProviderOutput),
}

fn relay(outputs: Vec<ProviderOutput>) -> Vec<ClientOutput> {
    outputs.into_iter().map(ClientOutput::Provider).collect()
}

impl Machine for ClientMachine {
    type State = ClientState;
    type Context = ClientContext;
    type Event = ClientEvent;
    type Output = ClientOutput;

    const NAME: &'static str = "client";

    fn initial() -> ClientState {
        ClientState::Initializing
    }

    fn on_event(state: ClientState, mut ctx: ClientContext, event: ClientEvent) -> Step<Self> {
        use ClientEvent as E;
        use ClientState as S;

        match (state, event) {
            (S::Complete, _) => Step::stay(ctx),
            (_, E::Discard) => {
                let should_remove = ctx.should_remove();
                Step::stay(ctx).emit(ClientOutput::Discard { should_remove })
            }
            (_, E::Provider(event)) => {
                let outputs = match ctx.provider.as_mut() {
                    Some(provider) => relay(provider.send(event)),
                    None => Vec::new(),
                };
                let finished = matches!(state, S::Harvest | S::FixedRate)
                    && ctx.provider.as_ref().is_some_and(ProviderFlow::is_terminal);
                let mut step = if finished {
                    capture_provider(&mut ctx);
                    Step::to(S::Review, ctx)
                } else {
                    Step::stay(ctx)
                };
                step.outputs = outputs;
                step
            }
            (S::Name, E::Name(name)) if !name.trim().is_empty() => {
                ctx.record.name = name.trim().to_string();
                Step::to(S::Provider, ctx)
            }
            (S::Provider, E::ChooseProvider(kind)) => {
                ctx.record.provider_kind = Some(kind);
                Step::to(S::ProviderFork, ctx)
            }
            (S::Review, E::Confirm) => {
                let output = match ctx.provider_status {
                    Some(ProviderStatus::Confirmed) => ClientOutput::Commit(ctx.record.clone()),
                    _ => ClientOutput::Discard {
                        should_remove: ctx.should_remove(),
                    },
                };
                Step::to(S::Complete, ctx).emit(output)
            }
            (S::Review, E::Back) => Step::to(S::Name, ctx),
            _ => Step::stay(ctx),
        }
    }

    fn on_enter(state: ClientState, mut ctx: ClientContext) -> Step<Self> {
        match state {
            ClientState::Initializing => {
                let mut outputs = Vec::new();
                if let Some(data) = ctx.record.active_provider() {
                    let (flow, out) = ProviderFlow::ready(ctx.record.id.clone(), data);
                    ctx.provider = Some(flow);
                    outputs = relay(out);
                }
                let mut step = Step::to(ClientState::Name, ctx);
                step.outputs = outputs;
                step
            }
            ClientState::ProviderFork => match ctx.record.provider_kind {
                Some(ProviderKind::Harvest) => Step::to(ClientState::Harvest, ctx),
                Some(ProviderKind::FixedRate) => Step::to(ClientState::FixedRate, ctx),
                None => Step::to(ClientState::Provider, ctx),
            },
            ClientState::Harvest | ClientState::FixedRate => {
                let kind = match state {
                    ClientState::Harvest => ProviderKind::Harvest,
                    _ => ProviderKind::FixedRate,
                };
                let (flow, out) = ProviderFlow::for_editing(
                    ctx.record.id.clone(),
                    kind,
                    ctx.record.providers.get(&kind),
                );
                ctx.provider = Some(flow);
                ctx.provider_status = None;
                let mut step = Step::stay(ctx);
                step.outputs = relay(out);
                step
            }
            _ => Step::stay(ctx),
        }
    }
}

/// Stores the finished provider's data as the only populated entry.
fn capture_provider(ctx: &mut ClientContext) {
    if let Some(provider) = ctx.provider.as_ref() {
        ctx.provider_status = Some(provider.status());
        ctx.record.provider_kind = Some(provider.kind());
        ctx.record.providers.clear();
        ctx.record.providers.insert(provider.kind(), provider.data());
    }
}

/// Spawns a client workflow from a draft or committed record.
pub fn spawn_client(record: ClientRecord) -> (Workflow<ClientMachine>, Vec<ClientOutput>) {
    let id: EntityId = record.id.clone();
    Workflow::spawn(id, ClientContext::from_record(record))
}
