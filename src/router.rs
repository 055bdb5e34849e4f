//! Root router: owns every client and invoice workflow, decides the active
//! screen and persists committed records.
//!
//! Workflows never talk to each other directly. Their outputs come back
//! here as messages and are relayed in FIFO order; anything that needs
//! I/O is handed out as an [`Effect`] for the engine to run.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::calendar::MonthWindow;
use crate::records::{BaseInfo, ClientRecord, EntityId, EntityKind, InvoiceRecord};
use crate::report::CalculatedReport;
use crate::store::{Snapshot, Store};
use crate::workflow::base_info::BaseInfoContext;
use crate::workflow::client::spawn_client;
use crate::workflow::invoice::{spawn_invoice, ClientChoice, ProviderRef};
use crate::workflow::{
    BaseInfoEvent, BaseInfoMachine, BaseInfoOutput, ClientEvent, ClientMachine, ClientOutput,
    InvoiceContext, InvoiceEvent, InvoiceMachine, InvoiceOutput, InvoiceRequest, ProviderEvent,
    ProviderOutput, ProviderRequest, Workflow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Initializing,
    Home,
    BaseInfo,
    CreateClient,
    CreateInvoice,
    ManageClients,
    EditClient,
    RemoveClient,
    ActionCompleted,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Screen::Initializing => "initializing",
            Screen::Home => "home",
            Screen::BaseInfo => "base-info",
            Screen::CreateClient => "create-client",
            Screen::CreateInvoice => "create-invoice",
            Screen::ManageClients => "manage-clients",
            Screen::EditClient => "edit-client",
            Screen::RemoveClient => "remove-client",
            Screen::ActionCompleted => "action-completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub screen: Screen,
}

impl MenuItem {
    const fn new(label: &'static str, screen: Screen) -> Self {
        Self { label, screen }
    }
}

/// What the last finished action was, for the completion screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedAction {
    Client,
    Invoice(EntityId),
    ClientsRemoved(usize),
}

/// Work a workflow asked for that needs the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Provider {
        client: EntityId,
        request: ProviderRequest,
    },
    Invoice {
        invoice: EntityId,
        request: InvoiceRequest,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    /// Jump straight to a screen.
    Navigate(Screen),
    /// Pick an entry from the current menu.
    SelectMenu(Screen),
    EditClient(EntityId),
    RemoveClients(Vec<EntityId>),
    BaseInfo(BaseInfoEvent),
    Client(EntityId, ClientEvent),
    Invoice(EntityId, InvoiceEvent),
}

#[derive(Debug)]
enum Message {
    CommitClient(ClientRecord),
    CommitInvoice(Box<InvoiceContext>),
    Discard {
        kind: EntityKind,
        id: EntityId,
        should_remove: bool,
    },
    CalculateSuccess(CalculatedReport),
    CalculateFailure(String),
    Calculate {
        provider: ProviderRef,
        window: MonthWindow,
    },
    SaveBaseInfo(BaseInfo),
    DiscardBaseInfo,
}

#[derive(Debug)]
struct ClientEntry {
    committed: Option<ClientRecord>,
    workflow: Workflow<ClientMachine>,
}

#[derive(Debug)]
struct InvoiceEntry {
    committed: Option<InvoiceRecord>,
    workflow: Option<Workflow<InvoiceMachine>>,
}

#[derive(Debug)]
pub struct Router {
    screen: Screen,
    navigated: Option<Screen>,
    menu: Vec<MenuItem>,
    clients: BTreeMap<EntityId, ClientEntry>,
    invoices: BTreeMap<EntityId, InvoiceEntry>,
    active: Option<(EntityKind, EntityId)>,
    last_completed: Option<CompletedAction>,
    base_info: BaseInfo,
    base_info_flow: Option<Workflow<BaseInfoMachine>>,
    store: Store,
}

impl Router {
    /// Builds the router from a loaded snapshot. Committed clients get a
    /// ready workflow so invoices can calculate through them.
    pub fn new(store: Store, snapshot: Snapshot) -> Self {
        let clients = snapshot
            .clients
            .into_values()
            .map(|record| {
                let record = ClientRecord::create(record);
                let (workflow, _) = spawn_client(record.clone());
                (
                    record.id.clone(),
                    ClientEntry {
                        committed: Some(record),
                        workflow,
                    },
                )
            })
            .collect();
        let invoices = snapshot
            .invoices
            .into_iter()
            .map(|(id, record)| {
                let entry = InvoiceEntry {
                    committed: Some(record),
                    workflow: None,
                };
                (id, entry)
            })
            .collect();

        Self {
            screen: Screen::Initializing,
            navigated: None,
            menu: Vec::new(),
            clients,
            invoices,
            active: None,
            last_completed: None,
            base_info: snapshot.base_info,
            base_info_flow: None,
            store,
        }
    }

    /// Leaves the initializing screen for the first useful one.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        let target = if self.setup_finished() {
            Screen::Home
        } else if !self.base_info.is_complete() {
            Screen::BaseInfo
        } else {
            Screen::CreateClient
        };
        info!(screen = %target, "router started");
        let mut queue = VecDeque::new();
        self.goto(target, &mut queue, &mut effects);
        self.process(queue, &mut effects);
        effects
    }

    pub fn handle(&mut self, event: RouterEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut queue = VecDeque::new();

        match event {
            RouterEvent::Navigate(target) => {
                if self.screen == Screen::ActionCompleted && target != Screen::Home {
                    debug!(%target, "only home is reachable from the completion screen");
                } else {
                    self.navigated = Some(target);
                    self.goto(target, &mut queue, &mut effects);
                }
            }
            RouterEvent::SelectMenu(target) => {
                if self.menu.iter().any(|item| item.screen == target) {
                    self.navigated = Some(target);
                    self.goto(target, &mut queue, &mut effects);
                } else {
                    debug!(%target, screen = %self.screen, "not in the current menu");
                }
            }
            RouterEvent::EditClient(id) => self.edit_client(id),
            RouterEvent::RemoveClients(ids) => self.remove_clients(&ids, &mut queue, &mut effects),
            RouterEvent::BaseInfo(event) => match self.base_info_flow.as_mut() {
                Some(flow) => {
                    let outputs = flow.send(event);
                    queue.extend(outputs.into_iter().map(|out| match out {
                        BaseInfoOutput::Save(info) => Message::SaveBaseInfo(info),
                        BaseInfoOutput::Discard => Message::DiscardBaseInfo,
                    }));
                }
                None => debug!(?event, "no base info flow running"),
            },
            RouterEvent::Client(id, event) => match self.clients.get_mut(&id) {
                Some(entry) => {
                    let outputs = entry.workflow.send(event);
                    client_outputs(&id, outputs, &mut queue, &mut effects);
                }
                None => debug!(%id, ?event, "event for unknown client dropped"),
            },
            RouterEvent::Invoice(id, event) => {
                match self.invoices.get_mut(&id).and_then(|e| e.workflow.as_mut()) {
                    Some(workflow) => {
                        let outputs = workflow.send(event);
                        invoice_outputs(&id, outputs, &mut queue, &mut effects);
                    }
                    None => debug!(%id, ?event, "event for unknown invoice dropped"),
                }
            }
        }

        self.process(queue, &mut effects);
        effects
    }

    fn process(&mut self, mut queue: VecDeque<Message>, effects: &mut Vec<Effect>) {
        while let Some(message) = queue.pop_front() {
            debug!(?message, "routing message");
            match message {
                Message::CommitClient(record) => self.commit_client(record, &mut queue, effects),
                Message::CommitInvoice(ctx) => self.commit_invoice(*ctx, &mut queue, effects),
                Message::Discard {
                    kind,
                    id,
                    should_remove,
                } => self.discard(kind, id, should_remove, &mut queue, effects),
                Message::CalculateSuccess(report) => {
                    let event = InvoiceEvent::CalculateSuccess(report);
                    self.relay_to_invoice(event, &mut queue, effects)
                }
                Message::CalculateFailure(error) => {
                    let event = InvoiceEvent::CalculateFailure(error);
                    self.relay_to_invoice(event, &mut queue, effects)
                }
                Message::Calculate { provider, window } => {
                    let id = provider.0;
                    match self.clients.get_mut(&id) {
                        Some(entry) => {
                            let event = ClientEvent::Provider(ProviderEvent::Calculate(window));
                            let outputs = entry.workflow.send(event);
                            client_outputs(&id, outputs, &mut queue, effects);
                        }
                        None => {
                            warn!(client = %id, "invoice references a missing client");
                            queue.push_back(Message::CalculateFailure(format!(
                                "client {id} no longer exists"
                            )));
                        }
                    }
                }
                Message::SaveBaseInfo(info) => {
                    self.base_info = info;
                    self.base_info_flow = None;
                    self.persist();
                    let next = if self.committed_clients().next().is_none() {
                        Screen::CreateClient
                    } else {
                        Screen::Home
                    };
                    self.goto(next, &mut queue, effects);
                }
                Message::DiscardBaseInfo => {
                    self.base_info_flow = None;
                    self.goto(Screen::Home, &mut queue, effects);
                }
            }
        }
    }

    fn goto(&mut self, target: Screen, queue: &mut VecDeque<Message>, effects: &mut Vec<Effect>) {
        match target {
            Screen::Initializing | Screen::ActionCompleted => {
                debug!(%target, "screen is not navigable");
                return;
            }
            Screen::Home => {
                self.active = None;
                self.last_completed = None;
                self.menu = self.home_menu();
            }
            Screen::BaseInfo => {
                self.active = None;
                let (flow, _) = Workflow::<BaseInfoMachine>::spawn(
                    EntityId::new(),
                    BaseInfoContext::seeded(self.base_info.clone()),
                );
                self.base_info_flow = Some(flow);
            }
            Screen::CreateClient => {
                self.drop_drafts();
                let record = ClientRecord::empty();
                let id = record.id.clone();
                let (workflow, outputs) = spawn_client(record);
                self.clients.insert(
                    id.clone(),
                    ClientEntry {
                        committed: None,
                        workflow,
                    },
                );
                client_outputs(&id, outputs, queue, effects);
                self.active = Some((EntityKind::Client, id));
            }
            Screen::CreateInvoice => {
                if !self.setup_finished() {
                    debug!("invoices need base info and at least one client");
                    return;
                }
                self.drop_drafts();
                let id = EntityId::new();
                let choices = self.committed_clients().map(ClientChoice::from).collect();
                let ctx = InvoiceContext::new(id.clone(), self.base_info.clone(), choices);
                let (workflow, outputs) = spawn_invoice(ctx);
                self.invoices.insert(
                    id.clone(),
                    InvoiceEntry {
                        committed: None,
                        workflow: Some(workflow),
                    },
                );
                invoice_outputs(&id, outputs, queue, effects);
                self.active = Some((EntityKind::Invoice, id));
            }
            Screen::ManageClients => {
                self.active = None;
                self.menu = vec![
                    MenuItem::new("Edit client", Screen::EditClient),
                    MenuItem::new("Remove client", Screen::RemoveClient),
                    MenuItem::new("Back", Screen::Home),
                ];
            }
            Screen::EditClient | Screen::RemoveClient => {
                self.active = None;
            }
        }
        debug!(from = %self.screen, to = %target, "screen changed");
        self.screen = target;
    }

    fn edit_client(&mut self, id: EntityId) {
        if self.screen != Screen::EditClient {
            debug!(%id, screen = %self.screen, "edit requested outside the edit screen");
            return;
        }
        match self.clients.get(&id) {
            Some(entry) if entry.committed.is_some() => {
                self.active = Some((EntityKind::Client, id));
            }
            _ => debug!(%id, "no committed client to edit"),
        }
    }

    fn remove_clients(
        &mut self,
        ids: &[EntityId],
        queue: &mut VecDeque<Message>,
        effects: &mut Vec<Effect>,
    ) {
        if self.screen != Screen::RemoveClient {
            debug!(screen = %self.screen, "remove requested outside the remove screen");
            return;
        }
        let removed = ids
            .iter()
            .filter(|id| self.clients.remove(*id).is_some())
            .count();
        if removed == 0 {
            self.goto(Screen::Home, queue, effects);
            return;
        }
        info!(removed, "clients removed");
        self.persist();
        self.complete(CompletedAction::ClientsRemoved(removed));
    }

    fn commit_client(
        &mut self,
        record: ClientRecord,
        queue: &mut VecDeque<Message>,
        effects: &mut Vec<Effect>,
    ) {
        let record = ClientRecord::create(record);
        let id = record.id.clone();
        if let Some(entry) = self.clients.get(&id) {
            debug!(client = %id, path = ?entry.workflow.history(), "client flow finished");
        }
        let (workflow, outputs) = spawn_client(record.clone());
        self.clients.insert(
            id.clone(),
            ClientEntry {
                committed: Some(record),
                workflow,
            },
        );
        client_outputs(&id, outputs, queue, effects);
        info!(client = %id, "client committed");
        self.persist();
        self.complete(CompletedAction::Client);
    }

    fn commit_invoice(
        &mut self,
        ctx: InvoiceContext,
        queue: &mut VecDeque<Message>,
        effects: &mut Vec<Effect>,
    ) {
        let id = ctx.id.clone();
        let Some(record) = InvoiceRecord::create(&ctx) else {
            warn!(invoice = %id, "invoice committed without a complete period, discarding");
            self.discard(EntityKind::Invoice, id, true, queue, effects);
            return;
        };
        if let Some(workflow) = self.invoices.get(&id).and_then(|e| e.workflow.as_ref()) {
            debug!(invoice = %id, path = ?workflow.history(), "invoice flow finished");
        }
        self.invoices.insert(
            id.clone(),
            InvoiceEntry {
                committed: Some(record),
                workflow: None,
            },
        );
        info!(invoice = %id, "invoice committed");
        self.persist();
        self.complete(CompletedAction::Invoice(id));
    }

    /// Drops an uncommitted draft. A committed client being edited is
    /// restored from its record instead.
    fn discard(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        should_remove: bool,
        queue: &mut VecDeque<Message>,
        effects: &mut Vec<Effect>,
    ) {
        match kind {
            EntityKind::Client => {
                let committed = self.clients.get(&id).and_then(|e| e.committed.clone());
                match committed {
                    Some(record) => {
                        let (workflow, outputs) = spawn_client(record);
                        if let Some(entry) = self.clients.get_mut(&id) {
                            entry.workflow = workflow;
                        }
                        client_outputs(&id, outputs, queue, effects);
                    }
                    None if should_remove => {
                        self.clients.remove(&id);
                    }
                    None => debug!(client = %id, "draft kept after discard"),
                }
            }
            EntityKind::Invoice => {
                let committed = self.invoices.get(&id).is_some_and(|e| e.committed.is_some());
                if committed {
                    if let Some(entry) = self.invoices.get_mut(&id) {
                        entry.workflow = None;
                    }
                } else {
                    self.invoices.remove(&id);
                }
            }
        }
        debug!(%kind, %id, should_remove, "discarded");
        self.goto(Screen::Home, queue, effects);
    }

    fn relay_to_invoice(
        &mut self,
        event: InvoiceEvent,
        queue: &mut VecDeque<Message>,
        effects: &mut Vec<Effect>,
    ) {
        let Some((EntityKind::Invoice, id)) = self.active.clone() else {
            debug!(?event, "no active invoice for calculation result");
            return;
        };
        match self.invoices.get_mut(&id).and_then(|e| e.workflow.as_mut()) {
            Some(workflow) => {
                let outputs = workflow.send(event);
                invoice_outputs(&id, outputs, queue, effects);
            }
            None => debug!(invoice = %id, "active invoice has no workflow"),
        }
    }

    fn complete(&mut self, action: CompletedAction) {
        debug!(from = %self.screen, ?action, "action completed");
        self.active = None;
        self.last_completed = Some(action);
        self.screen = Screen::ActionCompleted;
    }

    /// Removes drafts that never got committed.
    fn drop_drafts(&mut self) {
        self.clients.retain(|_, entry| entry.committed.is_some());
        self.invoices.retain(|_, entry| entry.committed.is_some());
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            error!(error = %e, "failed to persist store");
        }
    }

    fn home_menu(&self) -> Vec<MenuItem> {
        if self.setup_finished() {
            return vec![
                MenuItem::new("Create client", Screen::CreateClient),
                MenuItem::new("Create invoice", Screen::CreateInvoice),
                MenuItem::new("Manage clients", Screen::ManageClients),
                MenuItem::new("Change base info", Screen::BaseInfo),
            ];
        }
        let mut menu = vec![MenuItem::new("Create client", Screen::CreateClient)];
        if !self.base_info.is_complete() {
            menu.push(MenuItem::new("Base info", Screen::BaseInfo));
        }
        menu
    }

    pub fn setup_finished(&self) -> bool {
        self.base_info.is_complete() && self.committed_clients().next().is_some()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn navigated(&self) -> Option<Screen> {
        self.navigated
    }

    pub fn menu(&self) -> &[MenuItem] {
        &self.menu
    }

    pub fn last_completed(&self) -> Option<&CompletedAction> {
        self.last_completed.as_ref()
    }

    pub fn base_info(&self) -> &BaseInfo {
        &self.base_info
    }

    pub fn base_info_flow(&self) -> Option<&Workflow<BaseInfoMachine>> {
        self.base_info_flow.as_ref()
    }

    pub fn active_client(&self) -> Option<&Workflow<ClientMachine>> {
        match &self.active {
            Some((EntityKind::Client, id)) => self.clients.get(id).map(|e| &e.workflow),
            _ => None,
        }
    }

    pub fn active_invoice(&self) -> Option<&Workflow<InvoiceMachine>> {
        match &self.active {
            Some((EntityKind::Invoice, id)) => {
                self.invoices.get(id).and_then(|e| e.workflow.as_ref())
            }
            _ => None,
        }
    }

    pub fn committed_clients(&self) -> impl Iterator<Item = &ClientRecord> {
        self.clients.values().filter_map(|e| e.committed.as_ref())
    }

    pub fn committed_invoice(&self, id: &EntityId) -> Option<&InvoiceRecord> {
        self.invoices.get(id).and_then(|e| e.committed.as_ref())
    }

    pub fn committed_invoices(&self) -> impl Iterator<Item = &InvoiceRecord> {
        self.invoices.values().filter_map(|e| e.committed.as_ref())
    }

    /// Committed state only; drafts never reach the store.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            clients: self
                .committed_clients()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
            invoices: self
                .committed_invoices()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
            base_info: self.base_info.clone(),
        }
    }
}

fn client_outputs(
    id: &EntityId,
    outputs: Vec<ClientOutput>,
    queue: &mut VecDeque<Message>,
    effects: &mut Vec<Effect>,
) {
    for output in outputs {
        match output {
            ClientOutput::Commit(record) => queue.push_back(Message::CommitClient(record)),
            ClientOutput::Discard { should_remove } => queue.push_back(Message::Discard {
                kind: EntityKind::Client,
                id: id.clone(),
                should_remove,
            }),
            ClientOutput::Provider(ProviderOutput::Request(request)) => {
                effects.push(Effect::Provider {
                    client: id.clone(),
                    request,
                })
            }
            ClientOutput::Provider(ProviderOutput::CalculateSuccess(report)) => {
                queue.push_back(Message::CalculateSuccess(report))
            }
            ClientOutput::Provider(ProviderOutput::CalculateFailure(error)) => {
                queue.push_back(Message::CalculateFailure(error))
            }
        }
    }
}

fn invoice_outputs(
    id: &EntityId,
    outputs: Vec<InvoiceOutput>,
    queue: &mut VecDeque<Message>,
    effects: &mut Vec<Effect>,
) {
    for output in outputs {
        match output {
            InvoiceOutput::Request(request) => effects.push(Effect::Invoice {
                invoice: id.clone(),
                request,
            }),
            InvoiceOutput::Calculate { provider, window } => {
                queue.push_back(Message::Calculate { provider, window })
            }
            InvoiceOutput::Commit(ctx) => queue.push_back(Message::CommitInvoice(ctx)),
            InvoiceOutput::Discard => queue.push_back(Message::Discard {
                kind: EntityKind::Invoice,
                id: id.clone(),
                should_remove: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{FixedRateData, ProviderData, ProviderKind};
    use crate::workflow::fixed_rate::FixedRateEvent;
    use crate::workflow::{ClientState, InvoiceState};
    use tempfile::TempDir;

    fn ada() -> BaseInfo {
        BaseInfo {
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
        }
    }

    fn fixed_client(name: &str) -> ClientRecord {
        let mut record = ClientRecord::empty();
        record.name = name.into();
        record.provider_kind = Some(ProviderKind::FixedRate);
        record.providers.insert(
            ProviderKind::FixedRate,
            ProviderData::FixedRate(FixedRateData {
                rate: "1000".into(),
                description: "Retainer".into(),
            }),
        );
        record
    }

    fn router_with(dir: &TempDir, snapshot: Snapshot) -> Router {
        let mut router = Router::new(Store::new(dir.path().join("store.json")), snapshot);
        router.start();
        router
    }

    fn active_client_id(router: &Router) -> EntityId {
        router.active_client().unwrap().id().clone()
    }

    fn create_fixed_client(router: &mut Router, name: &str) {
        let id = active_client_id(router);
        let steps = [
            ClientEvent::Name(name.into()),
            ClientEvent::ChooseProvider(ProviderKind::FixedRate),
            ClientEvent::Provider(ProviderEvent::FixedRate(FixedRateEvent::Rate("500".into()))),
            ClientEvent::Provider(ProviderEvent::FixedRate(FixedRateEvent::Description(
                "Support".into(),
            ))),
            ClientEvent::Confirm,
        ];
        for event in steps {
            router.handle(RouterEvent::Client(id.clone(), event));
        }
    }

    #[test]
    fn empty_store_starts_with_base_info() {
        let dir = TempDir::new().unwrap();
        let router = router_with(&dir, Snapshot::default());
        assert_eq!(router.screen(), Screen::BaseInfo);
        assert!(router.base_info_flow().is_some());
    }

    #[test]
    fn base_info_without_clients_starts_with_client_draft() {
        let dir = TempDir::new().unwrap();
        let router = router_with(
            &dir,
            Snapshot {
                base_info: ada(),
                ..Default::default()
            },
        );
        assert_eq!(router.screen(), Screen::CreateClient);
        assert_eq!(router.active_client().unwrap().state(), ClientState::Name);
        assert_eq!(router.committed_clients().count(), 0);
    }

    #[test]
    fn finished_setup_starts_at_home() {
        let dir = TempDir::new().unwrap();
        let client = fixed_client("Acme");
        let mut snapshot = Snapshot {
            base_info: ada(),
            ..Default::default()
        };
        snapshot.clients.insert(client.id.clone(), client);
        let router = router_with(&dir, snapshot);
        assert_eq!(router.screen(), Screen::Home);
        let labels: Vec<_> = router.menu().iter().map(|m| m.label).collect();
        assert_eq!(
            labels,
            ["Create client", "Create invoice", "Manage clients", "Change base info"]
        );
    }

    #[test]
    fn saving_base_info_moves_to_client_creation() {
        let dir = TempDir::new().unwrap();
        let mut router = router_with(&dir, Snapshot::default());
        for event in [
            BaseInfoEvent::Firstname("Ada".into()),
            BaseInfoEvent::Lastname("Lovelace".into()),
            BaseInfoEvent::Confirm,
        ] {
            router.handle(RouterEvent::BaseInfo(event));
        }
        assert_eq!(router.screen(), Screen::CreateClient);
        assert_eq!(router.base_info(), &ada());
        assert!(router.active_client().is_some());

        let stored = Store::new(dir.path().join("store.json")).load().unwrap();
        assert_eq!(stored.base_info, ada());
    }

    #[test]
    fn committing_a_client_persists_and_completes() {
        let dir = TempDir::new().unwrap();
        let mut router = router_with(
            &dir,
            Snapshot {
                base_info: ada(),
                ..Default::default()
            },
        );
        create_fixed_client(&mut router, "Acme");

        assert_eq!(router.screen(), Screen::ActionCompleted);
        assert_eq!(router.last_completed(), Some(&CompletedAction::Client));
        let stored = Store::new(dir.path().join("store.json")).load().unwrap();
        let client = stored.clients.values().next().unwrap();
        assert_eq!(client.name, "Acme");
        assert_eq!(client.providers.len(), 1);
    }

    #[test]
    fn completion_screen_only_navigates_home() {
        let dir = TempDir::new().unwrap();
        let mut router = router_with(
            &dir,
            Snapshot {
                base_info: ada(),
                ..Default::default()
            },
        );
        create_fixed_client(&mut router, "Acme");

        router.handle(RouterEvent::Navigate(Screen::CreateInvoice));
        assert_eq!(router.screen(), Screen::ActionCompleted);
        router.handle(RouterEvent::Navigate(Screen::Home));
        assert_eq!(router.screen(), Screen::Home);
        assert_eq!(router.last_completed(), None);
    }

    #[test]
    fn discarding_a_draft_removes_it() {
        let dir = TempDir::new().unwrap();
        let mut router = router_with(
            &dir,
            Snapshot {
                base_info: ada(),
                ..Default::default()
            },
        );
        let id = active_client_id(&router);
        router.handle(RouterEvent::Client(id.clone(), ClientEvent::Name("Draft".into())));
        router.handle(RouterEvent::Client(id.clone(), ClientEvent::Discard));

        assert_eq!(router.screen(), Screen::Home);
        assert!(router.active_client().is_none());
        assert!(!router.snapshot().clients.contains_key(&id));
        // the draft is gone, so further events are dropped
        assert!(router
            .handle(RouterEvent::Client(id, ClientEvent::Name("x".into())))
            .is_empty());
    }

    #[test]
    fn discarding_an_edit_keeps_the_committed_client() {
        let dir = TempDir::new().unwrap();
        let client = fixed_client("Acme");
        let id = client.id.clone();
        let mut snapshot = Snapshot {
            base_info: ada(),
            ..Default::default()
        };
        snapshot.clients.insert(id.clone(), client);
        let mut router = router_with(&dir, snapshot);

        router.handle(RouterEvent::SelectMenu(Screen::ManageClients));
        router.handle(RouterEvent::SelectMenu(Screen::EditClient));
        router.handle(RouterEvent::EditClient(id.clone()));
        router.handle(RouterEvent::Client(id.clone(), ClientEvent::Name("Renamed".into())));
        router.handle(RouterEvent::Client(id.clone(), ClientEvent::Discard));

        assert_eq!(router.screen(), Screen::Home);
        let names: Vec<_> = router.committed_clients().map(|c| c.name.clone()).collect();
        assert_eq!(names, ["Acme"]);
    }

    #[test]
    fn menu_selection_outside_menu_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut router = router_with(&dir, Snapshot::default());
        router.handle(RouterEvent::BaseInfo(BaseInfoEvent::Discard));
        assert_eq!(router.screen(), Screen::Home);

        router.handle(RouterEvent::SelectMenu(Screen::CreateInvoice));
        assert_eq!(router.screen(), Screen::Home);
        let labels: Vec<_> = router.menu().iter().map(|m| m.label).collect();
        assert_eq!(labels, ["Create client", "Base info"]);
    }

    #[test]
    fn removing_clients_persists() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (fixed_client("A"), fixed_client("B"));
        let mut snapshot = Snapshot {
            base_info: ada(),
            ..Default::default()
        };
        snapshot.clients.insert(a.id.clone(), a.clone());
        snapshot.clients.insert(b.id.clone(), b.clone());
        let mut router = router_with(&dir, snapshot);

        router.handle(RouterEvent::SelectMenu(Screen::ManageClients));
        router.handle(RouterEvent::SelectMenu(Screen::RemoveClient));
        router.handle(RouterEvent::RemoveClients(vec![a.id.clone()]));

        assert_eq!(router.last_completed(), Some(&CompletedAction::ClientsRemoved(1)));
        let stored = Store::new(dir.path().join("store.json")).load().unwrap();
        assert_eq!(stored.clients.keys().collect::<Vec<_>>(), [&b.id]);
    }

    #[test]
    fn invoice_calculates_through_its_client() {
        let dir = TempDir::new().unwrap();
        let client = fixed_client("Acme");
        let client_id = client.id.clone();
        let mut snapshot = Snapshot {
            base_info: ada(),
            ..Default::default()
        };
        snapshot.clients.insert(client_id.clone(), client);
        let mut router = router_with(&dir, snapshot);

        router.handle(RouterEvent::SelectMenu(Screen::CreateInvoice));
        let id = router.active_invoice().unwrap().id().clone();
        router.handle(RouterEvent::Invoice(id.clone(), InvoiceEvent::SelectClient(client_id)));
        router.handle(RouterEvent::Invoice(id.clone(), InvoiceEvent::Payment("paypal".into())));
        let effects = router.handle(RouterEvent::Invoice(id.clone(), InvoiceEvent::Year(2024)));
        assert_eq!(
            effects,
            [Effect::Invoice {
                invoice: id.clone(),
                request: InvoiceRequest::RecommendedMonth
            }]
        );
        router.handle(RouterEvent::Invoice(id.clone(), InvoiceEvent::Month(3)));

        let invoice = router.active_invoice().unwrap();
        assert_eq!(invoice.state(), InvoiceState::Review);
        let report = invoice.context().calculated.as_ref().unwrap();
        assert_eq!(report.report[0].project_name, "Retainer");
    }

    #[test]
    fn discarding_an_invoice_leaves_no_record() {
        let dir = TempDir::new().unwrap();
        let client = fixed_client("Acme");
        let mut snapshot = Snapshot {
            base_info: ada(),
            ..Default::default()
        };
        snapshot.clients.insert(client.id.clone(), client);
        let mut router = router_with(&dir, snapshot);

        router.handle(RouterEvent::SelectMenu(Screen::CreateInvoice));
        let id = router.active_invoice().unwrap().id().clone();
        router.handle(RouterEvent::Invoice(id, InvoiceEvent::Discard));

        assert_eq!(router.screen(), Screen::Home);
        assert_eq!(router.committed_invoices().count(), 0);
        assert!(router.snapshot().invoices.is_empty());
    }
}
