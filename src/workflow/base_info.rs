//! First-run capture of the user's first and last name.

use std::fmt;

use super::fields::{self, FormSchema};
use super::machine::{Machine, Step};
use crate::records::BaseInfo;

pub struct BaseInfoMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseInfoState {
    Firstname,
    Lastname,
    Review,
    Success,
}

impl fmt::Display for BaseInfoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseInfoState::Firstname => write!(f, "firstname"),
            BaseInfoState::Lastname => write!(f, "lastname"),
            BaseInfoState::Review => write!(f, "review"),
            BaseInfoState::Success => write!(f, "success"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseInfoContext {
    pub info: BaseInfo,
    pub fields: FormSchema,
}

impl BaseInfoContext {
    /// Seeds the form from any partially saved base info.
    pub fn seeded(info: BaseInfo) -> Self {
        Self {
            info,
            fields: fields::base_info_schema(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseInfoEvent {
    Firstname(String),
    Lastname(String),
    Confirm,
    /// Local discard: relayed upward, nothing is saved.
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseInfoOutput {
    Save(BaseInfo),
    Discard,
}

impl Machine for BaseInfoMachine {
    type State = BaseInfoState;
    type Context = BaseInfoContext;
    type Event = BaseInfoEvent;
    type Output = BaseInfoOutput;

    const NAME: &'static str = "base-info";

    fn initial() -> BaseInfoState {
        BaseInfoState::Firstname
    }

    fn on_event(state: BaseInfoState, mut ctx: BaseInfoContext, event: BaseInfoEvent) -> Step<Self> {
        use BaseInfoEvent as E;
        use BaseInfoState as S;

        match (state, event) {
            (S::Success, _) => Step::stay(ctx),
            (_, E::Discard) => Step::stay(ctx).emit(BaseInfoOutput::Discard),
            (S::Firstname, E::Firstname(value)) if !value.trim().is_empty() => {
                ctx.info.firstname = value.trim().to_string();
                Step::to(S::Lastname, ctx)
            }
            (S::Lastname, E::Lastname(value)) if !value.trim().is_empty() => {
                ctx.info.lastname = value.trim().to_string();
                Step::to(S::Review, ctx)
            }
            (S::Review, E::Confirm) => {
                let info = ctx.info.clone();
                Step::to(S::Success, ctx).emit(BaseInfoOutput::Save(info))
            }
            _ => Step::stay(ctx),
        }
    }

    fn on_enter(_state: BaseInfoState, ctx: BaseInfoContext) -> Step<Self> {
        Step::stay(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::machine::Workflow;

    fn spawn() -> Workflow<BaseInfoMachine> {
        Workflow::spawn("base".into(), BaseInfoContext::seeded(BaseInfo::default())).0
    }

    #[test]
    fn happy_path_saves_names() {
        let mut wf = spawn();
        assert_eq!(wf.state(), BaseInfoState::Firstname);

        wf.send(BaseInfoEvent::Firstname("Ada".into()));
        assert_eq!(wf.state(), BaseInfoState::Lastname);

        wf.send(BaseInfoEvent::Lastname(" Lovelace ".into()));
        assert_eq!(wf.state(), BaseInfoState::Review);

        let outputs = wf.send(BaseInfoEvent::Confirm);
        assert_eq!(wf.state(), BaseInfoState::Success);
        assert_eq!(
            outputs,
            vec![BaseInfoOutput::Save(BaseInfo {
                firstname: "Ada".into(),
                lastname: "Lovelace".into(),
            })]
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut wf = spawn();
        wf.send(BaseInfoEvent::Firstname("   ".into()));
        assert_eq!(wf.state(), BaseInfoState::Firstname);
        assert!(wf.context().info.firstname.is_empty());
    }

    #[test]
    fn discard_relays_without_saving() {
        let mut wf = spawn();
        wf.send(BaseInfoEvent::Firstname("Ada".into()));
        let outputs = wf.send(BaseInfoEvent::Discard);
        assert_eq!(outputs, vec![BaseInfoOutput::Discard]);
        assert_eq!(wf.state(), BaseInfoState::Lastname);
    }

    #[test]
    fn seeded_values_are_kept_as_defaults() {
        let seed = BaseInfo {
            firstname: "Ada".into(),
            lastname: String::new(),
        };
        let (wf, _) = Workflow::<BaseInfoMachine>::spawn("base".into(), BaseInfoContext::seeded(seed));
        assert_eq!(wf.context().info.firstname, "Ada");
        assert_eq!(wf.context().fields.label("firstname"), "First Name");
    }

    #[test]
    fn success_is_terminal() {
        let mut wf = spawn();
        wf.send(BaseInfoEvent::Firstname("Ada".into()));
        wf.send(BaseInfoEvent::Lastname("Lovelace".into()));
        wf.send(BaseInfoEvent::Confirm);
        assert!(wf.send(BaseInfoEvent::Discard).is_empty());
        assert!(wf.send(BaseInfoEvent::Confirm).is_empty());
    }
}
