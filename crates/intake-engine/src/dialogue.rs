// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scripted intake dialogue.
//!
//! Handlers are pure: they mutate the [`Session`] in place and return the
//! outbound texts to send, in order. Persistence, exclusion windows and
//! pacing are applied by the caller.

use intake_core::{DialogueState, Session};

use crate::templates;

/// Field holding the contact's name.
pub const NAME_FIELD: &str = "name";

/// Field holding the menu option code the contact picked.
pub const SELECTED_OPTION_FIELD: &str = "selectedOption";

/// Menu code that hands the contact to a human.
const HUMAN_OPTION: &str = "6";

/// One field-collection sub-flow of the menu.
#[derive(Debug)]
pub struct Branch {
    pub option: u8,
    pub state: DialogueState,
    /// Fields solicited in order.
    pub fields: &'static [&'static str],
}

pub const BRANCHES: &[Branch] = &[
    Branch {
        option: 1,
        state: DialogueState::Option1Details,
        fields: &["energyConsumption", "panelPreference"],
    },
    Branch {
        option: 2,
        state: DialogueState::Option2Details,
        fields: &["wellDepth", "waterFlow", "pumpPreference"],
    },
    Branch {
        option: 3,
        state: DialogueState::Option3Details,
        fields: &["investmentGoal", "riskProfile", "investmentType"],
    },
    Branch {
        option: 4,
        state: DialogueState::Option4Details,
        fields: &["budget", "financingPreference", "wantsIncentives"],
    },
    Branch {
        option: 5,
        state: DialogueState::Option5Details,
        fields: &["technicalProblem", "errorMessage", "wantsTechnicalVisit"],
    },
];

impl Branch {
    /// The branch selected by a menu code such as `"3"`.
    pub fn for_code(code: &str) -> Option<&'static Branch> {
        BRANCHES.iter().find(|b| code == b.option.to_string())
    }

    /// The branch whose details are collected in `state`.
    pub fn for_state(state: DialogueState) -> Option<&'static Branch> {
        BRANCHES.iter().find(|b| b.state == state)
    }

    /// First field of this branch not yet present in the session.
    pub fn next_missing(&self, session: &Session) -> Option<&'static str> {
        self.fields
            .iter()
            .copied()
            .find(|f| !session.collected_fields.contains_key(*f))
    }
}

/// Override commands recognized before normal dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Opt out of automated messages.
    Stop,
    /// Return to the main menu.
    Menu,
}

impl Command {
    /// Recognizes a command; the whole message must be the command word.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("stop") {
            Some(Command::Stop)
        } else if text.eq_ignore_ascii_case("menu") {
            Some(Command::Menu)
        } else {
            None
        }
    }
}

/// A single outbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub text: String,
    /// Send only after the pacing delay.
    pub paced: bool,
}

impl Outbound {
    pub fn now(text: String) -> Self {
        Self { text, paced: false }
    }

    pub fn paced(text: String) -> Self {
        Self { text, paced: true }
    }
}

/// Result of applying one inbound text to a session.
#[derive(Debug, Default)]
pub struct Step {
    pub replies: Vec<Outbound>,
    /// The branch was finished; the caller starts the cool-down.
    pub completed: bool,
}

impl Step {
    fn reply(replies: Vec<Outbound>) -> Self {
        Self {
            replies,
            completed: false,
        }
    }
}

/// Apply an inbound text to a session that is not excluded.
pub fn advance(session: &mut Session, text: &str) -> Step {
    let input = text.trim();

    match session.dialogue_state {
        DialogueState::Initial => {
            session.dialogue_state = DialogueState::WaitingName;
            session.pending_field = Some(NAME_FIELD.to_string());
            Step::reply(vec![
                Outbound::now(templates::welcome()),
                Outbound::paced(templates::name_request()),
            ])
        }
        DialogueState::WaitingName => {
            if input.is_empty() {
                return Step::reply(vec![Outbound::now(templates::name_request())]);
            }
            session
                .collected_fields
                .insert(NAME_FIELD.to_string(), input.to_string());
            session.dialogue_state = DialogueState::WaitingOption;
            session.pending_field = None;
            Step::reply(vec![Outbound::paced(templates::main_menu(Some(input)))])
        }
        DialogueState::WaitingOption => select_option(session, input),
        DialogueState::Option1Details
        | DialogueState::Option2Details
        | DialogueState::Option3Details
        | DialogueState::Option4Details
        | DialogueState::Option5Details => collect_field(session, input),
        DialogueState::Completed => {
            session.reset_dialogue();
            advance(session, text)
        }
        DialogueState::ForwardedToHuman => Step::default(),
    }
}

fn select_option(session: &mut Session, input: &str) -> Step {
    if input == HUMAN_OPTION {
        session
            .collected_fields
            .insert(SELECTED_OPTION_FIELD.to_string(), input.to_string());
        session.dialogue_state = DialogueState::ForwardedToHuman;
        session.pending_field = None;
        return Step::reply(vec![Outbound::now(templates::forwarded_to_human())]);
    }

    match Branch::for_code(input) {
        Some(branch) => {
            session
                .collected_fields
                .insert(SELECTED_OPTION_FIELD.to_string(), input.to_string());
            session.dialogue_state = branch.state;
            session.pending_field = branch.next_missing(session).map(str::to_string);
            Step::reply(vec![Outbound::now(templates::branch_opening(branch.option))])
        }
        None => Step::reply(vec![Outbound::now(templates::invalid_option())]),
    }
}

fn collect_field(session: &mut Session, input: &str) -> Step {
    let Some(branch) = Branch::for_state(session.dialogue_state) else {
        return Step::default();
    };

    let Some(field) = branch.next_missing(session) else {
        // All fields present already (e.g. an interrupted completion); finish now.
        return complete(session);
    };

    if input.is_empty() {
        let prompt = if Some(&field) == branch.fields.first() {
            templates::branch_opening(branch.option)
        } else {
            templates::field_prompt(field)
        };
        return Step::reply(vec![Outbound::now(prompt)]);
    }

    session.set_field_if_absent(field, input);

    match branch.next_missing(session) {
        Some(next) => {
            session.pending_field = Some(next.to_string());
            Step::reply(vec![Outbound::now(templates::field_prompt(next))])
        }
        None => complete(session),
    }
}

fn complete(session: &mut Session) -> Step {
    session.dialogue_state = DialogueState::Completed;
    session.pending_field = None;
    Step {
        replies: vec![
            Outbound::now(templates::summary(&session.collected_fields)),
            Outbound::now(templates::thank_you()),
        ],
        completed: true,
    }
}

/// Send the contact back to the main menu, keeping only their name.
pub fn return_to_menu(session: &mut Session) -> Step {
    let name = session.collected_fields.remove(NAME_FIELD);
    session.collected_fields.clear();
    if let Some(name) = name {
        session.collected_fields.insert(NAME_FIELD.to_string(), name);
    }
    session.dialogue_state = DialogueState::WaitingOption;
    session.pending_field = None;
    Step::reply(vec![Outbound::now(templates::main_menu(
        session.field(NAME_FIELD),
    ))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn session() -> Session {
        Session::new(
            "+5511999990000",
            "Hi",
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn command_parsing_is_trimmed_and_case_insensitive() {
        assert_eq!(Command::parse("  STOP "), Some(Command::Stop));
        assert_eq!(Command::parse("Menu"), Some(Command::Menu));
        assert_eq!(Command::parse("stop please"), None);
        assert_eq!(Command::parse("1"), None);
    }

    #[test]
    fn initial_greets_then_paces_name_prompt() {
        let mut s = session();
        let step = advance(&mut s, "Hi");
        assert_eq!(s.dialogue_state, DialogueState::WaitingName);
        assert_eq!(step.replies.len(), 2);
        assert!(!step.replies[0].paced);
        assert!(step.replies[0].text.starts_with("EP ENGENHARIA"));
        assert!(step.replies[1].paced);
        assert_eq!(step.replies[1].text, templates::name_request());
    }

    #[test]
    fn name_is_trimmed_and_menu_personalized() {
        let mut s = session();
        s.dialogue_state = DialogueState::WaitingName;
        let step = advance(&mut s, "  Maria ");
        assert_eq!(s.field("name"), Some("Maria"));
        assert_eq!(s.dialogue_state, DialogueState::WaitingOption);
        assert_eq!(step.replies.len(), 1);
        assert!(step.replies[0].paced);
        assert!(step.replies[0].text.starts_with("Olá, Maria!"));
    }

    #[test]
    fn invalid_option_keeps_state() {
        let mut s = session();
        s.dialogue_state = DialogueState::WaitingOption;
        let step = advance(&mut s, "7");
        assert_eq!(s.dialogue_state, DialogueState::WaitingOption);
        assert_eq!(step.replies[0].text, templates::invalid_option());
        assert!(s.field(SELECTED_OPTION_FIELD).is_none());
    }

    #[test]
    fn option_six_forwards_to_human() {
        let mut s = session();
        s.dialogue_state = DialogueState::WaitingOption;
        let step = advance(&mut s, "6");
        assert_eq!(s.dialogue_state, DialogueState::ForwardedToHuman);
        assert_eq!(step.replies[0].text, templates::forwarded_to_human());

        let silent = advance(&mut s, "hello?");
        assert!(silent.replies.is_empty());
        assert_eq!(s.dialogue_state, DialogueState::ForwardedToHuman);
    }

    #[test]
    fn every_branch_walks_its_fields_and_completes() {
        for branch in BRANCHES {
            let mut s = session();
            s.dialogue_state = DialogueState::WaitingOption;
            s.collected_fields.insert("name".into(), "Maria".into());

            let opening = advance(&mut s, &branch.option.to_string());
            assert_eq!(s.dialogue_state, branch.state);
            assert_eq!(opening.replies[0].text, templates::branch_opening(branch.option));
            assert_eq!(s.pending_field.as_deref(), branch.fields.first().copied());

            for (i, field) in branch.fields.iter().enumerate() {
                let step = advance(&mut s, &format!("answer {i}"));
                assert_eq!(s.field(field), Some(format!("answer {i}").as_str()));
                if i + 1 < branch.fields.len() {
                    assert!(!step.completed);
                    assert_eq!(step.replies[0].text, templates::field_prompt(branch.fields[i + 1]));
                } else {
                    assert!(step.completed);
                    assert_eq!(step.replies.len(), 2);
                    assert!(step.replies[0].text.contains("Resumo"));
                    assert_eq!(step.replies[1].text, templates::thank_you());
                }
            }
            assert_eq!(s.dialogue_state, DialogueState::Completed);
            assert!(s.pending_field.is_none());
        }
    }

    #[test]
    fn detail_handler_resumes_from_data_not_pending_field() {
        let mut s = session();
        s.dialogue_state = DialogueState::Option2Details;
        s.collected_fields.insert("wellDepth".into(), "80m".into());
        s.pending_field = Some("wellDepth".into());

        advance(&mut s, "2000 L/h");
        assert_eq!(s.field("waterFlow"), Some("2000 L/h"));
        assert_eq!(s.field("wellDepth"), Some("80m"));
        assert_eq!(s.pending_field.as_deref(), Some("pumpPreference"));
    }

    #[test]
    fn completed_restarts_from_initial() {
        let mut s = session();
        s.dialogue_state = DialogueState::Completed;
        s.collected_fields.insert("budget".into(), "10k".into());
        let step = advance(&mut s, "oi de novo");
        assert_eq!(s.dialogue_state, DialogueState::WaitingName);
        assert!(s.collected_fields.is_empty());
        assert!(step.replies[0].text.starts_with("EP ENGENHARIA"));
    }

    #[test]
    fn menu_keeps_only_the_name() {
        let mut s = session();
        s.dialogue_state = DialogueState::Option4Details;
        s.collected_fields.insert("name".into(), "João".into());
        s.collected_fields.insert("selectedOption".into(), "4".into());
        s.collected_fields.insert("budget".into(), "10k".into());
        s.pending_field = Some("financingPreference".into());

        let step = return_to_menu(&mut s);
        assert_eq!(s.dialogue_state, DialogueState::WaitingOption);
        assert_eq!(s.collected_fields.len(), 1);
        assert_eq!(s.field("name"), Some("João"));
        assert!(s.pending_field.is_none());
        assert!(step.replies[0].text.starts_with("Olá, João!"));
    }

    #[test]
    fn blank_answer_reprompts_without_storing() {
        let mut s = session();
        s.dialogue_state = DialogueState::Option1Details;
        let step = advance(&mut s, "   ");
        assert!(s.field("energyConsumption").is_none());
        assert_eq!(step.replies[0].text, templates::branch_opening(1));
    }

    proptest::proptest! {
        #[test]
        fn collected_fields_are_never_overwritten(answers in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            let mut s = session();
            s.dialogue_state = DialogueState::Option5Details;
            let mut first_seen = std::collections::BTreeMap::new();
            for answer in &answers {
                advance(&mut s, answer);
                for (k, v) in &s.collected_fields {
                    let prior = first_seen.entry(k.clone()).or_insert_with(|| v.clone());
                    proptest::prop_assert_eq!(&*prior, v);
                }
                if s.dialogue_state == DialogueState::Completed {
                    break;
                }
            }
        }
    }
}
