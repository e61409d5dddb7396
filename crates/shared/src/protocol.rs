use serde::{Deserialize, Serialize};

use crate::{domain::NavigationData, error::FaultReport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TransitionEvent {
    BeforeReveal { navigation: NavigationData },
    RevealStarted,
    MidEnter,
    AfterReveal { navigation: NavigationData },
    Fault(FaultReport),
}

impl TransitionEvent {
    /// Names of the window events page scripts historically listened for.
    pub fn dom_event_names(&self) -> &'static [&'static str] {
        match self {
            TransitionEvent::BeforeReveal { .. } => &["pageTransitionBeforeReveal"],
            TransitionEvent::RevealStarted => &["pageTransitionRevealStart"],
            TransitionEvent::MidEnter => &["pageTransitionCompleted", "pageTransitionMidEnter"],
            TransitionEvent::AfterReveal { .. } => &["pageTransitionAfterReveal"],
            TransitionEvent::Fault(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ElementId, PageRef};

    #[test]
    fn mid_enter_keeps_legacy_completed_name() {
        let names = TransitionEvent::MidEnter.dom_event_names();
        assert_eq!(names[0], "pageTransitionCompleted");
        assert!(names.contains(&"pageTransitionMidEnter"));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = TransitionEvent::AfterReveal {
            navigation: NavigationData::first_load(PageRef::new(ElementId(7), "Home")),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "after_reveal");
        assert_eq!(json["payload"]["navigation"]["next"]["namespace"], "Home");
        assert_eq!(json["payload"]["navigation"]["next"]["container"], 7);
    }
}
