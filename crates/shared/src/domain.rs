use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);
    };
}

id_newtype!(ElementId);
id_newtype!(ReadyToken);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Namespace {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub container: ElementId,
    pub namespace: Namespace,
}

impl PageRef {
    pub fn new(container: ElementId, namespace: impl Into<Namespace>) -> Self {
        Self {
            container,
            namespace: namespace.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationData {
    pub current: Option<PageRef>,
    pub next: PageRef,
}

impl NavigationData {
    pub fn first_load(next: PageRef) -> Self {
        Self {
            current: None,
            next,
        }
    }

    pub fn between(current: PageRef, next: PageRef) -> Self {
        Self {
            current: Some(current),
            next,
        }
    }

    pub fn current_container(&self) -> Option<ElementId> {
        self.current.as_ref().map(|page| page.container)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    Once,
    Leave,
    BeforeEnter,
    Enter,
    After,
}

impl TransitionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPhase::Once => "once",
            TransitionPhase::Leave => "leave",
            TransitionPhase::BeforeEnter => "before_enter",
            TransitionPhase::Enter => "enter",
            TransitionPhase::After => "after",
        }
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
