use serde::{Deserialize, Serialize};

use crate::domain::{Namespace, TransitionPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Degraded,
    ControllerFault,
    ResourceLoad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultReport {
    pub kind: FaultKind,
    pub phase: Option<TransitionPhase>,
    pub namespace: Option<Namespace>,
    pub message: String,
}

impl FaultReport {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            phase: None,
            namespace: None,
            message: message.into(),
        }
    }

    pub fn in_phase(mut self, phase: TransitionPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn for_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }
}
