use host_integration::ResourceKind;
use shared::domain::Namespace;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("router is not available; load the page-transition router before wiring transitions")]
    RouterMissing,
    #[error("router rejected the transition registration: {0}")]
    Registration(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load {kind:?} {url}: {reason}")]
pub struct LoadError {
    pub kind: ResourceKind,
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum MountError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("cannot build controller url for namespace {namespace}: {source}")]
    ControllerUrl {
        namespace: Namespace,
        source: url::ParseError,
    },
}
