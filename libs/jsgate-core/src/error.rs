use thiserror::Error;

/// Rejection of a whitelist pattern at write time. The reason is shown to
/// the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct InvalidPatternError {
    pub reason: &'static str,
}

impl InvalidPatternError {
    pub(crate) fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A header value that does not carry a usable host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no domain in request")]
pub struct NoDomainError;

/// Rejected popunder settings. Shown to the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct InvalidCampaignError {
    pub reason: &'static str,
}

/// A write that hit a uniqueness rule of the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{what} already exists")]
pub struct DuplicateError {
    pub what: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("Domain must be verified before activation (current status: {0})")]
    NotVerified(crate::model::DomainStatus),
}
