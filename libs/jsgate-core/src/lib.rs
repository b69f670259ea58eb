//! Domain logic for scoped script delivery: whitelist patterns, header
//! normalization, matching, the delivery decision for scripts and popunder
//! campaigns, access analytics and custom domain verification. Storage sits
//! behind the traits in [`repo`].

pub mod analytics;
pub mod delivery;
pub mod dns;
pub mod error;
pub mod matcher;
pub mod memory;
pub mod model;
pub mod normalize;
pub mod pattern;
pub mod popunder;
pub mod repo;
pub mod secondary;

pub use error::{
    ActivationError, DuplicateError, InvalidCampaignError, InvalidPatternError, NoDomainError,
};
