pub mod access_log;
pub mod campaign;
pub mod custom_domain;
pub mod project;
pub mod script;
pub mod whitelist;
