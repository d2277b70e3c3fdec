//! Site authentication: three-layer architecture (domain, repository, service).
//!
//! Every client-facing endpoint resolves a tenant identity here before
//! touching tenant data. Operator auth is a separate trust domain handled by
//! [`AgentAuth`].

pub mod domain;
pub mod errors;
pub mod repo;
pub mod repository;
pub mod service;

pub use service::{AgentAuth, SiteAuthService};
