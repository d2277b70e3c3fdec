//! Scoping intake subsystem.
//!
//! A session is keyed by a client-generated id and moves through a fixed
//! forward-only lifecycle; the terminal `deliver` transition provisions a new
//! authenticated site. Magic-link grants prove control of an email address
//! for the dashboard, independent of site tokens.

pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod magic_link;
pub mod repo;
pub mod repository;

pub use lifecycle::LifecycleEngine;
pub use magic_link::MagicLinkIssuer;
