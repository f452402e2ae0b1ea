//! Clearance: a multi-level-security access-control service.
//!
//! Subjects and objects carry a [`label::Label`]: a level plus a set of
//! categories. Every operation on an object is gated by a decision from
//! [`policy`], applied by [`service::AccessService`], and recorded in the
//! [`audit`] trail whether it was granted or denied.
//!
//! See `DESIGN.md` for the full architecture.

#![forbid(unsafe_code)]

pub mod audit;
pub mod config;
pub mod credential;
pub mod error;
pub mod label;
pub mod logging;
pub mod policy;
pub mod request;
pub mod script;
pub mod service;
pub mod store;
