//! Mortgage application intake: role policy, application and document lifecycles,
//! visibility rules, bulk review transitions and the audit trail that records them.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
