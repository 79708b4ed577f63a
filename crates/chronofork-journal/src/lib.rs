//! Chronofork Journal -- a queryable record of what happened to time.
//!
//! The temporal engine reports every fork, abandon, boundary notice, paradox,
//! win and collaborator notice to a [`TemporalJournal`](journal::TemporalJournal).
//! The journal is an observability layer only: nothing in the simulation
//! reads it back.
//!
//! # Modules
//!
//! - [`journal`]: the event log and its query API.

#![deny(unsafe_code)]

pub mod journal;
