//! Persistence for the single state document.
//! The basic idea is:
//!  - Everything lives in one JSON document: activities, active and completed
//!    tasks, the settings singleton and the day state.
//!  - Every write is a full read-modify-write rewrite of the document.
//!  - [json_store::JsonFileStore] is the on-disk realization; the
//!    [json_store::StateStore] trait keeps the tracker storage-agnostic.

pub mod document;
pub mod entities;
pub mod json_store;
