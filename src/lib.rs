//! Track how a day is spent straight from the terminal. A day is opened,
//! activities are logged back-to-back against an anchor time, to-dos are
//! managed alongside, and the result can be reviewed as a timeline or a
//! per-category summary.
//!

pub mod cli;
pub mod store;
pub mod tracker;
pub mod utils;
