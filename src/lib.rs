//! Intake: multi-step data entry wizards for a medical transport operator
//!
//! Each wizard (patient, institution, trip, employee) is a table of steps
//! over a typed field schema. The engine validates one step at a time,
//! skips steps whose inclusion condition does not hold, keeps resumable
//! drafts and hands validated submissions to a finalizer.

pub mod cli;
pub mod core;
pub mod forms;
pub mod schema;
