pub mod config;
pub mod ids;
pub mod layout;
pub mod model;
pub mod progression;
pub mod ranking;
pub mod recurrence;
pub mod service;
pub mod store;
pub mod streaks;
pub mod undo;
pub mod viewport;

pub use crate::service::{DaySchedule, NewTask, PlannerService, PlannerServiceBuilder};
