pub mod aggregate;
pub mod date_key;
pub mod error;
pub mod exam;
pub mod habit;
pub mod heatmap;
pub mod model;
pub mod next_task;
pub mod service;
pub mod snapshot;
pub mod subjects;
pub mod weeks;

pub use crate::error::{Error, Result};
pub use crate::service::{StudyService, StudyServiceBuilder};
