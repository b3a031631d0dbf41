//! Core of the AWB operator console: the shipment-creation workflow and the
//! data access layer it runs on.

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
