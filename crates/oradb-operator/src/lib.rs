//! oradb operator: controllers, CRD install and admin commands

pub mod cli;
pub mod commands;
pub mod controller_runner;
pub mod crds;
