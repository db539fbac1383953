//! The `projecthub` library crate.
//!
//! This crate contains the domain models, authentication mechanisms, routing
//! configuration, and error handling for the ProjectHub API. It is used by the
//! server binary (`main.rs`) and the `create_admin` bootstrap binary.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
