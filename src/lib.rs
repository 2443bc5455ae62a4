//! Service that checks whether links are safe and working for end users.
//!
//! Links are checked in the background by a job worker; callers poll single
//! links or batches, and batches can notify a webhook once every link has a
//! result.

pub mod admin;
pub mod batch;
pub mod checker;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod reputation;
pub mod routes;
pub mod runner;
pub mod server;
pub mod services;
pub mod state;
pub mod store;
pub mod util;
pub mod webhook;
