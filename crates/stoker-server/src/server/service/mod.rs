//! HTTP service implementation and worker coordination logic.
//!
//! This module contains the client-facing submission endpoint and the glue
//! that delegates accepted tasks to the background worker pool.
//!
//! ## Structure
//!
//! - [`handler`] - HTTP entry point (`TaskService`).

pub mod handler;
