//! Core types shared by every component: the typed error enum and its
//! user-facing presentation.

pub mod error;

pub use error::{ErrorClass, ErrorContext, UpdateError, user_friendly_error};
