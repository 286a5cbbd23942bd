//! # Persona Common Library
//!
//! Shared code for the persona services including:
//! - Domain models (profiles, posts, Big Five trait scores)
//! - Caption and handle parsing helpers
//! - Configuration loading
//! - Logging setup

pub mod caption;
pub mod config;
pub mod error;
pub mod handle;
pub mod logging;
pub mod models;

pub use error::{Error, Result};
pub use models::{ImageRef, Post, Profile, Trait, TraitScores};
