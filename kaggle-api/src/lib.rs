pub mod client;
pub mod notebook;
pub mod resolver;

// Re-export the ergonomic client and configuration for easy access
pub use client::{Configuration, Credential, KaggleClient, KaggleError};
pub use resolver::{ResourceKind, ResourceRef, resolve};

/// Production Kaggle origin; the default `Configuration::base_path`.
pub const KAGGLE_BASE_URL: &str = "https://www.kaggle.com";
