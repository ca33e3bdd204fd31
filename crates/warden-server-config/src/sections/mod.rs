// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod access;
mod cache;
mod catalogue;
mod database;
mod logging;

pub use access::{AccessConfig, AccessConfigLayer};
pub use cache::{CacheConfig, CacheConfigLayer};
pub use catalogue::{CatalogueConfig, CatalogueConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
