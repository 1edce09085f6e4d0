// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # varscope
//!
//! Discovery and binding of monitored variables.
//!
//! `varscope` exposes internal values of a running program, static or instance-bound fields and
//! zero-argument accessors that carry a monitoring marker, through a single queryable registry.
//! The registry reconciles three facts that become known independently of each other:
//!
//! - which members were **marked** for monitoring, reported by an [`scanner::AnnotationScanner`]
//! - which types have **loaded** so far, reported by a [`detector::ClassDetector`]
//! - which **instances** exist to bind instance members to, registered by the application
//!
//! and is safe to query from any thread while the program keeps loading types and creating
//! objects.
//!
//! ## Features
//!
//! - **Lazy discovery** - Marked members are scanned once, resolved as soon as their type loads
//! - **Weak binding** - Registering an instance never extends its lifetime
//! - **Override aware** - An overridden monitored method is reported once, from the subclass
//! - **Failure as data** - A failing read yields [`runtime::Reading::Failed`], never a panic
//! - **Concurrent** - Lock-free maps for state, a short critical section per newly loaded type
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{atomic::{AtomicI64, Ordering}, Arc};
//! use varscope::prelude::*;
//!
//! struct Session {
//!     open_requests: AtomicI64,
//! }
//! varscope::instance!(Session, "app.Session");
//!
//! // Describe the type, as a reflective runtime would
//! let session_type = TypeBuilder::new("app.Session")
//!     .field(
//!         FieldDef::new_instance::<Session, _, _>("open_requests", ValueType::I64, |s| {
//!             s.open_requests.load(Ordering::Relaxed)
//!         })
//!         .marked(Marker::new("Monitored")),
//!     )
//!     .build()?;
//!
//! // Discovery knows about the member before the type is loaded
//! let scanner = ManifestScanner::new();
//! scanner.declare_type(&session_type);
//!
//! let catalog = Arc::new(TypeCatalog::new());
//! let registry = VariableRegistry::new(scanner, catalog.clone());
//!
//! catalog.load(session_type)?;
//! let session: InstanceRc = Arc::new(Session { open_requests: AtomicI64::new(4) });
//! registry.register_instance(&session);
//!
//! for variable in registry.get_variables() {
//!     println!("{} = {}", variable.name(), variable.read());
//! }
//! # assert_eq!(registry.get_variables().len(), 1);
//! # Ok::<(), varscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`runtime`] - The host type model: types, members, markers, values and instances
//! - [`scanner`] - Discovery of marked members ([`scanner::ManifestScanner`])
//! - [`detector`] - Load detection ([`runtime::TypeCatalog`] is the stock detector)
//! - [`naming`] - Display names for variables
//! - [`variables`] - [`Variable`]s and the [`VariableRegistry`]
//! - [`config`] - Registry configuration
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events: `debug` for scan completion,
//! newly resolved types, registrations and sweeps, `warn` for scanner failures and scan entries
//! that do not match the loaded type, `trace` for ignored registrations. No subscriber is
//! installed; that choice is left to the application.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use varscope::prelude::*;
///
/// let registry = VariableRegistry::new(ManifestScanner::new(), TypeCatalog::new());
/// assert_eq!(registry.marker(), "Monitored");
/// ```
pub mod prelude;

/// Registry configuration
///
/// See [`config::RegistryConfig`] for the available options and presets.
pub mod config;

/// Load detection
///
/// The [`detector::ClassDetector`] trait tells the registry which types are loaded, without ever
/// causing a load.
pub mod detector;

/// Display names for monitored members
///
/// # Examples
///
/// ```rust
/// use varscope::{naming::{DefaultNamingStrategy, NamingStrategy}, runtime::{Member, MethodDef, ValueType}};
///
/// let method = MethodDef::new_static("get_queue_depth", ValueType::U64, || 3_u64);
/// assert_eq!(DefaultNamingStrategy.name(Member::Method(&method), None), "queue_depth");
/// ```
pub mod naming;

/// The host type model
///
/// Types, members and instances as seen by the registry, see the module documentation for how
/// they replace runtime reflection.
pub mod runtime;

/// Discovery of marked members
pub mod scanner;

/// Variables and the variable registry
pub mod variables;

/// `varscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// It is used for every fallible setup operation; registry queries themselves never fail.
pub type Result<T> = std::result::Result<T, Error>;

/// `varscope` Error type
///
/// # Examples
///
/// ```rust
/// use varscope::{Error, runtime::{TypeBuilder, TypeCatalog}};
///
/// let catalog = TypeCatalog::new();
/// catalog.load(TypeBuilder::new("app.Service").build()?)?;
///
/// match catalog.load(TypeBuilder::new("app.Service").build()?) {
///     Err(Error::TypeAlreadyLoaded(name)) => assert_eq!(name, "app.Service"),
///     _ => unreachable!(),
/// }
/// # Ok::<(), varscope::Error>(())
/// ```
pub use error::Error;

/// Registry configuration, see [`config::RegistryConfig`]
pub use config::{DuplicatePolicy, RegistryConfig};

/// The registry and its products, see [`variables::VariableRegistry`]
pub use variables::{Variable, VariableKind, VariableRc, VariableRegistry};
