//! # varscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the varscope library. Import this module to get quick access to everything needed to
//! describe types, discover their monitored members and read the resulting variables.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all varscope operations
pub use crate::Error;

/// The result type used throughout varscope
pub use crate::Result;

/// Registry configuration
pub use crate::config::{DuplicatePolicy, RegistryConfig};

// ================================================================================================
// Registry and Variables
// ================================================================================================

/// The registry and the variables it produces
pub use crate::variables::{Variable, VariableKind, VariableRc, VariableRegistry};

// ================================================================================================
// Collaborators
// ================================================================================================

/// Discovery of marked members
pub use crate::scanner::{AnnotationScanner, ManifestScanner, TypeDeclaration};

/// Load detection
pub use crate::detector::ClassDetector;

/// Variable naming
pub use crate::naming::{DefaultNamingStrategy, NamingStrategy};

// ================================================================================================
// Host Type Model
// ================================================================================================

/// Types, members and markers
pub use crate::runtime::{
    FieldDef, FieldFlags, Marker, Member, MethodDef, MethodFlags, TypeBuilder, TypeCatalog,
    TypeDef, TypeRc,
};

/// Instances
pub use crate::runtime::{Instance, InstanceRc, InstanceRef};

/// Values and read outcomes
pub use crate::runtime::{ReadError, Reading, Value, ValueType};
