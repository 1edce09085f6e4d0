use thiserror::Error;

macro_rules! scan_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Scan {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Scan {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors are only ever produced while *setting up* monitoring: describing types, loading them into
/// a catalog, configuring a registry or consulting a scanner. Once a registry is running, its public
/// operations never fail; problems with individual entries are logged and skipped, and problems
/// reading a value are reported as data through [`crate::runtime::Reading::Failed`].
///
/// # Error Categories
///
/// ## Scanning Errors
/// - [`Error::Scan`] - The annotation scanner could not produce its entries
///
/// ## Type Model Errors
/// - [`Error::DuplicateMember`] - A type declares the same member twice
/// - [`Error::TypeAlreadyLoaded`] - A type name was loaded into a catalog twice
/// - [`Error::TypeNotFound`] - A referenced type is not present in the catalog
/// - [`Error::TypeError`] - General type model inconsistency
///
/// ## Configuration Errors
/// - [`Error::InvalidConfig`] - A registry configuration failed validation
/// - [`Error::MissingComponent`] - A registry builder was finished without a required collaborator
///
/// # Examples
///
/// ```rust
/// use varscope::{Error, runtime::{FieldDef, TypeBuilder, ValueType}};
///
/// let result = TypeBuilder::new("app.Cache")
///     .field(FieldDef::new_static("hits", ValueType::I64, || 0_i64))
///     .field(FieldDef::new_static("hits", ValueType::I64, || 1_i64))
///     .build();
///
/// match result {
///     Err(Error::DuplicateMember { type_name, member }) => {
///         assert_eq!(type_name, "app.Cache");
///         assert_eq!(member, "hits");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The annotation scanner failed to produce entries.
    ///
    /// The error includes the source location where the failure was detected for debugging
    /// purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what went wrong
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Scan failed - {file}:{line}: {message}")]
    Scan {
        /// The message to be printed for the Scan error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A type declares the same field or method name twice.
    ///
    /// Member names are the identity used by scan entries, so they have to be unique per kind
    /// within a single type.
    #[error("Type '{type_name}' declares member '{member}' more than once")]
    DuplicateMember {
        /// The name of the offending type
        type_name: String,
        /// The duplicated member name
        member: String,
    },

    /// A type with the same name has already been loaded.
    #[error("Type '{0}' has already been loaded")]
    TypeAlreadyLoaded(String),

    /// A type referenced by name could not be found.
    #[error("Failed to find type '{0}'")]
    TypeNotFound(String),

    /// General error in the type model.
    #[error("{0}")]
    TypeError(String),

    /// The registry configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A required collaborator was not supplied to a builder.
    #[error("Missing required component: {0}")]
    MissingComponent(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_macro() {
        let error = scan_error!("index for '{}' is corrupt", "Monitored");
        match error {
            Error::Scan {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "index for 'Monitored' is corrupt");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            _ => panic!("unexpected variant"),
        }
    }

    #[test]
    fn test_display() {
        let error = Error::TypeAlreadyLoaded("app.Pool".to_string());
        assert_eq!(error.to_string(), "Type 'app.Pool' has already been loaded");

        let error = Error::MissingComponent("scanner");
        assert_eq!(error.to_string(), "Missing required component: scanner");
    }
}
