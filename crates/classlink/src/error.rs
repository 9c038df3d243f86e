//! Error types for the `classlink` runtime.
//!
//! Every fallible runtime operation returns [`Result`]. Type mismatches at
//! the guarded dispatch entry points are reported as values, never panics,
//! and protocol violations (a constructor chain that broke the shared
//! prefix contract) are detected at registration or instantiation.

use std::fmt;

/// Ways a class or its constructor chain can break the layout protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The class declares fewer bytes than its parent's field block.
    SizeSmallerThanParent {
        /// Declared size of the class.
        size: usize,
        /// Size of the parent class.
        parent_size: usize,
    },

    /// A capability root was registered with a parent.
    BaseWithParent,

    /// The constructor chain never reached the base constructor, so the
    /// capability table was never installed.
    BaseNotInitialized,

    /// The class requires its own `clone` but construction finished with the
    /// root default.
    CloneNotOverridden,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SizeSmallerThanParent { size, parent_size } => write!(
                f,
                "size {size} is smaller than the parent's {parent_size} bytes"
            ),
            Violation::BaseWithParent => {
                write!(f, "a capability root cannot have a parent")
            }
            Violation::BaseNotInitialized => write!(
                f,
                "constructor chain did not delegate to the base constructor"
            ),
            Violation::CloneNotOverridden => {
                write!(f, "clone was not overridden by the constructor chain")
            }
        }
    }
}

/// Errors that can occur in the `classlink` runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The field block of an instance could not be allocated.
    AllocationFailure {
        /// Requested block size in bytes.
        size: usize,
    },

    /// An operation was applied to an instance lacking the required ancestor.
    TypeMismatch {
        /// Name of the class the operation requires.
        expected: String,
        /// Name of the instance's class.
        found: String,
    },

    /// A class or constructor broke the shared-prefix protocol.
    ProtocolViolation {
        /// Name of the offending class.
        class: String,
        /// What went wrong.
        violation: Violation,
    },

    /// Registering the class would exceed the configured chain depth.
    InheritanceTooDeep {
        /// Depth the new class would have.
        depth: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A typed field access fell outside the instance's field block.
    FieldOutOfBounds {
        /// Byte offset of the access.
        offset: usize,
        /// Width of the accessed field.
        width: usize,
        /// Size of the visible block.
        size: usize,
    },

    /// A constructor asked for an argument that was not supplied.
    MissingArgument {
        /// Position of the missing argument.
        index: usize,
    },

    /// A constructor argument had the wrong kind.
    ArgumentMismatch {
        /// Position of the argument.
        index: usize,
        /// Kind the constructor asked for.
        expected: &'static str,
        /// Kind that was supplied.
        found: &'static str,
    },

    /// A configuration value could not be parsed or is out of range.
    InvalidConfig {
        /// Name of the setting.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// The runtime was already initialized.
    AlreadyInitialized,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AllocationFailure { size } => {
                write!(f, "Unable to allocate {size} bytes for instance")
            }
            Error::TypeMismatch { expected, found } => write!(
                f,
                "Type mismatch: expected a descendant of `{expected}`, found `{found}`"
            ),
            Error::ProtocolViolation { class, violation } => {
                write!(f, "Protocol violation in class `{class}`: {violation}")
            }
            Error::InheritanceTooDeep { depth, limit } => write!(
                f,
                "Inheritance chain of depth {depth} exceeds the limit of {limit}"
            ),
            Error::FieldOutOfBounds {
                offset,
                width,
                size,
            } => write!(
                f,
                "Field of {width} bytes at offset {offset} is outside a {size}-byte block"
            ),
            Error::MissingArgument { index } => {
                write!(f, "Missing constructor argument {index}")
            }
            Error::ArgumentMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "Constructor argument {index}: expected {expected}, found {found}"
            ),
            Error::InvalidConfig { key, value } => {
                write!(f, "Invalid value `{value}` for {key}")
            }
            Error::AlreadyInitialized => {
                write!(f, "Runtime is already initialized")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Builds a [`Error::ProtocolViolation`] and reports it at error level.
    pub(crate) fn violation(class: &str, violation: Violation) -> Error {
        classlink_log::error!("class `{class}`: {violation}");

        #[cfg(feature = "violation_backtrace")]
        {
            let trace = backtrace::Backtrace::new();
            classlink_log::error!("violation raised at:\n{trace:?}");
        }

        Error::ProtocolViolation {
            class: class.to_string(),
            violation,
        }
    }
}

/// Result type for `classlink` runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::AllocationFailure { size: 64 }.to_string(),
            "Unable to allocate 64 bytes for instance"
        );
        assert_eq!(
            Error::ProtocolViolation {
                class: "vector".to_string(),
                violation: Violation::BaseNotInitialized,
            }
            .to_string(),
            "Protocol violation in class `vector`: constructor chain did not delegate to the base constructor"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::AlreadyInitialized, Error::AlreadyInitialized);
        assert_ne!(
            Error::MissingArgument { index: 0 },
            Error::MissingArgument { index: 1 }
        );
    }
}
