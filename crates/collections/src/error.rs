//! Error types for collection instrumentation.

use crate::capability::{Role, Shape};

/// Result alias used throughout the crate.
pub type Result<T, E = CollectionError> = std::result::Result<T, E>;

/// Errors raised while classifying a container type or declaring a keyed collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
	#[error("type {type_name} must elect {} {role} method to be a collection class", .role.article())]
	MissingRole { type_name: &'static str, role: Role },
	#[error("type {type_name} binds the {role} role to both `{first}` and `{second}`")]
	DuplicateRole {
		type_name: &'static str,
		role: Role,
		first: &'static str,
		second: &'static str,
	},
	#[error("method `{method}` of {type_name} cannot be both appender and remover")]
	ConflictingRoles {
		type_name: &'static str,
		method: &'static str,
	},
	#[error("column expression expected for keyed collection; got '{0}'")]
	ColumnExpected(String),
}

/// Error raised by a listener to abort the mutation it was notified about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ListenerError {
	message: String,
}

impl ListenerError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
	#[error(transparent)]
	Configuration(#[from] ConfigurationError),
	#[error("incompatible collection type: {given} is not {wanted}-like")]
	TypeMismatch { given: Shape, wanted: Shape },
	#[error("attempt to assign sequence of size {given} to extended slice of size {expected}")]
	Range { given: usize, expected: usize },
	#[error("invalid state: {0}")]
	InvalidState(&'static str),
	#[error(
		"in event triggered from {event}: attribute '{attribute}' must be populated before the value is added to the dictionary"
	)]
	KeyPopulation { attribute: String, event: String },
	#[error(transparent)]
	Listener(#[from] ListenerError),
	#[error("{0} is not present in the collection")]
	NotFound(String),
	#[error("{0} from an empty collection")]
	Empty(&'static str),
	#[error("index {index} is out of range for a collection of length {len}")]
	IndexOutOfRange { index: isize, len: usize },
	#[error("slice step cannot be zero")]
	ZeroSliceStep,
	#[error("can not remove {value}: collection holds {held} under key {key}")]
	KeyConflict {
		value: String,
		held: String,
		key: String,
	},
	#[error("{type_name} has no instrumented method `{method}`")]
	UnknownMethod {
		type_name: &'static str,
		method: String,
	},
	#[error("missing argument {argument} for `{method}`")]
	MissingArgument {
		method: &'static str,
		argument: String,
	},
}

impl CollectionError {
	pub(crate) fn not_found(what: impl std::fmt::Debug) -> Self {
		Self::NotFound(format!("{what:?}"))
	}
}
