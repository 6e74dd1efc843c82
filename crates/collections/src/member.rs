//! Member values and dynamic keys.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A value that can live in an instrumented collection.
///
/// Equality is the membership notion used for diffing and no-op detection, so entity handles
/// should compare by identity.
pub trait Member: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Member for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Dynamic key scalar derived from a member's attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
	Null,
	Bool(bool),
	Int(i64),
	Str(String),
	Tuple(Vec<KeyValue>),
}

impl fmt::Display for KeyValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			KeyValue::Null => f.write_str("null"),
			KeyValue::Bool(b) => write!(f, "{b}"),
			KeyValue::Int(i) => write!(f, "{i}"),
			KeyValue::Str(s) => write!(f, "{s:?}"),
			KeyValue::Tuple(parts) => {
				f.write_str("(")?;
				for (i, part) in parts.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{part}")?;
				}
				f.write_str(")")
			}
		}
	}
}

impl From<&str> for KeyValue {
	fn from(value: &str) -> Self {
		KeyValue::Str(value.to_owned())
	}
}

impl From<String> for KeyValue {
	fn from(value: String) -> Self {
		KeyValue::Str(value)
	}
}

impl From<i64> for KeyValue {
	fn from(value: i64) -> Self {
		KeyValue::Int(value)
	}
}

impl From<bool> for KeyValue {
	fn from(value: bool) -> Self {
		KeyValue::Bool(value)
	}
}

impl<T: Into<KeyValue>> From<Option<T>> for KeyValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(KeyValue::Null, Into::into)
	}
}

/// Read access to a member's named attributes, used by attribute- and column-keyed collections.
pub trait AttributeSource {
	/// `None` when the attribute was never assigned; `Some(KeyValue::Null)` when it was set to null.
	fn attribute(&self, name: &str) -> Option<KeyValue>;

	/// Value of the attribute mapped to `table.name`. Defaults to the attribute named after the
	/// column.
	fn column(&self, _table: &str, name: &str) -> Option<KeyValue> {
		self.attribute(name)
	}
}

impl<T: AttributeSource + ?Sized> AttributeSource for Arc<T> {
	fn attribute(&self, name: &str) -> Option<KeyValue> {
		(**self).attribute(name)
	}

	fn column(&self, table: &str, name: &str) -> Option<KeyValue> {
		(**self).column(table, name)
	}
}
