//! Declarative key specifications for keyed collections.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{KeyFuncMap, keyed_by_attribute, keyed_by_derived_column};
use crate::attribute::ContainerFactory;
use crate::error::ConfigurationError;
use crate::member::{AttributeSource, KeyValue, Member};

/// What a keyed collection does with a value whose key attribute was never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpopulatedPolicy {
	#[default]
	Raise,
	Ignore,
}

/// A table-qualified column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
	table: String,
	name: String,
}

impl Column {
	pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			name: name.into(),
		}
	}

	/// Parses `table.column`. Bare names are rejected; a column expression needs its table.
	pub fn parse(expr: &str) -> Result<Self, ConfigurationError> {
		let expr = expr.trim();
		match expr.split_once('.') {
			Some((table, name)) if !table.is_empty() && !name.is_empty() && !name.contains('.') => Ok(Self::new(table, name)),
			_ => Err(ConfigurationError::ColumnExpected(expr.to_owned())),
		}
	}

	pub fn table(&self) -> &str {
		&self.table
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub(crate) fn read<V: AttributeSource>(&self, value: &V) -> Option<KeyValue> {
		value.column(&self.table, &self.name)
	}
}

impl fmt::Display for Column {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}", self.table, self.name)
	}
}

/// One column, or several forming a tuple key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSpec {
	Single(Column),
	Composite(Vec<Column>),
}

impl ColumnSpec {
	/// Parses `t.a` or a comma-separated list `t.a, t.b`.
	pub fn parse(expr: &str) -> Result<Self, ConfigurationError> {
		let parts: Vec<&str> = expr.split(',').collect();
		Self::from_parts(&parts)
	}

	pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Result<Self, ConfigurationError> {
		let mut columns = parts.iter().map(|part| Column::parse(part.as_ref())).collect::<Result<Vec<_>, _>>()?;
		match columns.len() {
			0 => Err(ConfigurationError::ColumnExpected(String::new())),
			1 => Ok(ColumnSpec::Single(columns.remove(0))),
			_ => Ok(ColumnSpec::Composite(columns)),
		}
	}

	pub fn columns(&self) -> &[Column] {
		match self {
			ColumnSpec::Single(column) => std::slice::from_ref(column),
			ColumnSpec::Composite(columns) => columns,
		}
	}
}

/// Serializable declaration of a keyed collection's key function.
///
/// ```toml
/// kind = "column"
/// columns = ["b.x", "b.y"]
/// on_unpopulated = "ignore"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeySpec {
	Attribute {
		name: String,
		#[serde(default)]
		on_unpopulated: UnpopulatedPolicy,
	},
	Column {
		columns: Vec<String>,
		#[serde(default)]
		on_unpopulated: UnpopulatedPolicy,
	},
}

impl KeySpec {
	pub fn on_unpopulated(&self) -> UnpopulatedPolicy {
		match self {
			KeySpec::Attribute { on_unpopulated, .. } | KeySpec::Column { on_unpopulated, .. } => *on_unpopulated,
		}
	}

	/// Container factory for the declared key.
	pub fn factory<V>(&self) -> Result<ContainerFactory<KeyFuncMap<KeyValue, V>>, ConfigurationError>
	where
		V: Member + AttributeSource,
	{
		match self {
			KeySpec::Attribute { name, on_unpopulated } => Ok(keyed_by_attribute(name.clone(), *on_unpopulated)),
			KeySpec::Column { columns, on_unpopulated } => {
				let spec = ColumnSpec::from_parts(columns)?;
				Ok(keyed_by_derived_column(spec, *on_unpopulated))
			}
		}
	}
}
