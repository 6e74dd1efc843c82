//! Container shapes, method roles and structural capability flags.

use bitflags::bitflags;
use strum::{Display, EnumString};

/// Collection protocol a container type is treated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Shape {
	List,
	Set,
	Dict,
	/// No recognised protocol; behavior comes entirely from method annotations.
	Custom,
}

/// Semantic role a container method can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Role {
	Appender,
	Remover,
	Iterator,
	Adds,
	Replaces,
	Removes,
	RemovesReturn,
	BulkReplace,
	InternallyInstrumented,
}

impl Role {
	pub const ALL: [Role; 9] = [
		Role::Appender,
		Role::Remover,
		Role::Iterator,
		Role::Adds,
		Role::Replaces,
		Role::Removes,
		Role::RemovesReturn,
		Role::BulkReplace,
		Role::InternallyInstrumented,
	];

	pub fn as_set(self) -> RoleSet {
		match self {
			Role::Appender => RoleSet::APPENDER,
			Role::Remover => RoleSet::REMOVER,
			Role::Iterator => RoleSet::ITERATOR,
			Role::Adds => RoleSet::ADDS,
			Role::Replaces => RoleSet::REPLACES,
			Role::Removes => RoleSet::REMOVES,
			Role::RemovesReturn => RoleSet::REMOVES_RETURN,
			Role::BulkReplace => RoleSet::BULK_REPLACE,
			Role::InternallyInstrumented => RoleSet::INTERNALLY_INSTRUMENTED,
		}
	}

	pub(crate) fn article(self) -> &'static str {
		match self {
			Role::Appender | Role::Iterator | Role::Adds | Role::InternallyInstrumented => "an",
			_ => "a",
		}
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct RoleSet: u16 {
		const APPENDER = 1 << 0;
		const REMOVER = 1 << 1;
		const ITERATOR = 1 << 2;
		const ADDS = 1 << 3;
		const REPLACES = 1 << 4;
		const REMOVES = 1 << 5;
		const REMOVES_RETURN = 1 << 6;
		const BULK_REPLACE = 1 << 7;
		const INTERNALLY_INSTRUMENTED = 1 << 8;
	}
}

impl RoleSet {
	pub fn roles(self) -> impl Iterator<Item = Role> {
		Role::ALL.into_iter().filter(move |r| self.contains(r.as_set()))
	}
}

impl From<Role> for RoleSet {
	fn from(role: Role) -> Self {
		role.as_set()
	}
}

impl FromIterator<Role> for RoleSet {
	fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
		let mut set = RoleSet::empty();
		for role in iter {
			set |= role.as_set();
		}
		set
	}
}

bitflags! {
	/// Native operations a container type provides, as declared by its descriptor.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct StructuralCaps: u16 {
		const LEN = 1 << 0;
		const INDEX_GET = 1 << 1;
		const INDEX_INSERT = 1 << 2;
		const INDEX_DELETE = 1 << 3;
		const MEMBER_CONTAINS = 1 << 4;
		const MEMBER_ADD = 1 << 5;
		const MEMBER_DISCARD = 1 << 6;
		const MEMBER_POP = 1 << 7;
		const KEY_GET = 1 << 8;
		const KEY_SET = 1 << 9;
		const KEY_DELETE = 1 << 10;
		const ITERATE = 1 << 11;

		const LIST = Self::INDEX_INSERT.bits() | Self::INDEX_DELETE.bits() | Self::LEN.bits();
		const SET = Self::MEMBER_ADD.bits() | Self::MEMBER_DISCARD.bits() | Self::MEMBER_POP.bits();
		const DICT = Self::KEY_SET.bits() | Self::KEY_DELETE.bits();
	}
}

impl StructuralCaps {
	/// Infers the shape in precedence order: list, then set, then dict.
	pub fn detect_shape(self) -> Shape {
		if self.contains(Self::LIST) {
			Shape::List
		} else if self.contains(Self::SET) {
			Shape::Set
		} else if self.contains(Self::DICT) {
			Shape::Dict
		} else {
			Shape::Custom
		}
	}
}
