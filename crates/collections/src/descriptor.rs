//! Container type declarations.
//!
//! A container type opts into instrumentation by implementing [`Container`] and returning a
//! [`TypeDescriptor`]. The descriptor carries two kinds of information:
//!
//! - **Structural capabilities** recorded by the shape builders ([`TypeDescriptor::list`],
//!   [`TypeDescriptor::set`], [`TypeDescriptor::dict`]), available when the type implements the
//!   matching shape trait. Each shape contributes default role bindings.
//! - **Method annotations** ([`MethodAnnotation`]) binding named methods to roles. Annotations
//!   always override the structural defaults.
//!
//! Nothing here instantiates the container; classification works from the descriptor alone.

use std::fmt;
use std::hash::Hash;

use smallvec::SmallVec;

use crate::bulk::{BulkDiff, DiffInput, identity_diff, keyed_diff};
use crate::capability::{Role, RoleSet, Shape, StructuralCaps};
use crate::collection::{Collection, list, set};
use crate::error::Result;
use crate::member::{KeyValue, Member};

/// Member type of container `C`.
pub type MemberOf<C> = <C as Container>::Member;

/// Native method invoked with the raw container; events are fired around it from its annotation.
pub type RawMethod<C> = fn(&mut C, &MethodCall<MemberOf<C>>) -> Result<Option<MemberOf<C>>>;

/// Method that fires its own events through the collection handle.
pub type InstrumentedMethod<C> =
	fn(&Collection<C>, MethodCall<MemberOf<C>>) -> Result<Option<MemberOf<C>>>;

/// Enumerates the members of a raw container (the `iterator` role).
pub type IterFn<C> = fn(&C) -> Vec<MemberOf<C>>;

/// Computes the bulk replace diff (the `bulk_replace` role).
pub type DiffFn<C> = fn(&DiffInput<'_, C>) -> BulkDiff<MemberOf<C>>;

/// A type usable as the implementation of a collection attribute.
pub trait Container: Send + Sized + 'static {
	type Member: Member;

	fn descriptor() -> TypeDescriptor<Self>;
}

/// Index-addressed, ordered containers.
pub trait ListOps: Container {
	fn len(&self) -> usize;

	fn get(&self, index: usize) -> Option<&Self::Member>;

	/// Inserts at `index`, which is at most `len()`.
	fn insert_at(&mut self, index: usize, value: Self::Member);

	fn remove_at(&mut self, index: usize) -> Option<Self::Member>;

	fn replace_at(&mut self, index: usize, value: Self::Member) -> Option<Self::Member> {
		let old = self.remove_at(index)?;
		self.insert_at(index, value);
		Some(old)
	}

	fn position(&self, value: &Self::Member) -> Option<usize> {
		(0..self.len()).find(|&i| self.get(i) == Some(value))
	}

	fn to_vec(&self) -> Vec<Self::Member> {
		(0..self.len()).filter_map(|i| self.get(i).cloned()).collect()
	}
}

/// Unordered-membership containers.
pub trait SetOps: Container {
	fn len(&self) -> usize;

	fn contains(&self, value: &Self::Member) -> bool;

	/// Returns `false` when the value was already present.
	fn add(&mut self, value: Self::Member) -> bool;

	/// Returns `false` when the value was absent.
	fn discard(&mut self, value: &Self::Member) -> bool;

	fn members(&self) -> Vec<Self::Member>;
}

/// Key type of a dict-shaped container.
pub trait DictKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> DictKey for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Key-subscripted containers. Only values are collection members; keys are bookkeeping.
pub trait DictOps: Container {
	type Key: DictKey;

	fn len(&self) -> usize;

	fn get(&self, key: &Self::Key) -> Option<&Self::Member>;

	fn insert_entry(&mut self, key: Self::Key, value: Self::Member) -> Option<Self::Member>;

	fn remove_entry(&mut self, key: &Self::Key) -> Option<Self::Member>;

	/// Entries in iteration order.
	fn entries(&self) -> Vec<(Self::Key, Self::Member)>;

	fn last_key(&self) -> Option<Self::Key> {
		self.entries().pop().map(|(key, _)| key)
	}

	/// Key this container files `value` under, for containers that derive keys from values.
	fn key_for(&self, _value: &Self::Member) -> Option<Self::Key> {
		None
	}
}

/// Which argument of an annotated method carries the affected member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPosition {
	/// 1-based; position 0 is the receiver.
	Index(usize),
	Named(&'static str),
}

impl From<usize> for ArgPosition {
	fn from(index: usize) -> Self {
		ArgPosition::Index(index)
	}
}

impl From<&'static str> for ArgPosition {
	fn from(name: &'static str) -> Self {
		ArgPosition::Named(name)
	}
}

impl fmt::Display for ArgPosition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ArgPosition::Index(i) => write!(f, "#{i}"),
			ArgPosition::Named(name) => write!(f, "'{name}'"),
		}
	}
}

/// Membership effect of a non-instrumented method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutator {
	/// The argument is added; fires `append` before the call.
	Adds(ArgPosition),
	/// The argument is removed; fires `remove` before the call.
	Removes(ArgPosition),
	/// The argument is added and the returned value, if any, was displaced.
	Replaces(ArgPosition),
	/// The returned value was removed.
	RemovesReturn,
}

impl Mutator {
	pub fn role(self) -> Role {
		match self {
			Mutator::Adds(_) => Role::Adds,
			Mutator::Removes(_) => Role::Removes,
			Mutator::Replaces(_) => Role::Replaces,
			Mutator::RemovesReturn => Role::RemovesReturn,
		}
	}
}

pub enum MethodOp<C: Container> {
	Raw(RawMethod<C>),
	Instrumented(InstrumentedMethod<C>),
}

impl<C: Container> Clone for MethodOp<C> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<C: Container> Copy for MethodOp<C> {}

/// Role binding for one named method of a container type.
pub struct MethodAnnotation<C: Container> {
	pub(crate) name: &'static str,
	pub(crate) params: &'static [&'static str],
	pub(crate) roles: RoleSet,
	pub(crate) mutator: Option<Mutator>,
	pub(crate) op: MethodOp<C>,
}

impl<C: Container> Clone for MethodAnnotation<C> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<C: Container> Copy for MethodAnnotation<C> {}

impl<C: Container> fmt::Debug for MethodAnnotation<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MethodAnnotation")
			.field("name", &self.name)
			.field("params", &self.params)
			.field("roles", &self.roles)
			.field("mutator", &self.mutator)
			.finish()
	}
}

impl<C: Container> MethodAnnotation<C> {
	pub fn raw(name: &'static str, op: RawMethod<C>) -> Self {
		Self {
			name,
			params: &[],
			roles: RoleSet::empty(),
			mutator: None,
			op: MethodOp::Raw(op),
		}
	}

	pub fn instrumented(name: &'static str, op: InstrumentedMethod<C>) -> Self {
		Self {
			name,
			params: &[],
			roles: RoleSet::INTERNALLY_INSTRUMENTED,
			mutator: None,
			op: MethodOp::Instrumented(op),
		}
	}

	/// Parameter names after the receiver, used to resolve arguments passed by name.
	pub fn params(mut self, params: &'static [&'static str]) -> Self {
		self.params = params;
		self
	}

	pub fn appender(mut self) -> Self {
		self.roles |= RoleSet::APPENDER;
		self
	}

	pub fn remover(mut self) -> Self {
		self.roles |= RoleSet::REMOVER;
		self
	}

	pub fn adds(self, arg: impl Into<ArgPosition>) -> Self {
		self.with_mutator(Mutator::Adds(arg.into()))
	}

	pub fn removes(self, arg: impl Into<ArgPosition>) -> Self {
		self.with_mutator(Mutator::Removes(arg.into()))
	}

	pub fn replaces(self, arg: impl Into<ArgPosition>) -> Self {
		self.with_mutator(Mutator::Replaces(arg.into()))
	}

	pub fn removes_return(self) -> Self {
		self.with_mutator(Mutator::RemovesReturn)
	}

	pub(crate) fn with_mutator(mut self, mutator: Mutator) -> Self {
		if let Some(previous) = self.mutator {
			self.roles.remove(previous.role().as_set());
		}
		self.roles |= mutator.role().as_set();
		self.mutator = Some(mutator);
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn roles(&self) -> RoleSet {
		self.roles
	}

	pub fn mutator(&self) -> Option<Mutator> {
		self.mutator
	}

	pub fn is_internally_instrumented(&self) -> bool {
		self.roles.contains(RoleSet::INTERNALLY_INSTRUMENTED)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Emulation {
	#[default]
	Inferred,
	Shape(Shape),
	Nothing,
}

/// Role bindings a shape contributes when it is the resolved shape of the type.
pub(crate) struct ShapeDefaults<C: Container> {
	pub(crate) appender: Option<MethodAnnotation<C>>,
	pub(crate) remover: Option<MethodAnnotation<C>>,
	pub(crate) iterator: IterFn<C>,
	pub(crate) bulk_replace: DiffFn<C>,
}

/// Declaration of a container type's capabilities and annotated methods.
pub struct TypeDescriptor<C: Container> {
	pub(crate) type_name: &'static str,
	pub(crate) caps: StructuralCaps,
	pub(crate) emulation: Emulation,
	pub(crate) list: Option<ShapeDefaults<C>>,
	pub(crate) set: Option<ShapeDefaults<C>>,
	pub(crate) dict: Option<ShapeDefaults<C>>,
	pub(crate) iterator: Option<IterFn<C>>,
	pub(crate) bulk_replace: Option<DiffFn<C>>,
	pub(crate) methods: Vec<MethodAnnotation<C>>,
}

impl<C: Container> TypeDescriptor<C> {
	pub fn new(type_name: &'static str) -> Self {
		Self {
			type_name,
			caps: StructuralCaps::empty(),
			emulation: Emulation::Inferred,
			list: None,
			set: None,
			dict: None,
			iterator: None,
			bulk_replace: None,
			methods: Vec::new(),
		}
	}

	/// Forces the shape regardless of structural capabilities.
	pub fn emulates(mut self, shape: Shape) -> Self {
		self.emulation = Emulation::Shape(shape);
		self
	}

	/// Forces opaque treatment even when the type looks like a known shape.
	pub fn emulates_nothing(mut self) -> Self {
		self.emulation = Emulation::Nothing;
		self
	}

	pub fn method(mut self, annotation: MethodAnnotation<C>) -> Self {
		self.methods.push(annotation);
		self
	}

	pub fn iterator(mut self, iterate: IterFn<C>) -> Self {
		self.caps |= StructuralCaps::ITERATE;
		self.iterator = Some(iterate);
		self
	}

	pub fn bulk_replace(mut self, diff: DiffFn<C>) -> Self {
		self.bulk_replace = Some(diff);
		self
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	pub fn caps(&self) -> StructuralCaps {
		self.caps
	}
}

impl<C: ListOps> TypeDescriptor<C> {
	pub fn list(mut self) -> Self {
		self.caps |= StructuralCaps::LIST | StructuralCaps::INDEX_GET | StructuralCaps::ITERATE;
		self.list = Some(ShapeDefaults {
			appender: Some(MethodAnnotation::instrumented("push", list::append_member::<C>).appender()),
			remover: Some(MethodAnnotation::instrumented("remove", list::remove_member::<C>).remover()),
			iterator: <C as ListOps>::to_vec,
			bulk_replace: identity_diff::<C>,
		});
		self
	}
}

impl<C: SetOps> TypeDescriptor<C> {
	pub fn set(mut self) -> Self {
		self.caps |= StructuralCaps::SET | StructuralCaps::MEMBER_CONTAINS | StructuralCaps::LEN | StructuralCaps::ITERATE;
		self.set = Some(ShapeDefaults {
			appender: Some(MethodAnnotation::instrumented("add", set::append_member::<C>).appender()),
			remover: Some(MethodAnnotation::instrumented("remove", set::remove_member::<C>).remover()),
			iterator: <C as SetOps>::members,
			bulk_replace: identity_diff::<C>,
		});
		self
	}
}

impl<C: DictOps> TypeDescriptor<C> {
	/// Dict shapes bring no appender or remover; values carry no intrinsic key, so the type must
	/// annotate methods that know how to file a value.
	pub fn dict(mut self) -> Self {
		self.caps |= StructuralCaps::DICT | StructuralCaps::KEY_GET | StructuralCaps::LEN | StructuralCaps::ITERATE;
		self.dict = Some(ShapeDefaults {
			appender: None,
			remover: None,
			iterator: dict_values::<C>,
			bulk_replace: keyed_diff::<C>,
		});
		self
	}
}

fn dict_values<C: DictOps>(raw: &C) -> Vec<C::Member> {
	raw.entries().into_iter().map(|(_, value)| value).collect()
}

/// One argument of a [`MethodCall`].
#[derive(Debug, Clone, PartialEq)]
pub enum Arg<V> {
	Member(V),
	Value(KeyValue),
}

impl<V> Arg<V> {
	pub fn as_member(&self) -> Option<&V> {
		match self {
			Arg::Member(value) => Some(value),
			Arg::Value(_) => None,
		}
	}

	pub fn as_value(&self) -> Option<&KeyValue> {
		match self {
			Arg::Value(value) => Some(value),
			Arg::Member(_) => None,
		}
	}
}

/// Resolved location of an argument inside a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgSlot {
	Positional(usize),
	Named(usize),
}

/// Arguments of a by-name method invocation. The receiver is implicit.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall<V> {
	positional: SmallVec<[Arg<V>; 2]>,
	named: SmallVec<[(&'static str, Arg<V>); 1]>,
}

impl<V> Default for MethodCall<V> {
	fn default() -> Self {
		Self {
			positional: SmallVec::new(),
			named: SmallVec::new(),
		}
	}
}

impl<V> MethodCall<V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Call with a single positional member.
	pub fn member(value: V) -> Self {
		Self::new().with_member(value)
	}

	pub fn with_member(mut self, value: V) -> Self {
		self.positional.push(Arg::Member(value));
		self
	}

	pub fn with_value(mut self, value: impl Into<KeyValue>) -> Self {
		self.positional.push(Arg::Value(value.into()));
		self
	}

	pub fn with_named_member(mut self, name: &'static str, value: V) -> Self {
		self.named.push((name, Arg::Member(value)));
		self
	}

	pub fn with_named_value(mut self, name: &'static str, value: impl Into<KeyValue>) -> Self {
		self.named.push((name, Arg::Value(value.into())));
		self
	}

	/// Positional argument, 0-based after the receiver.
	pub fn positional(&self, index: usize) -> Option<&Arg<V>> {
		self.positional.get(index)
	}

	pub fn positional_len(&self) -> usize {
		self.positional.len()
	}

	pub fn named(&self, name: &str) -> Option<&Arg<V>> {
		self.named.iter().find(|(n, _)| *n == name).map(|(_, arg)| arg)
	}

	pub fn member_at(&self, index: usize) -> Option<&V> {
		self.positional(index).and_then(Arg::as_member)
	}

	pub fn value_at(&self, index: usize) -> Option<&KeyValue> {
		self.positional(index).and_then(Arg::as_value)
	}

	pub fn named_member(&self, name: &str) -> Option<&V> {
		self.named(name).and_then(Arg::as_member)
	}

	pub fn into_member(mut self, index: usize) -> Option<V> {
		if index >= self.positional.len() {
			return None;
		}
		match self.positional.swap_remove(index) {
			Arg::Member(value) => Some(value),
			Arg::Value(_) => None,
		}
	}

	pub(crate) fn resolve(&self, position: ArgPosition, params: &[&'static str]) -> Option<ArgSlot> {
		match position {
			ArgPosition::Index(n) => {
				let index = n.checked_sub(1)?;
				if index < self.positional.len() {
					return Some(ArgSlot::Positional(index));
				}
				let name = params.get(index)?;
				self.named_index(name).map(ArgSlot::Named)
			}
			ArgPosition::Named(name) => {
				if let Some(index) = params.iter().position(|p| *p == name)
					&& index < self.positional.len()
				{
					return Some(ArgSlot::Positional(index));
				}
				self.named_index(name).map(ArgSlot::Named)
			}
		}
	}

	pub(crate) fn slot_member(&self, slot: ArgSlot) -> Option<&V> {
		match slot {
			ArgSlot::Positional(i) => self.positional.get(i).and_then(Arg::as_member),
			ArgSlot::Named(i) => self.named.get(i).and_then(|(_, arg)| arg.as_member()),
		}
	}

	pub(crate) fn replace_slot(&mut self, slot: ArgSlot, value: V) {
		let arg = match slot {
			ArgSlot::Positional(i) => self.positional.get_mut(i),
			ArgSlot::Named(i) => self.named.get_mut(i).map(|(_, arg)| arg),
		};
		if let Some(arg) = arg {
			*arg = Arg::Member(value);
		}
	}

	fn named_index(&self, name: &str) -> Option<usize> {
		self.named.iter().position(|(n, _)| *n == name)
	}
}
