//! Capability classification: turns a [`TypeDescriptor`] into a [`RoleTable`].
//!
//! # Resolution order
//!
//! 1. Shape: an `emulates` declaration wins; otherwise structural capabilities are checked in
//!    list, set, dict order, falling back to [`Shape::Custom`].
//! 2. Shape defaults of the resolved shape seed the appender, remover, iterator and bulk replace
//!    bindings.
//! 3. Explicit method annotations override the seeded bindings by role and by method name.
//! 4. Appender, remover and iterator are required. Raw appenders and removers without a
//!    membership annotation act on their first argument.

use std::fmt;

use rustc_hash::FxHashMap as HashMap;
use tracing::debug;

use crate::bulk::{BulkDiff, DiffInput};
use crate::capability::{Role, RoleSet, Shape};
use crate::descriptor::{
	ArgPosition, Container, DiffFn, Emulation, IterFn, MemberOf, MethodAnnotation, MethodOp, Mutator,
};
use crate::error::ConfigurationError;

/// Resolved role bindings for one container type.
pub struct RoleTable<C: Container> {
	type_name: &'static str,
	shape: Shape,
	roles: RoleSet,
	appender: &'static str,
	remover: &'static str,
	iterator: IterFn<C>,
	bulk_replace: DiffFn<C>,
	methods: HashMap<&'static str, MethodAnnotation<C>>,
}

impl<C: Container> fmt::Debug for RoleTable<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RoleTable")
			.field("type_name", &self.type_name)
			.field("shape", &self.shape)
			.field("roles", &self.roles)
			.field("appender", &self.appender)
			.field("remover", &self.remover)
			.field("methods", &self.methods.len())
			.finish()
	}
}

impl<C: Container> RoleTable<C> {
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	pub fn shape(&self) -> Shape {
		self.shape
	}

	/// Union of every role held by any method of the type.
	pub fn roles(&self) -> RoleSet {
		self.roles
	}

	pub fn appender(&self) -> &'static str {
		self.appender
	}

	pub fn remover(&self) -> &'static str {
		self.remover
	}

	pub fn method(&self, name: &str) -> Option<&MethodAnnotation<C>> {
		self.methods.get(name)
	}

	pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.methods.keys().copied()
	}

	pub fn iterate(&self, raw: &C) -> Vec<MemberOf<C>> {
		(self.iterator)(raw)
	}

	pub(crate) fn diff(&self, input: &DiffInput<'_, C>) -> BulkDiff<MemberOf<C>> {
		(self.bulk_replace)(input)
	}
}

/// Classifies `C` from its descriptor without instantiating it.
pub fn classify<C: Container>() -> Result<RoleTable<C>, ConfigurationError> {
	let descriptor = C::descriptor();
	let type_name = descriptor.type_name;

	let shape = match descriptor.emulation {
		Emulation::Shape(shape) => shape,
		Emulation::Nothing => Shape::Custom,
		Emulation::Inferred => descriptor.caps.detect_shape(),
	};
	let defaults = match shape {
		Shape::List => descriptor.list,
		Shape::Set => descriptor.set,
		Shape::Dict => descriptor.dict,
		Shape::Custom => None,
	};

	let mut methods: HashMap<&'static str, MethodAnnotation<C>> = HashMap::default();
	let mut appender = None;
	let mut remover = None;
	let mut iterator = descriptor.iterator;
	let mut bulk_replace = descriptor.bulk_replace;

	if let Some(defaults) = defaults {
		for annotation in [defaults.appender, defaults.remover].into_iter().flatten() {
			if annotation.roles.contains(RoleSet::APPENDER) {
				appender = Some(annotation.name);
			}
			if annotation.roles.contains(RoleSet::REMOVER) {
				remover = Some(annotation.name);
			}
			methods.insert(annotation.name, annotation);
		}
		iterator = iterator.or(Some(defaults.iterator));
		bulk_replace = bulk_replace.or(Some(defaults.bulk_replace));
	}

	let mut explicit_appender: Option<&'static str> = None;
	let mut explicit_remover: Option<&'static str> = None;
	for annotation in descriptor.methods {
		let claims_appender = annotation.roles.contains(RoleSet::APPENDER);
		let claims_remover = annotation.roles.contains(RoleSet::REMOVER);
		if claims_appender && claims_remover {
			return Err(ConfigurationError::ConflictingRoles {
				type_name,
				method: annotation.name,
			});
		}
		if claims_appender {
			claim(type_name, Role::Appender, &mut explicit_appender, annotation.name)?;
			release(&mut methods, appender, RoleSet::APPENDER);
			appender = Some(annotation.name);
		}
		if claims_remover {
			claim(type_name, Role::Remover, &mut explicit_remover, annotation.name)?;
			release(&mut methods, remover, RoleSet::REMOVER);
			remover = Some(annotation.name);
		}
		methods.insert(annotation.name, annotation);
	}

	let missing = |role| ConfigurationError::MissingRole { type_name, role };
	let appender = appender.ok_or_else(|| missing(Role::Appender))?;
	let remover = remover.ok_or_else(|| missing(Role::Remover))?;
	let iterator = iterator.ok_or_else(|| missing(Role::Iterator))?;
	let bulk_replace = bulk_replace.unwrap_or(crate::bulk::identity_diff::<C>);

	for (name, implied) in [
		(appender, Mutator::Adds(ArgPosition::Index(1))),
		(remover, Mutator::Removes(ArgPosition::Index(1))),
	] {
		if let Some(annotation) = methods.get_mut(name)
			&& matches!(annotation.op, MethodOp::Raw(_))
			&& annotation.mutator.is_none()
		{
			*annotation = annotation.with_mutator(implied);
		}
	}

	let mut roles = RoleSet::ITERATOR;
	if descriptor.bulk_replace.is_some() {
		roles |= RoleSet::BULK_REPLACE;
	}
	for annotation in methods.values() {
		roles |= annotation.roles;
	}

	debug!(type_name, %shape, appender, remover, methods = methods.len(), "classified collection type");

	Ok(RoleTable {
		type_name,
		shape,
		roles,
		appender,
		remover,
		iterator,
		bulk_replace,
		methods,
	})
}

fn claim(
	type_name: &'static str,
	role: Role,
	slot: &mut Option<&'static str>,
	method: &'static str,
) -> Result<(), ConfigurationError> {
	match *slot {
		Some(first) if first != method => Err(ConfigurationError::DuplicateRole {
			type_name,
			role,
			first,
			second: method,
		}),
		_ => {
			*slot = Some(method);
			Ok(())
		}
	}
}

/// Strips a role from the method currently holding it; the method stays callable by name.
fn release<C: Container>(
	methods: &mut HashMap<&'static str, MethodAnnotation<C>>,
	holder: Option<&'static str>,
	role: RoleSet,
) {
	if let Some(annotation) = holder.and_then(|name| methods.get_mut(name)) {
		annotation.roles.remove(role);
	}
}
