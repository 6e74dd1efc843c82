//! The instrumented collection handle.
//!
//! A [`Collection`] wraps one raw container in a shared cell. Every mutation made through the
//! shape proxies ([`ListProxy`], [`SetProxy`], [`DictProxy`]) or [`Collection::call`] fires its
//! event through the cell's adapter first and touches the raw container second.
//!
//! # Invariants
//!
//! - The raw container lock is held only for the native operation, never while listeners run.
//! - A cell has at most one adapter. Severance clears it and never reattaches.
//! - Events fire only when the handle's [`Emit`] mode allows it and an adapter is attached.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::adapter::CollectionAdapter;
use crate::classify::RoleTable;
use crate::descriptor::{ArgPosition, Container, MemberOf, MethodAnnotation, MethodCall, MethodOp, Mutator, RawMethod};
use crate::error::{CollectionError, Result};
use crate::event::{EventKind, Initiator};
use crate::registry;

pub(crate) mod dict;
pub(crate) mod list;
pub(crate) mod set;
mod slice;

pub use dict::DictProxy;
pub use list::ListProxy;
pub use set::{SetOperand, SetProxy};
pub use slice::Slice;

/// How a handle reports the mutations made through it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Emit {
	/// Fire events with the adapter's own initiator.
	#[default]
	Events,
	/// Fire events carrying this initiator.
	Initiated(Initiator),
	/// Mutate without events.
	Silent,
}

pub(crate) struct Cell<C: Container> {
	raw: Mutex<C>,
	adapter: Mutex<Option<CollectionAdapter<C>>>,
	roles: Arc<RoleTable<C>>,
}

/// Shared handle to an instrumented container.
pub struct Collection<C: Container> {
	cell: Arc<Cell<C>>,
	emit: Emit,
}

impl<C: Container> Clone for Collection<C> {
	fn clone(&self) -> Self {
		Self {
			cell: self.cell.clone(),
			emit: self.emit.clone(),
		}
	}
}

impl<C: Container> fmt::Debug for Collection<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Collection")
			.field("type", &self.cell.roles.type_name())
			.field("members", &self.members())
			.field("emit", &self.emit)
			.finish()
	}
}

impl<C: Container> Collection<C> {
	/// Wraps `raw`, classifying `C` on first use. The handle has no adapter until it is bound.
	pub fn new(raw: C) -> Result<Self> {
		let roles = registry::roles_for::<C>()?;
		Ok(Self::from_parts(raw, roles))
	}

	pub(crate) fn from_parts(raw: C, roles: Arc<RoleTable<C>>) -> Self {
		Self {
			cell: Arc::new(Cell {
				raw: Mutex::new(raw),
				adapter: Mutex::new(None),
				roles,
			}),
			emit: Emit::Events,
		}
	}

	pub(crate) fn from_cell(cell: Arc<Cell<C>>) -> Self {
		Self { cell, emit: Emit::Events }
	}

	/// View of the same container whose mutations fire no events.
	pub fn without_events(&self) -> Self {
		self.with_emit(Emit::Silent)
	}

	pub fn with_emit(&self, emit: Emit) -> Self {
		Self {
			cell: self.cell.clone(),
			emit,
		}
	}

	pub fn emit(&self) -> &Emit {
		&self.emit
	}

	pub fn roles(&self) -> &Arc<RoleTable<C>> {
		&self.cell.roles
	}

	/// The bound adapter, if the container is instrumented and not yet severed.
	pub fn adapter(&self) -> Option<CollectionAdapter<C>> {
		self.cell.adapter.lock().clone()
	}

	/// Members in iteration order, via the type's iterator role.
	pub fn members(&self) -> Vec<MemberOf<C>> {
		let raw = self.cell.raw.lock();
		self.cell.roles.iterate(&raw)
	}

	pub fn with_raw<R>(&self, f: impl FnOnce(&C) -> R) -> R {
		f(&self.cell.raw.lock())
	}

	/// Direct access to the raw container. Changes made here fire no events.
	pub fn with_raw_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
		f(&mut self.cell.raw.lock())
	}

	/// Whether both handles refer to the same container.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.cell, &other.cell)
	}

	/// Adds `value` through the type's appender role.
	pub fn append_member(&self, value: MemberOf<C>) -> Result<()> {
		self.call(self.cell.roles.appender(), MethodCall::member(value)).map(|_| ())
	}

	/// Removes `value` through the type's remover role.
	pub fn remove_member(&self, value: MemberOf<C>) -> Result<()> {
		self.call(self.cell.roles.remover(), MethodCall::member(value)).map(|_| ())
	}

	/// Invokes an annotated method by name.
	///
	/// Internally instrumented methods run as-is. Other methods get their events from the
	/// membership annotation: `adds`/`replaces` fire `append` for the argument (substituting any
	/// listener replacement into the call) and `removes` fires `remove`, all before the native
	/// call; `replaces`/`removes_return` fire `remove` for a returned value afterwards.
	pub fn call(&self, method: &str, call: MethodCall<MemberOf<C>>) -> Result<Option<MemberOf<C>>> {
		let annotation = *self
			.cell
			.roles
			.method(method)
			.ok_or_else(|| CollectionError::UnknownMethod {
				type_name: self.cell.roles.type_name(),
				method: method.to_owned(),
			})?;
		match annotation.op {
			MethodOp::Instrumented(op) => op(self, call),
			MethodOp::Raw(op) => self.call_raw(&annotation, op, call),
		}
	}

	fn call_raw(
		&self,
		annotation: &MethodAnnotation<C>,
		op: RawMethod<C>,
		mut call: MethodCall<MemberOf<C>>,
	) -> Result<Option<MemberOf<C>>> {
		match annotation.mutator {
			Some(Mutator::Adds(position) | Mutator::Replaces(position)) => {
				let slot = call.resolve(position, annotation.params);
				let value = slot.and_then(|slot| call.slot_member(slot).cloned().map(|v| (slot, v)));
				let Some((slot, value)) = value else {
					return Err(CollectionError::MissingArgument {
						method: annotation.name,
						argument: position.to_string(),
					});
				};
				let value = self.fire_append(value)?;
				call.replace_slot(slot, value);
			}
			Some(Mutator::Removes(position)) => {
				let value = call
					.resolve(position, annotation.params)
					.and_then(|slot| call.slot_member(slot).cloned())
					.ok_or_else(|| CollectionError::MissingArgument {
						method: annotation.name,
						argument: position.to_string(),
					})?;
				self.fire_remove(&value)?;
			}
			Some(Mutator::RemovesReturn) | None => {}
		}

		let returned = {
			let mut raw = self.cell.raw.lock();
			op(&mut raw, &call)?
		};

		if let (Some(Mutator::Replaces(_) | Mutator::RemovesReturn), Some(removed)) = (annotation.mutator, &returned) {
			self.fire_remove(removed)?;
		}
		Ok(returned)
	}

	pub(crate) fn raw(&self) -> MutexGuard<'_, C> {
		self.cell.raw.lock()
	}

	pub(crate) fn cell(&self) -> &Arc<Cell<C>> {
		&self.cell
	}

	/// Installs the adapter. Fails if the container is already bound.
	pub(crate) fn attach(&self, adapter: CollectionAdapter<C>) -> Result<()> {
		let mut slot = self.cell.adapter.lock();
		if slot.is_some() {
			return Err(CollectionError::InvalidState("collection is already bound to an owner"));
		}
		*slot = Some(adapter);
		Ok(())
	}

	/// Clears the back-pointer, returning the adapter that was attached.
	pub(crate) fn detach(&self) -> Option<CollectionAdapter<C>> {
		let adapter = self.cell.adapter.lock().take();
		if adapter.is_some() {
			debug!(type_name = self.cell.roles.type_name(), "detached collection adapter");
		}
		adapter
	}

	fn emitter(&self) -> Option<(CollectionAdapter<C>, Option<Initiator>)> {
		let initiator = match &self.emit {
			Emit::Silent => return None,
			Emit::Events => None,
			Emit::Initiated(initiator) => Some(initiator.clone()),
		};
		self.adapter().map(|adapter| (adapter, initiator))
	}

	/// Describes the event source for error messages.
	pub(crate) fn event_label(&self, kind: EventKind) -> String {
		match (&self.emit, self.adapter()) {
			(Emit::Initiated(initiator), _) => initiator.to_string(),
			(_, Some(adapter)) => adapter.initiator(kind).to_string(),
			(_, None) => format!("unbound {} population", self.cell.roles.type_name()),
		}
	}

	pub(crate) fn fire_append(&self, value: MemberOf<C>) -> Result<MemberOf<C>> {
		match self.emitter() {
			Some((adapter, initiator)) => adapter.fire_append_event(value, initiator.as_ref()),
			None => Ok(value),
		}
	}

	pub(crate) fn fire_append_wo_mutation(&self, value: &MemberOf<C>) -> Result<()> {
		match self.emitter() {
			Some((adapter, initiator)) => adapter.fire_append_wo_mutation_event(value, initiator.as_ref()),
			None => Ok(()),
		}
	}

	pub(crate) fn fire_remove(&self, value: &MemberOf<C>) -> Result<()> {
		match self.emitter() {
			Some((adapter, initiator)) => adapter.fire_remove_event(value, initiator.as_ref()),
			None => Ok(()),
		}
	}

	pub(crate) fn fire_set(&self, value: MemberOf<C>, old: Option<&MemberOf<C>>) -> Result<MemberOf<C>> {
		match self.emitter() {
			Some((adapter, initiator)) => adapter.fire_set_event(value, old, initiator.as_ref()),
			None => Ok(value),
		}
	}
}

pub(crate) fn first_member<V>(call: MethodCall<V>, method: &'static str) -> Result<V> {
	call.into_member(0).ok_or_else(|| CollectionError::MissingArgument {
		method,
		argument: ArgPosition::Index(1).to_string(),
	})
}

/// Adapter bound to `collection`, or `None` if it was never instrumented or has been severed.
pub fn collection_adapter<C: Container>(collection: &Collection<C>) -> Option<CollectionAdapter<C>> {
	collection.adapter()
}
