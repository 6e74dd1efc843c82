//! The owner's view of one instrumented container.
//!
//! A [`CollectionAdapter`] is created when a container is bound to an owner's attribute and
//! stays attached until the attribute is reassigned. It references the container and the owner
//! weakly; the container's cell holds the adapter.
//!
//! # Implicit empty collections
//!
//! Reading an unpopulated attribute yields an empty collection that is not yet part of the
//! owner's committed state. Evented paths commit it on first use. Event-free paths refuse to
//! touch it, since a change nobody hears about would be silently lost.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::attribute::AttributeInner;
use crate::collection::{Cell, Collection};
use crate::descriptor::{Container, MemberOf};
use crate::error::{CollectionError, Result};
use crate::event::{EventKind, Initiator};
use crate::instance::{Instance, WeakInstance};

struct AdapterInner<C: Container> {
	attribute: Arc<AttributeInner<C>>,
	owner: WeakInstance,
	data: Weak<Cell<C>>,
	referenced_by_owner: AtomicBool,
	empty: AtomicBool,
}

pub struct CollectionAdapter<C: Container> {
	inner: Arc<AdapterInner<C>>,
}

impl<C: Container> Clone for CollectionAdapter<C> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<C: Container> fmt::Debug for CollectionAdapter<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionAdapter")
			.field("attribute", &self.inner.attribute.qualified_name())
			.field("owner", &self.owner())
			.field("referenced_by_owner", &self.referenced_by_owner())
			.field("empty", &self.is_empty())
			.finish()
	}
}

impl<C: Container> CollectionAdapter<C> {
	pub(crate) fn new(attribute: Arc<AttributeInner<C>>, owner: &Instance, collection: &Collection<C>, empty: bool) -> Self {
		Self {
			inner: Arc::new(AdapterInner {
				attribute,
				owner: owner.downgrade(),
				data: Arc::downgrade(collection.cell()),
				referenced_by_owner: AtomicBool::new(true),
				empty: AtomicBool::new(empty),
			}),
		}
	}

	pub fn owner(&self) -> Option<Instance> {
		self.inner.owner.upgrade()
	}

	pub fn attribute_key(&self) -> &'static str {
		self.inner.attribute.key()
	}

	/// False once the owner's attribute has been reassigned away from this container.
	pub fn referenced_by_owner(&self) -> bool {
		self.inner.referenced_by_owner.load(Ordering::Acquire)
	}

	/// Whether this adapter fronts an implicit empty collection not yet committed to the owner.
	pub fn is_empty(&self) -> bool {
		self.inner.empty.load(Ordering::Acquire)
	}

	/// The container, if it is still alive.
	pub fn data(&self) -> Option<Collection<C>> {
		self.inner.data.upgrade().map(Collection::from_cell)
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Members via the type's iterator role.
	pub fn members(&self) -> Vec<MemberOf<C>> {
		self.data().map(|data| data.members()).unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.members().len()
	}

	pub fn append_with_event(&self, value: MemberOf<C>) -> Result<()> {
		self.live_data()?.append_member(value)
	}

	pub fn append_without_event(&self, value: MemberOf<C>) -> Result<()> {
		self.ensure_materialized()?;
		self.live_data()?.without_events().append_member(value)
	}

	pub fn append_multiple_without_event(&self, values: impl IntoIterator<Item = MemberOf<C>>) -> Result<()> {
		self.ensure_materialized()?;
		let data = self.live_data()?.without_events();
		for value in values {
			data.append_member(value)?;
		}
		Ok(())
	}

	pub fn remove_with_event(&self, value: MemberOf<C>) -> Result<()> {
		self.live_data()?.remove_member(value)
	}

	pub fn remove_without_event(&self, value: MemberOf<C>) -> Result<()> {
		self.ensure_materialized()?;
		self.live_data()?.without_events().remove_member(value)
	}

	pub fn clear_with_event(&self) -> Result<()> {
		let data = self.live_data()?;
		for value in data.members() {
			data.remove_member(value)?;
		}
		Ok(())
	}

	pub fn clear_without_event(&self) -> Result<()> {
		self.ensure_materialized()?;
		let data = self.live_data()?.without_events();
		for value in data.members() {
			data.remove_member(value)?;
		}
		Ok(())
	}

	/// Runs the `append` listeners, returning the value to store.
	pub fn fire_append_event(&self, value: MemberOf<C>, initiator: Option<&Initiator>) -> Result<MemberOf<C>> {
		let Some(owner) = self.owner() else {
			return Ok(value);
		};
		self.materialize(&owner);
		let initiator = self.resolve_initiator(initiator, EventKind::Append);
		self.inner.attribute.listeners().dispatch_append(&owner, value, &initiator)
	}

	pub fn fire_append_wo_mutation_event(&self, value: &MemberOf<C>, initiator: Option<&Initiator>) -> Result<()> {
		let Some(owner) = self.owner() else {
			return Ok(());
		};
		self.materialize(&owner);
		let initiator = self.resolve_initiator(initiator, EventKind::AppendWoMutation);
		self.inner.attribute.listeners().dispatch_append_wo_mutation(&owner, value, &initiator)
	}

	pub fn fire_remove_event(&self, value: &MemberOf<C>, initiator: Option<&Initiator>) -> Result<()> {
		let Some(owner) = self.owner() else {
			return Ok(());
		};
		self.materialize(&owner);
		let initiator = self.resolve_initiator(initiator, EventKind::Remove);
		self.inner.attribute.listeners().dispatch_remove(&owner, value, &initiator)
	}

	pub fn fire_set_event(&self, value: MemberOf<C>, old: Option<&MemberOf<C>>, initiator: Option<&Initiator>) -> Result<MemberOf<C>> {
		let Some(owner) = self.owner() else {
			return Ok(value);
		};
		self.materialize(&owner);
		let initiator = self.resolve_initiator(initiator, EventKind::Set);
		self.inner.attribute.listeners().dispatch_set(&owner, value, old, &initiator)
	}

	pub(crate) fn initiator(&self, kind: EventKind) -> Initiator {
		Initiator::new(self.inner.attribute.qualified_name_arc(), kind)
	}

	/// Marks the adapter as no longer referenced by its owner. Idempotent.
	pub(crate) fn sever(&self) {
		if self.inner.referenced_by_owner.swap(false, Ordering::AcqRel) {
			debug!(attribute = self.inner.attribute.qualified_name(), "severed collection adapter");
		}
	}

	fn resolve_initiator(&self, initiator: Option<&Initiator>, kind: EventKind) -> Initiator {
		initiator.cloned().unwrap_or_else(|| self.initiator(kind))
	}

	fn live_data(&self) -> Result<Collection<C>> {
		self.data().ok_or(CollectionError::InvalidState("collection has been dropped"))
	}

	fn ensure_materialized(&self) -> Result<()> {
		if self.is_empty() {
			return Err(CollectionError::InvalidState(
				"this is a special 'empty' collection which cannot accommodate internal mutation operations",
			));
		}
		Ok(())
	}

	/// Commits an implicit empty collection to its owner.
	fn materialize(&self, owner: &Instance) {
		if !self.inner.empty.swap(false, Ordering::AcqRel) {
			return;
		}
		if let Some(data) = self.data() {
			owner.commit(self.attribute_key(), data);
			debug!(attribute = self.inner.attribute.qualified_name(), owner = ?owner, "materialized empty collection");
		}
	}
}
