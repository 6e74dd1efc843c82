//! Collection-valued attributes of an owning entity.
//!
//! [`CollectionAttribute`] is the thin owner-side attribute system the instrumentation needs: it
//! creates containers from a factory, binds them to adapters, hands out implicit empty
//! collections for unpopulated reads and runs the bulk replace reconciler on assignment.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::adapter::CollectionAdapter;
use crate::bulk::{self, BulkValue};
use crate::capability::Shape;
use crate::classify::RoleTable;
use crate::collection::Collection;
use crate::descriptor::{Container, MemberOf};
use crate::error::Result;
use crate::event::{EventKind, Initiator, Listeners};
use crate::instance::Instance;
use crate::registry;

/// Produces fresh raw containers for an attribute.
pub type ContainerFactory<C> = Arc<dyn Fn() -> C + Send + Sync>;

pub(crate) struct AttributeInner<C: Container> {
	class_name: &'static str,
	key: &'static str,
	qualified: Arc<str>,
	factory: ContainerFactory<C>,
	roles: Arc<RoleTable<C>>,
	listeners: Listeners<MemberOf<C>>,
}

impl<C: Container> AttributeInner<C> {
	pub(crate) fn key(&self) -> &'static str {
		self.key
	}

	pub(crate) fn qualified_name(&self) -> &str {
		&self.qualified
	}

	pub(crate) fn qualified_name_arc(&self) -> Arc<str> {
		self.qualified.clone()
	}

	pub(crate) fn listeners(&self) -> &Listeners<MemberOf<C>> {
		&self.listeners
	}
}

pub struct CollectionAttribute<C: Container> {
	inner: Arc<AttributeInner<C>>,
}

impl<C: Container> Clone for CollectionAttribute<C> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<C: Container> fmt::Debug for CollectionAttribute<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionAttribute")
			.field("attribute", &self.inner.qualified)
			.field("type", &self.inner.roles.type_name())
			.field("shape", &self.inner.roles.shape())
			.field("listeners", &self.inner.listeners.len())
			.finish()
	}
}

impl<C: Container> CollectionAttribute<C> {
	/// Registers attribute `key` of `class_name`. Classification of `C` happens here, so a
	/// misdeclared container type fails at registration rather than at first use.
	pub fn new(class_name: &'static str, key: &'static str, factory: impl Fn() -> C + Send + Sync + 'static) -> Result<Self> {
		Self::with_factory(class_name, key, Arc::new(factory))
	}

	pub fn with_factory(class_name: &'static str, key: &'static str, factory: ContainerFactory<C>) -> Result<Self> {
		let roles = registry::roles_for::<C>()?;
		debug!(class_name, key, type_name = roles.type_name(), shape = %roles.shape(), "registered collection attribute");
		Ok(Self {
			inner: Arc::new(AttributeInner {
				class_name,
				key,
				qualified: Arc::from(format!("{class_name}.{key}")),
				factory,
				roles,
				listeners: Listeners::new(),
			}),
		})
	}

	pub fn class_name(&self) -> &'static str {
		self.inner.class_name
	}

	pub fn key(&self) -> &'static str {
		self.inner.key
	}

	/// `Class.key`
	pub fn qualified_name(&self) -> &str {
		&self.inner.qualified
	}

	pub fn shape(&self) -> Shape {
		self.inner.roles.shape()
	}

	pub fn roles(&self) -> &Arc<RoleTable<C>> {
		&self.inner.roles
	}

	pub fn listeners(&self) -> &Listeners<MemberOf<C>> {
		&self.inner.listeners
	}

	pub(crate) fn initiator(&self, kind: EventKind) -> Initiator {
		Initiator::new(self.inner.qualified.clone(), kind)
	}

	/// Current collection of `owner`: the committed one, or an implicit empty collection that
	/// is committed on its first evented mutation.
	pub fn get(&self, owner: &Instance) -> Result<Collection<C>> {
		if let Some(collection) = owner.committed::<C>(self.inner.key) {
			return Ok(collection);
		}
		if let Some(collection) = owner.implicit_empty::<C>(self.inner.key) {
			return Ok(collection);
		}
		let collection = self.fresh(owner, true)?;
		owner.set_implicit_empty(self.inner.key, collection.clone());
		Ok(collection)
	}

	/// Adapter of the committed collection, if any.
	pub fn adapter(&self, owner: &Instance) -> Option<CollectionAdapter<C>> {
		owner.committed::<C>(self.inner.key).and_then(|collection| collection.adapter())
	}

	/// Creates and binds a fresh container for `owner` without committing it.
	pub fn initialize(&self, owner: &Instance) -> Result<Collection<C>> {
		self.fresh(owner, false)
	}

	/// Binds an existing, unbound collection to `owner` and commits it as the attribute's value
	/// without events. A previously committed collection is severed silently.
	pub fn bind(&self, owner: &Instance, collection: &Collection<C>) -> Result<CollectionAdapter<C>> {
		let adapter = CollectionAdapter::new(self.inner.clone(), owner, collection, false);
		collection.attach(adapter.clone())?;
		if let Some(stale) = owner.take_implicit_empty::<C>(self.inner.key) {
			sever(&stale);
		}
		let previous = owner.commit(self.inner.key, collection.clone());
		if let Some(previous) = previous.filter(|previous| !previous.ptr_eq(collection)) {
			sever(&previous);
		}
		debug!(attribute = %self.inner.qualified, owner = ?owner, "bound collection");
		Ok(adapter)
	}

	/// Replaces the attribute's whole value, firing the minimal event sequence.
	pub fn set(&self, owner: &Instance, value: impl Into<BulkValue<C>>) -> Result<()> {
		bulk::replace(self, owner, value.into())
	}

	pub(crate) fn fresh(&self, owner: &Instance, empty: bool) -> Result<Collection<C>> {
		let collection = Collection::from_parts((self.inner.factory)(), self.inner.roles.clone());
		let adapter = CollectionAdapter::new(self.inner.clone(), owner, &collection, empty);
		collection.attach(adapter)?;
		self.inner.listeners.dispatch_init(owner, &self.initiator(EventKind::InitCollection))?;
		Ok(collection)
	}

	/// Puts back the attribute's value from before a failed replacement and severs `fresh`.
	/// `previous` is the collection that was current, committed or implicit.
	pub(crate) fn restore(
		&self,
		owner: &Instance,
		fresh: &Collection<C>,
		committed: Option<Collection<C>>,
		previous: Option<&Collection<C>>,
	) {
		match committed {
			Some(committed) => {
				owner.commit(self.inner.key, committed);
			}
			None => {
				owner.uncommit(self.inner.key);
				if let Some(implicit) = previous {
					owner.set_implicit_empty(self.inner.key, implicit.clone());
				}
			}
		}
		sever(fresh);
		debug!(attribute = %self.inner.qualified, owner = ?owner, "bulk replace failed; previous collection restored");
	}

	/// Detaches `old` from `owner` and reports it as disposed.
	pub(crate) fn dispose(&self, owner: &Instance, old: &Collection<C>, initiator: &Initiator) -> Result<()> {
		sever(old);
		if let Some(stale) = owner.implicit_empty::<C>(self.inner.key)
			&& stale.ptr_eq(old)
		{
			owner.take_implicit_empty::<C>(self.inner.key);
		}
		let values = old.members();
		self.inner.listeners.dispatch_dispose(owner, &values, &initiator.with_kind(EventKind::DisposeCollection))
	}
}

fn sever<C: Container>(collection: &Collection<C>) {
	if let Some(adapter) = collection.detach() {
		adapter.sever();
	}
}
