//! Owning entity state.
//!
//! An [`Instance`] stands in for the mapped object that owns collection attributes. It keeps two
//! slot maps per attribute key:
//!
//! - **committed**: the collection the attribute currently points at.
//! - **empty**: an implicit empty collection handed out by a read of an unpopulated attribute.
//!   It moves into the committed map the first time it is mutated with events.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::collection::Collection;
use crate::descriptor::Container;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for InstanceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

type Slot = Box<dyn Any + Send + Sync>;

#[derive(Default)]
struct Slots {
	committed: HashMap<&'static str, Slot>,
	empty: HashMap<&'static str, Slot>,
}

struct InstanceInner {
	id: InstanceId,
	class_name: &'static str,
	slots: Mutex<Slots>,
}

/// Shared handle to an owning entity. Clones refer to the same entity.
#[derive(Clone)]
pub struct Instance {
	inner: Arc<InstanceInner>,
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.inner.class_name, self.inner.id)
	}
}

impl PartialEq for Instance {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Instance {}

impl Instance {
	pub fn new(class_name: &'static str) -> Self {
		let id = InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed));
		Self {
			inner: Arc::new(InstanceInner {
				id,
				class_name,
				slots: Mutex::new(Slots::default()),
			}),
		}
	}

	pub fn id(&self) -> InstanceId {
		self.inner.id
	}

	pub fn class_name(&self) -> &'static str {
		self.inner.class_name
	}

	/// Whether the attribute `key` holds a committed collection.
	pub fn is_populated(&self, key: &str) -> bool {
		self.inner.slots.lock().committed.contains_key(key)
	}

	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	pub(crate) fn downgrade(&self) -> WeakInstance {
		WeakInstance(Arc::downgrade(&self.inner))
	}

	pub(crate) fn committed<C: Container>(&self, key: &str) -> Option<Collection<C>> {
		let slots = self.inner.slots.lock();
		slots.committed.get(key).and_then(|slot| slot.downcast_ref::<Collection<C>>()).cloned()
	}

	pub(crate) fn implicit_empty<C: Container>(&self, key: &str) -> Option<Collection<C>> {
		let slots = self.inner.slots.lock();
		slots.empty.get(key).and_then(|slot| slot.downcast_ref::<Collection<C>>()).cloned()
	}

	pub(crate) fn set_implicit_empty<C: Container>(&self, key: &'static str, collection: Collection<C>) {
		self.inner.slots.lock().empty.insert(key, Box::new(collection));
	}

	/// Installs `collection` as the committed value of `key`, returning the one it displaced.
	/// Any implicit empty collection for the key is dropped.
	pub(crate) fn commit<C: Container>(&self, key: &'static str, collection: Collection<C>) -> Option<Collection<C>> {
		let mut slots = self.inner.slots.lock();
		slots.empty.remove(key);
		let previous = slots.committed.insert(key, Box::new(collection))?;
		previous.downcast::<Collection<C>>().ok().map(|boxed| *boxed)
	}

	pub(crate) fn uncommit(&self, key: &str) {
		self.inner.slots.lock().committed.remove(key);
	}

	pub(crate) fn take_implicit_empty<C: Container>(&self, key: &str) -> Option<Collection<C>> {
		let slot = self.inner.slots.lock().empty.remove(key)?;
		slot.downcast::<Collection<C>>().ok().map(|boxed| *boxed)
	}
}

#[derive(Clone)]
pub(crate) struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
	pub(crate) fn upgrade(&self) -> Option<Instance> {
		self.0.upgrade().map(|inner| Instance { inner })
	}
}
