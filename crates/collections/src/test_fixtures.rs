//! Shared fixtures for unit tests.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::error::ListenerError;
use crate::event::{CollectionListener, EventFlow, Initiator, Listeners};
use crate::instance::Instance;
use crate::member::{AttributeSource, KeyValue, Member};

static NEXT_ENTITY: AtomicU64 = AtomicU64::new(1);

struct EntityInner {
	id: u64,
	label: &'static str,
	attrs: Mutex<HashMap<String, KeyValue>>,
}

/// Identity-compared member with mutable attributes.
#[derive(Clone)]
pub(crate) struct Entity(Arc<EntityInner>);

impl Entity {
	pub(crate) fn new(label: &'static str) -> Self {
		Self(Arc::new(EntityInner {
			id: NEXT_ENTITY.fetch_add(1, Ordering::Relaxed),
			label,
			attrs: Mutex::new(HashMap::default()),
		}))
	}

	pub(crate) fn with_attr(self, name: &str, value: impl Into<KeyValue>) -> Self {
		self.set_attr(name, value);
		self
	}

	pub(crate) fn set_attr(&self, name: &str, value: impl Into<KeyValue>) {
		self.0.attrs.lock().insert(name.to_owned(), value.into());
	}

	pub(crate) fn unset_attr(&self, name: &str) {
		self.0.attrs.lock().remove(name);
	}
}

impl PartialEq for Entity {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for Entity {}

impl Hash for Entity {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.id.hash(state);
	}
}

impl fmt::Debug for Entity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.0.label, self.0.id)
	}
}

impl AttributeSource for Entity {
	fn attribute(&self, name: &str) -> Option<KeyValue> {
		self.0.attrs.lock().get(name).cloned()
	}
}

/// One observed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Seen<V> {
	Append(V),
	AppendWoMutation(V),
	Remove(V),
	Set(V, Option<V>),
	BulkReplace(Vec<V>),
	Init,
	Dispose(Vec<V>),
}

impl<V> Seen<V> {
	fn is_mutation(&self) -> bool {
		matches!(self, Seen::Append(_) | Seen::AppendWoMutation(_) | Seen::Remove(_) | Seen::Set(..))
	}
}

/// Listener that logs every event and tracks membership from `append`/`remove` alone.
pub(crate) struct Recorder<V: Member> {
	log: Mutex<Vec<(Seen<V>, Initiator)>>,
	tracked: Mutex<HashMap<V, usize>>,
}

impl<V: Member> Recorder<V> {
	pub(crate) fn attach(listeners: &Listeners<V>) -> Arc<Self> {
		let recorder = Arc::new(Self {
			log: Mutex::new(Vec::new()),
			tracked: Mutex::new(HashMap::default()),
		});
		listeners.listen(recorder.clone());
		recorder
	}

	pub(crate) fn events(&self) -> Vec<Seen<V>> {
		self.log.lock().iter().map(|(seen, _)| seen.clone()).collect()
	}

	/// Events other than lifecycle notifications.
	pub(crate) fn mutations(&self) -> Vec<Seen<V>> {
		self.events().into_iter().filter(Seen::is_mutation).collect()
	}

	pub(crate) fn initiators(&self) -> Vec<Initiator> {
		self.log.lock().iter().map(|(_, initiator)| initiator.clone()).collect()
	}

	pub(crate) fn clear(&self) {
		self.log.lock().clear();
	}

	/// Membership as seen through events, with multiplicity.
	pub(crate) fn tracked(&self) -> HashMap<V, usize> {
		self.tracked.lock().clone()
	}

	fn record(&self, seen: Seen<V>, initiator: &Initiator) {
		self.log.lock().push((seen, initiator.clone()));
	}
}

impl<V: Member> CollectionListener<V> for Recorder<V> {
	fn append(&self, _owner: &Instance, value: &V, initiator: &Initiator) -> EventFlow<V> {
		*self.tracked.lock().entry(value.clone()).or_default() += 1;
		self.record(Seen::Append(value.clone()), initiator);
		EventFlow::Continue
	}

	fn append_wo_mutation(&self, _owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		self.record(Seen::AppendWoMutation(value.clone()), initiator);
		Ok(())
	}

	fn remove(&self, _owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		let mut tracked = self.tracked.lock();
		if let Some(count) = tracked.get_mut(value) {
			*count -= 1;
			if *count == 0 {
				tracked.remove(value);
			}
		}
		drop(tracked);
		self.record(Seen::Remove(value.clone()), initiator);
		Ok(())
	}

	fn set(&self, _owner: &Instance, value: &V, old: Option<&V>, initiator: &Initiator) -> EventFlow<V> {
		self.record(Seen::Set(value.clone(), old.cloned()), initiator);
		EventFlow::Continue
	}

	fn bulk_replace(&self, _owner: &Instance, values: &[V], initiator: &Initiator) -> Result<(), ListenerError> {
		self.record(Seen::BulkReplace(values.to_vec()), initiator);
		Ok(())
	}

	fn init_collection(&self, _owner: &Instance, initiator: &Initiator) -> Result<(), ListenerError> {
		self.record(Seen::Init, initiator);
		Ok(())
	}

	fn dispose_collection(&self, _owner: &Instance, values: &[V], initiator: &Initiator) -> Result<(), ListenerError> {
		self.record(Seen::Dispose(values.to_vec()), initiator);
		Ok(())
	}
}

/// Multiset of `values`, comparable with [`Recorder::tracked`].
pub(crate) fn counts<V: Member>(values: impl IntoIterator<Item = V>) -> HashMap<V, usize> {
	let mut counts = HashMap::default();
	for value in values {
		*counts.entry(value).or_default() += 1;
	}
	counts
}
