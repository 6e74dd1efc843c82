//! Common utilities for collection integration tests.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use xeno_collections::{
	AttributeSource, CollectionListener, EventFlow, EventKind, Initiator, Instance, KeyValue, ListenerError, Listeners,
};

static NEXT_PERSON: AtomicU64 = AtomicU64::new(1);

struct PersonInner {
	id: u64,
	attrs: Mutex<HashMap<String, KeyValue>>,
}

/// Mapped entity stand-in: compared by identity, keyed by its attributes.
#[derive(Clone)]
pub struct Person(Arc<PersonInner>);

impl Person {
	pub fn new() -> Self {
		Self(Arc::new(PersonInner {
			id: NEXT_PERSON.fetch_add(1, Ordering::Relaxed),
			attrs: Mutex::new(HashMap::new()),
		}))
	}

	pub fn named(name: &str) -> Self {
		Self::new().with("name", name)
	}

	pub fn with(self, attr: &str, value: impl Into<KeyValue>) -> Self {
		self.0.attrs.lock().insert(attr.to_owned(), value.into());
		self
	}
}

impl PartialEq for Person {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for Person {}

impl Hash for Person {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.id.hash(state);
	}
}

impl fmt::Debug for Person {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0.attrs.lock().get("name") {
			Some(name) => write!(f, "Person({name})"),
			None => write!(f, "Person#{}", self.0.id),
		}
	}
}

impl AttributeSource for Person {
	fn attribute(&self, name: &str) -> Option<KeyValue> {
		self.0.attrs.lock().get(name).cloned()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<V> {
	Append(V),
	AppendWoMutation(V),
	Remove(V),
	Set(V),
	BulkReplace(usize),
	Init,
	Dispose(usize),
}

/// Records what an attribute's listeners are told, along with each event's initiator kind.
pub struct EventLog<V> {
	events: Mutex<Vec<(Event<V>, EventKind)>>,
}

impl<V: xeno_collections::Member> EventLog<V> {
	pub fn attach(listeners: &Listeners<V>) -> Arc<Self> {
		let log = Arc::new(Self {
			events: Mutex::new(Vec::new()),
		});
		listeners.listen(log.clone());
		log
	}

	pub fn take(&self) -> Vec<Event<V>> {
		std::mem::take(&mut *self.events.lock()).into_iter().map(|(event, _)| event).collect()
	}

	/// Membership changes only, draining the log.
	pub fn take_changes(&self) -> Vec<Event<V>> {
		self.take()
			.into_iter()
			.filter(|event| matches!(event, Event::Append(_) | Event::Remove(_)))
			.collect()
	}

	pub fn kinds(&self) -> Vec<EventKind> {
		self.events.lock().iter().map(|(_, kind)| *kind).collect()
	}

	fn push(&self, event: Event<V>, initiator: &Initiator) {
		self.events.lock().push((event, initiator.kind()));
	}
}

impl<V: xeno_collections::Member> CollectionListener<V> for EventLog<V> {
	fn append(&self, _owner: &Instance, value: &V, initiator: &Initiator) -> EventFlow<V> {
		self.push(Event::Append(value.clone()), initiator);
		EventFlow::Continue
	}

	fn append_wo_mutation(&self, _owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		self.push(Event::AppendWoMutation(value.clone()), initiator);
		Ok(())
	}

	fn remove(&self, _owner: &Instance, value: &V, initiator: &Initiator) -> Result<(), ListenerError> {
		self.push(Event::Remove(value.clone()), initiator);
		Ok(())
	}

	fn set(&self, _owner: &Instance, value: &V, _old: Option<&V>, initiator: &Initiator) -> EventFlow<V> {
		self.push(Event::Set(value.clone()), initiator);
		EventFlow::Continue
	}

	fn bulk_replace(&self, _owner: &Instance, values: &[V], initiator: &Initiator) -> Result<(), ListenerError> {
		self.push(Event::BulkReplace(values.len()), initiator);
		Ok(())
	}

	fn init_collection(&self, _owner: &Instance, initiator: &Initiator) -> Result<(), ListenerError> {
		self.push(Event::Init, initiator);
		Ok(())
	}

	fn dispose_collection(&self, _owner: &Instance, values: &[V], initiator: &Initiator) -> Result<(), ListenerError> {
		self.push(Event::Dispose(values.len()), initiator);
		Ok(())
	}
}
