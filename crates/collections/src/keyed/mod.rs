//! Dict collections keyed by a function of their values.
//!
//! [`KeyFuncMap`] is the ordered dict-shaped container behind every keyed collection. Its
//! appender (`set`) files a value under `keyfunc(value)`; its remover (`remove`) deletes the
//! entry for `keyfunc(value)` after checking that the entry holds that very value.
//!
//! When the key attribute of a value was never assigned, the [`UnpopulatedPolicy`] decides:
//! `Raise` fails with [`CollectionError::KeyPopulation`], `Ignore` leaves the collection untouched.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::attribute::ContainerFactory;
use crate::collection::{Collection, DictProxy, first_member};
use crate::descriptor::{Container, DictKey, DictOps, MethodAnnotation, MethodCall, TypeDescriptor};
use crate::error::{CollectionError, Result};
use crate::event::EventKind;
use crate::member::{AttributeSource, KeyValue, Member};

mod spec;

pub use spec::{Column, ColumnSpec, KeySpec, UnpopulatedPolicy};

/// Outcome of applying a key function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLookup<K> {
	Key(K),
	/// The named attribute the key depends on was never assigned.
	Unpopulated(String),
}

pub type KeyFunc<K, V> = Arc<dyn Fn(&V) -> KeyLookup<K> + Send + Sync>;

pub struct KeyFuncMap<K: DictKey, V: Member> {
	keyfunc: KeyFunc<K, V>,
	on_unpopulated: UnpopulatedPolicy,
	entries: IndexMap<K, V, FxBuildHasher>,
}

impl<K: DictKey, V: Member> fmt::Debug for KeyFuncMap<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.entries.iter()).finish()
	}
}

impl<K: DictKey, V: Member> KeyFuncMap<K, V> {
	pub fn new(keyfunc: impl Fn(&V) -> K + Send + Sync + 'static) -> Self {
		Self::with_lookup(Arc::new(move |value: &V| KeyLookup::Key(keyfunc(value))), UnpopulatedPolicy::Raise)
	}

	pub fn with_lookup(keyfunc: KeyFunc<K, V>, on_unpopulated: UnpopulatedPolicy) -> Self {
		Self {
			keyfunc,
			on_unpopulated,
			entries: IndexMap::default(),
		}
	}

	pub fn lookup(&self, value: &V) -> KeyLookup<K> {
		(self.keyfunc)(value)
	}

	pub fn on_unpopulated(&self) -> UnpopulatedPolicy {
		self.on_unpopulated
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, key: &K) -> Option<&V> {
		self.entries.get(key)
	}

	pub fn keys(&self) -> impl Iterator<Item = &K> {
		self.entries.keys()
	}

	pub fn values(&self) -> impl Iterator<Item = &V> {
		self.entries.values()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
		self.entries.iter()
	}
}

impl<K: DictKey, V: Member> Container for KeyFuncMap<K, V> {
	type Member = V;

	fn descriptor() -> TypeDescriptor<Self> {
		TypeDescriptor::new("KeyFuncMap")
			.dict()
			.method(MethodAnnotation::instrumented("set", keyed_set::<K, V>).appender())
			.method(MethodAnnotation::instrumented("remove", keyed_remove::<K, V>).remover())
	}
}

impl<K: DictKey, V: Member> DictOps for KeyFuncMap<K, V> {
	type Key = K;

	fn len(&self) -> usize {
		self.entries.len()
	}

	fn get(&self, key: &K) -> Option<&V> {
		self.entries.get(key)
	}

	fn insert_entry(&mut self, key: K, value: V) -> Option<V> {
		self.entries.insert(key, value)
	}

	fn remove_entry(&mut self, key: &K) -> Option<V> {
		self.entries.shift_remove(key)
	}

	fn entries(&self) -> Vec<(K, V)> {
		self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	fn last_key(&self) -> Option<K> {
		self.entries.last().map(|(k, _)| k.clone())
	}

	fn key_for(&self, value: &V) -> Option<K> {
		match self.lookup(value) {
			KeyLookup::Key(key) => Some(key),
			KeyLookup::Unpopulated(_) => None,
		}
	}
}

/// Resolves the key of `value`, applying the unpopulated policy. `Ok(None)` means skip.
fn resolve_key<K: DictKey, V: Member>(collection: &Collection<KeyFuncMap<K, V>>, value: &V, kind: EventKind) -> Result<Option<K>> {
	let (lookup, policy) = collection.with_raw(|map| (map.lookup(value), map.on_unpopulated));
	match (lookup, policy) {
		(KeyLookup::Key(key), _) => Ok(Some(key)),
		(KeyLookup::Unpopulated(attribute), UnpopulatedPolicy::Raise) => Err(CollectionError::KeyPopulation {
			attribute,
			event: collection.event_label(kind),
		}),
		(KeyLookup::Unpopulated(attribute), UnpopulatedPolicy::Ignore) => {
			debug!(attribute = %attribute, ?value, %kind, "skipped keyed value with unpopulated key attribute");
			Ok(None)
		}
	}
}

fn keyed_set<K: DictKey, V: Member>(collection: &Collection<KeyFuncMap<K, V>>, call: MethodCall<V>) -> Result<Option<V>> {
	let value = first_member(call, "set")?;
	if let Some(key) = resolve_key(collection, &value, EventKind::Append)? {
		collection.insert(key, value)?;
	}
	Ok(None)
}

fn keyed_remove<K: DictKey, V: Member>(collection: &Collection<KeyFuncMap<K, V>>, call: MethodCall<V>) -> Result<Option<V>> {
	let value = first_member(call, "remove")?;
	let Some(key) = resolve_key(collection, &value, EventKind::Remove)? else {
		return Ok(None);
	};
	let held = DictProxy::get(collection, &key).ok_or_else(|| CollectionError::not_found(&key))?;
	if held != value {
		return Err(CollectionError::KeyConflict {
			value: format!("{value:?}"),
			held: format!("{held:?}"),
			key: format!("{key:?}"),
		});
	}
	collection.delete(&key)?;
	Ok(None)
}

/// Factory for collections keyed by an arbitrary function.
pub fn keyed_by<K, V, F>(keyfunc: F) -> ContainerFactory<KeyFuncMap<K, V>>
where
	K: DictKey,
	V: Member,
	F: Fn(&V) -> K + Send + Sync + 'static,
{
	let keyfunc: KeyFunc<K, V> = Arc::new(move |value: &V| KeyLookup::Key(keyfunc(value)));
	Arc::new(move || KeyFuncMap::with_lookup(keyfunc.clone(), UnpopulatedPolicy::Raise))
}

/// Factory for collections keyed by the value's attribute `name`.
pub fn keyed_by_attribute<V>(name: impl Into<String>, on_unpopulated: UnpopulatedPolicy) -> ContainerFactory<KeyFuncMap<KeyValue, V>>
where
	V: Member + AttributeSource,
{
	let name: String = name.into();
	let keyfunc: KeyFunc<KeyValue, V> = Arc::new(move |value: &V| match value.attribute(&name) {
		Some(key) => KeyLookup::Key(key),
		None => KeyLookup::Unpopulated(name.clone()),
	});
	Arc::new(move || KeyFuncMap::with_lookup(keyfunc.clone(), on_unpopulated))
}

/// Factory for collections keyed by mapped column values; composite specs produce tuple keys.
pub fn keyed_by_derived_column<V>(spec: ColumnSpec, on_unpopulated: UnpopulatedPolicy) -> ContainerFactory<KeyFuncMap<KeyValue, V>>
where
	V: Member + AttributeSource,
{
	let keyfunc: KeyFunc<KeyValue, V> = match spec {
		ColumnSpec::Single(column) => Arc::new(move |value: &V| match column.read(value) {
			Some(key) => KeyLookup::Key(key),
			None => KeyLookup::Unpopulated(column.name().to_owned()),
		}),
		ColumnSpec::Composite(columns) => Arc::new(move |value: &V| {
			let mut parts = Vec::with_capacity(columns.len());
			for column in &columns {
				match column.read(value) {
					Some(part) => parts.push(part),
					None => return KeyLookup::Unpopulated(column.name().to_owned()),
				}
			}
			KeyLookup::Key(KeyValue::Tuple(parts))
		}),
	};
	Arc::new(move || KeyFuncMap::with_lookup(keyfunc.clone(), on_unpopulated))
}
