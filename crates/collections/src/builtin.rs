//! Container declarations for standard and `indexmap` collections.
//!
//! `HashMap` and `IndexMap` classify as dicts with no appender, so using them directly as a
//! collection attribute fails with a configuration error. Keyed collections go through
//! [`KeyFuncMap`](crate::keyed::KeyFuncMap) instead.

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;

use indexmap::{IndexMap, IndexSet};

use crate::descriptor::{Container, DictKey, DictOps, ListOps, SetOps, TypeDescriptor};
use crate::member::Member;

impl<V: Member> Container for Vec<V> {
	type Member = V;

	fn descriptor() -> TypeDescriptor<Self> {
		TypeDescriptor::new("Vec").list()
	}
}

impl<V: Member> ListOps for Vec<V> {
	fn len(&self) -> usize {
		Vec::len(self)
	}

	fn get(&self, index: usize) -> Option<&V> {
		self.as_slice().get(index)
	}

	fn insert_at(&mut self, index: usize, value: V) {
		let index = index.min(Vec::len(self));
		self.insert(index, value);
	}

	fn remove_at(&mut self, index: usize) -> Option<V> {
		(index < Vec::len(self)).then(|| self.remove(index))
	}

	fn replace_at(&mut self, index: usize, value: V) -> Option<V> {
		self.get_mut(index).map(|slot| std::mem::replace(slot, value))
	}

	fn position(&self, value: &V) -> Option<usize> {
		self.iter().position(|v| v == value)
	}

	fn to_vec(&self) -> Vec<V> {
		self.clone()
	}
}

impl<V: Member, S> Container for HashSet<V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	type Member = V;

	fn descriptor() -> TypeDescriptor<Self> {
		TypeDescriptor::new("HashSet").set()
	}
}

impl<V: Member, S> SetOps for HashSet<V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	fn len(&self) -> usize {
		HashSet::len(self)
	}

	fn contains(&self, value: &V) -> bool {
		HashSet::contains(self, value)
	}

	fn add(&mut self, value: V) -> bool {
		self.insert(value)
	}

	fn discard(&mut self, value: &V) -> bool {
		HashSet::remove(self, value)
	}

	fn members(&self) -> Vec<V> {
		self.iter().cloned().collect()
	}
}

impl<V: Member, S> Container for IndexSet<V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	type Member = V;

	fn descriptor() -> TypeDescriptor<Self> {
		TypeDescriptor::new("IndexSet").set()
	}
}

impl<V: Member, S> SetOps for IndexSet<V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	fn len(&self) -> usize {
		IndexSet::len(self)
	}

	fn contains(&self, value: &V) -> bool {
		IndexSet::contains(self, value)
	}

	fn add(&mut self, value: V) -> bool {
		self.insert(value)
	}

	fn discard(&mut self, value: &V) -> bool {
		self.shift_remove(value)
	}

	fn members(&self) -> Vec<V> {
		self.iter().cloned().collect()
	}
}

impl<K: DictKey, V: Member, S> Container for HashMap<K, V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	type Member = V;

	fn descriptor() -> TypeDescriptor<Self> {
		TypeDescriptor::new("HashMap").dict()
	}
}

impl<K: DictKey, V: Member, S> DictOps for HashMap<K, V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	type Key = K;

	fn len(&self) -> usize {
		HashMap::len(self)
	}

	fn get(&self, key: &K) -> Option<&V> {
		HashMap::get(self, key)
	}

	fn insert_entry(&mut self, key: K, value: V) -> Option<V> {
		self.insert(key, value)
	}

	fn remove_entry(&mut self, key: &K) -> Option<V> {
		self.remove(key)
	}

	fn entries(&self) -> Vec<(K, V)> {
		self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}
}

impl<K: DictKey, V: Member, S> Container for IndexMap<K, V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	type Member = V;

	fn descriptor() -> TypeDescriptor<Self> {
		TypeDescriptor::new("IndexMap").dict()
	}
}

impl<K: DictKey, V: Member, S> DictOps for IndexMap<K, V, S>
where
	S: BuildHasher + Default + Send + Sync + 'static,
{
	type Key = K;

	fn len(&self) -> usize {
		IndexMap::len(self)
	}

	fn get(&self, key: &K) -> Option<&V> {
		IndexMap::get(self, key)
	}

	fn insert_entry(&mut self, key: K, value: V) -> Option<V> {
		self.insert(key, value)
	}

	fn remove_entry(&mut self, key: &K) -> Option<V> {
		self.shift_remove(key)
	}

	fn entries(&self) -> Vec<(K, V)> {
		self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	fn last_key(&self) -> Option<K> {
		self.last().map(|(k, _)| k.clone())
	}
}
