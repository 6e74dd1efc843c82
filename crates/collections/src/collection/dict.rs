//! Dict-shaped proxy surface.

use super::Collection;
use crate::descriptor::{DictOps, MemberOf};
use crate::error::{CollectionError, Result};

type KeyOf<C> = <C as DictOps>::Key;

/// Instrumented mutation surface of dict-shaped collections. Values are the members; keys are
/// bookkeeping and never appear in events.
pub trait DictProxy {
	type Raw: DictOps;

	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get(&self, key: &KeyOf<Self::Raw>) -> Option<MemberOf<Self::Raw>>;

	fn contains_key(&self, key: &KeyOf<Self::Raw>) -> bool {
		self.get(key).is_some()
	}

	fn keys(&self) -> Vec<KeyOf<Self::Raw>>;

	fn entries(&self) -> Vec<(KeyOf<Self::Raw>, MemberOf<Self::Raw>)>;

	/// Item assignment: fires `set` (which may replace the value), then `remove` for a displaced
	/// value and `append` for the new one. Fires even when the value is unchanged.
	fn insert(&self, key: KeyOf<Self::Raw>, value: MemberOf<Self::Raw>) -> Result<()>;

	fn delete(&self, key: &KeyOf<Self::Raw>) -> Result<()>;

	fn pop(&self, key: &KeyOf<Self::Raw>) -> Result<MemberOf<Self::Raw>>;

	/// Like [`pop`](Self::pop) but returns `default` without events when the key is absent.
	fn pop_or(&self, key: &KeyOf<Self::Raw>, default: MemberOf<Self::Raw>) -> Result<MemberOf<Self::Raw>>;

	/// Removes the most recently inserted entry.
	fn popitem(&self) -> Result<(KeyOf<Self::Raw>, MemberOf<Self::Raw>)>;

	/// Returns the value under `key`, inserting `default` if absent. An existing value equal to
	/// `default` fires `append_wo_mutation`.
	fn setdefault(&self, key: KeyOf<Self::Raw>, default: MemberOf<Self::Raw>) -> Result<MemberOf<Self::Raw>>;

	/// Assigns each entry; entries already holding the same value fire `append_wo_mutation`.
	fn update(&self, entries: impl IntoIterator<Item = (KeyOf<Self::Raw>, MemberOf<Self::Raw>)>) -> Result<()>;

	fn clear(&self) -> Result<()>;
}

impl<C: DictOps> DictProxy for Collection<C> {
	type Raw = C;

	fn len(&self) -> usize {
		self.raw().len()
	}

	fn get(&self, key: &KeyOf<C>) -> Option<MemberOf<C>> {
		self.raw().get(key).cloned()
	}

	fn keys(&self) -> Vec<KeyOf<C>> {
		self.raw().entries().into_iter().map(|(key, _)| key).collect()
	}

	fn entries(&self) -> Vec<(KeyOf<C>, MemberOf<C>)> {
		self.raw().entries()
	}

	fn insert(&self, key: KeyOf<C>, value: MemberOf<C>) -> Result<()> {
		let old = self.get(&key);
		let value = self.fire_set(value, old.as_ref())?;
		if let Some(old) = &old {
			self.fire_remove(old)?;
		}
		let value = self.fire_append(value)?;
		self.raw().insert_entry(key, value);
		Ok(())
	}

	fn delete(&self, key: &KeyOf<C>) -> Result<()> {
		self.pop(key).map(|_| ())
	}

	fn pop(&self, key: &KeyOf<C>) -> Result<MemberOf<C>> {
		let value = self.get(key).ok_or_else(|| CollectionError::not_found(key))?;
		self.fire_remove(&value)?;
		self.raw().remove_entry(key);
		Ok(value)
	}

	fn pop_or(&self, key: &KeyOf<C>, default: MemberOf<C>) -> Result<MemberOf<C>> {
		if !self.contains_key(key) {
			return Ok(default);
		}
		self.pop(key)
	}

	fn popitem(&self) -> Result<(KeyOf<C>, MemberOf<C>)> {
		let last = self.raw().last_key();
		let key = last.ok_or(CollectionError::Empty("popitem"))?;
		let value = self.pop(&key)?;
		Ok((key, value))
	}

	fn setdefault(&self, key: KeyOf<C>, default: MemberOf<C>) -> Result<MemberOf<C>> {
		if let Some(existing) = self.get(&key) {
			if existing == default {
				self.fire_append_wo_mutation(&existing)?;
			}
			return Ok(existing);
		}
		self.insert(key.clone(), default.clone())?;
		Ok(self.get(&key).unwrap_or(default))
	}

	fn update(&self, entries: impl IntoIterator<Item = (KeyOf<C>, MemberOf<C>)>) -> Result<()> {
		for (key, value) in entries {
			if self.get(&key).as_ref() == Some(&value) {
				self.fire_append_wo_mutation(&value)?;
			} else {
				self.insert(key, value)?;
			}
		}
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		let doomed = self.entries();
		for (_, value) in &doomed {
			self.fire_remove(value)?;
		}
		let mut raw = self.raw();
		for (key, _) in &doomed {
			raw.remove_entry(key);
		}
		Ok(())
	}
}
