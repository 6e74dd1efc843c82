//! List-shaped proxy surface.

use tracing::debug;

use super::{Collection, Slice, first_member};
use crate::descriptor::{ListOps, MemberOf, MethodCall};
use crate::error::{CollectionError, Result};

/// Instrumented mutation surface of list-shaped collections.
///
/// Indices accept negative values counting from the end. Single-index assignment is a `remove`
/// of the old element followed by an `append` of the new one.
pub trait ListProxy {
	type Item;

	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get(&self, index: isize) -> Option<Self::Item>;

	fn to_vec(&self) -> Vec<Self::Item>;

	fn push(&self, value: Self::Item) -> Result<()>;

	/// Inserts before `index`, clamping out-of-range positions like `list.insert`.
	fn insert(&self, index: isize, value: Self::Item) -> Result<()>;

	/// Removes the first occurrence of `value`; absent values fail without events.
	fn remove(&self, value: &Self::Item) -> Result<()>;

	/// Removes and returns the element at `index` (the last one for `None`).
	fn pop(&self, index: Option<isize>) -> Result<Self::Item>;

	fn set(&self, index: isize, value: Self::Item) -> Result<()>;

	/// Assigns `values` to a slice. Step-1 slices may resize; extended slices need an exact
	/// length match and fail with [`CollectionError::Range`] before any mutation.
	fn set_slice(&self, slice: impl Into<Slice>, values: Vec<Self::Item>) -> Result<()>;

	/// Slice assignment from another collection; a step-1 slice of a collection to itself is a
	/// no-op.
	fn set_slice_from(&self, slice: impl Into<Slice>, source: &Self) -> Result<()>;

	fn delete(&self, index: isize) -> Result<()>;

	fn delete_slice(&self, slice: impl Into<Slice>) -> Result<()>;

	fn extend(&self, values: impl IntoIterator<Item = Self::Item>) -> Result<()>;

	fn clear(&self) -> Result<()>;
}

impl<C: ListOps> ListProxy for Collection<C> {
	type Item = MemberOf<C>;

	fn len(&self) -> usize {
		self.raw().len()
	}

	fn get(&self, index: isize) -> Option<MemberOf<C>> {
		let raw = self.raw();
		let at = resolve_index(index, raw.len()).ok()?;
		raw.get(at).cloned()
	}

	fn to_vec(&self) -> Vec<MemberOf<C>> {
		self.raw().to_vec()
	}

	fn push(&self, value: MemberOf<C>) -> Result<()> {
		let value = self.fire_append(value)?;
		let mut raw = self.raw();
		let end = raw.len();
		raw.insert_at(end, value);
		Ok(())
	}

	fn insert(&self, index: isize, value: MemberOf<C>) -> Result<()> {
		let value = self.fire_append(value)?;
		let mut raw = self.raw();
		let at = insertion_index(index, raw.len());
		raw.insert_at(at, value);
		Ok(())
	}

	fn remove(&self, value: &MemberOf<C>) -> Result<()> {
		if self.raw().position(value).is_none() {
			return Err(CollectionError::not_found(value));
		}
		self.fire_remove(value)?;
		let mut raw = self.raw();
		if let Some(at) = raw.position(value) {
			raw.remove_at(at);
		}
		Ok(())
	}

	fn pop(&self, index: Option<isize>) -> Result<MemberOf<C>> {
		let (at, item) = element(self, index.unwrap_or(-1))?;
		self.fire_remove(&item)?;
		self.raw().remove_at(at);
		Ok(item)
	}

	fn set(&self, index: isize, value: MemberOf<C>) -> Result<()> {
		let (at, existing) = element(self, index)?;
		self.fire_remove(&existing)?;
		let value = self.fire_append(value)?;
		self.raw().replace_at(at, value);
		Ok(())
	}

	fn set_slice(&self, slice: impl Into<Slice>, values: Vec<MemberOf<C>>) -> Result<()> {
		let slice = slice.into();
		let (start, stop, step) = slice.indices(self.len())?;

		if step != 1 {
			let positions = slice.positions(self.len())?;
			if positions.len() != values.len() {
				return Err(CollectionError::Range {
					given: values.len(),
					expected: positions.len(),
				});
			}
			for (at, value) in positions.into_iter().zip(values) {
				self.set(at as isize, value)?;
			}
			return Ok(());
		}

		let start = start.max(0) as usize;
		let stop = stop.max(start as isize) as usize;
		for _ in start..stop {
			let existing = self.raw().get(start).cloned();
			let Some(existing) = existing else { break };
			self.fire_remove(&existing)?;
			self.raw().remove_at(start);
		}
		for (offset, value) in values.into_iter().enumerate() {
			let value = self.fire_append(value)?;
			let mut raw = self.raw();
			let at = (start + offset).min(raw.len());
			raw.insert_at(at, value);
		}
		Ok(())
	}

	fn set_slice_from(&self, slice: impl Into<Slice>, source: &Self) -> Result<()> {
		let slice = slice.into();
		if self.ptr_eq(source) && !slice.is_extended() {
			debug!(type_name = self.roles().type_name(), "slice self-assignment skipped");
			return Ok(());
		}
		self.set_slice(slice, source.to_vec())
	}

	fn delete(&self, index: isize) -> Result<()> {
		let (at, existing) = element(self, index)?;
		self.fire_remove(&existing)?;
		self.raw().remove_at(at);
		Ok(())
	}

	fn delete_slice(&self, slice: impl Into<Slice>) -> Result<()> {
		let mut positions = slice.into().positions(self.len())?;
		let doomed: Vec<_> = {
			let raw = self.raw();
			positions.iter().filter_map(|&at| raw.get(at).cloned()).collect()
		};
		for item in &doomed {
			self.fire_remove(item)?;
		}
		positions.sort_unstable_by(|a, b| b.cmp(a));
		let mut raw = self.raw();
		for at in positions {
			raw.remove_at(at);
		}
		Ok(())
	}

	fn extend(&self, values: impl IntoIterator<Item = MemberOf<C>>) -> Result<()> {
		for value in values {
			self.push(value)?;
		}
		Ok(())
	}

	fn clear(&self) -> Result<()> {
		let doomed = self.to_vec();
		for item in &doomed {
			self.fire_remove(item)?;
		}
		let mut raw = self.raw();
		while let Some(last) = raw.len().checked_sub(1) {
			raw.remove_at(last);
		}
		Ok(())
	}
}

fn element<C: ListOps>(collection: &Collection<C>, index: isize) -> Result<(usize, MemberOf<C>)> {
	let raw = collection.raw();
	let len = raw.len();
	let at = resolve_index(index, len)?;
	let item = raw.get(at).cloned().ok_or(CollectionError::IndexOutOfRange { index, len })?;
	Ok((at, item))
}

fn resolve_index(index: isize, len: usize) -> Result<usize> {
	let resolved = if index < 0 { index + len as isize } else { index };
	if resolved < 0 || resolved >= len as isize {
		return Err(CollectionError::IndexOutOfRange { index, len });
	}
	Ok(resolved as usize)
}

fn insertion_index(index: isize, len: usize) -> usize {
	if index < 0 {
		(index + len as isize).max(0) as usize
	} else {
		(index as usize).min(len)
	}
}

pub(crate) fn append_member<C: ListOps>(collection: &Collection<C>, call: MethodCall<MemberOf<C>>) -> Result<Option<MemberOf<C>>> {
	collection.push(first_member(call, "push")?)?;
	Ok(None)
}

pub(crate) fn remove_member<C: ListOps>(collection: &Collection<C>, call: MethodCall<MemberOf<C>>) -> Result<Option<MemberOf<C>>> {
	collection.remove(&first_member(call, "remove")?)?;
	Ok(None)
}
