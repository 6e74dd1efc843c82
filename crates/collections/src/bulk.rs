//! Whole-collection assignment.
//!
//! Assigning a new value to a collection attribute builds a fresh container, fills it and swaps
//! it in, firing events only for membership that actually changed:
//!
//! 1. The value is checked against the attribute's shape before anything is touched.
//! 2. `bulk_replace` listeners see the incoming members.
//! 3. A fresh container is created (`init_collection`) and committed to the owner. If filling
//!    it fails, the previous collection is reinstated and the fresh one severed.
//! 4. The type's `bulk_replace` role diffs old against new. Added members are appended with
//!    events in the new value's order; retained members are appended silently.
//! 5. Removed members get `remove` events through the old adapter, then the old container is
//!    severed (`dispose_collection`). It is never mutated and stays usable as a snapshot.

use rustc_hash::FxHashSet as HashSet;
use tracing::debug;

use crate::attribute::CollectionAttribute;
use crate::capability::Shape;
use crate::collection::{Collection, Emit};
use crate::descriptor::{Container, DictOps, MemberOf};
use crate::error::{CollectionError, Result};
use crate::event::{EventKind, Initiator};
use crate::instance::Instance;

/// A value assignable to a collection attribute.
pub enum BulkValue<C: Container> {
	/// A raw container of the attribute's own type.
	Native(C),
	/// Another collection handle (or the attribute's current one, which is a no-op).
	Collection(Collection<C>),
	/// Plain ordered values; accepted by list-shaped attributes.
	Sequence(Vec<MemberOf<C>>),
	/// Plain unordered values; accepted by set-shaped attributes.
	Set(Vec<MemberOf<C>>),
	/// Mapping values with their keys dropped; accepted by dict-shaped attributes, whose
	/// appender files each value under its own key.
	Mapping(Vec<MemberOf<C>>),
}

impl<C: Container> BulkValue<C> {
	pub fn sequence(values: impl IntoIterator<Item = MemberOf<C>>) -> Self {
		BulkValue::Sequence(values.into_iter().collect())
	}

	pub fn set(values: impl IntoIterator<Item = MemberOf<C>>) -> Self {
		BulkValue::Set(values.into_iter().collect())
	}

	pub fn mapping<K>(entries: impl IntoIterator<Item = (K, MemberOf<C>)>) -> Self {
		BulkValue::Mapping(entries.into_iter().map(|(_, value)| value).collect())
	}

	fn given_shape(&self, wanted: Shape) -> Shape {
		match self {
			BulkValue::Native(_) | BulkValue::Collection(_) => wanted,
			BulkValue::Sequence(_) => Shape::List,
			BulkValue::Set(_) => Shape::Set,
			BulkValue::Mapping(_) => Shape::Dict,
		}
	}
}

impl<C: Container> From<Collection<C>> for BulkValue<C> {
	fn from(collection: Collection<C>) -> Self {
		BulkValue::Collection(collection)
	}
}

impl<C: Container> From<&Collection<C>> for BulkValue<C> {
	fn from(collection: &Collection<C>) -> Self {
		BulkValue::Collection(collection.clone())
	}
}

/// How an incoming member relates to the old collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
	/// New membership; appended with events.
	Added,
	/// Already present; appended silently.
	Retained,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDiff<V> {
	/// Incoming members in assignment order.
	pub placements: Vec<(V, Placement)>,
	/// Old members absent from the new value, in old iteration order.
	pub removals: Vec<V>,
}

impl<V> BulkDiff<V> {
	pub fn additions(&self) -> impl Iterator<Item = &V> {
		self.placements.iter().filter(|(_, p)| *p == Placement::Added).map(|(v, _)| v)
	}

	pub fn constants(&self) -> impl Iterator<Item = &V> {
		self.placements.iter().filter(|(_, p)| *p == Placement::Retained).map(|(v, _)| v)
	}
}

/// Inputs of a `bulk_replace` role.
pub struct DiffInput<'a, C: Container> {
	/// The raw container being replaced, if the attribute had one.
	pub old: Option<&'a C>,
	pub old_members: &'a [MemberOf<C>],
	/// The empty container that will receive the new members.
	pub fresh: &'a C,
	pub incoming: &'a [MemberOf<C>],
}

/// Diff by member equality.
pub fn identity_diff<C: Container>(input: &DiffInput<'_, C>) -> BulkDiff<MemberOf<C>> {
	let old: HashSet<&MemberOf<C>> = input.old_members.iter().collect();
	let incoming: HashSet<&MemberOf<C>> = input.incoming.iter().collect();

	let placements = input
		.incoming
		.iter()
		.map(|value| {
			let placement = if old.contains(value) {
				Placement::Retained
			} else {
				Placement::Added
			};
			(value.clone(), placement)
		})
		.collect();

	let mut seen = HashSet::default();
	let removals = input
		.old_members
		.iter()
		.filter(|value| !incoming.contains(value) && seen.insert(*value))
		.cloned()
		.collect();

	BulkDiff { placements, removals }
}

/// Diff by derived key for dict containers that know how to key their values.
///
/// A member is retained when the old container holds it, under its current key or under the
/// key it was filed with before its key attribute changed, and added otherwise. An old entry is
/// removed only when neither its key nor its value appears in the new value, so a value
/// displaced by a new value under the same key goes without a `remove`. Falls back to
/// [`identity_diff`] when the fresh container cannot derive keys.
pub fn keyed_diff<C: DictOps>(input: &DiffInput<'_, C>) -> BulkDiff<MemberOf<C>> {
	let Some(old) = input.old else {
		return identity_diff(input);
	};

	let mut keyed = Vec::with_capacity(input.incoming.len());
	for value in input.incoming {
		match input.fresh.key_for(value) {
			Some(key) => keyed.push((key, value)),
			None => return identity_diff(input),
		}
	}

	let old_entries = old.entries();
	let held: HashSet<&MemberOf<C>> = old_entries.iter().map(|(_, value)| value).collect();
	let incoming_keys: HashSet<&C::Key> = keyed.iter().map(|(key, _)| key).collect();
	let incoming_values: HashSet<&MemberOf<C>> = input.incoming.iter().collect();

	let placements = keyed
		.iter()
		.map(|(key, value)| {
			let placement = if old.get(key) == Some(*value) || held.contains(*value) {
				Placement::Retained
			} else {
				Placement::Added
			};
			((*value).clone(), placement)
		})
		.collect();
	let removals = old_entries
		.iter()
		.filter(|(key, value)| !incoming_keys.contains(key) && !incoming_values.contains(value))
		.map(|(_, value)| value.clone())
		.collect();

	BulkDiff { placements, removals }
}

pub(crate) fn replace<C: Container>(attribute: &CollectionAttribute<C>, owner: &Instance, value: BulkValue<C>) -> Result<()> {
	let key = attribute.key();
	let shape = attribute.shape();
	let roles = attribute.roles().clone();
	let current = owner.committed::<C>(key).or_else(|| owner.implicit_empty::<C>(key));

	let incoming = match value {
		BulkValue::Collection(handle) => {
			if current.as_ref().is_some_and(|current| current.ptr_eq(&handle)) {
				debug!(attribute = attribute.qualified_name(), "collection assigned to itself; skipped");
				return Ok(());
			}
			handle.members()
		}
		BulkValue::Native(raw) => roles.iterate(&raw),
		BulkValue::Sequence(values) if shape == Shape::List => values,
		BulkValue::Set(values) if shape == Shape::Set => values,
		BulkValue::Mapping(values) if shape == Shape::Dict => values,
		other => {
			return Err(CollectionError::TypeMismatch {
				given: other.given_shape(shape),
				wanted: shape,
			});
		}
	};

	let token = attribute.initiator(EventKind::BulkReplace);
	attribute.listeners().dispatch_bulk_replace(owner, &incoming, &token)?;

	let fresh = attribute.initialize(owner)?;
	let diff = {
		let fresh_raw = fresh.raw();
		match &current {
			Some(old) => {
				let old_raw = old.raw();
				let old_members = roles.iterate(&old_raw);
				roles.diff(&DiffInput {
					old: Some(&*old_raw),
					old_members: &old_members,
					fresh: &*fresh_raw,
					incoming: &incoming,
				})
			}
			None => roles.diff(&DiffInput {
				old: None,
				old_members: &[],
				fresh: &*fresh_raw,
				incoming: &incoming,
			}),
		}
	};

	let committed = owner.committed::<C>(key);
	owner.commit(key, fresh.clone());
	if let Err(err) = apply(&fresh, current.as_ref(), &diff, &token) {
		attribute.restore(owner, &fresh, committed, current.as_ref());
		return Err(err);
	}
	if let Some(old) = &current {
		attribute.dispose(owner, old, &token)?;
	}

	let added = diff.additions().count();
	debug!(
		attribute = attribute.qualified_name(),
		added,
		removed = diff.removals.len(),
		"bulk replaced collection"
	);
	Ok(())
}

/// Fills `fresh` and reports removals through the old adapter.
fn apply<C: Container>(
	fresh: &Collection<C>,
	old: Option<&Collection<C>>,
	diff: &BulkDiff<MemberOf<C>>,
	token: &Initiator,
) -> Result<()> {
	let evented = fresh.with_emit(Emit::Initiated(token.clone()));
	let silent = fresh.without_events();
	for (value, placement) in &diff.placements {
		match placement {
			Placement::Added => evented.append_member(value.clone())?,
			Placement::Retained => silent.append_member(value.clone())?,
		}
	}
	if let Some(adapter) = old.and_then(Collection::adapter) {
		for value in &diff.removals {
			adapter.fire_remove_event(value, Some(token))?;
		}
	}
	Ok(())
}
