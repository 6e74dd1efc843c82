//! Event streams stay consistent with the container they describe.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexSet;
use proptest::prelude::*;
use xeno_collections::prelude::*;
use xeno_collections::{CollectionAttribute, Instance};

use crate::common::{Event, EventLog};

type Numbers = IndexSet<u32>;

#[derive(Debug, Clone)]
enum SetOp {
	Add(u32),
	Discard(u32),
	Update(Vec<u32>),
	DifferenceUpdate(Vec<u32>),
	IntersectionUpdate(Vec<u32>),
	SymmetricDifferenceUpdate(Vec<u32>),
	Clear,
}

fn small_values() -> impl Strategy<Value = Vec<u32>> {
	prop::collection::vec(0u32..12, 0..6)
}

fn set_op() -> impl Strategy<Value = SetOp> {
	prop_oneof![
		4 => (0u32..12).prop_map(SetOp::Add),
		2 => (0u32..12).prop_map(SetOp::Discard),
		2 => small_values().prop_map(SetOp::Update),
		1 => small_values().prop_map(SetOp::DifferenceUpdate),
		1 => small_values().prop_map(SetOp::IntersectionUpdate),
		1 => small_values().prop_map(SetOp::SymmetricDifferenceUpdate),
		1 => Just(SetOp::Clear),
	]
}

fn apply_to_model(model: &mut BTreeSet<u32>, op: &SetOp) {
	match op {
		SetOp::Add(v) => {
			model.insert(*v);
		}
		SetOp::Discard(v) => {
			model.remove(v);
		}
		SetOp::Update(values) => model.extend(values.iter().copied()),
		SetOp::DifferenceUpdate(values) => {
			for v in values {
				model.remove(v);
			}
		}
		SetOp::IntersectionUpdate(values) => {
			let keep: BTreeSet<u32> = values.iter().copied().collect();
			model.retain(|v| keep.contains(v));
		}
		SetOp::SymmetricDifferenceUpdate(values) => {
			let other: BTreeSet<u32> = values.iter().copied().collect();
			*model = model.symmetric_difference(&other).copied().collect();
		}
		SetOp::Clear => model.clear(),
	}
}

/// Net membership implied by the append/remove events seen so far.
fn tracked(events: &[Event<u32>]) -> BTreeSet<u32> {
	let mut counts: BTreeMap<u32, i64> = BTreeMap::new();
	for event in events {
		match event {
			Event::Append(v) => *counts.entry(*v).or_default() += 1,
			Event::Remove(v) => *counts.entry(*v).or_default() -= 1,
			_ => {}
		}
	}
	counts.into_iter().filter(|(_, n)| *n > 0).map(|(v, _)| v).collect()
}

proptest! {
	#[test]
	fn set_events_track_membership(ops in prop::collection::vec(set_op(), 1..40)) {
		let attribute: CollectionAttribute<Numbers> =
			CollectionAttribute::new("Bag", "numbers", Numbers::new).expect("IndexSet is a set collection");
		let log = EventLog::attach(attribute.listeners());
		let bag = Instance::new("Bag");
		let numbers = attribute.get(&bag).expect("collection");
		let mut model = BTreeSet::new();
		let mut events = Vec::new();

		for op in &ops {
			let applied = match op {
				SetOp::Add(v) => numbers.add(*v),
				SetOp::Discard(v) => numbers.discard(v),
				SetOp::Update(values) => numbers.update(values.clone()),
				SetOp::DifferenceUpdate(values) => numbers.difference_update(values.clone()),
				SetOp::IntersectionUpdate(values) => numbers.intersection_update(values.clone()),
				SetOp::SymmetricDifferenceUpdate(values) => numbers.symmetric_difference_update(values.clone()),
				SetOp::Clear => SetProxy::clear(&numbers),
			};
			prop_assert!(applied.is_ok(), "{op:?} failed: {applied:?}");
			apply_to_model(&mut model, op);
			events.extend(log.take());

			let held: BTreeSet<u32> = numbers.members().into_iter().collect();
			prop_assert_eq!(&held, &model);
			prop_assert_eq!(tracked(&events), model.clone());
		}

		let appends = events.iter().filter(|e| matches!(e, Event::Append(_))).count();
		let removes = events.iter().filter(|e| matches!(e, Event::Remove(_))).count();
		prop_assert_eq!(appends - removes, model.len());
	}
}
