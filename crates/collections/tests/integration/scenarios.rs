//! End-to-end attribute scenarios: an owner, an attribute, and what its listeners observe.

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use xeno_collections::prelude::*;
use xeno_collections::{
	BulkValue, CollectionAttribute, CollectionError, EventFlow, EventKind, Instance, KeyFuncMap, KeyValue, Slice,
	UnpopulatedPolicy, collection_adapter, keyed_by_attribute,
};

use crate::common::{Event, EventLog, Person};

type People = Vec<Person>;
type Club = HashSet<Person>;
type Directory = KeyFuncMap<KeyValue, Person>;

fn people() -> CollectionAttribute<People> {
	CollectionAttribute::new("Team", "members", Vec::new).expect("Vec is a list collection")
}

#[test]
fn test_list_assignment_reports_only_membership_changes() {
	let attribute = people();
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	let (e1, e2, e3) = (Person::new(), Person::new(), Person::new());

	let members = attribute.get(&team).unwrap();
	members.push(e1.clone()).unwrap();
	members.push(e2.clone()).unwrap();
	assert_eq!(log.take_changes(), vec![Event::Append(e1.clone()), Event::Append(e2.clone())]);

	attribute.set(&team, BulkValue::<People>::sequence([e3.clone()])).unwrap();
	assert_eq!(
		log.take(),
		vec![
			Event::BulkReplace(1),
			Event::Init,
			Event::Append(e3.clone()),
			Event::Remove(e1),
			Event::Remove(e2),
			Event::Dispose(2),
		]
	);
	assert_eq!(attribute.get(&team).unwrap().members(), vec![e3]);
}

#[test]
fn test_set_assignment_is_a_minimal_diff() {
	let attribute: CollectionAttribute<Club> =
		CollectionAttribute::new("Team", "club", HashSet::new).expect("HashSet is a set collection");
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	let (e1, e2, e3) = (Person::new(), Person::new(), Person::new());

	attribute.set(&team, BulkValue::<Club>::set([e1.clone(), e2.clone()])).unwrap();
	log.take();

	attribute.set(&team, BulkValue::<Club>::set([e2.clone(), e3.clone()])).unwrap();
	assert_eq!(log.take_changes(), vec![Event::Append(e3.clone()), Event::Remove(e1)]);

	let club = attribute.get(&team).unwrap();
	let held: HashSet<Person> = club.members().into_iter().collect();
	assert_eq!(held, HashSet::from([e2, e3]));
}

#[test]
fn test_readding_a_set_member_is_not_a_mutation() {
	let attribute: CollectionAttribute<Club> = CollectionAttribute::new("Team", "club", HashSet::new).unwrap();
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	let e1 = Person::new();

	let club = attribute.get(&team).unwrap();
	club.add(e1.clone()).unwrap();
	club.add(e1.clone()).unwrap();
	assert_eq!(log.take(), vec![Event::Init, Event::Append(e1.clone()), Event::AppendWoMutation(e1)]);
	assert_eq!(club.members().len(), 1);
}

#[test]
fn test_extended_slice_size_mismatch_leaves_list_untouched() {
	let attribute = people();
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	let crew: Vec<Person> = (0..6).map(|_| Person::new()).collect();
	attribute.set(&team, BulkValue::<People>::sequence(crew.clone())).unwrap();
	log.take();

	let members = attribute.get(&team).unwrap();
	let err = members.set_slice(Slice::range(0, 6).with_step(2), vec![Person::new()]);
	assert_eq!(err, Err(CollectionError::Range { given: 1, expected: 3 }));
	assert_eq!(
		err.map_err(|e| e.to_string()),
		Err("attempt to assign sequence of size 1 to extended slice of size 3".to_owned())
	);
	assert!(log.take().is_empty());
	assert_eq!(members.members(), crew);
}

#[test]
fn test_keyed_directory_files_people_by_name() {
	let attribute: CollectionAttribute<Directory> = CollectionAttribute::with_factory(
		"Team",
		"directory",
		keyed_by_attribute("name", UnpopulatedPolicy::Raise),
	)
	.expect("keyed maps are dict collections");
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	let (ada, grace) = (Person::named("ada"), Person::named("grace"));

	let directory = attribute.get(&team).unwrap();
	directory.append_member(ada.clone()).unwrap();
	directory.insert(KeyValue::from("grace"), grace.clone()).unwrap();
	assert_eq!(directory.get(&KeyValue::from("ada")), Some(ada.clone()));
	assert_eq!(directory.keys(), vec![KeyValue::from("ada"), KeyValue::from("grace")]);

	let popped = directory.pop(&KeyValue::from("ada")).unwrap();
	assert_eq!(popped, ada);
	assert_eq!(
		log.take(),
		vec![
			Event::Init,
			Event::Set(ada.clone()),
			Event::Append(ada.clone()),
			Event::Set(grace.clone()),
			Event::Append(grace),
			Event::Remove(ada),
		]
	);
}

#[test]
fn test_severed_collection_stays_severed() {
	let attribute = people();
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	attribute.set(&team, BulkValue::<People>::sequence([Person::new()])).unwrap();
	let first = attribute.get(&team).unwrap();
	let first_adapter = collection_adapter(&first).expect("committed collections are bound");

	attribute.set(&team, BulkValue::<People>::sequence([])).unwrap();
	attribute.set(&team, BulkValue::<People>::sequence([Person::new()])).unwrap();

	assert!(collection_adapter(&first).is_none());
	assert!(!first_adapter.referenced_by_owner());
	assert!(first_adapter.owner().is_some());

	log.take();
	first.push(Person::new()).unwrap();
	first.clear().unwrap();
	assert!(log.take().is_empty());
	assert_eq!(attribute.get(&team).unwrap().members().len(), 1);
}

#[test]
fn test_append_listener_can_substitute_the_stored_value() {
	let attribute = people();
	let stand_in = Person::named("stand-in");
	let substitute = stand_in.clone();
	attribute
		.listeners()
		.on_append(move |_, _, _| EventFlow::Replace(substitute.clone()));
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");

	let members = attribute.get(&team).unwrap();
	members.push(Person::new()).unwrap();
	assert_eq!(members.members(), vec![stand_in.clone()]);
	assert_eq!(log.take_changes(), vec![Event::Append(stand_in)]);
}

#[test]
fn test_listener_abort_prevents_the_mutation() {
	let attribute = people();
	attribute.listeners().on_remove(|_, _, _| Err(xeno_collections::ListenerError::new("members are permanent")));
	let team = Instance::new("Team");
	let e1 = Person::new();

	let members = attribute.get(&team).unwrap();
	members.push(e1.clone()).unwrap();
	let err = members.remove(&e1);
	assert_eq!(err.map_err(|e| e.to_string()), Err("members are permanent".to_owned()));
	assert_eq!(members.members(), vec![e1]);
}

#[test]
fn test_bulk_replace_tokens_distinguish_the_phases() {
	let attribute = people();
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	let keep = Person::new();
	attribute.set(&team, BulkValue::<People>::sequence([keep.clone(), Person::new()])).unwrap();
	log.take();

	attribute.set(&team, BulkValue::<People>::sequence([keep, Person::new()])).unwrap();
	assert_eq!(
		log.kinds(),
		vec![
			EventKind::BulkReplace,
			EventKind::InitCollection,
			EventKind::BulkReplace,
			EventKind::BulkReplace,
			EventKind::DisposeCollection,
		]
	);
}
