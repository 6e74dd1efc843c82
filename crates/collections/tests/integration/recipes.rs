//! User-defined containers declared through method annotations.

use pretty_assertions::assert_eq;
use xeno_collections::{
	BulkValue, Collection, CollectionAttribute, CollectionError, Container, Instance, KeyValue, MethodAnnotation,
	MethodCall, Mutator, Result, RoleSet, Shape, TypeDescriptor, roles_for,
};

use crate::common::{Event, EventLog, Person};

/// Rank-ordered roster; only its annotations make it a collection.
#[derive(Default)]
struct Roster {
	ranks: Vec<(i64, Person)>,
}

impl Roster {
	fn place(&mut self, rank: i64, person: Person) -> Option<Person> {
		let displaced = self
			.ranks
			.iter()
			.position(|(held, _)| *held == rank)
			.map(|at| self.ranks.remove(at).1);
		let at = self.ranks.partition_point(|(held, _)| *held < rank);
		self.ranks.insert(at, (rank, person));
		displaced
	}
}

fn enlist(roster: &mut Roster, call: &MethodCall<Person>) -> Result<Option<Person>> {
	if let Some(person) = call.member_at(0) {
		let rank = roster.ranks.last().map_or(1, |(rank, _)| rank + 1);
		roster.place(rank, person.clone());
	}
	Ok(None)
}

fn discharge(roster: &mut Roster, call: &MethodCall<Person>) -> Result<Option<Person>> {
	if let Some(person) = call.member_at(0) {
		roster.ranks.retain(|(_, held)| held != person);
	}
	Ok(None)
}

fn promote(roster: &mut Roster, call: &MethodCall<Person>) -> Result<Option<Person>> {
	let rank = match call.named("rank").or_else(|| call.positional(0)).and_then(|arg| arg.as_value()) {
		Some(KeyValue::Int(rank)) => *rank,
		_ => return Ok(None),
	};
	let recruit = call.named_member("recruit").or_else(|| call.member_at(1));
	Ok(recruit.and_then(|recruit| roster.place(rank, recruit.clone())))
}

fn retire(roster: &mut Roster, _call: &MethodCall<Person>) -> Result<Option<Person>> {
	Ok(roster.ranks.pop().map(|(_, person)| person))
}

fn enlist_all(collection: &Collection<Roster>, call: MethodCall<Person>) -> Result<Option<Person>> {
	for index in 0..call.positional_len() {
		if let Some(person) = call.member_at(index) {
			collection.call("enlist", MethodCall::member(person.clone()))?;
		}
	}
	Ok(None)
}

fn roster_members(roster: &Roster) -> Vec<Person> {
	roster.ranks.iter().map(|(_, person)| person.clone()).collect()
}

impl Container for Roster {
	type Member = Person;

	fn descriptor() -> TypeDescriptor<Self> {
		TypeDescriptor::new("Roster")
			.method(MethodAnnotation::raw("enlist", enlist).appender())
			.method(MethodAnnotation::raw("discharge", discharge).remover())
			.method(
				MethodAnnotation::raw("promote", promote)
					.params(&["rank", "recruit"])
					.replaces("recruit"),
			)
			.method(MethodAnnotation::raw("retire", retire).removes_return())
			.method(MethodAnnotation::instrumented("enlist_all", enlist_all))
			.iterator(roster_members)
	}
}

fn roster() -> CollectionAttribute<Roster> {
	CollectionAttribute::new("Unit", "roster", Roster::default).expect("Roster is fully annotated")
}

#[test]
fn test_annotated_type_is_a_custom_collection() {
	let table = roles_for::<Roster>().expect("Roster classifies");
	assert_eq!(table.shape(), Shape::Custom);
	assert_eq!(table.appender(), "enlist");
	assert_eq!(table.remover(), "discharge");
	assert!(table.roles().contains(RoleSet::REPLACES | RoleSet::REMOVES_RETURN));
	assert_eq!(
		table.method("promote").and_then(|m| m.mutator()),
		Some(Mutator::Replaces("recruit".into()))
	);
	assert!(table.method("enlist_all").is_some_and(|m| m.is_internally_instrumented()));
}

#[test]
fn test_annotated_methods_fire_membership_events() {
	let attribute = roster();
	let log = EventLog::attach(attribute.listeners());
	let unit = Instance::new("Unit");
	let (ada, grace, linus) = (Person::named("ada"), Person::named("grace"), Person::named("linus"));

	let roster = attribute.get(&unit).unwrap();
	roster.call("enlist", MethodCall::member(ada.clone())).unwrap();
	roster.call("enlist", MethodCall::member(grace.clone())).unwrap();
	let displaced = roster
		.call(
			"promote",
			MethodCall::new().with_named_value("rank", 1i64).with_named_member("recruit", linus.clone()),
		)
		.unwrap();
	assert_eq!(displaced, Some(ada.clone()));
	assert_eq!(roster.members(), vec![linus.clone(), grace.clone()]);

	let retired = roster.call("retire", MethodCall::new()).unwrap();
	assert_eq!(retired, Some(grace.clone()));
	roster.call("discharge", MethodCall::member(linus.clone())).unwrap();
	assert!(roster.members().is_empty());

	assert_eq!(
		log.take_changes(),
		vec![
			Event::Append(ada.clone()),
			Event::Append(grace.clone()),
			Event::Append(linus.clone()),
			Event::Remove(ada),
			Event::Remove(grace),
			Event::Remove(linus),
		]
	);
}

#[test]
fn test_instrumented_method_routes_through_the_appender() {
	let attribute = roster();
	let log = EventLog::attach(attribute.listeners());
	let unit = Instance::new("Unit");
	let (ada, grace) = (Person::new(), Person::new());

	let roster = attribute.get(&unit).unwrap();
	roster
		.call("enlist_all", MethodCall::new().with_member(ada.clone()).with_member(grace.clone()))
		.unwrap();
	assert_eq!(log.take_changes(), vec![Event::Append(ada.clone()), Event::Append(grace.clone())]);
	assert_eq!(roster.members(), vec![ada, grace]);
}

#[test]
fn test_replacing_without_a_recruit_is_a_missing_argument() {
	let attribute = roster();
	let unit = Instance::new("Unit");
	let roster = attribute.get(&unit).unwrap();

	let err = roster.call("promote", MethodCall::new().with_value(1i64));
	assert_eq!(
		err,
		Err(CollectionError::MissingArgument {
			method: "promote",
			argument: "'recruit'".to_owned(),
		})
	);
	assert_eq!(
		roster.call("desert", MethodCall::new()),
		Err(CollectionError::UnknownMethod {
			type_name: "Roster",
			method: "desert".to_owned(),
		})
	);
}

#[test]
fn test_native_roster_assignment_uses_the_iterator_role() {
	let attribute = roster();
	let log = EventLog::attach(attribute.listeners());
	let unit = Instance::new("Unit");
	let (ada, grace) = (Person::new(), Person::new());

	let mut draft = Roster::default();
	draft.place(2, grace.clone());
	draft.place(1, ada.clone());
	attribute.set(&unit, BulkValue::Native(draft)).unwrap();

	assert_eq!(log.take_changes(), vec![Event::Append(ada.clone()), Event::Append(grace.clone())]);
	assert_eq!(attribute.get(&unit).unwrap().members(), vec![ada, grace]);

	let err = attribute.set(&unit, BulkValue::<Roster>::sequence([Person::new()]));
	assert_eq!(
		err,
		Err(CollectionError::TypeMismatch {
			given: Shape::List,
			wanted: Shape::Custom,
		})
	);
}
