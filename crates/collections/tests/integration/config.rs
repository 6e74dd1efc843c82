//! Keyed collections declared from TOML.

use pretty_assertions::assert_eq;
use serde::Deserialize;
use xeno_collections::prelude::*;
use xeno_collections::{
	CollectionAttribute, CollectionError, ConfigurationError, Instance, KeyFuncMap, KeySpec, KeyValue,
	UnpopulatedPolicy,
};

use crate::common::{Event, EventLog, Person};

type Directory = KeyFuncMap<KeyValue, Person>;

#[derive(Debug, Deserialize)]
struct Relationship {
	class: String,
	key: String,
	keyed_by: KeySpec,
}

fn directory(spec: &KeySpec) -> CollectionAttribute<Directory> {
	let factory = spec.factory::<Person>().expect("valid key spec");
	CollectionAttribute::with_factory("Team", "directory", factory).expect("keyed maps classify")
}

#[test]
fn test_attribute_key_spec_from_toml() {
	let relationship: Relationship = toml::from_str(
		r#"
class = "Team"
key = "directory"

[keyed_by]
kind = "attribute"
name = "handle"
"#,
	)
	.expect("valid relationship");
	assert_eq!(relationship.class, "Team");
	assert_eq!(relationship.key, "directory");
	assert_eq!(
		relationship.keyed_by,
		KeySpec::Attribute {
			name: "handle".into(),
			on_unpopulated: UnpopulatedPolicy::Raise,
		}
	);

	let attribute = directory(&relationship.keyed_by);
	let team = Instance::new("Team");
	let ada = Person::new().with("handle", "ada");
	let entries = attribute.get(&team).unwrap();
	entries.append_member(ada.clone()).unwrap();
	assert_eq!(entries.get(&KeyValue::from("ada")), Some(ada));

	let err = entries.append_member(Person::new());
	assert!(matches!(err, Err(CollectionError::KeyPopulation { attribute, .. }) if attribute == "handle"));
}

#[test]
fn test_composite_column_spec_ignores_unpopulated_members() {
	let spec: KeySpec = toml::from_str(
		r#"
kind = "column"
columns = ["person.team", "person.seat"]
on_unpopulated = "ignore"
"#,
	)
	.expect("valid column spec");
	assert_eq!(spec.on_unpopulated(), UnpopulatedPolicy::Ignore);

	let attribute = directory(&spec);
	let log = EventLog::attach(attribute.listeners());
	let team = Instance::new("Team");
	let seated = Person::new().with("team", "core").with("seat", 4i64);
	let unseated = Person::new().with("team", "core");

	let entries = attribute.get(&team).unwrap();
	entries.append_member(seated.clone()).unwrap();
	entries.append_member(unseated).unwrap();

	let key = KeyValue::Tuple(vec![KeyValue::from("core"), KeyValue::Int(4)]);
	assert_eq!(entries.entries(), vec![(key, seated.clone())]);
	assert_eq!(log.take_changes(), vec![Event::Append(seated)]);
}

#[test]
fn test_bare_column_names_are_rejected() {
	let spec: KeySpec = toml::from_str(
		r#"
kind = "column"
columns = ["seat"]
"#,
	)
	.expect("well-formed toml");
	assert_eq!(
		spec.factory::<Person>().map(|_| ()),
		Err(ConfigurationError::ColumnExpected("seat".into()))
	);
}

#[test]
fn test_unknown_key_kind_fails_to_parse() {
	let parsed = toml::from_str::<KeySpec>(
		r#"
kind = "function"
name = "id"
"#,
	);
	assert!(parsed.is_err());
}

#[test]
fn test_key_spec_round_trips_through_toml() {
	let spec = KeySpec::Column {
		columns: vec!["person.seat".into()],
		on_unpopulated: UnpopulatedPolicy::Ignore,
	};
	let text = toml::to_string(&spec).expect("serializable");
	assert_eq!(toml::from_str::<KeySpec>(&text).expect("parses back"), spec);
}
