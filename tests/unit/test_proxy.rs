use seshat::logging::ConsoleOutput;
use seshat::proxy::Member;
use seshat::{here, share, AccessError, Instrumented, Members, Proxy, Shape, SharedBuffer, Tracer};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
struct Person {
    name: String,
    age: u32,
    nickname: Option<String>,
    id: u64,
}

impl Person {
    fn new(name: &str, age: u32) -> Self {
        Self {
            name: name.to_string(),
            age,
            nickname: None,
            id: 1,
        }
    }

    fn info(&self) -> String {
        format!("{} is {} years old", self.name, self.age)
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.age)
    }
}

impl Instrumented for Person {
    fn describe(shape: &mut Shape<Self>) {
        shape
            .field("name", |p| &p.name, |p, v| p.name = v)
            .field("age", |p| &p.age, |p, v| p.age = v)
            .optional("nickname", |p| &p.nickname, |p| &mut p.nickname)
            .readonly("id", |p| &p.id)
            .method("info", |p, _| Ok(p.info()))
            .method_mut("birthday", |p, args| {
                let years: u32 = args.get_or(0, 1)?;
                p.age += years;
                Ok(p.age)
            })
            .method("fail", |_, _| -> Result<(), AccessError> {
                Err(AccessError::msg("refused"))
            });
    }
}

fn capture() -> (Arc<Tracer>, SharedBuffer) {
    let buffer = SharedBuffer::new();
    (Tracer::with_writer(buffer.clone()), buffer)
}

#[test]
fn test_name_age_scenario() {
    let (tracer, buffer) = capture();
    let person = tracer.wrap(&share(Person::new("Ada", 36)));
    let access = person.at(here!());

    assert_eq!(access.read_as::<String>("name").unwrap(), "Ada");
    access.set("age", 37).unwrap();
    assert_eq!(access.call("info", &[]).unwrap(), json!("Ada is 37 years old"));

    let lines = buffer.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("[READ] [test_proxy] << test_name_age_scenario >> Proxy<Person>.name"));
    assert!(lines[1].ends_with("[WRITE] [test_proxy] << test_name_age_scenario >> Proxy<Person>.age"));
    assert!(lines[2].ends_with("[CALL] [test_proxy] << test_name_age_scenario >> Proxy<Person>.info()"));
    assert_eq!(person.snapshot().age, 37);
}

#[test]
fn test_missing_member_matches_direct_access() {
    let (tracer, buffer) = capture();
    let target = share(Person::new("Ada", 36));
    let person = tracer.wrap(&target);

    let through_proxy = person.read("height").unwrap_err();
    let direct = target.read().unwrap().member("height").unwrap_err();

    assert!(through_proxy.is_missing_member());
    assert_eq!(through_proxy.to_string(), direct.to_string());
    assert!(buffer.lines().is_empty());
}

#[test]
fn test_wrap_is_idempotent() {
    let (tracer, _buffer) = capture();
    let target = share(Person::new("Ada", 36));

    let first = tracer.wrap(&target);
    let second = tracer.wrap(&target);
    let of_target = tracer.wrap(&first.target());

    assert!(Proxy::ptr_eq(&first, &second));
    assert!(Proxy::ptr_eq(&first, &of_target));
    assert!(tracer.is_wrapped(&target));
    assert_eq!(tracer.proxy_count(), 1);

    let twin = share(Person::new("Ada", 36));
    let other = tracer.wrap(&twin);
    assert!(!Proxy::ptr_eq(&first, &other));
    assert_eq!(first, other);
    assert_eq!(tracer.proxy_count(), 2);
}

#[test]
fn test_reads_and_writes_match_target() {
    let (tracer, _buffer) = capture();
    let target = share(Person::new("Grace", 45));
    let person = tracer.wrap(&target);

    person.set("name", "Hopper").unwrap();
    assert_eq!(target.read().unwrap().name, "Hopper");

    target.write().unwrap().age = 50;
    assert_eq!(person.read("age").unwrap(), json!(50));
    assert_eq!(
        person.read("age").unwrap(),
        target.read().unwrap().member("age").unwrap()
    );
}

#[test]
fn test_methods_match_direct_calls() {
    let (tracer, buffer) = capture();
    let target = share(Person::new("Alan", 41));
    let person = tracer.wrap(&target);

    let expected = target.read().unwrap().info();
    assert_eq!(person.call("info", &[]).unwrap(), json!(expected));

    let birthday = person.get("birthday").unwrap().into_method().unwrap();
    assert_eq!(birthday.invoke_as::<u32>(&[json!(2)]).unwrap(), 43);
    assert_eq!(birthday.invoke(&[]).unwrap(), json!(44));
    assert_eq!(target.read().unwrap().age, 44);

    // One CALL line per fetch, none per invocation.
    let calls = buffer
        .lines()
        .iter()
        .filter(|line| line.contains("[CALL]"))
        .count();
    assert_eq!(calls, 2);
}

#[test]
fn test_get_classifies_members() {
    let (tracer, buffer) = capture();
    let person = tracer.wrap(&share(Person::new("Ada", 36)));

    match person.get("name").unwrap() {
        Member::Field(value) => assert_eq!(value, json!("Ada")),
        other => panic!("expected a field, got {:?}", other),
    }
    assert!(person.get("info").unwrap().is_method());

    let lines = buffer.lines();
    assert!(lines[0].contains("[READ]"));
    assert!(lines[1].contains("[CALL]"));
    assert!(lines[1].ends_with("Proxy<Person>.info()"));
}

#[test]
fn test_access_errors_surface_unchanged() {
    let (tracer, _buffer) = capture();
    let person = tracer.wrap(&share(Person::new("Ada", 36)));

    assert!(matches!(person.set("id", 9), Err(AccessError::ReadOnly { .. })));
    assert!(matches!(person.call("name", &[]), Err(AccessError::NotCallable { .. })));
    assert!(matches!(person.read("info"), Err(AccessError::NotAField { .. })));
    assert!(matches!(
        person.set("age", "old"),
        Err(AccessError::InvalidValue { .. })
    ));
    assert!(matches!(
        person.call("birthday", &[json!("soon")]),
        Err(AccessError::InvalidArgument { index: 0, .. })
    ));

    let raised = person.call("fail", &[]).unwrap_err();
    assert!(matches!(raised, AccessError::Raised(_)));
    assert_eq!(raised.to_string(), "refused");
}

#[test]
fn test_unassignable_members_write_no_line() {
    let (tracer, buffer) = capture();
    let person = tracer.wrap(&share(Person::new("Ada", 36)));

    assert!(person.set("height", 170).unwrap_err().is_missing_member());
    assert!(matches!(person.set("id", 9), Err(AccessError::ReadOnly { .. })));
    assert!(matches!(person.set("info", "x"), Err(AccessError::ReadOnly { .. })));
    assert!(buffer.lines().is_empty());

    // The member exists, so the attempt is logged even though the value is rejected.
    assert!(person.set("age", "old").is_err());
    let lines = buffer.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("[WRITE] [tests::unit::test_proxy] << line "));
    assert!(lines[0].ends_with(" >> Proxy<Person>.age"));
    assert_eq!(person.snapshot().age, 36);
}

#[test]
fn test_delete_optional_member_is_silent() {
    let (tracer, buffer) = capture();
    let person = tracer.wrap(&share(Person::new("Ada", 36)));

    person.set("nickname", "Countess").unwrap();
    assert_eq!(person.read_as::<String>("nickname").unwrap(), "Countess");
    buffer.clear();

    person.delete("nickname").unwrap();
    assert!(buffer.lines().is_empty());
    assert!(person.read("nickname").unwrap_err().is_missing_member());
    assert!(matches!(person.delete("name"), Err(AccessError::Undeletable { .. })));
    assert!(person.delete("nickname").unwrap_err().is_missing_member());
}

#[test]
fn test_protocols_do_not_log() {
    let (tracer, buffer) = capture();
    let person = tracer.wrap(&share(Person::new("Ada", 36)));

    assert_eq!(person.to_string(), "Ada (36)");
    assert_eq!(format!("{:?}", person), format!("{:?}", Person::new("Ada", 36)));
    assert_eq!(person, Person::new("Ada", 36));
    assert!(buffer.lines().is_empty());
}

#[test]
fn test_collection_targets() {
    struct Scores(HashMap<String, u32>);

    impl Instrumented for Scores {
        fn describe(shape: &mut Shape<Self>) {
            shape
                .named("Scores")
                .method("best", |s, _| Ok(s.0.values().max().copied()));
        }
    }

    impl<'a> IntoIterator for &'a Scores {
        type Item = (&'a String, &'a u32);
        type IntoIter = std::collections::hash_map::Iter<'a, String, u32>;
        fn into_iter(self) -> Self::IntoIter {
            self.0.iter()
        }
    }

    let tracer = Tracer::with_console(ConsoleOutput::None);
    let scores = tracer.wrap(&share(Scores(HashMap::from([
        ("ada".to_string(), 9),
        ("alan".to_string(), 7),
    ]))));

    assert_eq!(scores.len(), 2);
    assert_eq!(scores.call("best", &[]).unwrap(), json!(9));
    assert_eq!(scores.wrapper_name(), "Proxy<Scores>");
}

#[test]
fn test_dropped_tracer_keeps_forwarding() {
    let buffer = SharedBuffer::new();
    let tracer = Tracer::with_writer(buffer.clone());
    let person = tracer.wrap(&share(Person::new("Ada", 36)));
    drop(tracer);

    person.set("age", 40).unwrap();
    assert_eq!(person.read_as::<u32>("age").unwrap(), 40);
    assert!(buffer.lines().is_empty());
}
