use classad_common::error::ErrorKind;
use classad_keyset::KeySet;

use crate::{AttributeKind, BooleanIndex, ClassAdIndex, Interval, StringIndex, Value, tests::dimension};

fn filter(index: &ClassAdIndex, query: &Interval) -> Vec<u32> {
    let mut result = KeySet::new();
    assert!(index.filter(query, &mut result).unwrap());
    result.to_vec()
}

fn all(index: &ClassAdIndex) -> Vec<u32> {
    let mut result = KeySet::new();
    assert!(index.filter_all(&mut result).unwrap());
    result.to_vec()
}

fn opsys() -> ClassAdIndex {
    ClassAdIndex::make(
        "s:OpSys",
        &dimension([
            Interval::point(0, "LINUX"),
            Interval::point(1, "WINDOWS"),
            Interval::point(2, "LINUX"),
            Interval::point(3, "OSX"),
        ]),
    )
    .unwrap()
}

#[test]
fn test_string_equality() {
    let index = opsys();
    assert_eq!(index.kind(), AttributeKind::String);
    assert_eq!(index.len(), 4);
    assert_eq!(filter(&index, &Interval::point(9, "LINUX")), vec![0, 2]);
    assert_eq!(filter(&index, &Interval::point(9, "SOLARIS")), Vec::<u32>::new());
    assert_eq!(all(&index), vec![0, 1, 2, 3]);
}

#[test]
fn test_string_ranges() {
    let index = opsys();
    assert_eq!(filter(&index, &Interval::unbounded(9)), vec![0, 1, 2, 3]);
    assert_eq!(
        filter(&index, &Interval::new(9, "LINUX", true, "WINDOWS", true)),
        vec![3]
    );
    assert_eq!(
        filter(&index, &Interval::new(9, "M", false, Value::INFINITY, true)),
        vec![1, 3]
    );
    // Numeric bounds carry no meaning for strings.
    assert_eq!(filter(&index, &Interval::closed(9, 1.0, 2.0)), vec![0, 1, 2, 3]);
    // Inverted and degenerate open windows hold nothing.
    assert!(filter(&index, &Interval::closed(9, "Z", "A")).is_empty());
    assert!(filter(&index, &Interval::new(9, "LINUX", true, "LINUX", true)).is_empty());
    assert!(filter(&index, &Interval::new(9, "LINUX", false, "LINUX", true)).is_empty());
}

#[test]
fn test_string_delete() {
    let mut index = opsys();
    assert!(index.delete(0, &Interval::point(0, "LINUX")).unwrap());
    assert!(!index.delete(0, &Interval::point(0, "LINUX")).unwrap());
    assert!(!index.delete(1, &Interval::point(1, "LINUX")).unwrap());
    assert_eq!(filter(&index, &Interval::point(9, "LINUX")), vec![2]);

    assert!(index.delete(2, &Interval::point(2, "LINUX")).unwrap());
    let ClassAdIndex::String(strings) = &index else {
        panic!("expected a string index");
    };
    assert_eq!(strings.value_count(), 2);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_string_rejects_ranges() {
    let err = StringIndex::make(&dimension([Interval::closed(0, "A", "B")]))
        .err()
        .unwrap();
    assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
    assert!(StringIndex::make(&dimension([Interval::point(0, 1.0)])).is_err());
}

#[test]
fn test_boolean_classification() {
    let index = BooleanIndex::make(&dimension([
        Interval::point(0, true),
        Interval::point(1, false),
        Interval::closed(2, false, true),
        Interval::unbounded(3),
        Interval::new(4, false, true, true, false),
    ]))
    .unwrap();
    assert_eq!(index.yup().to_vec(), vec![0, 2, 3, 4]);
    assert_eq!(index.nope().to_vec(), vec![1, 2, 3]);
    assert_eq!(index.len(), 5);

    let index = ClassAdIndex::Boolean(index);
    assert_eq!(filter(&index, &Interval::point(9, true)), vec![0, 2, 3, 4]);
    assert_eq!(filter(&index, &Interval::point(9, false)), vec![1, 2, 3]);
    assert_eq!(filter(&index, &Interval::unbounded(9)), vec![0, 1, 2, 3, 4]);
    assert_eq!(all(&index), vec![0, 1, 2, 3, 4]);

    let mut result = KeySet::new();
    assert!(!index.filter(&Interval::point(9, "yes"), &mut result).unwrap());
    assert!(result.is_empty());
}

#[test]
fn test_boolean_delete() {
    let mut index = ClassAdIndex::make(
        "b:HasJava",
        &dimension([Interval::point(0, true), Interval::closed(1, false, true)]),
    )
    .unwrap();
    assert!(index.delete(1, &Interval::closed(1, false, true)).unwrap());
    assert!(!index.delete(1, &Interval::closed(1, false, true)).unwrap());
    assert_eq!(filter(&index, &Interval::point(9, false)), Vec::<u32>::new());
    assert_eq!(filter(&index, &Interval::point(9, true)), vec![0]);
}

#[test]
fn test_boolean_delete_requires_matching_interval() {
    let mut index = ClassAdIndex::make(
        "b:HasJava",
        &dimension([Interval::point(0, true), Interval::unbounded(1)]),
    )
    .unwrap();
    assert!(!index.delete(0, &Interval::point(0, false)).unwrap());
    assert!(!index.delete(0, &Interval::unbounded(0)).unwrap());
    assert!(!index.delete(1, &Interval::point(1, true)).unwrap());
    assert!(!index.delete(0, &Interval::point(0, "true")).unwrap());
    assert_eq!(index.len(), 2);
    assert_eq!(filter(&index, &Interval::point(9, true)), vec![0, 1]);
    assert_eq!(filter(&index, &Interval::point(9, false)), vec![1]);

    // Any interval admitting the same truth values identifies the entry.
    assert!(index.delete(1, &Interval::closed(1, false, true)).unwrap());
    assert!(index.delete(0, &Interval::point(0, true)).unwrap());
    assert!(index.is_empty());
}

#[test]
fn test_boolean_rejects_other_kinds() {
    assert!(BooleanIndex::make(&dimension([Interval::point(0, "true")])).is_err());
    assert!(BooleanIndex::make(&dimension([Interval::closed(0, 0.0, 1.0)])).is_err());
}

#[test]
fn test_make_dispatches_on_prefix() {
    let numbers = dimension([Interval::closed(0, 1.0, 2.0)]);
    for (attribute, kind) in [
        ("n:Memory", AttributeKind::Numeric),
        ("i:Cpus", AttributeKind::Numeric),
        ("t:Start", AttributeKind::Numeric),
    ] {
        assert_eq!(ClassAdIndex::make(attribute, &numbers).unwrap().kind(), kind);
    }
    let flags = dimension([Interval::point(0, true)]);
    assert_eq!(
        ClassAdIndex::make("u:Flag", &flags).unwrap().kind(),
        AttributeKind::Boolean
    );

    let err = ClassAdIndex::make("x:Memory", &numbers).err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::UnknownAttributeType { .. }));
    let err = ClassAdIndex::make("n:OpSys", &dimension([Interval::point(0, "LINUX")]))
        .err()
        .unwrap();
    assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
}

#[test]
fn test_numeric_filter_all() {
    let index = ClassAdIndex::make(
        "n:Memory",
        &dimension([
            Interval::closed(0, 1.0, 2.0),
            Interval::new(1, 3.0, true, 3.0, true),
            Interval::new(2, Value::NEG_INFINITY, true, 0.0, false),
        ]),
    )
    .unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(all(&index), vec![0, 2]);
    assert_eq!(all(&index), filter(&index, &Interval::unbounded(9)));
    assert!(index.to_string().starts_with("interval tree"));
}
