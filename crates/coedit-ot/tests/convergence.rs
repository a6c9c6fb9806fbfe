mod common;

use chrono::{TimeZone, Utc};
use coedit_model::{path, DataValue, ObjectMap};
use coedit_ot::{DiscreteOperation, OperationTransformer, Priority, TransformConfig};
use serde_json::json;

use common::{assert_converges, doc};

#[test]
fn concurrent_inserts_into_empty_string() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"s": ""}));
    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::string_insert(path!["s"], 0, "A"),
        DiscreteOperation::string_insert(path!["s"], 0, "B"),
    );
    assert_eq!(result.to_json(), json!({"s": "AB"}));

    let client_first = OperationTransformer::new(&TransformConfig {
        priority: Priority::Client,
    });
    let (result, _, _) = assert_converges(
        &client_first,
        &base,
        DiscreteOperation::string_insert(path!["s"], 0, "A"),
        DiscreteOperation::string_insert(path!["s"], 0, "B"),
    );
    assert_eq!(result.to_json(), json!({"s": "BA"}));
}

#[test]
fn remove_beats_replace_of_same_element() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"list": [1, 2, 3, 4]}));
    let (result, _, client) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::array_remove(path!["list"], 2),
        DiscreteOperation::array_replace(path!["list"], 2, 30.0),
    );
    assert!(client.is_no_op());
    assert_eq!(result.to_json(), json!({"list": [1, 2, 4]}));
}

#[test]
fn object_set_beats_property_write() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"cfg": {"a": 1}}));
    let mut replacement = ObjectMap::new();
    replacement.insert("b".into(), DataValue::from(2.0));
    let (result, _, client) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::object_set(path!["cfg"], replacement),
        DiscreteOperation::object_set_property(path!["cfg"], "x", true),
    );
    assert!(client.is_no_op());
    assert_eq!(result.to_json(), json!({"cfg": {"b": 2}}));
}

#[test]
fn removing_an_ancestor_obsoletes_nested_edit() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"todo": [{"title": "milk"}, {"title": "eggs"}]}));
    let (result, _, client) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::array_remove(path!["todo"], 0),
        DiscreteOperation::string_insert(path!["todo", 0, "title"], 4, "!"),
    );
    assert!(client.is_no_op());
    assert_eq!(result.to_json(), json!({"todo": [{"title": "eggs"}]}));
}

#[test]
fn nested_edit_follows_moved_element() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"todo": [{"title": "milk"}, {"title": "eggs"}, {"title": "tea"}]}));
    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::array_move(path!["todo"], 0, 2),
        DiscreteOperation::string_insert(path!["todo", 0, "title"], 0, "oat "),
    );
    assert_eq!(
        result.to_json(),
        json!({"todo": [{"title": "eggs"}, {"title": "tea"}, {"title": "oat milk"}]})
    );
}

#[test]
fn table_cell_edit_follows_row_insert() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"grid": [[1, 2], [3, 4]]}));
    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::array_insert(path!["grid"], 0, DataValue::from(json!([0, 0]))),
        DiscreteOperation::number_delta(path!["grid", (1, 1)], 10.0),
    );
    assert_eq!(result.to_json(), json!({"grid": [[0, 0], [1, 2], [3, 14]]}));
}

#[test]
fn cell_edit_follows_insert_into_its_row() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"grid": [[0, 0, 0, 0], [1, 2, 3, 4]]}));
    let (result, _, client) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::array_insert(path!["grid", 1], 0, 9.0),
        DiscreteOperation::number_delta(path!["grid", (1, 3)], 100.0),
    );
    assert_eq!(client.as_discrete().map(|op| op.path.clone()), Some(path!["grid", (1, 4)]));
    assert_eq!(result.to_json(), json!({"grid": [[0, 0, 0, 0], [9, 1, 2, 3, 104]]}));

    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::array_remove(path!["grid", 1], 0),
        DiscreteOperation::number_delta(path!["grid", (1, 3)], 100.0),
    );
    assert_eq!(result.to_json(), json!({"grid": [[0, 0, 0, 0], [2, 3, 104]]}));
}

#[test]
fn cell_and_nested_index_name_the_same_value() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"grid": [[0, 0, 0], [1, 2, 3]]}));
    let (result, _, client) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::number_set(path!["grid", 1, 2], 7.0),
        DiscreteOperation::number_set(path!["grid", (1, 2)], 8.0),
    );
    assert!(client.is_no_op());
    assert_eq!(result.to_json(), json!({"grid": [[0, 0, 0], [1, 2, 7]]}));
}

#[test]
fn overlapping_text_removals() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"s": "collaborate"}));
    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::string_remove(path!["s"], 2, "llab"),
        DiscreteOperation::string_remove(path!["s"], 4, "abor"),
    );
    assert_eq!(result.to_json(), json!({"s": "coate"}));
}

#[test]
fn property_write_survives_remove() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"k": 1}));
    let (result, server, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::object_set_property(path![], "k", 5.0),
        DiscreteOperation::object_remove_property(path![], "k"),
    );
    assert_eq!(
        server.as_discrete().map(|op| op.type_name()),
        Some("object_add_property")
    );
    assert_eq!(result.to_json(), json!({"k": 5}));
}

#[test]
fn scalar_updates() {
    let transformer = OperationTransformer::default();
    let base = doc(json!({"n": 10, "done": false, "due": {"$date": "2024-01-01T00:00:00+00:00"}}));

    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::number_delta(path!["n"], 5.0),
        DiscreteOperation::number_delta(path!["n"], -2.0),
    );
    assert_eq!(result.to_json()["n"], json!(13));

    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::number_set(path!["n"], 0.0),
        DiscreteOperation::number_delta(path!["n"], 3.0),
    );
    assert_eq!(result.to_json()["n"], json!(0));

    let due = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
    let (result, _, _) = assert_converges(
        &transformer,
        &base,
        DiscreteOperation::date_set(path!["due"], due),
        DiscreteOperation::date_set(path!["due"], Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
    );
    assert_eq!(result.to_json()["due"], json!({"$date": "2025-06-01T09:30:00+00:00"}));
}
