use csv2json::{
    headers_to_template, infer_type, ErrorKind, FieldOptions, Options, Template, Transform,
};
use rstest::rstest;
use serde_json::{json, Value};

/// Splits an ISO timestamp into its date and time parts.
fn split_timestamp(value: Value) -> Result<Value, csv2json::BoxError> {
    let text = value.as_str().ok_or("timestamp must be text")?;
    let (date, time) = text.split_once('T').ok_or("missing `T` separator")?;
    Ok(json!({"date": date, "time": time}))
}

fn sample_options() -> Options {
    Options::new()
        .with("abc.3", FieldOptions::new().with_infer_type(true))
        .with("abc", FieldOptions::new().with_fill_value(json!(0)))
        .with("status", FieldOptions::new().with_render(split_timestamp))
        .with("foo", FieldOptions::new().with_optional())
}

#[test]
fn infer_type_and_render() {
    let options = Options::new()
        .with("abc.3", FieldOptions::new().with_infer_type(true))
        .with("status", FieldOptions::new().with_render(split_timestamp));
    let mut template = headers_to_template(["abc.3", "status"], options).unwrap();
    assert_eq!(
        template.render(["1", "2019-02-01T01:01:01"]).unwrap(),
        json!({
            "abc": [null, null, null, 1],
            "status": {"date": "2019-02-01", "time": "01:01:01"},
        })
    );
}

#[test]
fn fill_value_and_optional_drop() {
    let headers = ["abc.0", "abc.3", "status", "item1.subitem1", "foo"];
    let mut template = headers_to_template(headers, sample_options()).unwrap();
    let values = ["1", "2", "2019-02-01T01:01:01", "0", ""];
    let expected = json!({
        "abc": ["1", 0, 0, 2],
        "status": {"date": "2019-02-01", "time": "01:01:01"},
        "item1": {"subitem1": "0"},
    });
    assert_eq!(template.render(values).unwrap(), expected);
    assert_eq!(template.render(values).unwrap(), expected);
}

#[test]
fn optional_value_kept_when_present() {
    let mut template = headers_to_template(["foo", "bar"], sample_options()).unwrap();
    assert_eq!(template.render(["x", ""]).unwrap(), json!({"foo": "x", "bar": ""}));
}

#[test]
fn optional_multi_level() {
    let options = Options::new()
        .with("abc.0", FieldOptions::new().with_optional())
        .with("foo", FieldOptions::new().with_optional())
        .with("foo.0", FieldOptions::new().with_optional())
        .with("foo.1", FieldOptions::new().with_optional());
    let mut template = headers_to_template(["abc.0", "foo.0", "foo.1"], options).unwrap();
    assert_eq!(template.render(["", "", ""]).unwrap(), json!({"abc": []}));
    assert_eq!(
        template.render(["", "", "y"]).unwrap(),
        json!({"abc": [], "foo": [null, "y"]})
    );
}

#[rstest]
#[case("5", json!(5))]
#[case("true", json!(true))]
#[case("TRUE", json!(true))]
#[case("x,y", json!(["x", "y"]))]
#[case("hello", json!("hello"))]
fn inferred_leaf_types(#[case] input: &str, #[case] expected: Value) {
    let options = Options::new().with("v", FieldOptions::new().with_infer_type(true));
    let mut template = headers_to_template(["v"], options).unwrap();
    assert_eq!(template.render([input]).unwrap(), json!({"v": expected}));
    assert_eq!(infer_type(json!(input)), expected);
}

#[rstest]
#[case(json!(true))]
#[case(json!(3.25))]
#[case(json!(null))]
#[case(json!({"k": "v"}))]
fn non_string_leaves_pass_through(#[case] value: Value) {
    let options = Options::new().with(
        "v",
        FieldOptions::new()
            .with_infer_type(true)
            .with_transform(Transform::Uppercase),
    );
    let mut template = headers_to_template(["v"], options).unwrap();
    assert_eq!(template.render([value.clone()]).unwrap(), json!({"v": value}));
}

#[test]
fn transform_failure_reports_path() {
    let options = Options::new().with("n", FieldOptions::new().with_transform(Transform::Integer));
    let mut template = headers_to_template(["n", "m"], options).unwrap();
    let err = template.render(["abc", "1"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transform);
    assert!(err.is_row_error());
    assert!(err.to_string().starts_with("transform failed at `n`"));
    assert_eq!(template.render(["12", "1"]).unwrap(), json!({"n": 12, "m": "1"}));
}

#[test]
fn options_from_file_match_builder() {
    let from_file = Options::from_json_str(
        r#"{
            "abc.3": {"infer_type": true},
            "abc": {"fill_value": 0},
            "status": {"render": "trim"},
            "foo": {"optional": true}
        }"#,
    )
    .unwrap();
    let mut template = Template::with_options(["abc.0", "abc.3", "status", "foo"], from_file).unwrap();
    assert_eq!(
        template.render(["1", "2", "  ok ", ""]).unwrap(),
        json!({"abc": ["1", 0, 0, 2], "status": "ok"})
    );
}

#[test]
fn merged_defaults_are_overridden() {
    let defaults = Options::new().with("a", FieldOptions::new().with_fill_value(json!("-")));
    let user = Options::from_json_str(r#"{"a.2": {"infer_type": true}}"#).unwrap();
    let mut template = headers_to_template(["a.2"], defaults.merge(user)).unwrap();
    assert_eq!(template.render(["7"]).unwrap(), json!({"a": ["-", "-", 7]}));
}

#[test]
fn custom_optional_predicate() {
    let options = Options::new().with(
        "score",
        FieldOptions::new()
            .with_infer_type(true)
            .with_optional_if(|value| value.as_u64().is_some_and(|n| n > 0)),
    );
    let mut template = headers_to_template(["name", "score"], options).unwrap();
    assert_eq!(template.render(["a", "0"]).unwrap(), json!({"name": "a"}));
    assert_eq!(template.render(["a", "3"]).unwrap(), json!({"name": "a", "score": 3}));
}

#[rstest]
#[case(json!({"0": "a"}))]
#[case(json!({"1": "b", "0": "a"}))]
#[case(json!(["", "a"]))]
fn bound_collections_keep_their_shape(#[case] value: Value) {
    let mut plain = Template::new(["v", "w"]).unwrap();
    let options = Options::new().with("w", FieldOptions::new().with_infer_type(true));
    let mut with_options = headers_to_template(["v", "w"], options).unwrap();
    let expected = json!({"v": value.clone(), "w": 1});
    assert_eq!(plain.render([value.clone(), json!(1)]).unwrap(), expected);
    assert_eq!(with_options.render([value, json!("1")]).unwrap(), expected);
}

#[test]
fn options_apply_to_bound_collections_whole() {
    let options = Options::new().with("v", FieldOptions::new().with_optional());
    let mut template = headers_to_template(["v", "w"], options).unwrap();
    assert_eq!(template.render([json!({}), json!(1)]).unwrap(), json!({"w": 1}));
    assert_eq!(
        template.render([json!({"0": ""}), json!(1)]).unwrap(),
        json!({"v": {"0": ""}, "w": 1})
    );
}
