use jsonplate_core::{compile, environment_from_json, render, Environment, Value};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn test_values() -> Environment {
    environment_from_json(json!({
        "test_string": "test",
        "test_int": 3,
        "test_float": 3.14,
        "test_obj": {
            "string": "test",
            "test": true
        }
    }))
}

fn render_json(template: &str, env: &Environment) -> serde_json::Value {
    let rendered = render(template, env)
        .unwrap_or_else(|err| panic!("{:?}", miette::Report::new(err)));
    serde_json::from_str(&rendered.to_json().unwrap()).unwrap()
}

#[test]
fn test_table() {
    let cases = [
        ("empty", "", json!({})),
        ("braces", "{}", json!({})),
        (
            "string, float, and integer values",
            r#"{ "test_string": "test", "test_int": 12345, "test_float": 123.45 }"#,
            json!({ "test_string": "test", "test_int": 12345, "test_float": 123.45 }),
        ),
        (
            "array",
            r#"{ "test": [1, 2, 3, 4, 5] }"#,
            json!({ "test": [1, 2, 3, 4, 5] }),
        ),
        (
            "variables in array",
            r#"{ "test": [test_string, test_int, test_float, test_obj] }"#,
            json!({ "test": ["test", 3, 3.14, { "string": "test", "test": true }] }),
        ),
        (
            "objects in array",
            r#"{ "test": [{"test": true}, {"test": "test"}] }"#,
            json!({ "test": [{ "test": true }, { "test": "test" }] }),
        ),
        (
            "variables in field values",
            r#"{ "test_string": test_string, "test_int": test_int, "test_float": test_float }"#,
            json!({ "test_string": "test", "test_int": 3, "test_float": 3.14 }),
        ),
        (
            "variables in field names",
            r#"{ test_string: "test" }"#,
            json!({ "test": "test" }),
        ),
        (
            "variables in field names and values",
            "{ test_string: test_string }",
            json!({ "test": "test" }),
        ),
        (
            "external object in field values",
            r#"{ "object": test_obj }"#,
            json!({ "object": { "test": true, "string": "test" } }),
        ),
        (
            "nested fields in field value and field name",
            "{ test_obj.string: test_obj.test }",
            json!({ "test": true }),
        ),
        (
            "nested objects and arrays in field value",
            r#"{
                "test_object": {
                    "test": [
                        { "test": { "test": true } },
                        { "test": [1, 2, 3, 4] }
                    ]
                }
            }"#,
            json!({
                "test_object": {
                    "test": [
                        { "test": { "test": true } },
                        { "test": [1, 2, 3, 4] }
                    ]
                }
            }),
        ),
    ];

    let env = test_values();
    for (name, template, expected) in cases {
        assert_eq!(render_json(template, &env), expected, "{name}");
    }
}

#[test]
fn test_literal_only_template_matches_json() {
    let template = r#"{"a": [1, 2.5, "s", true], "o": {"x": {"y": true}}, "e": [], "f": {}}"#;
    let expected: serde_json::Value = serde_json::from_str(template).unwrap();
    assert_eq!(render_json(template, &Environment::new()), expected);
    assert_eq!(render_json(template, &test_values()), expected);
}

#[test]
fn test_field_name_resolution() {
    let env = environment_from_json(json!({ "name": "x" }));
    assert_eq!(render_json(r#"{ name: "v" }"#, &env), json!({ "x": "v" }));
    assert_eq!(render_json(r#"{ "y": 1 }"#, &env), json!({ "y": 1 }));
}

#[test]
fn test_path_resolution() {
    let env = environment_from_json(json!({ "a": { "b": { "c": 7 } } }));
    assert_eq!(render_json(r#"{ "v": a.b.c }"#, &env), json!({ "v": 7 }));
    assert_eq!(render_json(r#"{ "v": a.b.c.d }"#, &env), json!({ "v": 7 }));
    assert!(render(r#"{ "v": a.b.x }"#, &env).is_err());
}

#[test]
fn test_last_write_wins() {
    assert_eq!(
        render_json(r#"{"a": 1, "a": 2}"#, &Environment::new()),
        json!({ "a": 2 })
    );
}

#[test]
fn test_multiple_top_level_objects_merge() {
    assert_eq!(
        render_json(r#"{"a": 1} {"b": 2, "a": 3}"#, &Environment::new()),
        json!({ "a": 3, "b": 2 })
    );
}

#[test]
fn test_null_in_data_passes_through() {
    let env = environment_from_json(json!({ "nothing": null }));
    assert_eq!(
        render_json(r#"{ "n": nothing, "l": [nothing] }"#, &env),
        json!({ "n": null, "l": [null] })
    );
}

#[test]
fn test_output_keeps_evaluation_order() {
    let rendered = render(r#"{ "z": 1, "a": 2, "m": 3 }"#, &Environment::new()).unwrap();
    assert_eq!(rendered.to_json().unwrap(), r#"{"z":1,"a":2,"m":3}"#);
}

#[test]
fn test_pretty_json() {
    let rendered = render(r#"{ "a": [1] }"#, &Environment::new()).unwrap();
    assert_eq!(
        rendered.to_json_pretty().unwrap(),
        "{\n  \"a\": [\n    1\n  ]\n}"
    );
}

#[test]
fn test_compiled_template_shared_across_threads() {
    let template = Arc::new(compile(r#"{ "id": id, "tags": [id, "fixed"] }"#, "shared").unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let template = Arc::clone(&template);
            thread::spawn(move || {
                let mut env = Environment::new();
                env.insert("id".to_string(), Value::Number(f64::from(i)));
                template.render(&env).unwrap().to_json().unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let expected = format!(r#"{{"id":{i},"tags":[{i},"fixed"]}}"#);
        assert_eq!(handle.join().unwrap(), expected);
    }
}
