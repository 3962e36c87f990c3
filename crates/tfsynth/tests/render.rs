//! Rendered expressions must be valid terraform
//!
//! Every case is synthesized through a [Stack] and the interpolation is parsed again with `hcl-edit`.

use pretty_assertions::assert_eq;
use tfsynth::element::{Output, Resource};
use tfsynth::expression::*;
use tfsynth::stack::Stack;
use tfsynth::value::Value;

/// Synthesize `value` as the only output of a fresh stack and return the rendered string
fn synthesize(stack: &mut Stack, value: impl Into<Value>) -> String {
    stack.add(Output::new("out", value));
    let document = stack.to_document().expect("must resolve");

    document["output"]["out"]["value"]
        .as_str()
        .expect("expressions render to strings")
        .to_string()
}

fn assert_parses(rendered: &str) {
    let inner = rendered
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .unwrap_or_else(|| panic!("{rendered:?} is not an interpolation"));

    if let Err(error) = inner.parse::<hcl_edit::expr::Expression>() {
        panic!("{inner:?} does not parse: {error}");
    }
}

#[test]
fn arithmetic() {
    let rendered = synthesize(&mut Stack::new("test"), mul(2, 3));

    assert_eq!(rendered, "${(2 * 3)}");
    assert_parses(&rendered);
}

#[test]
fn nested_operators() {
    let rendered = synthesize(
        &mut Stack::new("test"),
        add(negate(reference("var.a")), mul(reference("var.b"), 2)),
    );

    assert_eq!(rendered, "${(-var.a + (var.b * 2))}");
    assert_parses(&rendered);
}

#[test]
fn escaped_string_argument() {
    let rendered = synthesize(&mut Stack::new("test"), call("length", vec![raw_string("\"").into()]));

    assert_eq!(rendered, r#"${length("\"")}"#);
    assert_parses(&rendered);
}

#[test]
fn conditional_expression() {
    let rendered = synthesize(&mut Stack::new("test"), conditional(true, 1, 0));

    assert_eq!(rendered, "${true ? 1 : 0}");
    assert_parses(&rendered);
}

#[test]
fn property_access_and_object_literal() {
    let rendered = synthesize(
        &mut Stack::new("test"),
        call(
            "merge",
            vec![
                property_access(reference("var.users"), vec![0.into(), "tags".into()]).into(),
                Value::from_iter([("Name", "web"), ("not an identifier", "x")]),
            ],
        ),
    );

    assert_eq!(
        rendered,
        r#"${merge(var.users[0]["tags"], {Name = "web", "not an identifier" = "x"})}"#
    );
    assert_parses(&rendered);
}

#[test]
fn join_with_embedded_references() {
    let mut stack = Stack::new("test");
    let tokens = stack.tokens();
    let values: Value = vec![
        format!(
            "one ref is plain {} and the other one as well: {}",
            tokens.as_string(reference("docker_container.foo.barA")),
            tokens.as_string(reference("docker_container.foo.barB")),
        ),
        tokens.as_string(reference("docker_container.foo.barC")),
        format!(
            "{} woop woop",
            tokens.as_string(reference("docker_container.foo.barD"))
        ),
    ]
    .into();

    let rendered = synthesize(&mut stack, call("join", vec![", ".into(), values]));

    assert_eq!(
        rendered,
        r#"${join(", ", ["one ref is plain ${docker_container.foo.barA} and the other one as well: ${docker_container.foo.barB}", docker_container.foo.barC, "${docker_container.foo.barD} woop woop"])}"#
    );
    assert_parses(&rendered);
}

#[test]
fn resource_attributes() {
    let mut stack = Stack::new("test");
    let password = Resource::new(stack.scope(), "random_password", "str");
    let result = password.attribute("result");
    stack.add(password);

    let rendered = synthesize(&mut stack, call("sha256", vec![result.into()]));

    assert_eq!(rendered, "${sha256(random_password.str.result)}");
    assert_parses(&rendered);
}
