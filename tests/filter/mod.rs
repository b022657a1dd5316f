// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use proptest::prelude::*;
use zvec_client::filter::{compile, field, null, BinaryOp, StringMethod};
use zvec_client::ZvecError;

#[test]
fn test_conjunction_of_comparisons() {
    let predicate = field("Category").eq("tech").and(field("Year").ge(2020));
    assert_eq!(compile(&predicate).unwrap(), "((Category == 'tech') && (Year >= 2020))");
}

#[test]
fn test_string_methods_and_escaping() {
    assert_eq!(
        field("Title").starts_with("Intro").compile().unwrap(),
        "Title HAS_PREFIX 'Intro'"
    );
    assert_eq!(field("Title").ends_with("s").compile().unwrap(), "Title HAS_SUFFIX 's'");
    assert_eq!(
        field("Tags").contains("it's").compile().unwrap(),
        "Tags CONTAIN_ANY 'it\\'s'"
    );
}

#[test]
fn test_null_checks_emit_no_right_operand() {
    assert_eq!(field("Rating").eq(null()).compile().unwrap(), "(Rating IS NULL)");
    assert_eq!(field("Rating").ne(null()).compile().unwrap(), "(Rating IS NOT NULL)");
}

#[test]
fn test_negation_and_disjunction() {
    let predicate = !(field("Year").lt(2000) | field("Category").eq("home"));
    assert_eq!(
        predicate.compile().unwrap(),
        "!((Year < 2000) || (Category == 'home'))"
    );
}

#[test]
fn test_unsupported_constructs_name_alternatives() {
    let arithmetic = field("Year").binary(BinaryOp::Add, 1);
    let err = arithmetic.compile().unwrap_err();
    assert!(matches!(err, ZvecError::UnsupportedExpression(_)));
    assert!(err.to_string().contains("=="));

    let method = field("Title").call(StringMethod::Other("ToUpper".into()), "X");
    let err = method.compile().unwrap_err();
    assert!(err.to_string().contains("StartsWith"));
}

proptest! {
    #[test]
    fn prop_comparison_shape(name in "[A-Za-z][A-Za-z0-9_]{0,15}", value in any::<i32>()) {
        let compiled = field(name.as_str()).ge(value).compile().unwrap();
        prop_assert_eq!(compiled, format!("({} >= {})", name, value));
    }

    #[test]
    fn prop_string_literals_are_quoted(text in "[ -~]{0,24}") {
        prop_assume!(!text.contains('\\'));
        let compiled = field("Title").eq(text.as_str()).compile().unwrap();
        let expected = format!("(Title == '{}')", text.replace('\'', "\\'"));
        prop_assert_eq!(compiled, expected);
    }
}
