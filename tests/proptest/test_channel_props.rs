//! Property-based tests for the sentinel protocol and the classifier
//!
//! These tests use proptest to generate random inputs and verify the
//! protocol helpers hold their guarantees on arbitrary text, not just the
//! outputs seen on a well-behaved host.

use proptest::prelude::*;

use vzremote::channel::{cleanup, compose_command, is_complete, SENTINEL};
use vzremote::classify::{classify, Operation, Outcome};

fn any_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Stop),
        Just(Operation::Start),
        Just(Operation::Restart),
        Just(Operation::Create),
        Just(Operation::Destroy),
        Just(Operation::SetParam),
        Just(Operation::FileExists),
    ]
}

proptest! {
    #[test]
    fn test_cleanup_is_idempotent(s in "\\PC*") {
        let once = cleanup(&s);
        let twice = cleanup(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_cleanup_removes_every_sentinel(
        prefix in "[a-zA-Z0-9 \n]{0,200}",
        suffix in "[a-zA-Z0-9 \n]{0,200}",
    ) {
        let raw = format!("{}{}\n{}{} ", prefix, SENTINEL, suffix, SENTINEL);
        let clean = cleanup(&raw);
        prop_assert!(!clean.contains(SENTINEL));
    }

    #[test]
    fn test_text_without_sentinel_never_completes(s in "[a-zA-Z0-9 \n;\"]{0,500}") {
        prop_assume!(!s.contains(SENTINEL));
        prop_assert!(!is_complete(&s));
    }

    #[test]
    fn test_output_followed_by_bare_sentinel_completes(s in "[a-zA-Z0-9 \n]{0,200}") {
        let accumulated = format!("{}\n{}\r\n", s, SENTINEL);
        prop_assert!(is_complete(&accumulated));
    }

    #[test]
    fn test_composed_command_echo_alone_never_completes(cmd in "[a-zA-Z0-9 ./-]{1,100}") {
        // An interactive shell echoes exactly the composed line back; the
        // quote after the token must keep the channel waiting.
        let echoed = compose_command(&cmd);
        prop_assert!(!is_complete(&echoed));
    }

    #[test]
    fn test_compose_strips_trailing_semicolons(cmd in "[a-zA-Z0-9 ./-]{1,100}", semis in 0usize..5) {
        let input = format!("{}{}", cmd, ";".repeat(semis));
        let wire = compose_command(&input);
        let expected_suffix = format!("; echo \"{}\"", SENTINEL);
        prop_assert!(wire.ends_with(&expected_suffix));
        prop_assert!(!wire.contains(";;"));
    }

    #[test]
    fn test_classifier_is_pure(op in any_operation(), output in "\\PC{0,300}") {
        let first = classify(op, &output);
        let second = classify(op, &output);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_classifier_is_total(op in any_operation(), output in "\\PC{0,300}") {
        // Any text maps to one of the three outcomes; unmatched text keeps
        // the raw output in the failure.
        match classify(op, &output) {
            Outcome::Success | Outcome::AlreadyInDesiredState => {}
            Outcome::Failure(raw) => prop_assert_eq!(raw, output),
        }
    }

    #[test]
    fn test_classifier_matching_ignores_case(output in "[a-zA-Z ]{0,60}") {
        let upper = classify(Operation::Stop, &output.to_uppercase());
        let lower = classify(Operation::Stop, &output.to_lowercase());
        prop_assert_eq!(upper.is_success(), lower.is_success());
    }
}
