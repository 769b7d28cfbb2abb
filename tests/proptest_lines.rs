//! Property tests for the line tokenizer, formatting stripper, and
//! casemapping.

use proptest::prelude::*;

use slirc_client::{Casemapping, FormattedStringExt, LineRef};

fn command() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z]{1,12}",
        "[0-9]{3}",
    ]
}

fn middle_param() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9#&+_\\-]{1,12}"
}

fn trailing_param() -> impl Strategy<Value = String> {
    // Any printable ASCII, spaces and colons included.
    "[ -~]{0,40}"
}

fn prefix() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z][a-zA-Z0-9]{0,8}",
        "[a-z][a-z0-9]{0,8}![a-z]{1,6}@[a-z]{1,8}\\.[a-z]{2,4}",
    ]
}

proptest! {
    #[test]
    fn constructed_line_parses_back(
        pfx in prefix(),
        cmd in command(),
        middles in prop::collection::vec(middle_param(), 0..4),
        trail in trailing_param(),
    ) {
        let mut raw = format!(":{} {}", pfx, cmd);
        for param in &middles {
            raw.push(' ');
            raw.push_str(param);
        }
        raw.push_str(" :");
        raw.push_str(&trail);

        let line = LineRef::parse(&raw).unwrap();
        prop_assert_eq!(line.prefix, Some(pfx.as_str()));
        prop_assert_eq!(line.command, cmd.as_str());
        prop_assert_eq!(line.params.len(), middles.len() + 1);
        for (got, want) in line.params.iter().zip(middles.iter()) {
            prop_assert_eq!(*got, want.as_str());
        }
        prop_assert_eq!(*line.params.last().unwrap(), trail.as_str());
    }

    #[test]
    fn to_wire_round_trips(
        pfx in prefix(),
        cmd in command(),
        middles in prop::collection::vec(middle_param(), 0..4),
        trail in trailing_param(),
    ) {
        let mut raw = format!(":{} {}", pfx, cmd);
        for param in &middles {
            raw.push(' ');
            raw.push_str(param);
        }
        raw.push_str(" :");
        raw.push_str(&trail);

        let line = LineRef::parse(&raw).unwrap();
        let rejoined = line.to_wire();
        let reparsed = LineRef::parse(&rejoined).unwrap();
        prop_assert_eq!(&line.prefix, &reparsed.prefix);
        prop_assert_eq!(line.command, reparsed.command);
        prop_assert_eq!(&line.params, &reparsed.params);
    }

    #[test]
    fn strip_formatting_removes_all_control_codes(text in "[ -~\u{02}\u{03}\u{04}\u{0f}\u{16}\u{1d}\u{1e}\u{1f}]{0,60}") {
        let stripped = text.strip_formatting();
        prop_assert!(
            !stripped.chars().any(|c| matches!(
                c,
                '\u{02}' | '\u{03}' | '\u{04}' | '\u{0f}' | '\u{16}' | '\u{1d}' | '\u{1e}' | '\u{1f}'
            )),
            "stripped text still contains formatting control codes: {:?}",
            stripped
        );
    }

    #[test]
    fn strip_formatting_preserves_plain_text(text in "[ -~]{0,60}") {
        // No control codes in, identical text out.
        let stripped = text.strip_formatting();
        prop_assert_eq!(stripped.as_ref(), text.as_str());
    }

    #[test]
    fn fold_is_idempotent(name in "[!-~]{0,20}", rfc in any::<bool>()) {
        let mapping = if rfc { Casemapping::Rfc1459 } else { Casemapping::Ascii };
        let once = mapping.fold(&name);
        prop_assert_eq!(mapping.fold(&once), once.clone());
    }

    #[test]
    fn eq_agrees_with_fold(a in "[!-~]{0,12}", b in "[!-~]{0,12}", rfc in any::<bool>()) {
        let mapping = if rfc { Casemapping::Rfc1459 } else { Casemapping::Ascii };
        prop_assert_eq!(mapping.eq(&a, &b), mapping.fold(&a) == mapping.fold(&b));
    }
}
