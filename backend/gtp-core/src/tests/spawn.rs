// Unit tests for command line splitting and seed substitution.

use crate::RANDOM_SEED_PLACEHOLDER;
use crate::transport::spawn::{split_command_line, substitute_random_seed};

/// **VALUE**: Verifies quote-aware command line splitting.
///
/// **WHY THIS MATTERS**: Engine command lines come from user configuration
/// and routinely contain quoted paths with spaces. Splitting on raw
/// whitespace would pass half a path as the program name and the spawn
/// would fail with a confusing not-found error.
///
/// **BUG THIS CATCHES**: Would catch naive `split_whitespace` splitting, or
/// quotes leaking into the produced arguments.
#[test]
fn given_quoted_arguments_when_split_then_quotes_group_and_disappear() {
    // GIVEN: A command line with double and single quoted arguments
    let command_line = r#"gnugo --mode gtp --config "my file.cfg" --name 'level 10'"#;

    // WHEN: Splitting
    let arguments = split_command_line(command_line).expect("splits");

    // THEN: Quoted spans stay one argument and quotes are stripped
    assert_eq!(
        arguments,
        vec![
            "gnugo",
            "--mode",
            "gtp",
            "--config",
            "my file.cfg",
            "--name",
            "level 10",
        ]
    );
}

/// **VALUE**: Verifies whitespace-only and empty command lines are rejected.
///
/// **BUG THIS CATCHES**: Would catch an empty argument vector reaching
/// process creation and panicking on `arguments[0]`.
#[test]
fn given_empty_command_line_when_split_then_rejected() {
    assert!(split_command_line("").is_err());
    assert!(split_command_line("   ").is_err());
}

/// **VALUE**: Verifies unbalanced quotes are a hard error.
///
/// **BUG THIS CATCHES**: Would catch the splitter silently swallowing the
/// rest of the command line after a stray quote.
#[test]
fn given_unbalanced_quote_when_split_then_rejected() {
    assert!(split_command_line(r#"engine --config "unterminated"#).is_err());
}

/// **VALUE**: Verifies the random seed placeholder substitution.
///
/// **WHY THIS MATTERS**: Engines launched with `%SRAND` must play
/// differently on every attach; leaving the literal token in place makes
/// the engine reject its arguments.
///
/// **BUG THIS CATCHES**: Would catch the token surviving substitution or a
/// non-numeric replacement.
#[test]
fn given_seed_placeholder_when_substituted_then_replaced_with_number() {
    // GIVEN: A command line carrying the placeholder
    let command_line = format!("engine --seed {RANDOM_SEED_PLACEHOLDER}");

    // WHEN: Substituting
    let substituted = substitute_random_seed(&command_line);

    // THEN: The token is gone and a parseable number took its place
    assert!(!substituted.contains(RANDOM_SEED_PLACEHOLDER));
    let seed = substituted
        .rsplit(' ')
        .next()
        .expect("seed argument present");
    assert!(seed.parse::<u32>().is_ok(), "Seed is numeric: {seed}");
}

/// **VALUE**: Verifies command lines without the placeholder pass through
/// untouched.
#[test]
fn given_no_placeholder_when_substituted_then_unchanged() {
    assert_eq!(substitute_random_seed("gnugo --mode gtp"), "gnugo --mode gtp");
}
