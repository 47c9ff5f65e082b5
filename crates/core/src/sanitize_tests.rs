use super::*;

#[test]
fn empty_input_becomes_untitled() {
    assert_eq!(sanitize(""), "Untitled");
    assert_eq!(sanitize("   "), "Untitled");
}

#[test]
fn forbidden_characters_are_collapsed() {
    assert_eq!(sanitize("a/b\\c:d"), "a-b-c-d");
}

#[test]
fn control_characters_are_collapsed() {
    assert_eq!(sanitize("a\x01\x02b"), "a-b");
}

#[test]
fn whitespace_runs_collapse_to_one_space() {
    assert_eq!(sanitize("a   b\t\tc"), "a b c");
}

#[test]
fn leading_and_trailing_whitespace_and_dots_are_trimmed() {
    assert_eq!(sanitize("  ...My Video...  "), "My Video");
}

#[test]
fn reserved_device_names_are_guarded() {
    assert_eq!(sanitize("CON"), "_CON");
    assert_eq!(sanitize("con.txt"), "_con.txt");
    assert_eq!(sanitize("LPT1"), "_LPT1");
    assert_eq!(sanitize("Console"), "Console");
}

#[test]
fn only_dots_becomes_untitled() {
    assert_eq!(sanitize("...."), "Untitled");
}

#[test]
fn long_names_are_truncated_preserving_extension() {
    let long_stem = "a".repeat(300);
    let name = format!("{long_stem}.mp3");
    let result = sanitize(&name);

    assert!(result.len() <= 240);
    assert!(result.ends_with(".mp3"));
}

#[test]
fn truncation_respects_utf8_boundaries() {
    let name = format!("{}.mp3", "é".repeat(200));
    let result = sanitize(&name);

    assert!(result.is_char_boundary(result.len()));
    assert!(result.len() <= 240);
}

#[test]
fn decomposed_accents_normalize_to_the_same_result_as_composed() {
    let decomposed = "Cafe\u{0301}.mp3"; // "Café.mp3" with a combining acute accent
    let composed = "Café.mp3";
    assert_eq!(sanitize(decomposed), sanitize(composed));
    assert_eq!(sanitize(decomposed), "Café.mp3");
}

#[test]
fn sanitize_is_idempotent() {
    let cases = [
        "normal name.mp4",
        "a/b\\c:d*e?f\"g<h>i|j",
        "CON",
        "   leading and trailing...   ",
        &"x".repeat(500),
        "....",
        "",
    ];
    for case in cases {
        let once = sanitize(case);
        let twice = sanitize(&once);
        assert_eq!(once, twice, "not idempotent for {case:?}");
    }
}
