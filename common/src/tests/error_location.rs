use crate::ErrorLocation;

/// **VALUE**: Verifies that `ErrorLocation::caller()` records the call site, not the helper.
///
/// **WHY THIS MATTERS**: Every bridge error is built through `#[track_caller]` helpers.
/// If the location pointed at the helper, every `TransportLost` in the logs would report
/// the same line and the failing call site would be lost.
///
/// **BUG THIS CATCHES**: Would catch removal of `#[track_caller]` from `caller()`.
#[test]
fn given_track_caller_helper_when_capturing_then_each_call_site_has_its_own_line() {
    // GIVEN: A helper that forwards the caller's location
    #[track_caller]
    fn capture() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Capturing from two consecutive lines
    let first = capture();
    let second = capture();

    // THEN: Same file, sequential lines
    assert_eq!(first.file, second.file);
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
}

/// **VALUE**: Verifies the `[file:line:column]` display format and the short file name.
///
/// **WHY THIS MATTERS**: Error messages embed the location verbatim; log grepping relies on
/// the bracketed shape.
///
/// **BUG THIS CATCHES**: Would catch format drift or a broken `file_name()` split.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: A captured location
    let location = ErrorLocation::caller();

    // WHEN: Formatting it
    let formatted = location.to_string();

    // THEN: Bracketed, two colons, short name has no directory part
    assert!(formatted.starts_with('[') && formatted.ends_with(']'));
    assert_eq!(formatted.matches(':').count(), 2);
    assert_eq!(location.file_name(), "error_location.rs");
}
