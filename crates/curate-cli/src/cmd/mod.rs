pub mod act;
pub mod category;
pub mod completions;
pub mod edit;
pub mod external;
pub mod navigate;
pub mod show;
pub mod status;
pub mod tag;

/// Split leading positional words into an optional phase and the rest.
///
/// `tag` and `act` accept `[PHASE] ARGS...`; a phase is present only when
/// there are more words than the command needs and the first one is not
/// itself an argument (e.g. a signed tag).
pub fn split_phase(
    words: &[String],
    is_arg: impl Fn(&str) -> bool,
) -> (Option<&str>, &[String]) {
    match words.split_first() {
        Some((first, rest)) if !rest.is_empty() && !is_arg(first) => (Some(first.as_str()), rest),
        _ => (None, words),
    }
}
