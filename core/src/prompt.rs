//! Translation prompt construction.

/// Source language used when a request does not name one.
pub const DEFAULT_SOURCE_LANG: &str = "cs";

/// Target language used when a request does not name one.
pub const DEFAULT_TARGET_LANG: &str = "pl";

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("cs", "Czech"),
    ("pl", "Polish"),
    ("en", "English"),
    ("de", "German"),
    ("sk", "Slovak"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("it", "Italian"),
    ("ru", "Russian"),
    ("uk", "Ukrainian"),
];

/// Human-readable name for a two-letter language code. Unknown codes are
/// returned unchanged.
pub fn language_name(code: &str) -> &str {
    LANGUAGE_NAMES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map_or(code, |&(_, name)| name)
}

/// Build the instruction sent to the model for one HTML fragment.
pub fn build_prompt(text: &str, from: &str, to: &str) -> String {
    let from_lang = language_name(from);
    let to_lang = language_name(to);
    format!(
        "Translate the following HTML text from {from_lang} to {to_lang}.\n\
         \n\
         IMPORTANT INSTRUCTIONS:\n\
         - Preserve all HTML tags and the document structure exactly\n\
         - Translate only the visible text content inside the tags\n\
         - Do NOT translate album titles (text inside <em> tags)\n\
         - Do NOT translate names of people, brands or other proper nouns\n\
         - Keep every HTML attribute unchanged\n\
         - Return ONLY the translated HTML, without markdown formatting\n\
         - Do NOT use markdown code blocks (```html or ```)\n\
         - Return clean HTML without any explanations\n\
         \n\
         HTML text to translate:\n\
         \n\
         {text}"
    )
}
