/// Folds a city (or state) name to lowercase ASCII with hyphens as spaces, so
/// "São Paulo", "SAO-PAULO" and "sao paulo" compare equal.
///
/// Transliteration runs first so the output is always ASCII; the lowercase and
/// hyphen passes then see everything the transliteration produced, which keeps
/// the function idempotent.
pub fn normalize(name: &str) -> String {
    deunicode::deunicode(name)
        .to_ascii_lowercase()
        .replace('-', " ")
}
