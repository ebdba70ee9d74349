//! English inflection for collection names: `ExtendedIdentity` -> `extended_identities`.

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "fish",
    "information",
    "jeans",
    "money",
    "news",
    "police",
    "rice",
    "series",
    "sheep",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("mouse", "mice"),
    ("louse", "lice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("quiz", "quizzes"),
    ("leaf", "leaves"),
];

/// Convert a CamelCase type name to snake_case.
pub fn underscore(name: &str) -> String {
    let name = name.rsplit("::").next().unwrap_or(name);
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch == '-' {
            out.push('_');
            continue;
        }
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }
    out
}

/// Pluralize the last word of a snake_case name.
pub fn pluralize(name: &str) -> String {
    match name.rfind('_') {
        Some(idx) => format!("{}{}", &name[..=idx], pluralize_word(&name[idx + 1..])),
        None => pluralize_word(name),
    }
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == word) {
        return word.to_string();
    }

    let stem = |n: usize| &word[..word.len() - n];

    if ["alias", "status", "bus"].iter().any(|w| word.ends_with(w)) {
        return format!("{}es", word);
    }
    if word.ends_with("octopus") || word.ends_with("virus") {
        return format!("{}i", stem(2));
    }
    for ending in ["matrix", "vertex", "index"] {
        if word.ends_with(ending) {
            return format!("{}ices", stem(2));
        }
    }
    if word.ends_with("sis") || word.ends_with("axis") || word.ends_with("testis") {
        return format!("{}es", stem(2));
    }
    if word.ends_with("fe") && !word.ends_with("ffe") {
        return format!("{}ves", stem(2));
    }
    if (word.ends_with("lf") || word.ends_with("rf")) && word.len() > 2 {
        return format!("{}ves", stem(1));
    }
    if word.ends_with('y') {
        let before = word[..word.len() - 1].chars().last();
        let after_qu = word.ends_with("quy");
        if after_qu || before.is_some_and(|c| !"aeiouy".contains(c)) {
            return format!("{}ies", stem(1));
        }
    }
    if word.ends_with("tum") || word.ends_with("ium") {
        return format!("{}a", stem(2));
    }
    if ["buffalo", "tomato", "potato"].iter().any(|w| word.ends_with(w)) {
        return format!("{}es", word);
    }
    if ["x", "ch", "ss", "sh"].iter().any(|e| word.ends_with(e)) {
        return format!("{}es", word);
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    format!("{}s", word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscores_camel_case() {
        assert_eq!(underscore("Identity"), "identity");
        assert_eq!(underscore("ExtendedIdentity"), "extended_identity");
        assert_eq!(underscore("HTTPRequest"), "http_request");
        assert_eq!(underscore("Version2Doc"), "version2_doc");
        assert_eq!(underscore("crate::models::Company"), "company");
    }

    #[test]
    fn pluralizes_regular_words() {
        assert_eq!(pluralize("company"), "companies");
        assert_eq!(pluralize("link"), "links");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("extended_identity"), "extended_identities");
    }

    #[test]
    fn pluralizes_irregulars() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("child"), "children");
        assert_eq!(pluralize("vertex"), "vertices");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("analysis"), "analyses");
        assert_eq!(pluralize("knife"), "knives");
        assert_eq!(pluralize("medium"), "media");
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(pluralize("people"), "people");
        assert_eq!(pluralize("secondary_relation"), "secondary_relations");
    }
}
