use std::collections::{BTreeMap, BTreeSet};

/// Characters dropped outright before tokenizing.
const STRIPPED_CHARS: &[char] = &[
    '(', ')', '[', ']', '{', '}', ':', ';', '?', '!', ',', '"', '\'', '\u{2019}', '\u{b4}', '`',
    '*', '.', '\u{b7}', '_', '+',
];

/// Tokens that carry no identifying value when matching titles.
const STOP_WORDS: &[&str] = &[
    "the", "in", "a", "by", "for", "is", "am", "an", "with", "from", "and", "of", "movie",
    "trailer", "interview", "interviews", "scenes", "scene", "official", "hd", "hq", "lq",
    "1080p", "720p",
];

/// Canonical form of a title: lowercase, punctuation stripped, single spaces, roman
/// numerals ii..ix as digits and split abbreviations ("u s a") joined back together.
pub fn clean(text: &str) -> String {
    let lowered: String = text
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .map(lowercase_char)
        .collect();

    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == '-' || c == '/'))
        .filter(|token| !token.is_empty() && *token != "&")
        .map(roman_to_digit)
        .collect();

    join_single_chars(&tokens).join(" ")
}

/// Identifying words of a title, with stop words and promotional terms removed.
pub fn keywords(text: &str) -> BTreeSet<String> {
    clean(text)
        .split(' ')
        .filter(|word| !word.is_empty() && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// True when `word` appears in `text` as a whole space-delimited token sequence.
pub fn contains_word(text: &str, word: &str) -> bool {
    format!(" {} ", text.to_lowercase()).contains(&format!(" {} ", word.to_lowercase()))
}

/// Substitute `{key}` placeholders and tidy the resulting whitespace.
pub fn apply_query_template(template: &str, values: &BTreeMap<&str, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in values {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase `c` unless that would turn it into several chars (e.g. 'İ').
fn lowercase_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(single), None) => single,
        _ => c,
    }
}

fn roman_to_digit(token: &str) -> &str {
    match token {
        "ii" => "2",
        "iii" => "3",
        "iv" => "4",
        "vi" => "6",
        "vii" => "7",
        "viii" => "8",
        "ix" => "9",
        _ => token,
    }
}

fn join_single_chars(tokens: &[&str]) -> Vec<String> {
    let mut joined: Vec<String> = Vec::with_capacity(tokens.len());
    let mut run = String::new();

    for token in tokens {
        if token.chars().count() == 1 {
            run.push_str(token);
            continue;
        }
        if !run.is_empty() {
            joined.push(roman_to_digit(&run).to_string());
            run.clear();
        }
        joined.push(token.to_string());
    }
    if !run.is_empty() {
        joined.push(roman_to_digit(&run).to_string());
    }

    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_punctuation_and_case() {
        assert_eq!(clean("Spider-Man: Into the (Spider) Verse"), "spider-man into the spider verse");
        assert_eq!(clean("  Mission   Impossible -  Fallout "), "mission impossible fallout");
        assert_eq!(clean("Fast & Furious"), "fast furious");
    }

    #[test]
    fn test_clean_translates_roman_numerals() {
        assert_eq!(clean("Rocky IV"), "rocky 4");
        assert_eq!(clean("Star Wars Episode IX"), "star wars episode 9");
        assert_eq!(clean("The Godfather Part II"), "the godfather part 2");
        assert_eq!(clean("Divine"), "divine");
    }

    #[test]
    fn test_clean_joins_abbreviations() {
        assert_eq!(clean("S.H.I.E.L.D."), "shield");
        assert_eq!(clean("Agents of S H I E L D"), "agents of shield");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "The Matrix Reloaded",
            "Rocky II x",
            "i i robot",
            "S.H.I.E.L.D. - Season 1 [HD]",
            "Amélie (2001) Official Trailer #1",
            "---",
            "",
        ];
        for sample in samples {
            let once = clean(sample);
            assert_eq!(clean(&once), once, "not idempotent for {:?}", sample);
            assert!(once.chars().count() <= sample.chars().count());
        }
    }

    #[test]
    fn test_clean_never_grows_non_ascii_titles() {
        let samples = ["İ", "İstanbul Hatırası", "ΟΔΥΣΣΕΙΑ", "Ǆ Ǉ", "Amélie", "Straße"];
        for sample in samples {
            let once = clean(sample);
            assert!(
                once.chars().count() <= sample.chars().count(),
                "{:?} grew to {:?}",
                sample,
                once
            );
            assert_eq!(clean(&once), once, "not idempotent for {:?}", sample);
        }
        assert_eq!(clean("İstanbul"), "İstanbul");
        assert_eq!(clean("ÉLITE"), "élite");
    }

    #[test]
    fn test_keywords_drop_stop_words() {
        let words = keywords("The Matrix Reloaded");
        assert!(!words.contains("the"));
        assert!(words.contains("matrix"));
        assert!(words.contains("reloaded"));
        assert_eq!(words.len(), 2);

        let words = keywords("Inception Official Trailer HD");
        assert_eq!(words.into_iter().collect::<Vec<_>>(), vec!["inception".to_string()]);
    }

    #[test]
    fn test_keywords_of_empty_input() {
        assert!(keywords("").is_empty());
        assert!(keywords("?!... ()").is_empty());
    }

    #[test]
    fn test_contains_word_respects_boundaries() {
        assert!(contains_word("alien covenant trailer", "alien"));
        assert!(!contains_word("aliens trailer", "alien"));
        assert!(contains_word("Alien", "alien"));
    }

    #[test]
    fn test_apply_query_template() {
        let mut values = BTreeMap::new();
        values.insert("title", "inception".to_string());
        values.insert("year", "2010".to_string());
        values.insert("original_title", String::new());
        assert_eq!(
            apply_query_template("{title}  {original_title} {year} trailer", &values),
            "inception 2010 trailer"
        );
    }
}
