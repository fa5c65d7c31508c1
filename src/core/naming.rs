//! Naming conventions shared by the converter and the default resolvers
//!
//! GraphQL names are camelCase or PascalCase, SQL names are snake_case and
//! tables are optionally pluralized.

use heck::ToSnakeCase;

/// Convert a camelCase or PascalCase identifier to snake_case
///
/// Runs of capitals are treated as one word, so acronyms stay together.
///
/// ```
/// use sqlgraph::core::naming::snake_case;
///
/// assert_eq!(snake_case("createdAt"), "created_at");
/// assert_eq!(snake_case("BlogPost"), "blog_post");
/// assert_eq!(snake_case("userID"), "user_id");
/// assert_eq!(snake_case("HTTPRequest"), "http_request");
/// ```
pub fn snake_case(name: &str) -> String {
    name.to_snake_case()
}

/// English pluralization for table names derived from type names
pub struct Pluralizer;

impl Pluralizer {
    const SIBILANT_ENDINGS: [&'static str; 5] = ["s", "sh", "ch", "x", "z"];
    const VOWELS: [char; 5] = ['a', 'e', 'i', 'o', 'u'];

    /// Pluralize the last word of a snake_case name
    ///
    /// ```
    /// use sqlgraph::core::naming::Pluralizer;
    ///
    /// assert_eq!(Pluralizer::pluralize("user"), "users");
    /// assert_eq!(Pluralizer::pluralize("blog_category"), "blog_categories");
    /// assert_eq!(Pluralizer::pluralize("address"), "addresses");
    /// ```
    pub fn pluralize(name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        let (head, word) = match name.rfind('_') {
            Some(idx) => name.split_at(idx + 1),
            None => ("", name),
        };
        format!("{}{}", head, Self::pluralize_word(word))
    }

    fn pluralize_word(word: &str) -> String {
        let before_last = word.chars().rev().nth(1);
        let after_vowel = before_last.is_some_and(|c| Self::VOWELS.contains(&c));

        if let Some(stem) = word.strip_suffix('y')
            && !stem.is_empty()
            && !after_vowel
        {
            return format!("{stem}ies");
        }
        if Self::SIBILANT_ENDINGS.iter().any(|end| word.ends_with(end)) {
            return format!("{word}es");
        }
        if let Some(stem) = word.strip_suffix("fe")
            && !stem.is_empty()
        {
            return format!("{stem}ves");
        }
        if let Some(stem) = word.strip_suffix('f')
            && !stem.is_empty()
            && !stem.ends_with('f')
        {
            return format!("{stem}ves");
        }
        if word.ends_with('o') && word.len() > 1 && !after_vowel {
            return match word {
                "photo" | "piano" | "halo" | "memo" | "logo" | "video" => format!("{word}s"),
                _ => format!("{word}es"),
            };
        }
        format!("{word}s")
    }
}
