//! Identifier normalization
//!
//! Schema names separate words with `-` or `_`. Field identifiers become
//! lowerCamelCase and type identifiers UpperCamelCase. The conversion is
//! deterministic and one-way: `first-name` and `first_name` both become
//! `firstName`.

const WORD_SEPARATORS: [char; 2] = ['-', '_'];

fn words(s: &str) -> impl Iterator<Item = &str> {
    s.split(WORD_SEPARATORS).filter(|word| !word.is_empty())
}

/// Upper-case the first character, keep the rest of the word as written
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Lower-case the leading word. All-caps words (`ID`, `URL`) are lowered
/// entirely rather than producing `iD`.
fn decapitalize(word: &str) -> String {
    if word.chars().all(|c| !c.is_lowercase()) {
        return word.to_lowercase();
    }
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Convert to UpperCamelCase (type identifiers)
pub fn to_upper_camel_case(s: &str) -> String {
    words(s).map(capitalize).collect()
}

/// Convert to lowerCamelCase (field identifiers)
pub fn to_lower_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for (index, word) in words(s).enumerate() {
        if index == 0 {
            result.push_str(&decapitalize(word));
        } else {
            result.push_str(&capitalize(word));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_camel_case() {
        assert_eq!(to_upper_camel_case("person"), "Person");
        assert_eq!(to_upper_camel_case("line-item"), "LineItem");
        assert_eq!(to_upper_camel_case("user_profile"), "UserProfile");
        assert_eq!(to_upper_camel_case("--odd__spacing-"), "OddSpacing");
        // Already camel-cased input is preserved
        assert_eq!(to_upper_camel_case("postalAddress"), "PostalAddress");
    }

    #[test]
    fn test_lower_camel_case() {
        assert_eq!(to_lower_camel_case("name"), "name");
        assert_eq!(to_lower_camel_case("first-name"), "firstName");
        assert_eq!(to_lower_camel_case("zip_code"), "zipCode");
        assert_eq!(to_lower_camel_case("Name"), "name");
        assert_eq!(to_lower_camel_case("ID"), "id");
        assert_eq!(to_lower_camel_case("tenant_ID"), "tenantID");
    }

    #[test]
    fn test_separator_variants_collide() {
        assert_eq!(to_lower_camel_case("first-name"), to_lower_camel_case("first_name"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_upper_camel_case(""), "");
        assert_eq!(to_lower_camel_case("-_-"), "");
    }
}
