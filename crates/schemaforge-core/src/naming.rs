//! Identifier normalization shared by every generator.
//!
//! All functions are total: any input string produces some output, and the
//! case converters are idempotent on their own output.

/// TypeScript keywords and contextual words that cannot be used as symbols.
const HOST_RESERVED: &[&str] = &[
    "any", "as", "async", "await", "boolean", "break", "case", "catch", "class", "const",
    "constructor", "continue", "debugger", "declare", "default", "delete", "do", "else", "enum",
    "export", "extends", "false", "finally", "for", "from", "function", "get", "if", "implements",
    "import", "in", "instanceof", "interface", "let", "module", "new", "null", "number", "of",
    "package", "private", "protected", "public", "require", "return", "set", "static", "string",
    "super", "switch", "symbol", "this", "throw", "true", "try", "type", "typeof", "undefined",
    "var", "void", "while", "with", "yield",
];

/// Names that clash with the persistence layer's own decorators and services.
const PERSISTENCE_RESERVED: &[&str] = &[
    "check", "column", "connection", "entity", "entitymanager", "exclusion", "generated",
    "index", "manager", "metadata", "query", "querybuilder", "relation", "repository", "target",
    "tree", "unique",
];

pub fn is_reserved(ident: &str) -> bool {
    let lower = ident.to_lowercase();
    HOST_RESERVED.contains(&lower.as_str()) || PERSISTENCE_RESERVED.contains(&lower.as_str())
}

/// Split an identifier into words at separators and case boundaries.
///
/// `HTTPServer` splits into `HTTP` and `Server`; digits stay attached to the
/// word they follow.
pub fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (idx, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[idx - 1];
            let next_is_lower = chars.get(idx + 1).is_some_and(|next| next.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }

        current.push(ch);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Words without lowercase letters are acronyms and keep their casing, so
/// `point_x_y` and `PointXY` agree.
fn capitalize(word: &str) -> String {
    if word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn to_upper_camel(input: &str) -> String {
    split_words(input).iter().map(|word| capitalize(word)).collect()
}

pub fn to_lower_camel(input: &str) -> String {
    let mut out = String::new();
    for (idx, word) in split_words(input).iter().enumerate() {
        if idx == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

pub fn to_snake(input: &str) -> String {
    join_lower(input, "_")
}

pub fn to_kebab(input: &str) -> String {
    join_lower(input, "-")
}

fn join_lower(input: &str, separator: &str) -> String {
    split_words(input)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Make a catalog identifier safe to use as a host-language symbol.
pub fn sanitize_identifier(input: &str) -> String {
    let mut out: String = input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' { ch } else { '_' })
        .collect();

    if out.is_empty() {
        return "_".to_string();
    }
    if out.starts_with(|ch: char| ch.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if is_reserved(&out) {
        out.push('_');
    }
    out
}

fn guard_reserved(mut symbol: String) -> String {
    if symbol.is_empty() {
        return "_".to_string();
    }
    if symbol.starts_with(|ch: char| ch.is_ascii_digit()) {
        symbol.insert(0, '_');
    }
    if is_reserved(&symbol) {
        symbol.push('_');
    }
    symbol
}

/// Class name for a table: `order_items` -> `OrderItems`.
pub fn to_class_name(table: &str) -> String {
    let mut name = to_upper_camel(&sanitize_identifier(table));
    if name.chars().count() < 3 {
        name.push_str("Entity");
    }
    guard_reserved(name)
}

/// Property name for a column: `created_at` -> `createdAt`.
pub fn to_property_name(column: &str) -> String {
    guard_reserved(to_lower_camel(&sanitize_identifier(column)))
}

/// File stem for a table's artifacts: `OrderItems` -> `order-items`.
pub fn to_file_stem(table: &str) -> String {
    let stem = to_kebab(&sanitize_identifier(table));
    if stem.is_empty() { "table".to_string() } else { stem }
}

/// Directory/module name for a table's CRUD artifacts.
pub fn to_module_name(table: &str) -> String {
    guard_reserved(to_lower_camel(&sanitize_identifier(table)))
}

/// Relation property name pointing at `table`, pluralized for collections.
pub fn to_relationship_name(table: &str, is_collection: bool) -> String {
    let base = to_lower_camel(&sanitize_identifier(table));
    let name = if is_collection { pluralize(&base) } else { base };
    guard_reserved(name)
}

/// Naive English pluralization.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|ch| !"aeiouAEIOU".contains(ch)) {
            return format!("{stem}ies");
        }
    }
    if ["s", "sh", "ch", "x", "z"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Extract the values of an inline `enum('a','b')` definition.
///
/// Best effort: quoted values may contain commas, but nested parentheses are
/// not understood. Returns an empty list when the text is not an enum.
pub fn parse_enum_values(definition: &str) -> Vec<String> {
    let trimmed = definition.trim();
    let lower = trimmed.to_ascii_lowercase();
    let Some(start) = lower.find("enum(") else {
        return Vec::new();
    };
    let Some(end) = trimmed.rfind(')') else {
        return Vec::new();
    };
    let body_start = start + "enum(".len();
    if end < body_start {
        return Vec::new();
    }
    let body = &trimmed[body_start..end];

    let mut values = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                // Doubled quote inside a quoted value.
                if chars.peek() == Some(&q) {
                    current.push(q);
                    chars.next();
                } else {
                    quote = None;
                }
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(ch),
            (None, ',') => values.push(std::mem::take(&mut current).trim().to_string()),
            (None, c) => current.push(c),
        }
    }
    let last = current.trim().to_string();
    if !last.is_empty() || !values.is_empty() {
        values.push(last);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_cases() {
        assert_eq!(to_upper_camel("order_items"), "OrderItems");
        assert_eq!(to_lower_camel("created_at"), "createdAt");
        assert_eq!(to_snake("OrderItems"), "order_items");
        assert_eq!(to_kebab("orderItems"), "order-items");
        assert_eq!(to_snake("HTTPServer"), "http_server");
        assert_eq!(to_upper_camel("user2_name"), "User2Name");
    }

    #[test]
    fn keeps_single_letter_runs_stable() {
        assert_eq!(to_upper_camel("point_x_y"), "PointXY");
        assert_eq!(to_upper_camel("PointXY"), "PointXY");
        assert_eq!(to_lower_camel("x_y_z"), "xYZ");
        assert_eq!(to_lower_camel("xYZ"), "xYZ");
        assert_eq!(to_upper_camel("HTTPServer"), "HTTPServer");
    }

    #[test]
    fn case_converters_are_idempotent() {
        let inputs = [
            "order_items",
            "OrderItems",
            "HTTPServer",
            "user2Name",
            "  weird--Name__x ",
            "a_1b",
            "ÉtatCivil",
            "point_x_y",
            "x_y_z",
            "",
        ];
        for input in inputs {
            let upper = to_upper_camel(input);
            assert_eq!(to_upper_camel(&upper), upper, "upper camel of {input:?}");
            let lower = to_lower_camel(input);
            assert_eq!(to_lower_camel(&lower), lower, "lower camel of {input:?}");
            let snake = to_snake(input);
            assert_eq!(to_snake(&snake), snake, "snake of {input:?}");
            let kebab = to_kebab(input);
            assert_eq!(to_kebab(&kebab), kebab, "kebab of {input:?}");
        }
    }

    #[test]
    fn sanitizes_identifiers() {
        assert_eq!(sanitize_identifier("order-items"), "order_items");
        assert_eq!(sanitize_identifier("1st_place"), "_1st_place");
        assert_eq!(sanitize_identifier("class"), "class_");
        assert_eq!(sanitize_identifier("Entity"), "Entity_");
        assert_eq!(sanitize_identifier("prix €"), "prix__");
        assert_eq!(sanitize_identifier(""), "_");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["class", "1abc", "a b-c", "", "__", "default", "ünïcode", "9"] {
            let once = sanitize_identifier(input);
            assert_eq!(sanitize_identifier(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn builds_symbols_from_catalog_names() {
        assert_eq!(to_class_name("customers"), "Customers");
        assert_eq!(to_class_name("io"), "IoEntity");
        assert_eq!(to_property_name("class"), "class_");
        assert_eq!(to_property_name("first name"), "firstName");
        assert_eq!(to_file_stem("OrderItems"), "order-items");
        assert_eq!(to_module_name("order_items"), "orderItems");
    }

    #[test]
    fn pluralizes_relationship_names() {
        assert_eq!(to_relationship_name("category", true), "categories");
        assert_eq!(to_relationship_name("day", true), "days");
        assert_eq!(to_relationship_name("box", true), "boxes");
        assert_eq!(to_relationship_name("order_item", true), "orderItems");
        assert_eq!(to_relationship_name("address", false), "address");
    }

    #[test]
    fn parses_enum_definitions() {
        assert_eq!(
            parse_enum_values("enum('draft','sent','paid')"),
            vec!["draft", "sent", "paid"]
        );
        assert_eq!(parse_enum_values("ENUM('a, b', 'it''s')"), vec!["a, b", "it's"]);
        assert!(parse_enum_values("varchar(20)").is_empty());
    }
}
