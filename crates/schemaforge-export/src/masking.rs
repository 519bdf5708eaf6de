//! Deterministic, counter-based masking of sensitive columns.

use schemaforge_core::{ExportSettings, MaskKind, MaskingRule};

use crate::format::Cell;

pub const GENERIC_MASK: &str = "***MASKED***";
const DEFAULT_EMAIL: &str = "user{n}@example.com";
const DEFAULT_PHONE: &str = "XXX-XXX-XXXX";
const DEFAULT_NAME: &str = "User {n}";

/// Masks cells of sensitive columns. One instance per exported table.
#[derive(Debug, Clone)]
pub struct Masker {
    enabled: bool,
    sensitive: Vec<String>,
    rules: Vec<MaskingRule>,
    counter: u64,
}

impl Masker {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            enabled: settings.enable_masking,
            sensitive: settings
                .masked_fields
                .iter()
                .map(|field| field.to_lowercase())
                .collect(),
            rules: settings.masking_rules.clone(),
            counter: 0,
        }
    }

    /// A column is sensitive when its name contains a configured fragment, ignoring case.
    pub fn is_sensitive(&self, column: &str) -> bool {
        let column = column.to_lowercase();
        self.sensitive.iter().any(|fragment| column.contains(fragment.as_str()))
    }

    /// First rule whose match field occurs in the column name.
    pub fn rule_for(&self, column: &str) -> Option<&MaskingRule> {
        let column = column.to_lowercase();
        self.rules
            .iter()
            .find(|rule| column.contains(&rule.match_field.to_lowercase()))
    }

    /// Mask `cell` if masking is on and the column is sensitive. Nulls pass through.
    pub fn apply(&mut self, column: &str, cell: Cell) -> Cell {
        if !self.enabled || !self.is_sensitive(column) {
            return cell;
        }
        let Some(original) = cell.as_text() else {
            return cell;
        };
        Cell::Text(self.mask_value(column, &original))
    }

    /// Synthetic replacement for `original`; never equal to it.
    pub fn mask_value(&mut self, column: &str, original: &str) -> String {
        let rule = self.rule_for(column).cloned();
        for _ in 0..3 {
            self.counter += 1;
            let candidate = match &rule {
                Some(rule) => synthesize(rule, original, self.counter),
                None => GENERIC_MASK.to_string(),
            };
            if candidate != original {
                return candidate;
            }
        }
        if original == GENERIC_MASK {
            "*".repeat(original.chars().count() + 1)
        } else {
            GENERIC_MASK.to_string()
        }
    }
}

fn synthesize(rule: &MaskingRule, original: &str, counter: u64) -> String {
    match rule.kind {
        MaskKind::Email => rule
            .pattern
            .as_deref()
            .unwrap_or(DEFAULT_EMAIL)
            .replace("{n}", &counter.to_string()),
        MaskKind::Name => rule
            .pattern
            .as_deref()
            .unwrap_or(DEFAULT_NAME)
            .replace("{n}", &counter.to_string()),
        MaskKind::Phone => fill_digit_slots(rule.pattern.as_deref().unwrap_or(DEFAULT_PHONE), counter),
        MaskKind::Custom => {
            if rule.preserve_length {
                "*".repeat(original.chars().count())
            } else {
                rule.replacement.clone().unwrap_or_else(|| GENERIC_MASK.to_string())
            }
        }
    }
}

/// Replace each `X` slot with the counter's digits, zero padded, rightmost digits last.
fn fill_digit_slots(pattern: &str, counter: u64) -> String {
    let slots = pattern.chars().filter(|ch| *ch == 'X').count();
    if slots == 0 {
        return pattern.to_string();
    }
    let digits = format!("{counter:0slots$}");
    let mut digits = digits[digits.len() - slots..].chars();
    pattern
        .chars()
        .map(|ch| if ch == 'X' { digits.next().unwrap_or('0') } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masker() -> Masker {
        Masker::new(&ExportSettings {
            enable_masking: true,
            ..ExportSettings::default()
        })
    }

    #[test]
    fn sensitivity_is_a_case_insensitive_substring_match() {
        let masker = masker();
        assert!(masker.is_sensitive("User_Email"));
        assert!(masker.is_sensitive("home_phone"));
        assert!(!masker.is_sensitive("created_at"));
    }

    #[test]
    fn emails_use_the_counter() {
        let mut masker = masker();
        assert_eq!(masker.mask_value("email", "a@b.c"), "user1@example.com");
        assert_eq!(masker.mask_value("email", "d@e.f"), "user2@example.com");
    }

    #[test]
    fn unchanged_values_are_regenerated() {
        let mut masker = masker();
        assert_eq!(masker.mask_value("email", "user1@example.com"), "user2@example.com");
    }

    #[test]
    fn phones_fill_digit_slots() {
        assert_eq!(fill_digit_slots("XXX-XXX-XXXX", 42), "000-000-0042");
        assert_eq!(fill_digit_slots("+1 XX", 12345), "+1 45");
    }

    #[test]
    fn custom_rules_and_generic_fallback() {
        let mut masker = masker();
        assert_eq!(masker.mask_value("password_hash", "secret"), "MASKED_PASSWORD");
        assert_eq!(masker.mask_value("ssn", "123-45-6789"), GENERIC_MASK);

        let mut settings = ExportSettings {
            enable_masking: true,
            ..ExportSettings::default()
        };
        settings.masking_rules = vec![MaskingRule {
            preserve_length: true,
            ..MaskingRule::new("credit_card", MaskKind::Custom)
        }];
        let mut masker = Masker::new(&settings);
        assert_eq!(masker.mask_value("credit_card", "4111"), "****");
    }

    #[test]
    fn disabled_masking_and_nulls_pass_through() {
        let mut off = Masker::new(&ExportSettings::default());
        assert_eq!(off.apply("email", Cell::Text("a@b.c".into())), Cell::Text("a@b.c".into()));
        let mut on = masker();
        assert_eq!(on.apply("email", Cell::Null), Cell::Null);
    }
}
