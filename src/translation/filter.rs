//! Predicate composition for translation listing.

use sqlx::{QueryBuilder, Sqlite};

use crate::db::{distinct, push_in_list};

/// Optional listing filters. Empty values are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationFilter {
    /// Case-sensitive substring of the key
    pub key: Option<String>,
    /// Case-sensitive substring of the value
    pub value: Option<String>,
    /// Translation must carry at least one of these tags
    pub tags: Vec<String>,
}

impl TranslationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.tags = distinct(tags);
        self
    }

    /// Append ` WHERE ...` to a query over `translations t`, or nothing when
    /// no filter is active.
    ///
    /// Conditions are joined with AND in a fixed order: key, value, tags.
    /// `instr` keeps the match literal, so `%` and `_` in a pattern are plain
    /// characters. The tag condition is a semi-join: a translation carrying
    /// several requested tags still yields one row.
    pub(crate) fn push_predicate(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let mut first = true;

        if let Some(key) = non_empty(&self.key) {
            push_joiner(qb, &mut first);
            qb.push("instr(t.key, ").push_bind(key.to_string()).push(") > 0");
        }

        if let Some(value) = non_empty(&self.value) {
            push_joiner(qb, &mut first);
            qb.push("instr(t.value, ").push_bind(value.to_string()).push(") > 0");
        }

        if !self.tags.is_empty() {
            push_joiner(qb, &mut first);
            qb.push(
                "t.id IN (SELECT tt.translation_id FROM translation_tag tt \
                 JOIN tags g ON g.id = tt.tag_id WHERE g.name IN ",
            );
            push_in_list(qb, self.tags.iter().cloned());
            qb.push(")");
        }
    }
}

fn push_joiner(qb: &mut QueryBuilder<'_, Sqlite>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(filter: &TranslationFilter) -> String {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.id FROM translations t");
        filter.push_predicate(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn test_no_filters_is_unrestricted() {
        assert_eq!(render(&TranslationFilter::new()), "SELECT t.id FROM translations t");
    }

    #[test]
    fn test_empty_strings_are_no_ops() {
        let filter = TranslationFilter::new().with_key("").with_value("");
        assert_eq!(render(&filter), "SELECT t.id FROM translations t");
    }

    #[test]
    fn test_key_only() {
        let sql = render(&TranslationFilter::new().with_key("greet"));
        assert_eq!(sql, "SELECT t.id FROM translations t WHERE instr(t.key, ?) > 0");
    }

    #[test]
    fn test_conjunction_order_is_fixed() {
        let filter = TranslationFilter::new()
            .with_tags(&["web", "api"])
            .with_value("Hello")
            .with_key("greet");

        let sql = render(&filter);
        assert_eq!(
            sql,
            "SELECT t.id FROM translations t WHERE instr(t.key, ?) > 0 \
             AND instr(t.value, ?) > 0 \
             AND t.id IN (SELECT tt.translation_id FROM translation_tag tt \
             JOIN tags g ON g.id = tt.tag_id WHERE g.name IN (?, ?))"
        );
    }

    #[test]
    fn test_with_tags_drops_duplicates() {
        let filter = TranslationFilter::new().with_tags(&["web", "web", "api"]);
        assert_eq!(filter.tags, vec!["web", "api"]);
    }

    #[test]
    fn test_tags_only() {
        let sql = render(&TranslationFilter::new().with_tags(&["web"]));
        assert!(sql.starts_with("SELECT t.id FROM translations t WHERE t.id IN ("));
        assert!(sql.ends_with("WHERE g.name IN (?))"));
    }
}
