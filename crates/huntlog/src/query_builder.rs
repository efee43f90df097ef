//! SQL WHERE clause builder for filtered listings.
//!
//! The builder hands out `$n` placeholders in order; callers bind the values in
//! the same order the conditions were added.

use time::Date;

use crate::types::{HuntListQuery, split_list};

#[derive(Debug)]
pub struct QueryBuilder {
    conditions: Vec<String>,
    param_idx: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            param_idx: 1,
        }
    }

    /// Adds `{prefix}$n` and returns `n`.
    pub fn add_param_condition(&mut self, condition_prefix: &str) -> usize {
        let idx = self.next_param_idx();
        self.conditions.push(format!("{condition_prefix}${idx}"));
        idx
    }

    /// Adds a condition built from the next placeholder index when `value` is set.
    pub fn add_optional<T, F>(&mut self, value: &Option<T>, condition_fn: F) -> &mut Self
    where
        F: FnOnce(usize) -> String,
    {
        if value.is_some() {
            let idx = self.next_param_idx();
            self.conditions.push(condition_fn(idx));
        }
        self
    }

    pub fn next_param_idx(&mut self) -> usize {
        let idx = self.param_idx;
        self.param_idx += 1;
        idx
    }

    pub fn current_param_idx(&self) -> usize {
        self.param_idx
    }

    /// The conditions joined with AND, without the `WHERE` keyword.
    pub fn build_where(&self) -> String {
        if self.conditions.is_empty() {
            "TRUE".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }
}

/// Hunt listing filter with its values normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HuntFilter {
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    pub game_types: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    /// `ILIKE` pattern.
    pub search: Option<String>,
}

impl From<&HuntListQuery> for HuntFilter {
    fn from(query: &HuntListQuery) -> Self {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        Self {
            date_from: query.date_from,
            date_to: query.date_to,
            game_types: split_list(query.game_types.as_deref()),
            tags: split_list(query.tags.as_deref()),
            is_favorite: query.is_favorite,
            search,
        }
    }
}

impl HuntFilter {
    /// WHERE clause for `hunts` scoped to the owner bound at `$1`.
    ///
    /// Values are bound in field order: date_from, date_to, game_types, tags,
    /// is_favorite, search.
    pub fn where_clause(&self) -> (String, usize) {
        let mut qb = QueryBuilder::new();
        qb.add_param_condition("user_id = ");
        qb.add_optional(&self.date_from, |i| format!("date >= ${i}"))
            .add_optional(&self.date_to, |i| format!("date <= ${i}"))
            .add_optional(&self.game_types, |i| format!("game_type && ${i}"))
            .add_optional(&self.tags, |i| format!("tags && ${i}"))
            .add_optional(&self.is_favorite, |i| format!("is_favorite = ${i}"))
            .add_optional(&self.search, |i| {
                format!("(title ILIKE ${i} OR COALESCE(notes, '') ILIKE ${i})")
            });
        (qb.build_where(), qb.current_param_idx())
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_clause_only_scopes_owner() {
        let (clause, next) = HuntFilter::default().where_clause();
        assert_eq!(clause, "user_id = $1");
        assert_eq!(next, 2);
    }

    #[test]
    fn test_placeholders_follow_field_order() {
        let filter = HuntFilter {
            date_from: Some(time::macros::date!(2024 - 09 - 01)),
            tags: Some(vec!["elg".into()]),
            search: Some("%fjell%".into()),
            ..Default::default()
        };
        let (clause, next) = filter.where_clause();
        assert_eq!(
            clause,
            "user_id = $1 AND date >= $2 AND tags && $3 AND (title ILIKE $4 OR COALESCE(notes, '') ILIKE $4)"
        );
        assert_eq!(next, 5);
    }

    #[test]
    fn test_filter_from_query() {
        let query = HuntListQuery {
            game_types: Some("elg,hjort".into()),
            search: Some("  50%_ ".into()),
            ..Default::default()
        };
        let filter = HuntFilter::from(&query);
        assert_eq!(
            filter.game_types,
            Some(vec!["elg".to_string(), "hjort".to_string()])
        );
        assert_eq!(filter.search.as_deref(), Some("%50\\%\\_%"));
        assert!(filter.tags.is_none());
    }

    #[test]
    fn test_empty_builder() {
        assert_eq!(QueryBuilder::new().build_where(), "TRUE");
    }
}
