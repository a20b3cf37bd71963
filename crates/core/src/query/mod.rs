//! Query shaping for collection listings.
//!
//! A [`QueryShaper`] takes a base query and the client's query-string
//! parameters and narrows the query step by step:
//!
//! - [`QueryShaper::search`] matches the `search` parameter against the
//!   query's display field (case-insensitive substring).
//! - [`QueryShaper::filter`] turns every non-reserved parameter into an
//!   equality or range constraint (`price[gt]=10`, `category=hoodies`).
//! - [`QueryShaper::pager`] applies the `page` / `limit` window.
//!
//! The steps are independent and can run in any order; the shaped query is
//! taken out with [`QueryShaper::into_query`] and executed by the store.
//!
//! ```
//! use teeshop_core::query::{QueryParams, QueryPlan, QueryShaper, Window};
//!
//! let params = QueryParams::from_pairs([("page", "3"), ("price[gt]", "10")]).unwrap();
//! let plan = QueryShaper::new(QueryPlan::all("name"), params)
//!     .search()
//!     .filter()?
//!     .pager(6)?
//!     .into_query();
//! assert_eq!(plan.page_window(), Some(Window { skip: 12, limit: 6 }));
//! # Ok::<(), teeshop_core::query::QueryError>(())
//! ```

mod params;
mod plan;

pub use params::{ParamValue, QueryParams};
pub use plan::{ComposableQuery, Constraint, FieldConstraint, QueryPlan, TextMatch, Window};

/// Page-number parameter (1-indexed).
pub const PAGE_PARAM: &str = "page";
/// Page-size override parameter.
pub const LIMIT_PARAM: &str = "limit";
/// Free-text search parameter.
pub const SEARCH_PARAM: &str = "search";
/// Parameters that never become field constraints.
pub const RESERVED_PARAMS: [&str; 3] = [PAGE_PARAM, LIMIT_PARAM, SEARCH_PARAM];
/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Malformed query input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A parameter could not be interpreted.
    #[error("bad query parameter `{name}`: {reason}")]
    BadQueryParameter {
        /// Parameter name as the client sent it.
        name: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl QueryError {
    pub(crate) fn bad(name: &str, reason: &str) -> Self {
        Self::BadQueryParameter {
            name: name.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// Narrows a base query from client parameters.
#[derive(Debug, Clone)]
pub struct QueryShaper<Q> {
    query: Q,
    params: QueryParams,
}

impl<Q: ComposableQuery> QueryShaper<Q> {
    /// Start shaping `base` with the client's parameters.
    #[must_use]
    pub const fn new(base: Q, params: QueryParams) -> Self {
        Self {
            query: base,
            params,
        }
    }

    /// Apply the `search` parameter, if present and non-blank.
    ///
    /// A `search` given with comparators is not a search term and is left
    /// alone here; [`Self::filter`] never sees it either.
    #[must_use]
    pub fn search(mut self) -> Self {
        if let Some(ParamValue::Scalar(term)) = self.params.get(SEARCH_PARAM) {
            let term = term.trim();
            if !term.is_empty() {
                let field = self.query.display_field().to_owned();
                self.query.match_text(&field, term);
            }
        }
        self
    }

    /// Turn every non-reserved parameter into a field constraint.
    ///
    /// Plain values become equality constraints; comparator entries become
    /// range constraints. Field names are not checked here.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::BadQueryParameter` for an unknown comparator
    /// token.
    pub fn filter(mut self) -> Result<Self, QueryError> {
        let fields = self.params.without(&RESERVED_PARAMS);
        for (field, value) in fields.iter() {
            match value {
                ParamValue::Scalar(v) => {
                    self.query.constrain(field, Constraint::Equals(v.clone()));
                }
                ParamValue::Comparators(entries) => {
                    for (token, v) in entries {
                        let constraint = Constraint::from_token(field, token, v)?;
                        self.query.constrain(field, constraint);
                    }
                }
            }
        }
        Ok(self)
    }

    /// Apply the page window.
    ///
    /// `page` defaults to 1 and `limit` to `default_page_size`;
    /// `skip = (page - 1) * limit`.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::BadQueryParameter` if `page` or `limit` is not a
    /// positive integer, or `limit` exceeds [`MAX_PAGE_SIZE`].
    pub fn pager(mut self, default_page_size: u32) -> Result<Self, QueryError> {
        let page = match self.params.scalar(PAGE_PARAM)? {
            Some(raw) => parse_positive(PAGE_PARAM, raw)?,
            None => 1,
        };
        let limit = match self.params.scalar(LIMIT_PARAM)? {
            Some(raw) => {
                let limit = parse_positive(LIMIT_PARAM, raw)?;
                if limit > MAX_PAGE_SIZE {
                    return Err(QueryError::bad(
                        LIMIT_PARAM,
                        &format!("must be at most {MAX_PAGE_SIZE}"),
                    ));
                }
                limit
            }
            None => default_page_size.max(1),
        };

        let skip = u64::from(page - 1) * u64::from(limit);
        self.query.window(Window { skip, limit });
        Ok(self)
    }

    /// The query shaped so far.
    #[must_use]
    pub const fn query(&self) -> &Q {
        &self.query
    }

    /// Finish shaping and take the query out for execution.
    #[must_use]
    pub fn into_query(self) -> Q {
        self.query
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u32, QueryError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(QueryError::bad(name, "must be at least 1")),
        Err(_) => Err(QueryError::bad(name, "must be a positive integer")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE_SIZE: u32 = 6;

    fn shaper(params: QueryParams) -> QueryShaper<QueryPlan> {
        QueryShaper::new(QueryPlan::all("name"), params)
    }

    fn window_for(params: QueryParams) -> Window {
        shaper(params)
            .pager(PAGE_SIZE)
            .unwrap()
            .into_query()
            .page_window()
            .unwrap()
    }

    #[test]
    fn test_pager_first_page() {
        let params = QueryParams::new().with("page", "1");
        assert_eq!(window_for(params), Window { skip: 0, limit: 6 });
    }

    #[test]
    fn test_pager_third_page() {
        let params = QueryParams::new().with("page", "3");
        assert_eq!(window_for(params), Window { skip: 12, limit: 6 });
    }

    #[test]
    fn test_pager_missing_page_is_first_page() {
        assert_eq!(
            window_for(QueryParams::new()),
            window_for(QueryParams::new().with("page", "1"))
        );
    }

    #[test]
    fn test_pager_limit_override() {
        let params = QueryParams::new().with("page", "2").with("limit", "10");
        assert_eq!(window_for(params), Window { skip: 10, limit: 10 });
    }

    #[test]
    fn test_pager_rejects_malformed_numbers() {
        for (key, value) in [
            ("page", "two"),
            ("page", "0"),
            ("page", "-1"),
            ("page", "1.5"),
            ("limit", "0"),
            ("limit", "lots"),
            ("limit", "101"),
        ] {
            let result = shaper(QueryParams::new().with(key, value)).pager(PAGE_SIZE);
            assert!(
                matches!(result, Err(QueryError::BadQueryParameter { .. })),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_pager_rejects_comparator_page() {
        let params = QueryParams::new().with_comparator("page", "gt", "1");
        assert!(shaper(params).pager(PAGE_SIZE).is_err());
    }

    #[test]
    fn test_search_matches_display_field() {
        let plan = shaper(QueryParams::new().with("search", "  Hoodie "))
            .search()
            .into_query();
        let text = plan.text_match().unwrap();
        assert_eq!(text.field, "name");
        assert_eq!(text.needle, "Hoodie");
    }

    #[test]
    fn test_search_absent_or_blank_is_noop() {
        let plan = shaper(QueryParams::new()).search().into_query();
        assert_eq!(plan, QueryPlan::all("name"));

        let plan = shaper(QueryParams::new().with("search", "   "))
            .search()
            .into_query();
        assert_eq!(plan, QueryPlan::all("name"));
    }

    #[test]
    fn test_filter_translates_ranges_and_equality() {
        let params = QueryParams::new()
            .with_comparator("price", "greaterthan", "10")
            .with("category", "hoodies")
            .with("page", "2")
            .with("limit", "3")
            .with("search", "tee");

        let plan = shaper(params).filter().unwrap().into_query();

        assert_eq!(
            plan.constraints(),
            &[
                FieldConstraint {
                    field: "category".to_owned(),
                    constraint: Constraint::Equals("hoodies".to_owned()),
                },
                FieldConstraint {
                    field: "price".to_owned(),
                    constraint: Constraint::GreaterThan("10".to_owned()),
                },
            ]
        );
        assert!(
            plan.constraints()
                .iter()
                .all(|c| !RESERVED_PARAMS.contains(&c.field.as_str()))
        );
        assert!(plan.text_match().is_none());
        assert!(plan.page_window().is_none());
    }

    #[test]
    fn test_filter_multiple_comparators_on_one_field() {
        let params = QueryParams::new()
            .with_comparator("price", "gte", "100")
            .with_comparator("price", "lt", "500");
        let plan = shaper(params).filter().unwrap().into_query();
        assert_eq!(plan.constraints().len(), 2);
    }

    #[test]
    fn test_filter_passes_unknown_fields_through() {
        let params = QueryParams::new().with("colour", "red");
        let plan = shaper(params).filter().unwrap().into_query();
        assert_eq!(plan.constraints()[0].field, "colour");
    }

    #[test]
    fn test_filter_rejects_unknown_comparator() {
        let params = QueryParams::new().with_comparator("price", "regex", ".*");
        assert!(matches!(
            shaper(params).filter(),
            Err(QueryError::BadQueryParameter { .. })
        ));
    }

    #[test]
    fn test_order_of_search_and_filter_does_not_matter() {
        let params = QueryParams::new()
            .with("search", "hood")
            .with("brand", "acme")
            .with_comparator("ratings", "gte", "4")
            .with("page", "2");

        let search_first = shaper(params.clone())
            .search()
            .filter()
            .unwrap()
            .pager(PAGE_SIZE)
            .unwrap()
            .into_query();
        let filter_first = shaper(params)
            .filter()
            .unwrap()
            .search()
            .pager(PAGE_SIZE)
            .unwrap()
            .into_query();

        assert_eq!(search_first, filter_first);
    }
}
