//! Composable query capability and its plain-value implementation.

use serde::Serialize;

use super::QueryError;

/// A constraint on one field, tagged by comparison.
///
/// Values stay as the client sent them; the store parses them against the
/// column type when the query is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    Equals(String),
    GreaterThan(String),
    GreaterOrEqual(String),
    LessThan(String),
    LessOrEqual(String),
}

impl Constraint {
    /// Translate a comparator token from `field[token]=value`.
    ///
    /// Accepted tokens: `gt`/`greaterthan`, `gte`/`greaterorequal`,
    /// `lt`/`lessthan`, `lte`/`lessorequal` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `QueryError::BadQueryParameter` for any other token.
    pub fn from_token(field: &str, token: &str, value: &str) -> Result<Self, QueryError> {
        let value = value.to_owned();
        match token.to_ascii_lowercase().as_str() {
            "gt" | "greaterthan" => Ok(Self::GreaterThan(value)),
            "gte" | "greaterorequal" => Ok(Self::GreaterOrEqual(value)),
            "lt" | "lessthan" => Ok(Self::LessThan(value)),
            "lte" | "lessorequal" => Ok(Self::LessOrEqual(value)),
            _ => Err(QueryError::bad(
                &format!("{field}[{token}]"),
                "unknown comparator (use gt, gte, lt or lte)",
            )),
        }
    }

    /// The SQL comparison operator.
    #[must_use]
    pub const fn sql_operator(&self) -> &'static str {
        match self {
            Self::Equals(_) => "=",
            Self::GreaterThan(_) => ">",
            Self::GreaterOrEqual(_) => ">=",
            Self::LessThan(_) => "<",
            Self::LessOrEqual(_) => "<=",
        }
    }

    /// The raw operand.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Equals(v)
            | Self::GreaterThan(v)
            | Self::GreaterOrEqual(v)
            | Self::LessThan(v)
            | Self::LessOrEqual(v) => v,
        }
    }
}

/// A constraint bound to a field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldConstraint {
    pub field: String,
    pub constraint: Constraint,
}

/// Case-insensitive, unanchored substring match on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMatch {
    pub field: String,
    pub needle: String,
}

/// Offset/limit page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub skip: u64,
    pub limit: u32,
}

/// What a collection query must support to be shaped.
///
/// Any store client that can narrow a pending query this way, and later
/// execute it, can sit behind the query shaper.
pub trait ComposableQuery {
    /// Field matched by free-text search.
    fn display_field(&self) -> &str;

    /// Narrow by equality or range on `field`.
    fn constrain(&mut self, field: &str, constraint: Constraint);

    /// Narrow to records whose `field` contains `needle`, ignoring case.
    fn match_text(&mut self, field: &str, needle: &str);

    /// Narrow to a page window.
    fn window(&mut self, window: Window);
}

/// A not-yet-executed collection query, as plain data.
///
/// The catalog repository turns this into SQL; tests compare plans directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    display_field: String,
    text_match: Option<TextMatch>,
    constraints: Vec<FieldConstraint>,
    window: Option<Window>,
}

impl QueryPlan {
    /// An unfiltered query whose free-text search targets `display_field`.
    #[must_use]
    pub fn all(display_field: &str) -> Self {
        Self {
            display_field: display_field.to_owned(),
            text_match: None,
            constraints: Vec::new(),
            window: None,
        }
    }

    /// The text match, if any.
    #[must_use]
    pub const fn text_match(&self) -> Option<&TextMatch> {
        self.text_match.as_ref()
    }

    /// Field constraints in the order they were added.
    #[must_use]
    pub fn constraints(&self) -> &[FieldConstraint] {
        &self.constraints
    }

    /// The page window, if any.
    #[must_use]
    pub const fn page_window(&self) -> Option<Window> {
        self.window
    }
}

impl ComposableQuery for QueryPlan {
    fn display_field(&self) -> &str {
        &self.display_field
    }

    fn constrain(&mut self, field: &str, constraint: Constraint) {
        self.constraints.push(FieldConstraint {
            field: field.to_owned(),
            constraint,
        });
    }

    fn match_text(&mut self, field: &str, needle: &str) {
        self.text_match = Some(TextMatch {
            field: field.to_owned(),
            needle: needle.to_owned(),
        });
    }

    fn window(&mut self, window: Window) {
        self.window = Some(window);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_comparator_tokens() {
        assert_eq!(
            Constraint::from_token("price", "gt", "10").unwrap(),
            Constraint::GreaterThan("10".to_owned())
        );
        assert_eq!(
            Constraint::from_token("price", "GreaterThan", "10").unwrap(),
            Constraint::GreaterThan("10".to_owned())
        );
        assert_eq!(
            Constraint::from_token("price", "lessorequal", "9").unwrap(),
            Constraint::LessOrEqual("9".to_owned())
        );
        assert!(Constraint::from_token("price", "ne", "9").is_err());
        assert!(Constraint::from_token("price", "$where", "1").is_err());
    }

    #[test]
    fn test_operators() {
        assert_eq!(Constraint::Equals(String::new()).sql_operator(), "=");
        assert_eq!(Constraint::GreaterOrEqual(String::new()).sql_operator(), ">=");
        assert_eq!(Constraint::LessThan("3".to_owned()).value(), "3");
    }

    #[test]
    fn test_plan_records_narrowing() {
        let mut plan = QueryPlan::all("name");
        plan.match_text("name", "tee");
        plan.constrain("brand", Constraint::Equals("acme".to_owned()));
        plan.window(Window { skip: 6, limit: 6 });

        assert_eq!(plan.display_field(), "name");
        assert_eq!(plan.text_match().unwrap().needle, "tee");
        assert_eq!(plan.constraints().len(), 1);
        assert_eq!(plan.page_window(), Some(Window { skip: 6, limit: 6 }));
    }
}
