//! Translation of a shaped [`QueryPlan`] into SQL over the `product` table.
//!
//! Field names are mapped through a fixed column table and every value is
//! parsed to the column's type and bound as a parameter. Anything that does
//! not map is a `QueryError::BadQueryParameter`, raised before the database
//! is touched.

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use teeshop_core::Category;
use teeshop_core::query::{Constraint, QueryError, QueryPlan, Window};

/// Filterable product columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Brand,
    Description,
    Category,
    Price,
    Stock,
    Ratings,
    NumberOfReviews,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Category,
    Decimal,
    Integer,
    Float,
}

impl Column {
    fn from_field(field: &str) -> Option<Self> {
        match field {
            "name" => Some(Self::Name),
            "brand" => Some(Self::Brand),
            "description" => Some(Self::Description),
            "category" => Some(Self::Category),
            "price" => Some(Self::Price),
            "stock" => Some(Self::Stock),
            "ratings" => Some(Self::Ratings),
            "numberOfReviews" | "number_of_reviews" => Some(Self::NumberOfReviews),
            _ => None,
        }
    }

    const fn sql(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Brand => "brand",
            Self::Description => "description",
            Self::Category => "category",
            Self::Price => "price",
            Self::Stock => "stock",
            Self::Ratings => "ratings",
            Self::NumberOfReviews => "number_of_reviews",
        }
    }

    const fn kind(self) -> ColumnKind {
        match self {
            Self::Name | Self::Brand | Self::Description => ColumnKind::Text,
            Self::Category => ColumnKind::Category,
            Self::Price => ColumnKind::Decimal,
            Self::Stock | Self::NumberOfReviews => ColumnKind::Integer,
            Self::Ratings => ColumnKind::Float,
        }
    }
}

/// A typed bind parameter.
#[derive(Debug, Clone, PartialEq)]
enum Bound {
    Text(String),
    Category(Category),
    Decimal(Decimal),
    Int(i32),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    column: Column,
    operator: &'static str,
    value: Bound,
}

/// A catalog query ready to be appended to a `SELECT ... FROM product`.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    conditions: Vec<Condition>,
    window: Option<Window>,
}

impl CatalogQuery {
    /// Compile a shaped plan.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::BadQueryParameter` for a field with no column,
    /// a value that does not parse as the column's type, or a range
    /// comparison on a non-numeric column.
    pub fn compile(plan: &QueryPlan) -> Result<Self, QueryError> {
        let mut conditions = Vec::with_capacity(plan.constraints().len() + 1);

        if let Some(text) = plan.text_match() {
            let column = Column::from_field(&text.field)
                .filter(|c| c.kind() == ColumnKind::Text)
                .ok_or_else(|| bad(&text.field, "cannot be searched"))?;
            conditions.push(Condition {
                column,
                operator: "ILIKE",
                value: Bound::Text(format!("%{}%", escape_like(&text.needle))),
            });
        }

        for fc in plan.constraints() {
            let column =
                Column::from_field(&fc.field).ok_or_else(|| bad(&fc.field, "unknown field"))?;
            let value = parse_value(&fc.field, column.kind(), &fc.constraint)?;
            conditions.push(Condition {
                column,
                operator: fc.constraint.sql_operator(),
                value,
            });
        }

        Ok(Self {
            conditions,
            window: plan.page_window(),
        })
    }

    /// Append `WHERE`, `ORDER BY` and the page window to `builder`.
    pub fn push_onto(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(condition.column.sql());
            builder.push(" ");
            builder.push(condition.operator);
            builder.push(" ");
            match &condition.value {
                Bound::Text(v) => builder.push_bind(v.clone()),
                Bound::Category(v) => builder.push_bind(*v),
                Bound::Decimal(v) => builder.push_bind(*v),
                Bound::Int(v) => builder.push_bind(*v),
                Bound::Float(v) => builder.push_bind(*v),
            };
        }

        builder.push(" ORDER BY id");

        if let Some(window) = self.window {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(window.limit));
            builder.push(" OFFSET ");
            builder.push_bind(i64::try_from(window.skip).unwrap_or(i64::MAX));
        }
    }
}

fn bad(field: &str, reason: &str) -> QueryError {
    QueryError::BadQueryParameter {
        name: field.to_owned(),
        reason: reason.to_owned(),
    }
}

fn parse_value(field: &str, kind: ColumnKind, constraint: &Constraint) -> Result<Bound, QueryError> {
    let raw = constraint.value().trim();
    let ranged = !matches!(constraint, Constraint::Equals(_));

    match kind {
        ColumnKind::Text if ranged => Err(bad(field, "range comparison needs a numeric field")),
        ColumnKind::Category if ranged => {
            Err(bad(field, "range comparison needs a numeric field"))
        }
        ColumnKind::Text => Ok(Bound::Text(constraint.value().to_owned())),
        ColumnKind::Category => raw
            .parse::<Category>()
            .map(Bound::Category)
            .map_err(|e| bad(field, &e)),
        ColumnKind::Decimal => raw
            .parse::<Decimal>()
            .map(Bound::Decimal)
            .map_err(|_| bad(field, "expected a decimal number")),
        ColumnKind::Integer => raw
            .parse::<i32>()
            .map(Bound::Int)
            .map_err(|_| bad(field, "expected an integer")),
        ColumnKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Bound::Float)
            .ok_or_else(|| bad(field, "expected a number")),
    }
}

/// Escape `LIKE` metacharacters so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
