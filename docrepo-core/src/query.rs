//! Query construction: filter predicates, sorting, and paging composed into
//! one retrievable specification.
//!
//! # Query Building
//!
//! Queries are constructed with the fluent builder API:
//!
//! ```ignore
//! use docrepo_core::query::{Query, Filter, SortDirection};
//! use docrepo_core::page::PageRequest;
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("status", "active"))
//!     .sort("modified_at", SortDirection::Desc)
//!     .page(PageRequest::new(0, 25))
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides static constructors for filter expressions:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - String: `starts_with`, `ends_with`, `contains`, `not_contains`
//! - Existence: `exists`, `not_exists`
//! - Array: `any_of`, `none_of`
//! - Logical: `and`, `or`
//!
//! A prebuilt [`Expr`] and a freshly constructed predicate are the same thing:
//! both entry points produce the same specification and therefore the same
//! query behavior.

use bson::Bson;

use crate::{error::RepositoryError, page::PageRequest};

/// Sort direction for query results.
///
/// A sort whose direction was not stated defaults to descending; the
/// [`Default`] impl encodes that convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    #[default]
    Desc,
}

impl SortDirection {
    /// Returns the opposite direction.
    ///
    /// "Last" queries are defined as "first" under the inverted direction,
    /// never as a reversed result set.
    pub fn inverted(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Sort specification for query results.
///
/// Specifies which field to sort by and in which direction.
#[derive(Debug, Clone)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
///
/// Negated operators (`Ne`, `NotContains`, `NoneOf`) also match documents
/// where the field is absent; every other operator requires the field to be
/// present.
#[derive(Debug, Clone)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String contains the substring, or array contains the scalar value.
    /// With an array operand, the array field contains every element.
    Contains,
    /// Negation of `Contains` for string and scalar operands. With an array
    /// operand, the field matches none of the elements.
    NotContains,
    /// String starts with value.
    StartsWith,
    /// String ends with value.
    EndsWith,
    /// Field value is (or array field intersects) one of the values.
    AnyOf,
    /// Field value is not (and array field intersects none of) the values.
    NoneOf,
}

/// A filter expression selecting a subset of entities.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`)
/// to build complex predicates.
///
/// # Example
///
/// ```ignore
/// use docrepo_core::query::Filter;
///
/// let expr = Filter::and(vec![
///     Filter::eq("status", "active"),
///     Filter::gt("age", 18),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// A structured query for retrieving and filtering entities.
///
/// Encapsulates the filter predicate, sort specification, skip count, and
/// limit count. Built fresh per call and never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Optional filter expression to match documents; `None` matches all.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip (for pagination).
    pub skip: Option<usize>,
    /// Sort specification for results.
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a new empty query matching everything.
    pub fn new() -> Self {
        Query {
            filter: None,
            limit: None,
            skip: None,
            sort: None,
        }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
///
/// Provides static methods to construct common filter expressions in a
/// type-safe manner. All methods accept field names and values as
/// `Into<String>` and `Into<Bson>` for ergonomics.
pub struct Filter;

impl Filter {
    /// Creates an equality filter expression.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Creates a not-equal filter expression.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Creates a greater-than filter expression.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Creates a greater-than-or-equal filter expression.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Creates a less-than filter expression.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Creates a less-than-or-equal filter expression.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Creates a string prefix filter expression.
    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    /// Creates a string suffix filter expression.
    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    /// Creates a contains filter expression for string or array fields.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    /// Creates a not-contains filter expression for string or array fields.
    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    /// Creates an existence filter expression.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Creates a non-existence filter expression.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Creates a logical AND filter expression.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Creates a logical OR filter expression.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Creates an array membership filter expression.
    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    /// Creates an array exclusion filter expression.
    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

/// Fluent builder for [`Query`] values.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the filter expression, treating `None` as match-all.
    pub fn maybe_filter(mut self, filter: Option<Expr>) -> Self {
        self.query.filter = filter;
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.query.skip = Some(skip);
        self
    }

    /// Applies a page request, setting `skip = index * size` and `limit = size`.
    ///
    /// Page sizes are not validated or capped; sane paging is the caller's
    /// responsibility.
    pub fn page(mut self, page: PageRequest) -> Self {
        self.query.skip = Some(page.offset());
        self.query.limit = Some(page.size);
        self
    }

    /// Sets the sort field and direction for the query results.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Sets the sort field with the default (descending) direction.
    pub fn sort_by(self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::default())
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Visitor over [`Expr`] trees, used by backends to translate or evaluate
/// filter predicates.
pub trait QueryVisitor {
    type Output;
    type Error: Into<RepositoryError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_sets_skip_and_limit() {
        let query = Query::builder()
            .page(PageRequest::new(3, 25))
            .build();

        assert_eq!(query.skip, Some(75));
        assert_eq!(query.limit, Some(25));
    }

    #[test]
    fn directionless_sort_defaults_to_descending() {
        let query = Query::builder().sort_by("modified_at").build();
        let sort = query.sort.unwrap();

        assert_eq!(sort.field, "modified_at");
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn inversion_flips_both_directions() {
        assert_eq!(SortDirection::Asc.inverted(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.inverted(), SortDirection::Asc);
    }

    #[test]
    fn and_chaining_flattens_into_one_list() {
        let expr = Filter::eq("a", 1)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn prebuilt_and_fresh_filters_build_identical_queries() {
        let prebuilt = Filter::eq("status", "active");
        let a = Query::builder().filter(prebuilt.clone()).build();
        let b = Query::builder()
            .maybe_filter(Some(Filter::eq("status", "active")))
            .build();

        assert_eq!(format!("{:?}", a.filter), format!("{:?}", b.filter));
        let _ = prebuilt;
    }
}
