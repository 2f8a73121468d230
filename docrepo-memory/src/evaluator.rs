//! Predicate evaluation over in-memory BSON documents.
//!
//! Implements the core [`QueryVisitor`] seam for the in-memory backend:
//! filter expressions are walked directly against each stored document, and
//! the same value wrapper drives sort comparisons in the store.

use std::cmp::Ordering;

use bson::{Bson, datetime::DateTime, oid::ObjectId};

use docrepo_core::{
    error::{RepositoryError, RepositoryResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable view of a BSON value.
///
/// Normalizes all numeric types to f64 so mixed-width comparisons behave the
/// way a document store's query engine would. Identity values are ordered by
/// their raw bytes, which makes identity order creation order.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(items) => {
                Comparable::Array(items.iter().map(Comparable::from).collect())
            }
            // Null, documents, and exotic scalar types all collapse to Null:
            // equal to themselves, unordered against everything else.
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => Some(a.cmp(b)),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    fn contains(&self, needle: &Comparable<'a>) -> bool {
        match (self, needle) {
            (Comparable::Array(items), _) => items.iter().any(|item| item == needle),
            (Comparable::String(haystack), Comparable::String(sub)) => haystack.contains(sub),
            _ => false,
        }
    }

    /// Membership with scalar/array symmetry: either side may be a single
    /// value or a set of candidates.
    fn intersects(&self, other: &Comparable<'a>) -> bool {
        match (self, other) {
            (Comparable::Array(left), Comparable::Array(right)) => right
                .iter()
                .any(|candidate| left.iter().any(|item| item == candidate)),
            (Comparable::Array(left), single) => left.iter().any(|item| item == single),
            (single, Comparable::Array(right)) => right.iter().any(|item| item == single),
            (left, right) => left == right,
        }
    }
}

/// Evaluates filter expressions against one document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Bson,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document }
    }

    pub fn matches(&mut self, expr: &Expr) -> RepositoryResult<bool> {
        self.visit_expr(expr)
    }

    /// Filters a collection's documents down to those matching `expr`.
    ///
    /// Documents that fail evaluation (e.g. a non-document at the top level)
    /// are treated as non-matching rather than aborting the scan.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Bson>,
        expr: &Expr,
    ) -> Vec<Bson> {
        documents
            .into_iter()
            .filter(|doc| {
                DocumentEvaluator::new(doc)
                    .matches(expr)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn field_value(&self, field: &str) -> RepositoryResult<Option<&'a Bson>> {
        let doc = self.document.as_document().ok_or_else(|| {
            RepositoryError::InvalidDocument("stored value is not a document".to_string())
        })?;

        Ok(doc.get(field))
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = RepositoryError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<bool, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<bool, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<bool, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<bool, Self::Error> {
        Ok(self.field_value(field)?.is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<bool, Self::Error> {
        // Negated operators match documents missing the field, as MongoDB's
        // $ne/$nin/$not do; every other operator requires the field.
        let Some(stored) = self.field_value(field)? else {
            return Ok(matches!(
                op,
                FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf
            ));
        };

        let left = Comparable::from(stored);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            // Array operands carry MongoDB's $all / $nin meaning: every
            // element required, respectively no element allowed.
            FieldOp::Contains => match (&left, &right) {
                (Comparable::Array(items), Comparable::Array(required)) => required
                    .iter()
                    .all(|value| items.iter().any(|item| item == value)),
                _ => left.contains(&right),
            },
            FieldOp::NotContains => match &right {
                Comparable::Array(_) => !left.intersects(&right),
                _ => !left.contains(&right),
            },
            FieldOp::StartsWith => match (&left, &right) {
                (Comparable::String(s), Comparable::String(prefix)) => s.starts_with(prefix),
                _ => false,
            },
            FieldOp::EndsWith => match (&left, &right) {
                (Comparable::String(s), Comparable::String(suffix)) => s.ends_with(suffix),
                _ => false,
            },
            FieldOp::AnyOf => left.intersects(&right),
            FieldOp::NoneOf => !left.intersects(&right),
        })
    }
}

/// Compares two documents on one field for sorting.
///
/// Absent fields and incomparable values sort as equal, leaving their
/// relative order to the underlying sort's stability.
pub(crate) fn compare_field(a: &Bson, b: &Bson, field: &str) -> Ordering {
    let left = a
        .as_document()
        .and_then(|doc| doc.get(field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);
    let right = b
        .as_document()
        .and_then(|doc| doc.get(field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);

    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docrepo_core::query::Filter;

    use super::*;

    fn evaluate(doc: &Bson, expr: &Expr) -> bool {
        DocumentEvaluator::new(doc).matches(expr).unwrap()
    }

    #[test]
    fn comparison_operators_match_numbers_across_widths() {
        let document = Bson::Document(doc! { "age": 30_i32 });

        assert!(evaluate(&document, &Filter::eq("age", 30_i64)));
        assert!(evaluate(&document, &Filter::gt("age", 18)));
        assert!(evaluate(&document, &Filter::lte("age", 30.0)));
        assert!(!evaluate(&document, &Filter::lt("age", 30)));
    }

    #[test]
    fn string_operators_inspect_substrings() {
        let document = Bson::Document(doc! { "email": "alice@example.com" });

        assert!(evaluate(&document, &Filter::starts_with("email", "alice")));
        assert!(evaluate(&document, &Filter::ends_with("email", ".com")));
        assert!(evaluate(&document, &Filter::contains("email", "@example")));
        assert!(evaluate(&document, &Filter::not_contains("email", "@other")));
    }

    #[test]
    fn absent_field_only_matches_negated_operators() {
        let document = Bson::Document(doc! { "name": "alice" });

        assert!(!evaluate(&document, &Filter::eq("missing", 1)));
        assert!(!evaluate(&document, &Filter::gt("missing", 1)));
        assert!(evaluate(&document, &Filter::ne("missing", 1)));
        assert!(evaluate(&document, &Filter::not_contains("missing", "x")));
        assert!(evaluate(&document, &Filter::none_of("missing", vec![1, 2])));
        assert!(evaluate(&document, &Filter::not_exists("missing")));
        assert!(evaluate(&document, &Filter::exists("name")));
    }

    #[test]
    fn contains_with_array_operand_requires_every_element() {
        let document = Bson::Document(doc! { "tags": ["a", "b", "c"] });

        assert!(evaluate(&document, &Filter::contains("tags", vec!["a", "c"])));
        assert!(!evaluate(&document, &Filter::contains("tags", vec!["a", "z"])));
        assert!(!evaluate(&document, &Filter::not_contains("tags", vec!["c", "z"])));
        assert!(evaluate(&document, &Filter::not_contains("tags", vec!["x", "z"])));
    }

    #[test]
    fn any_of_accepts_scalar_and_array_on_either_side() {
        let document = Bson::Document(doc! { "tags": ["a", "b"], "kind": "x" });

        assert!(evaluate(&document, &Filter::any_of("tags", vec!["b", "z"])));
        assert!(evaluate(&document, &Filter::any_of("tags", "a")));
        assert!(evaluate(&document, &Filter::any_of("kind", vec!["x", "y"])));
        assert!(evaluate(&document, &Filter::none_of("tags", vec!["p", "q"])));
    }

    #[test]
    fn logical_operators_compose() {
        let document = Bson::Document(doc! { "age": 30, "name": "alice" });
        let expr = Filter::eq("name", "alice")
            .and(Filter::gt("age", 18))
            .and(Filter::eq("age", 99).not());

        assert!(evaluate(&document, &expr));
    }

    #[test]
    fn identity_values_compare_by_creation_order() {
        let older = ObjectId::new();
        let newer = ObjectId::new();
        let a = Bson::Document(doc! { "_id": older });
        let b = Bson::Document(doc! { "_id": newer });

        assert_eq!(compare_field(&a, &b, "_id"), Ordering::Less);
        assert_eq!(compare_field(&b, &a, "_id"), Ordering::Greater);
    }
}
