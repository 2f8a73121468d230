//! Translation from repository query and update specifications to MongoDB
//! syntax.
//!
//! Filter expressions become native BSON query documents via the
//! [`QueryVisitor`] seam; update specifications become `$set`/`$unset`/
//! `$currentDate` update documents. Translation is pure and infallible except
//! where an operator constrains its operand type.

use bson::{Bson, Document, doc};

use docrepo_core::{
    error::RepositoryError,
    query::{Expr, FieldOp, QueryVisitor},
    update::{UpdateOp, UpdateSpec},
};

/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    fn membership_candidates(value: &Bson) -> Bson {
        // $in / $nin require an array operand; a scalar is a one-element set.
        match value {
            Bson::Array(_) => value.clone(),
            other => Bson::Array(vec![other.clone()]),
        }
    }

    fn string_operand<'a>(op: &FieldOp, value: &'a Bson) -> Result<&'a str, RepositoryError> {
        value.as_str().ok_or_else(|| {
            RepositoryError::Store(format!("{op:?} operator requires a string value"))
        })
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = RepositoryError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Document, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Document, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Document, Self::Error> {
        // $not is operator-scoped in MongoDB; $nor of one branch negates an
        // arbitrary sub-expression.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Document, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Document, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::Array(items) => doc! { "$all": items },
                    _ => doc! {
                        "$regex": regex_escape(Self::string_operand(op, value)?),
                    },
                },
                FieldOp::NotContains => match value {
                    Bson::Array(items) => doc! { "$nin": items },
                    _ => doc! {
                        "$not": { "$regex": regex_escape(Self::string_operand(op, value)?) },
                    },
                },
                FieldOp::StartsWith => doc! {
                    "$regex": format!("^{}", regex_escape(Self::string_operand(op, value)?)),
                },
                FieldOp::EndsWith => doc! {
                    "$regex": format!("{}$", regex_escape(Self::string_operand(op, value)?)),
                },
                FieldOp::AnyOf => doc! { "$in": Self::membership_candidates(value) },
                FieldOp::NoneOf => doc! { "$nin": Self::membership_candidates(value) },
            }
        })
    }
}

/// Escapes regex metacharacters so string operators match literally.
fn regex_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for ch in value.chars() {
        if "\\^$.|?*+()[]{}".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

/// Translates a combined update specification into one update document.
///
/// Operations are grouped by MongoDB operator; the server applies the whole
/// document atomically, so grouping preserves the specification's semantics.
pub(crate) fn translate_update(update: &UpdateSpec) -> Document {
    let mut set = Document::new();
    let mut unset = Document::new();
    let mut current_date = Document::new();

    for op in update.ops() {
        match op {
            UpdateOp::Set { field, value } => {
                set.insert(field.clone(), value.clone());
            }
            UpdateOp::Unset { field } => {
                unset.insert(field.clone(), Bson::String(String::new()));
            }
            UpdateOp::CurrentTimestamp { field } => {
                current_date.insert(field.clone(), true);
            }
        }
    }

    let mut translated = Document::new();

    if !set.is_empty() {
        translated.insert("$set", set);
    }
    if !unset.is_empty() {
        translated.insert("$unset", unset);
    }
    if !current_date.is_empty() {
        translated.insert("$currentDate", current_date);
    }

    translated
}

#[cfg(test)]
mod tests {
    use docrepo_core::{entity::MODIFIED_AT_FIELD, query::Filter};

    use super::*;

    fn translate(expr: &Expr) -> Document {
        MongoQueryTranslator.visit_expr(expr).unwrap()
    }

    #[test]
    fn comparison_expressions_become_operator_documents() {
        assert_eq!(
            translate(&Filter::gt("age", 18)),
            doc! { "age": { "$gt": 18 } }
        );
        assert_eq!(
            translate(&Filter::eq("name", "alice")),
            doc! { "name": { "$eq": "alice" } }
        );
    }

    #[test]
    fn negation_uses_nor() {
        assert_eq!(
            translate(&Filter::eq("name", "alice").not()),
            doc! { "$nor": [ { "name": { "$eq": "alice" } } ] }
        );
    }

    #[test]
    fn scalar_membership_operand_is_wrapped() {
        assert_eq!(
            translate(&Filter::any_of("tag", "a")),
            doc! { "tag": { "$in": ["a"] } }
        );
        assert_eq!(
            translate(&Filter::none_of("tag", vec!["a", "b"])),
            doc! { "tag": { "$nin": ["a", "b"] } }
        );
    }

    #[test]
    fn string_operators_escape_regex_metacharacters() {
        assert_eq!(
            translate(&Filter::starts_with("email", "a.b")),
            doc! { "email": { "$regex": "^a\\.b" } }
        );
    }

    #[test]
    fn contains_with_non_string_scalar_is_an_error() {
        let result = MongoQueryTranslator.visit_expr(&Filter::contains("name", 7));

        assert!(result.is_err());
    }

    #[test]
    fn update_translation_groups_by_operator() {
        let update = UpdateSpec::combine([
            UpdateOp::set("name", "alice"),
            UpdateOp::unset("nickname"),
        ]);

        assert_eq!(
            translate_update(&update),
            doc! {
                "$set": { "name": "alice" },
                "$unset": { "nickname": "" },
                "$currentDate": { MODIFIED_AT_FIELD: true },
            }
        );
    }

    #[test]
    fn touch_translates_to_current_date_only() {
        assert_eq!(
            translate_update(&UpdateSpec::touch()),
            doc! { "$currentDate": { MODIFIED_AT_FIELD: true } }
        );
    }
}
