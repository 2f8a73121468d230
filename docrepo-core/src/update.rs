//! Update combination: field-level update operations merged into one atomic
//! update specification.
//!
//! Every combined specification carries a trailing "set the modification
//! timestamp to current server time" operation, so any successful mutating
//! write advances `modified_at`, including a specification combined from
//! zero explicit operations, which is how a record is "touched".

use bson::Bson;

use crate::entity::MODIFIED_AT_FIELD;

/// A single field-level update operation.
#[derive(Debug, Clone)]
pub enum UpdateOp {
    /// Sets a field to a new value.
    Set {
        /// The field name to set.
        field: String,
        /// The new value.
        value: Bson,
    },
    /// Removes a field from the document.
    Unset {
        /// The field name to remove.
        field: String,
    },
    /// Sets a field to the store's current server time.
    CurrentTimestamp {
        /// The field name to stamp.
        field: String,
    },
}

impl UpdateOp {
    /// Creates a set operation.
    pub fn set(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        UpdateOp::Set { field: field.into(), value: value.into() }
    }

    /// Creates an unset operation.
    pub fn unset(field: impl Into<String>) -> Self {
        UpdateOp::Unset { field: field.into() }
    }

    /// Creates a server-time stamp operation.
    pub fn current_timestamp(field: impl Into<String>) -> Self {
        UpdateOp::CurrentTimestamp { field: field.into() }
    }

    /// Returns the field this operation targets.
    pub fn field(&self) -> &str {
        match self {
            UpdateOp::Set { field, .. }
            | UpdateOp::Unset { field }
            | UpdateOp::CurrentTimestamp { field } => field,
        }
    }
}

/// An ordered sequence of field-level operations combined into one atomic
/// update document.
///
/// Construct through [`UpdateSpec::combine`] (or the convenience
/// constructors); the trailing modification-timestamp operation is always
/// present and always last.
#[derive(Debug, Clone)]
pub struct UpdateSpec {
    ops: Vec<UpdateOp>,
}

impl UpdateSpec {
    /// Merges zero or more operations into one specification, appending the
    /// modification-timestamp operation last.
    ///
    /// Caller-supplied operations addressing the modification timestamp field
    /// are dropped; the trailing server-time operation is authoritative and
    /// a duplicate would make the combined document address one field twice.
    pub fn combine(ops: impl IntoIterator<Item = UpdateOp>) -> Self {
        let mut ops = ops
            .into_iter()
            .filter(|op| op.field() != MODIFIED_AT_FIELD)
            .collect::<Vec<_>>();

        ops.push(UpdateOp::current_timestamp(MODIFIED_AT_FIELD));

        Self { ops }
    }

    /// Single-field convenience: combine one set operation.
    pub fn set(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::combine([UpdateOp::set(field, value)])
    }

    /// Zero-operation convenience: the resulting specification only advances
    /// the modification timestamp.
    pub fn touch() -> Self {
        Self::combine([])
    }

    /// Returns the combined operations, timestamp operation last.
    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_modified_stamp(op: &UpdateOp) -> bool {
        matches!(op, UpdateOp::CurrentTimestamp { field } if field == MODIFIED_AT_FIELD)
    }

    #[test]
    fn combine_appends_timestamp_last() {
        let spec = UpdateSpec::combine([
            UpdateOp::set("name", "alice"),
            UpdateOp::unset("nickname"),
        ]);

        assert_eq!(spec.ops().len(), 3);
        assert!(is_modified_stamp(spec.ops().last().unwrap()));
    }

    #[test]
    fn empty_combine_still_stamps() {
        let spec = UpdateSpec::touch();

        assert_eq!(spec.ops().len(), 1);
        assert!(is_modified_stamp(&spec.ops()[0]));
    }

    #[test]
    fn single_field_sugar_routes_through_combine() {
        let spec = UpdateSpec::set("name", "bob");

        assert_eq!(spec.ops().len(), 2);
        assert!(matches!(&spec.ops()[0], UpdateOp::Set { field, .. } if field == "name"));
        assert!(is_modified_stamp(spec.ops().last().unwrap()));
    }

    #[test]
    fn caller_supplied_modified_at_op_is_dropped() {
        let spec = UpdateSpec::combine([
            UpdateOp::set(MODIFIED_AT_FIELD, bson::DateTime::from_millis(0)),
            UpdateOp::set("name", "carol"),
        ]);

        assert_eq!(spec.ops().len(), 2);
        assert!(is_modified_stamp(spec.ops().last().unwrap()));
    }
}
