//! `Table`: a finite or bounded sequence.

use crate::action::{InputParam, Invocation};
use crate::class::ExpressionSignature;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Table {
    VarRef(String),
    Invocation {
        invocation: Invocation,
        schema: Option<ExpressionSignature>,
    },
    Filter {
        table: Box<Table>,
        filter: Box<crate::boolean::BooleanExpression>,
        schema: Option<ExpressionSignature>,
    },
    Projection {
        table: Box<Table>,
        args: Vec<String>,
        computations: Vec<Value>,
        schema: Option<ExpressionSignature>,
    },
    Compute {
        table: Box<Table>,
        value: Value,
        alias: Option<String>,
        schema: Option<ExpressionSignature>,
    },
    Alias {
        table: Box<Table>,
        name: String,
        schema: Option<ExpressionSignature>,
    },
    Aggregation {
        table: Box<Table>,
        op: String,
        field: Option<String>,
        alias: Option<String>,
        schema: Option<ExpressionSignature>,
    },
    Sort {
        table: Box<Table>,
        field: String,
        direction: SortDirection,
        schema: Option<ExpressionSignature>,
    },
    Index {
        table: Box<Table>,
        indices: Vec<Value>,
        schema: Option<ExpressionSignature>,
    },
    Slice {
        table: Box<Table>,
        base: Value,
        limit: Value,
        schema: Option<ExpressionSignature>,
    },
    Join {
        lhs: Box<Table>,
        rhs: Box<Table>,
        in_params: Vec<InputParam>,
        schema: Option<ExpressionSignature>,
    },
}

impl Table {
    #[must_use]
    pub fn schema(&self) -> Option<&ExpressionSignature> {
        match self {
            Table::VarRef(_) => None,
            Table::Invocation { schema, .. }
            | Table::Filter { schema, .. }
            | Table::Projection { schema, .. }
            | Table::Compute { schema, .. }
            | Table::Alias { schema, .. }
            | Table::Aggregation { schema, .. }
            | Table::Sort { schema, .. }
            | Table::Index { schema, .. }
            | Table::Slice { schema, .. }
            | Table::Join { schema, .. } => schema.as_ref(),
        }
    }

    pub fn set_schema(&mut self, new_schema: ExpressionSignature) {
        match self {
            Table::VarRef(_) => {}
            Table::Invocation { schema, .. }
            | Table::Filter { schema, .. }
            | Table::Projection { schema, .. }
            | Table::Compute { schema, .. }
            | Table::Alias { schema, .. }
            | Table::Aggregation { schema, .. }
            | Table::Sort { schema, .. }
            | Table::Index { schema, .. }
            | Table::Slice { schema, .. }
            | Table::Join { schema, .. } => *schema = Some(new_schema),
        }
    }

    #[must_use]
    pub fn is_false_filter(&self) -> bool {
        matches!(
            self,
            Table::Filter { filter, .. } if matches!(**filter, crate::boolean::BooleanExpression::False)
        )
    }
}
