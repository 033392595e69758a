//! `Stream`: a lazy sequence of records.

use crate::action::InputParam;
use crate::class::ExpressionSignature;
use crate::table::Table;
use crate::value::Value;

/// `Stream`.
#[derive(Clone, Debug, PartialEq)]
pub enum Stream {
    VarRef(String),
    Timer {
        base: Value,
        interval: Value,
        schema: Option<ExpressionSignature>,
    },
    AtTimer {
        times: Vec<Value>,
        expiration: Option<Value>,
        schema: Option<ExpressionSignature>,
    },
    Monitor {
        table: Box<Table>,
        args: Option<Vec<String>>,
        schema: Option<ExpressionSignature>,
    },
    EdgeNew {
        stream: Box<Stream>,
        schema: Option<ExpressionSignature>,
    },
    EdgeFilter {
        stream: Box<Stream>,
        filter: Box<crate::boolean::BooleanExpression>,
        schema: Option<ExpressionSignature>,
    },
    Filter {
        stream: Box<Stream>,
        filter: Box<crate::boolean::BooleanExpression>,
        schema: Option<ExpressionSignature>,
    },
    Projection {
        stream: Box<Stream>,
        args: Vec<String>,
        computations: Vec<Value>,
        schema: Option<ExpressionSignature>,
    },
    Compute {
        stream: Box<Stream>,
        value: Value,
        alias: Option<String>,
        schema: Option<ExpressionSignature>,
    },
    Alias {
        stream: Box<Stream>,
        name: String,
        schema: Option<ExpressionSignature>,
    },
    Join {
        stream: Box<Stream>,
        table: Box<Table>,
        in_params: Vec<InputParam>,
        schema: Option<ExpressionSignature>,
    },
}

impl Stream {
    #[must_use]
    pub fn schema(&self) -> Option<&ExpressionSignature> {
        match self {
            Stream::VarRef(_) => None,
            Stream::Timer { schema, .. }
            | Stream::AtTimer { schema, .. }
            | Stream::Monitor { schema, .. }
            | Stream::EdgeNew { schema, .. }
            | Stream::EdgeFilter { schema, .. }
            | Stream::Filter { schema, .. }
            | Stream::Projection { schema, .. }
            | Stream::Compute { schema, .. }
            | Stream::Alias { schema, .. }
            | Stream::Join { schema, .. } => schema.as_ref(),
        }
    }

    pub fn set_schema(&mut self, new_schema: ExpressionSignature) {
        match self {
            Stream::VarRef(_) => {}
            Stream::Timer { schema, .. }
            | Stream::AtTimer { schema, .. }
            | Stream::Monitor { schema, .. }
            | Stream::EdgeNew { schema, .. }
            | Stream::EdgeFilter { schema, .. }
            | Stream::Filter { schema, .. }
            | Stream::Projection { schema, .. }
            | Stream::Compute { schema, .. }
            | Stream::Alias { schema, .. }
            | Stream::Join { schema, .. } => *schema = Some(new_schema),
        }
    }
}
