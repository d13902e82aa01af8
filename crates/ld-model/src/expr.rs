//! Relational expression tree built by models
//!
//! A [`Relation`] is an unmaterialized query: a chain of operations rooted
//! at a table reference or a raw SQL subquery. [`Scalar`] expressions are
//! the column-level values flowing through it.

use ld_core::Value;

/// Binary operators on scalar expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn sql(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// Unary operators on scalar expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    IsNull,
    NotNull,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    CountDistinct,
    Sum,
    Mean,
    Min,
    Max,
}

impl AggFunc {
    /// Suffix used for the default output name (`id_count`, `amount_sum`)
    pub fn suffix(&self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::CountDistinct => "nunique",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

/// Column-level expression
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Column(String),
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<Scalar>,
        right: Box<Scalar>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Scalar>,
    },
    /// `arg` is `None` only for `COUNT(*)`
    Aggregate {
        func: AggFunc,
        arg: Option<Box<Scalar>>,
    },
    Cast {
        expr: Box<Scalar>,
        to: String,
    },
    InList {
        expr: Box<Scalar>,
        list: Vec<Scalar>,
    },
}

impl Scalar {
    pub fn column(name: impl Into<String>) -> Self {
        Scalar::Column(name.into())
    }

    pub fn binary(op: BinaryOp, left: Scalar, right: Scalar) -> Self {
        Scalar::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Scalar) -> Self {
        Scalar::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn aggregate(func: AggFunc, arg: Option<Scalar>) -> Self {
        Scalar::Aggregate {
            func,
            arg: arg.map(Box::new),
        }
    }

    /// Name the expression gets when none is given explicitly.
    ///
    /// Plain columns keep their name, aggregates and casts of a plain
    /// column derive one from it. Anything else must be named.
    pub fn default_name(&self) -> Option<String> {
        match self {
            Scalar::Column(name) => Some(name.clone()),
            Scalar::Aggregate { func, arg: None } => Some(func.suffix().to_string()),
            Scalar::Aggregate {
                func,
                arg: Some(arg),
            } => arg
                .default_name()
                .map(|base| format!("{}_{}", base, func.suffix())),
            Scalar::Cast { expr, .. } => expr.default_name(),
            _ => None,
        }
    }

    /// Whether an aggregate function appears anywhere in the expression
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Scalar::Aggregate { .. } => true,
            Scalar::Column(_) | Scalar::Literal(_) => false,
            Scalar::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Scalar::Unary { expr, .. } | Scalar::Cast { expr, .. } => expr.contains_aggregate(),
            Scalar::InList { expr, list } => {
                expr.contains_aggregate() || list.iter().any(Scalar::contains_aggregate)
            }
        }
    }
}

/// Scalar expression with an output column name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedExpr {
    pub name: String,
    pub expr: Scalar,
}

impl NamedExpr {
    pub fn new(name: impl Into<String>, expr: Scalar) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    /// A column passed through under its own name
    pub fn is_passthrough(&self) -> bool {
        matches!(&self.expr, Scalar::Column(c) if *c == self.name)
    }
}

/// Ordering key
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: Scalar,
    pub descending: bool,
}

/// Unmaterialized relation
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// Named table or view, optionally schema-qualified
    Table(String),
    /// Raw SQL query used as a subquery
    Sql(String),
    Filter {
        input: Box<Relation>,
        predicates: Vec<Scalar>,
    },
    /// Replace the column list
    Project {
        input: Box<Relation>,
        columns: Vec<NamedExpr>,
    },
    /// Append computed columns to every existing column
    Mutate {
        input: Box<Relation>,
        columns: Vec<NamedExpr>,
    },
    /// Group by `keys` (empty for a global aggregate); output is keys then metrics
    Aggregate {
        input: Box<Relation>,
        keys: Vec<NamedExpr>,
        metrics: Vec<NamedExpr>,
    },
    OrderBy {
        input: Box<Relation>,
        keys: Vec<SortKey>,
    },
    Limit {
        input: Box<Relation>,
        n: u64,
        offset: u64,
    },
    Distinct {
        input: Box<Relation>,
    },
}

impl Relation {
    pub fn table(name: impl Into<String>) -> Self {
        Relation::Table(name.into())
    }

    pub fn filter(self, predicates: Vec<Scalar>) -> Self {
        Relation::Filter {
            input: Box::new(self),
            predicates,
        }
    }

    pub fn project(self, columns: Vec<NamedExpr>) -> Self {
        Relation::Project {
            input: Box::new(self),
            columns,
        }
    }

    pub fn mutate(self, columns: Vec<NamedExpr>) -> Self {
        Relation::Mutate {
            input: Box::new(self),
            columns,
        }
    }

    pub fn aggregate(self, keys: Vec<NamedExpr>, metrics: Vec<NamedExpr>) -> Self {
        Relation::Aggregate {
            input: Box::new(self),
            keys,
            metrics,
        }
    }

    pub fn order_by(self, keys: Vec<SortKey>) -> Self {
        Relation::OrderBy {
            input: Box::new(self),
            keys,
        }
    }

    pub fn limit(self, n: u64, offset: u64) -> Self {
        Relation::Limit {
            input: Box::new(self),
            n,
            offset,
        }
    }

    pub fn distinct(self) -> Self {
        Relation::Distinct {
            input: Box::new(self),
        }
    }
}
