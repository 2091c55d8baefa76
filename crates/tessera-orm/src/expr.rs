//! Predicate expressions for [`TableQuery`](crate::TableQuery) filters.
//!
//! Values never appear in the rendered SQL. Each value becomes a `?`
//! placeholder and is returned alongside the text in placeholder order.

use std::fmt::Write;

use tessera_types::SqliteValue;

use crate::sql::quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Like,
}

impl BinaryOp {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Like => "LIKE",
        }
    }
}

/// An expression tree over columns and bound values.
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    Value(SqliteValue),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    In {
        expr: Box<Expr>,
        list: Vec<SqliteValue>,
    },
}

/// A column reference.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// A bound value.
pub fn val(value: impl Into<SqliteValue>) -> Expr {
    Expr::Value(value.into())
}

impl Expr {
    pub fn binary(left: Self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn eq(self, value: impl Into<SqliteValue>) -> Self {
        Self::binary(self, BinaryOp::Eq, val(value))
    }

    #[must_use]
    pub fn ne(self, value: impl Into<SqliteValue>) -> Self {
        Self::binary(self, BinaryOp::Ne, val(value))
    }

    #[must_use]
    pub fn lt(self, value: impl Into<SqliteValue>) -> Self {
        Self::binary(self, BinaryOp::Lt, val(value))
    }

    #[must_use]
    pub fn le(self, value: impl Into<SqliteValue>) -> Self {
        Self::binary(self, BinaryOp::Le, val(value))
    }

    #[must_use]
    pub fn gt(self, value: impl Into<SqliteValue>) -> Self {
        Self::binary(self, BinaryOp::Gt, val(value))
    }

    #[must_use]
    pub fn ge(self, value: impl Into<SqliteValue>) -> Self {
        Self::binary(self, BinaryOp::Ge, val(value))
    }

    /// SQL `LIKE` against a pattern value.
    #[must_use]
    pub fn like(self, pattern: impl Into<SqliteValue>) -> Self {
        Self::binary(self, BinaryOp::Like, val(pattern))
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::And, other)
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Or, other)
    }

    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull(Box::new(self))
    }

    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNotNull(Box::new(self))
    }

    #[must_use]
    pub fn in_list<V: Into<SqliteValue>>(self, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            expr: Box::new(self),
            list: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Render to SQL text with `?` placeholders and the values they bind.
    pub fn render(&self) -> (String, Vec<SqliteValue>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render_into(&mut sql, &mut params);
        (sql, params)
    }

    pub(crate) fn render_into(&self, sql: &mut String, params: &mut Vec<SqliteValue>) {
        match self {
            Self::Column(name) => sql.push_str(&quote(name)),
            Self::Value(value) => {
                sql.push('?');
                params.push(value.clone());
            }
            Self::Binary { op, left, right } => {
                sql.push('(');
                left.render_into(sql, params);
                let _ = write!(sql, " {} ", op.as_sql());
                right.render_into(sql, params);
                sql.push(')');
            }
            Self::Not(inner) => {
                sql.push_str("NOT ");
                inner.render_into(sql, params);
            }
            Self::IsNull(inner) => {
                sql.push('(');
                inner.render_into(sql, params);
                sql.push_str(" IS NULL)");
            }
            Self::IsNotNull(inner) => {
                sql.push('(');
                inner.render_into(sql, params);
                sql.push_str(" IS NOT NULL)");
            }
            // An empty list matches nothing.
            Self::In { list, .. } if list.is_empty() => sql.push_str("(0)"),
            Self::In { expr, list } => {
                sql.push('(');
                expr.render_into(sql, params);
                sql.push_str(" IN (");
                for (i, value) in list.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    params.push(value.clone());
                }
                sql.push_str("))");
            }
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}
