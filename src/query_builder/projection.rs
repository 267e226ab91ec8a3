//! SELECT lists and the result shape they imply.

use crate::dialect::Dialect;
use crate::expression::Expr;
use crate::sql_generator::{AliasBinding, ExprTranslator, Fragment, ProjectionItem, TranslateError};

/// How rows of a compiled statement are meant to be read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    /// Every column of the root entity, in field order
    Entity,
    /// Consecutive column groups, one per tuple element
    Tuple(Vec<usize>),
    /// Arbitrary columns read by name
    Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    columns: Vec<Fragment>,
    names: Vec<Option<String>>,
    shape: ResultShape,
}

impl Projection {
    /// All columns of the root binding.
    pub fn entity(dialect: &dyn Dialect, root: &AliasBinding) -> Self {
        let fields = root.meta.fields();
        Self {
            columns: fields
                .iter()
                .map(|f| Fragment::sql(root.qualify(dialect, f.column_name())))
                .collect(),
            names: fields.iter().map(|f| Some(f.column_name().to_string())).collect(),
            shape: ResultShape::Entity,
        }
    }

    pub fn compile(translator: &ExprTranslator<'_>, items: &[Expr]) -> Result<Self, TranslateError> {
        let mut columns = Vec::new();
        let mut names = Vec::new();
        let mut groups = Vec::new();
        let mut current = 0usize;

        for item in items {
            for projected in translator.translate_projection(item)? {
                match projected {
                    ProjectionItem::Column { fragment, name } => {
                        columns.push(fragment);
                        names.push(name);
                        current += 1;
                    }
                    ProjectionItem::TupleBreak => {
                        groups.push(current);
                        current = 0;
                    }
                }
            }
        }

        if columns.is_empty() {
            return Err(TranslateError::unsupported(
                "Select",
                "projection has no columns",
            ));
        }

        let shape = if groups.is_empty() {
            ResultShape::Map
        } else {
            if current > 0 {
                groups.push(current);
            }
            ResultShape::Tuple(groups)
        };

        Ok(Self {
            columns,
            names,
            shape,
        })
    }

    /// Caller-written select list.
    pub fn raw(sql: &str) -> Self {
        Self {
            columns: vec![Fragment::sql(sql)],
            names: vec![None],
            shape: ResultShape::Map,
        }
    }

    pub fn shape(&self) -> &ResultShape {
        &self.shape
    }

    /// Output column names, `None` where the expression has no natural name.
    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    pub fn to_fragment(&self) -> Fragment {
        Fragment::join(self.columns.iter().cloned(), ", ")
    }
}
