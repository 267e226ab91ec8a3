//! SQL text with its literal values still attached.
//!
//! A [`Fragment`] never contains placeholder text. Literals stay as
//! [`Part::Param`] and embedded sub-queries stay nested as [`Part::SubQuery`]
//! until the [`ParameterStore`](super::parameter_store::ParameterStore)
//! flattens everything into one statement, so numbering is decided exactly
//! once, at the end.

use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Sql(String),
    Param(Value),
    /// An already-built query embedded in this one
    SubQuery(Box<Fragment>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    parts: Vec<Part>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sql(text: impl Into<String>) -> Self {
        let mut fragment = Self::new();
        fragment.push_sql(&text.into());
        fragment
    }

    pub fn param(value: Value) -> Self {
        Self {
            parts: vec![Part::Param(value)],
        }
    }

    pub fn sub_query(inner: Fragment) -> Self {
        Self {
            parts: vec![Part::SubQuery(Box::new(inner))],
        }
    }

    /// `name(arg0, arg1, ...)`
    pub fn call(name: &str, args: Vec<Fragment>) -> Self {
        let mut out = Self::sql(format!("{name}("));
        out.append(Self::join(args, ", "));
        out.push_sql(")");
        out
    }

    /// `(left op right)`
    pub fn infix(left: Fragment, op: &str, right: Fragment) -> Self {
        let mut out = Self::sql("(");
        out.append(left);
        out.push_sql(&format!(" {op} "));
        out.append(right);
        out.push_sql(")");
        out
    }

    pub fn join(fragments: impl IntoIterator<Item = Fragment>, separator: &str) -> Self {
        let mut out = Self::new();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.push_sql(separator);
            }
            out.append(fragment);
        }
        out
    }

    pub fn wrap(self, prefix: &str, suffix: &str) -> Self {
        let mut out = Self::sql(prefix);
        out.append(self);
        out.push_sql(suffix);
        out
    }

    /// Wrap in parentheses.
    pub fn parenthesized(self) -> Self {
        self.wrap("(", ")")
    }

    pub fn push_sql(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Part::Sql(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(Part::Sql(text.to_string()));
        }
    }

    pub fn push_param(&mut self, value: Value) {
        self.parts.push(Part::Param(value));
    }

    pub fn push_sub_query(&mut self, inner: Fragment) {
        self.parts.push(Part::SubQuery(Box::new(inner)));
    }

    pub fn append(&mut self, other: Fragment) {
        for part in other.parts {
            match part {
                Part::Sql(text) => self.push_sql(&text),
                other => self.parts.push(other),
            }
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Whether the whole fragment is one parenthesised group, e.g. `(a = b)`
    /// but not `(a) AND (b)`.
    pub fn is_parenthesized(&self) -> bool {
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut closed_early = false;
        let mut seen_any = false;

        for part in &self.parts {
            let Part::Sql(text) = part else {
                if depth == 0 {
                    return false;
                }
                continue;
            };
            for c in text.chars() {
                if closed_early {
                    return false;
                }
                if let Some(q) = quote {
                    if c == q {
                        quote = None;
                    }
                    continue;
                }
                match c {
                    '(' => {
                        depth += 1;
                        seen_any = true;
                    }
                    _ if depth == 0 => return false,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            closed_early = true;
                        }
                    }
                    '\'' | '"' => quote = Some(c),
                    _ => {}
                }
            }
        }
        seen_any && depth == 0
    }

    /// Number of literals, including those of nested sub-queries.
    pub fn param_count(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                Part::Sql(_) => 0,
                Part::Param(_) => 1,
                Part::SubQuery(inner) => inner.param_count(),
            })
            .sum()
    }

    /// Literals in textual order, nested sub-queries flattened in place.
    pub fn values(&self) -> Vec<&Value> {
        let mut out = Vec::with_capacity(self.param_count());
        self.collect_values(&mut out);
        out
    }

    fn collect_values<'a>(&'a self, out: &mut Vec<&'a Value>) {
        for part in &self.parts {
            match part {
                Part::Sql(_) => {}
                Part::Param(v) => out.push(v),
                Part::SubQuery(inner) => inner.collect_values(out),
            }
        }
    }
}

/// Debug rendering: literals are shown as `?`.
impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Sql(text) => write!(f, "{text}")?,
                Part::Param(_) => write!(f, "?")?,
                Part::SubQuery(inner) => write!(f, "{inner}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_sql_parts_coalesce() {
        let mut f = Fragment::sql("a");
        f.push_sql(" = ");
        f.push_param(Value::Int(1));
        f.push_sql(" AND b");
        assert_eq!(f.parts().len(), 3);
        assert_eq!(f.to_string(), "a = ? AND b");
    }

    #[test]
    fn test_nested_values_flatten_in_order() {
        let mut inner = Fragment::sql("SELECT x FROM t WHERE y = ");
        inner.push_param(Value::Int(2));

        let mut outer = Fragment::param(Value::Int(1));
        outer.push_sub_query(inner);
        outer.push_param(Value::Int(3));

        let values: Vec<i64> = outer.values().iter().filter_map(|v| v.as_i64()).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(outer.param_count(), 3);
    }

    #[test]
    fn test_is_parenthesized() {
        assert!(Fragment::sql("(\"a\" = 1)").is_parenthesized());
        assert!(!Fragment::sql("(a) AND (b)").is_parenthesized());
        assert!(!Fragment::sql("\"a\" = 1").is_parenthesized());
        assert!(Fragment::sql("(x = ')')").is_parenthesized());
        let mut f = Fragment::sql("(a = ");
        f.push_param(Value::Int(1));
        f.push_sql(")");
        assert!(f.is_parenthesized());
    }

    #[test]
    fn test_call_and_infix() {
        let f = Fragment::infix(
            Fragment::call("LOWER", vec![Fragment::sql("\"Name\"")]),
            "=",
            Fragment::param(Value::from("x")),
        );
        assert_eq!(f.to_string(), "(LOWER(\"Name\") = ?)");
    }
}
