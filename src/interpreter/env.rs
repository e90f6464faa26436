use std::collections::HashMap;
use std::sync::Arc;

use super::{EvalError, Expression, Result};
use crate::bridge::BridgeResult;

/// Native function bound to a symbol. Receives already-evaluated arguments.
pub type Builtin = Arc<dyn Fn(&[Expression]) -> BridgeResult<Expression> + Send + Sync>;

/// Evaluation environment: builtin table plus top-level bindings.
///
/// Only builtin application and quoting are evaluated here; everything else
/// self-evaluates. Builtins are installed once during setup and are visible to
/// every subsequent evaluation.
#[derive(Clone, Default)]
pub struct Env {
    builtins: HashMap<String, Builtin>,
    bindings: HashMap<String, Expression>,
}

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a native function. Re-registering a name replaces the
    /// previous binding.
    pub fn add_builtin<F>(&mut self, name: impl Into<String>, builtin: F)
    where
        F: Fn(&[Expression]) -> BridgeResult<Expression> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.builtins.insert(name.clone(), Arc::new(builtin)).is_some() {
            tracing::debug!(builtin = %name, "replaced existing builtin");
        }
    }

    /// Check whether a builtin is bound under `name`.
    pub fn has_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Names of all installed builtins, sorted.
    pub fn builtin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builtins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Bind a symbol to a value for subsequent evaluations.
    pub fn define(&mut self, name: impl Into<String>, value: Expression) {
        self.bindings.insert(name.into(), value);
    }

    /// Look up a symbol binding.
    pub fn lookup(&self, name: &str) -> Option<&Expression> {
        self.bindings.get(name)
    }

    /// Evaluate one expression.
    pub fn eval(&self, expr: &Expression) -> Result<Expression> {
        match expr {
            Expression::Atom(_) => match expr.as_symbol() {
                Some(sym) => self
                    .lookup(sym)
                    .cloned()
                    .ok_or_else(|| EvalError::UnboundSymbol(sym.to_string())),
                None => Ok(expr.clone()),
            },
            Expression::List(items) => {
                let Some((head, rest)) = items.split_first() else {
                    return Ok(Expression::nil());
                };
                let name = head
                    .as_symbol()
                    .ok_or_else(|| EvalError::NotCallable(head.to_string()))?;
                if name == "quote" {
                    return match rest {
                        [quoted] => Ok(quoted.clone()),
                        _ => Err(EvalError::Malformed(format!(
                            "quote expects 1 argument, found {}",
                            rest.len()
                        ))),
                    };
                }
                let builtin = self
                    .builtins
                    .get(name)
                    .ok_or_else(|| EvalError::NotCallable(name.to_string()))?;
                let args = rest
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                builtin(&args).map_err(|source| EvalError::Builtin {
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Parse and evaluate every form in `source`, returning the last value.
    pub fn eval_source(&self, source: &str) -> Result<Expression> {
        let mut last = Expression::nil();
        for form in super::parse_script(source)? {
            last = self.eval(&form)?;
        }
        Ok(last)
    }
}
