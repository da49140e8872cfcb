//! CEL expression compilation and evaluation.

use crate::element::Tags;
use crate::mapping::ColumnValue;
use anyhow::Result;
use cel::{Context, Program, Value};
use std::sync::Arc;

/// A compiled CEL program ready for evaluation.
#[derive(Clone)]
pub struct CelProgram {
    program: Arc<Program>,
    source: String,
}

impl std::fmt::Debug for CelProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CelProgram")
            .field("source", &self.source)
            .finish()
    }
}

impl CelProgram {
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Variables visible to an expression column.
pub struct CelContext<'a> {
    pub tags: &'a Tags,
    pub match_key: &'a str,
    pub match_value: &'a str,
}

pub fn compile_cel(source: &str) -> Result<CelProgram> {
    let program =
        Program::compile(source).map_err(|e| anyhow::anyhow!("CEL compile error: {}", e))?;

    Ok(CelProgram {
        program: Arc::new(program),
        source: source.to_string(),
    })
}

pub fn evaluate_cel(program: &CelProgram, ctx: &CelContext) -> Result<Value> {
    let mut cel_ctx = Context::default();

    cel_ctx
        .add_variable("tags", ctx.tags.clone())
        .map_err(|e| anyhow::anyhow!("CEL context error: {}", e))?;
    cel_ctx
        .add_variable("match_key", ctx.match_key.to_string())
        .map_err(|e| anyhow::anyhow!("CEL context error: {}", e))?;
    cel_ctx
        .add_variable("match_value", ctx.match_value.to_string())
        .map_err(|e| anyhow::anyhow!("CEL context error: {}", e))?;

    program
        .program
        .execute(&cel_ctx)
        .map_err(|e| anyhow::anyhow!("CEL execution error: {}", e))
}

/// Convert a CEL result into a column value. `null` maps to an absent value.
pub fn cel_value_to_column(value: &Value) -> Option<ColumnValue> {
    match value {
        Value::String(s) => Some(ColumnValue::String(s.to_string())),
        Value::Int(i) => Some(ColumnValue::Integer(*i)),
        Value::UInt(u) => Some(match i64::try_from(*u) {
            Ok(i) => ColumnValue::Integer(i),
            Err(_) => ColumnValue::Float(*u as f64),
        }),
        Value::Float(f) => Some(ColumnValue::Float(*f)),
        Value::Bool(b) => Some(ColumnValue::Bool(*b)),
        Value::Null => None,
        _ => Some(ColumnValue::String(format!("{:?}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::tags_from;

    fn eval(source: &str, tags: &Tags) -> Option<ColumnValue> {
        let program = compile_cel(source).unwrap();
        let ctx = CelContext {
            tags,
            match_key: "highway",
            match_value: "primary",
        };
        cel_value_to_column(&evaluate_cel(&program, &ctx).unwrap())
    }

    #[test]
    fn reads_tags() {
        let tags = tags_from([("name", "Main Street")]);
        assert_eq!(
            eval("tags.name", &tags),
            Some(ColumnValue::String("Main Street".into()))
        );
    }

    #[test]
    fn sees_the_triggering_tag() {
        let tags = Tags::new();
        assert_eq!(
            eval("match_key + '=' + match_value", &tags),
            Some(ColumnValue::String("highway=primary".into()))
        );
    }

    #[test]
    fn conditional_with_has() {
        let tags = tags_from([("ref", "A7")]);
        assert_eq!(
            eval("has(tags.name) ? tags.name : tags.ref", &tags),
            Some(ColumnValue::String("A7".into()))
        );
    }

    #[test]
    fn bad_source_fails_to_compile() {
        assert!(compile_cel("tags.name ==").is_err());
    }
}
