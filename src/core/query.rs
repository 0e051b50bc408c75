//! jq programs, backed by jaq.
//!
//! jaq values are reference counted and cannot cross threads, so a [`Query`]
//! only carries the validated program text. Each thread that evaluates it
//! compiles its own [`CompiledQuery`].

use crate::utils::error::{BootstrapError, Result};
use chrono::{DateTime, Utc};
use jaq_interpret::{Ctx, Filter, FilterT, ParseCtx, RcIter, Val};
use serde_json::Value;
use std::sync::Arc;

/// A validated jq program that can be shared between worker threads.
#[derive(Debug, Clone)]
pub struct Query {
    source: Arc<str>,
}

impl Query {
    pub fn parse(source: &str) -> Result<Self> {
        CompiledQuery::new(source)?;
        Ok(Self {
            source: Arc::from(source),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn compile(&self) -> Result<CompiledQuery> {
        CompiledQuery::new(&self.source)
    }
}

pub struct CompiledQuery {
    filter: Filter,
}

impl CompiledQuery {
    pub fn new(source: &str) -> Result<Self> {
        let mut defs = ParseCtx::new(Vec::new());
        defs.insert_natives(jaq_core::core());
        defs.insert_defs(jaq_std::std());

        let (main, errs) = jaq_parse::parse(source, jaq_parse::main());
        if !errs.is_empty() {
            let message = errs
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BootstrapError::QueryParseError { message });
        }
        let main = main.ok_or_else(|| BootstrapError::QueryParseError {
            message: format!("no program in {:?}", source),
        })?;

        let filter = defs.compile(main);
        if !defs.errs.is_empty() {
            return Err(BootstrapError::QueryParseError {
                message: format!(
                    "{} undefined reference(s) in {:?}",
                    defs.errs.len(),
                    source
                ),
            });
        }

        Ok(Self { filter })
    }

    /// Runs the program and collects every output in yield order.
    ///
    /// The first evaluation error aborts the run. The deadline is checked
    /// before each output is pulled.
    pub fn evaluate(&self, input: Value, deadline: Option<DateTime<Utc>>) -> Result<Vec<Value>> {
        let inputs = RcIter::new(std::iter::empty());
        let mut out = self.filter.run((Ctx::new([], &inputs), Val::from(input)));

        let mut values = Vec::new();
        loop {
            check_deadline(deadline)?;
            match out.next() {
                Some(Ok(val)) => values.push(Value::from(val)),
                Some(Err(e)) => {
                    return Err(BootstrapError::QueryRunError {
                        message: e.to_string(),
                    })
                }
                None => break,
            }
        }
        Ok(values)
    }
}

pub fn check_deadline(deadline: Option<DateTime<Utc>>) -> Result<()> {
    match deadline {
        Some(deadline) if Utc::now() >= deadline => Err(BootstrapError::DeadlineExceeded),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_count_up() {
        let query = CompiledQuery::new(".count += 1").unwrap();
        let output = query.evaluate(json!({"count": 1}), None).unwrap();
        assert_eq!(output, vec![json!({"count": 2})]);
    }

    #[test]
    fn test_outputs_in_yield_order() {
        let query = CompiledQuery::new(".[] | .name").unwrap();
        let output = query
            .evaluate(json!([{"name": "a"}, {"name": "b"}, {"name": "c"}]), None)
            .unwrap();
        assert_eq!(output, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn test_empty_output() {
        let query = CompiledQuery::new("select(.keep)").unwrap();
        let output = query.evaluate(json!({"keep": false}), None).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_std_and_fromjson() {
        let query = CompiledQuery::new(".message | fromjson | map(. * 2)").unwrap();
        let output = query.evaluate(json!({"message": "[1,2]"}), None).unwrap();
        assert_eq!(output, vec![json!([2, 4])]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Query::parse(".["),
            Err(BootstrapError::QueryParseError { .. })
        ));
        assert!(matches!(
            Query::parse("no_such_function_here"),
            Err(BootstrapError::QueryParseError { .. })
        ));
    }

    #[test]
    fn test_parse_error_message_is_readable() {
        let err = Query::parse(".[").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("query parse failed: "));
        assert!(!message.contains("Simple {"));
    }

    /// jaq does not create objects when updating paths on `null`
    #[test]
    fn test_path_update_on_null_is_an_error() {
        let query = CompiledQuery::new(".count += 1").unwrap();
        assert!(matches!(
            query.evaluate(Value::Null, None),
            Err(BootstrapError::QueryRunError { .. })
        ));
        assert_eq!(
            query.evaluate(json!({}), None).unwrap(),
            vec![json!({"count": 1})]
        );
    }

    #[test]
    fn test_run_error() {
        let query = CompiledQuery::new(".[]").unwrap();
        let result = query.evaluate(json!(1), None);
        assert!(matches!(result, Err(BootstrapError::QueryRunError { .. })));
    }

    #[test]
    fn test_deadline() {
        let query = CompiledQuery::new(".").unwrap();

        let past = Utc::now() - Duration::seconds(1);
        let result = query.evaluate(json!({}), Some(past));
        assert!(matches!(result, Err(BootstrapError::DeadlineExceeded)));

        let future = Utc::now() + Duration::seconds(60);
        assert_eq!(query.evaluate(json!({}), Some(future)).unwrap(), vec![json!({})]);
    }

    #[test]
    fn test_query_keeps_source() {
        let query = Query::parse(".a").unwrap();
        assert_eq!(query.source(), ".a");
        let compiled = query.compile().unwrap();
        assert_eq!(compiled.evaluate(json!({"a": 3}), None).unwrap(), vec![json!(3)]);
    }
}
