//! Aggregate computation.
//!
//! Pure functions over a row set. Nulls are skipped by every aggregate except
//! `star_count`, and a single-column aggregate over no non-null values is
//! null rather than zero.

use quarry_core::{Row, Value};
use quarry_request::{Aggregate, AggregateFunction};
use std::collections::{BTreeMap, HashSet};

use crate::loader::KeyPart;
use crate::{QueryError, QueryResult};

/// Compute every named aggregate over the same rows.
pub fn evaluate_all<'r, I>(
    aggregates: &BTreeMap<String, Aggregate>,
    rows: I,
) -> QueryResult<BTreeMap<String, Value>>
where
    I: IntoIterator<Item = &'r Row> + Clone,
{
    aggregates
        .iter()
        .map(|(name, aggregate)| Ok((name.clone(), evaluate(aggregate, rows.clone())?)))
        .collect()
}

/// Compute one aggregate over rows.
pub fn evaluate<'r, I>(aggregate: &Aggregate, rows: I) -> QueryResult<Value>
where
    I: IntoIterator<Item = &'r Row>,
{
    match aggregate {
        Aggregate::StarCount => Ok(Value::Int(rows.into_iter().count() as i64)),
        Aggregate::ColumnCount { column, distinct } => {
            let values = non_null(column, rows);
            if *distinct {
                let seen: HashSet<KeyPart> = values
                    .iter()
                    .copied()
                    .filter_map(KeyPart::from_value)
                    .collect();
                Ok(Value::Int(seen.len() as i64))
            } else {
                Ok(Value::Int(values.len() as i64))
            }
        }
        Aggregate::SingleColumn {
            column, function, ..
        } => single_column(function, non_null(column, rows)),
    }
}

fn non_null<'r>(column: &str, rows: impl IntoIterator<Item = &'r Row>) -> Vec<&'r Value> {
    rows.into_iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null())
        .collect()
}

fn single_column(function: &AggregateFunction, values: Vec<&Value>) -> QueryResult<Value> {
    if let AggregateFunction::Other(name) = function {
        return Err(QueryError::UnknownAggregateFunction {
            function: name.clone(),
        });
    }
    if values.is_empty() {
        return Ok(Value::Null);
    }

    match function {
        AggregateFunction::Max => extreme(function, &values, std::cmp::Ordering::Greater),
        AggregateFunction::Min => extreme(function, &values, std::cmp::Ordering::Less),
        AggregateFunction::Longest => by_length(function, &values, |a, b| a > b),
        AggregateFunction::Shortest => by_length(function, &values, |a, b| a < b),
        _ => {
            let numbers: Vec<f64> = values
                .iter()
                .map(|v| v.as_f64())
                .collect::<Option<_>>()
                .ok_or_else(|| QueryError::non_numeric(function))?;
            numeric(function, &values, &numbers)
        }
    }
}

/// Max or min. Values must be all numbers or all strings.
fn extreme(
    function: &AggregateFunction,
    values: &[&Value],
    target: std::cmp::Ordering,
) -> QueryResult<Value> {
    let all_numbers = values.iter().all(|v| v.is_number());
    let all_strings = values.iter().all(|v| v.is_string());
    if !all_numbers && !all_strings {
        return Err(QueryError::non_comparable(function));
    }

    let mut best = values[0];
    for value in &values[1..] {
        if value.cmp_sortable(best) == target {
            best = value;
        }
    }
    Ok(best.clone())
}

/// Longest or shortest string; the last one wins ties.
fn by_length(
    function: &AggregateFunction,
    values: &[&Value],
    better: impl Fn(usize, usize) -> bool,
) -> QueryResult<Value> {
    let strings: Vec<&str> = values
        .iter()
        .map(|v| v.as_str())
        .collect::<Option<_>>()
        .ok_or_else(|| QueryError::non_comparable(function))?;

    let mut best = strings[0];
    for s in &strings[1..] {
        if !better(best.chars().count(), s.chars().count()) {
            best = s;
        }
    }
    Ok(Value::from(best))
}

fn numeric(function: &AggregateFunction, values: &[&Value], numbers: &[f64]) -> QueryResult<Value> {
    let n = numbers.len() as f64;
    let sum: f64 = numbers.iter().sum();

    let result = match function {
        AggregateFunction::Sum => {
            // Integer columns keep integer sums.
            let ints: Option<Vec<i64>> = values.iter().map(|v| v.as_int()).collect();
            return Ok(match ints.and_then(|ints| ints.iter().try_fold(0i64, |acc, i| acc.checked_add(*i))) {
                Some(total) => Value::Int(total),
                None => Value::Float(sum),
            });
        }
        AggregateFunction::Avg => Some(sum / n),
        AggregateFunction::VarPop => variance(numbers, 0.0),
        AggregateFunction::VarSamp | AggregateFunction::Variance => variance(numbers, 1.0),
        AggregateFunction::StddevPop => variance(numbers, 0.0).map(f64::sqrt),
        AggregateFunction::StddevSamp | AggregateFunction::Stddev => {
            variance(numbers, 1.0).map(f64::sqrt)
        }
        other => {
            return Err(QueryError::UnknownAggregateFunction {
                function: other.to_string(),
            })
        }
    };

    Ok(result.map(Value::Float).unwrap_or(Value::Null))
}

/// Variance with the given degrees-of-freedom correction. None when there are
/// not enough values for the correction.
fn variance(numbers: &[f64], correction: f64) -> Option<f64> {
    let n = numbers.len() as f64;
    if n - correction <= 0.0 {
        return None;
    }
    let mean = numbers.iter().sum::<f64>() / n;
    let squares: f64 = numbers.iter().map(|x| (x - mean).powi(2)).sum();
    Some(squares / (n - correction))
}
