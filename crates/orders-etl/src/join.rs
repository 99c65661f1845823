//! Cardinality-validated left join.
//!
//! The right table is indexed by key up front. A duplicated key on a side the
//! validation requires to be unique fails the join before any output is built,
//! so a many-to-many join can never silently multiply rows.

use crate::error::{EtlError, Result};
use crate::utils::{has_column, key_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

const KEY_SEPARATOR: &str = "\u{1f}";

/// Which sides of the join must have unique keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinValidation {
    /// Both sides unique.
    OneToOne,
    /// Right side unique.
    ManyToOne,
}

impl JoinValidation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::ManyToOne => "many_to_one",
        }
    }

    fn checks_left(&self) -> bool {
        matches!(self, Self::OneToOne)
    }
}

impl fmt::Display for JoinValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Left-join `right` onto `left` by the `on` columns.
///
/// Left row order is preserved and rows without a match get nulls. A null in
/// any key column never matches. Non-key right columns whose names collide
/// with a left column are renamed with `suffix`; left names are kept.
///
/// # Errors
///
/// - `MissingColumns` if a key column is absent on either side
/// - `JoinCardinality` if a side that `validation` requires unique has
///   duplicated keys
pub fn safe_left_join(
    left: &DataFrame,
    right: &DataFrame,
    on: &[&str],
    validation: JoinValidation,
    suffix: &str,
) -> Result<DataFrame> {
    for (table, df) in [("left", left), ("right", right)] {
        let missing: Vec<String> = on
            .iter()
            .filter(|c| !has_column(df, c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::MissingColumns {
                table: table.to_string(),
                columns: missing,
            });
        }
    }

    let key_label = on.join(",");
    let right_keys = build_keys(right, on)?;
    let lookup = build_right_lookup(&right_keys);

    let right_duplicates = count_duplicated(&right_keys);
    if right_duplicates > 0 {
        return Err(EtlError::JoinCardinality {
            key: key_label,
            validation: validation.to_string(),
            side: "right".to_string(),
            duplicates: right_duplicates,
        });
    }

    let left_keys = build_keys(left, on)?;
    if validation.checks_left() {
        let left_duplicates = count_duplicated(&left_keys);
        if left_duplicates > 0 {
            return Err(EtlError::JoinCardinality {
                key: key_label,
                validation: validation.to_string(),
                side: "left".to_string(),
                duplicates: left_duplicates,
            });
        }
    }

    let indices = IdxCa::from_iter_options(
        "right_idx".into(),
        left_keys
            .iter()
            .map(|key| key.as_ref().and_then(|k| lookup.get(k).copied())),
    );
    let matched = indices.len() - indices.null_count();

    let right_rest = right.drop_many(on.iter().map(|c| PlSmallStr::from(*c)));
    let mut taken = right_rest.take(&indices)?;

    let left_names: HashSet<String> = left
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let right_names: Vec<String> = taken
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for name in right_names {
        if left_names.contains(&name) {
            let renamed = format!("{}{}", name, suffix);
            if left_names.contains(&renamed) {
                return Err(EtlError::InvalidArgument(format!(
                    "suffixed column '{}' already exists in the left table",
                    renamed
                )));
            }
            taken.rename(&name, renamed.into())?;
        }
    }

    let joined = left.hstack(taken.get_columns())?;
    debug!(
        "Left join on '{}' ({}): {} of {} rows matched",
        key_label,
        validation,
        matched,
        left.height()
    );
    Ok(joined)
}

/// Composite text key per row; `None` if any key part is null.
fn build_keys(df: &DataFrame, on: &[&str]) -> Result<Vec<Option<String>>> {
    let columns = on
        .iter()
        .map(|c| key_values(df, c))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|col| col[row].as_deref())
                .collect::<Option<Vec<&str>>>()
                .map(|parts| parts.join(KEY_SEPARATOR))
        })
        .collect())
}

fn build_right_lookup(keys: &[Option<String>]) -> HashMap<String, IdxSize> {
    let mut map = HashMap::with_capacity(keys.len());
    for (row, key) in keys.iter().enumerate() {
        if let Some(key) = key {
            map.entry(key.clone()).or_insert(row as IdxSize);
        }
    }
    map
}

/// Number of distinct non-null keys that occur more than once.
fn count_duplicated(keys: &[Option<String>]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys.iter().flatten() {
        *counts.entry(key.as_str()).or_insert(0) += 1;
    }
    counts.values().filter(|&&n| n > 1).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> DataFrame {
        df! {
            "order_id" => ["A1", "A2", "A3", "A4"],
            "user_id" => [Some("u2"), Some("u1"), Some("u9"), None],
            "country" => ["xx", "xx", "xx", "xx"],
        }
        .unwrap()
    }

    fn users() -> DataFrame {
        df! {
            "user_id" => ["u1", "u2", "u3"],
            "country" => ["US", "DE", "FR"],
            "signup_date" => ["2023-01-01", "2023-02-01", "2023-03-01"],
        }
        .unwrap()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_left_join_preserves_rows_and_order() {
        let left = orders();
        let joined =
            safe_left_join(&left, &users(), &["user_id"], JoinValidation::ManyToOne, "_user")
                .unwrap();

        assert_eq!(joined.height(), left.height());
        assert_eq!(strings(&joined, "order_id"), strings(&left, "order_id"));
        assert_eq!(
            strings(&joined, "country_user"),
            vec![Some("DE".to_string()), Some("US".to_string()), None, None]
        );
        assert_eq!(strings(&joined, "country"), strings(&left, "country"));
        assert!(joined.column("signup_date").is_ok());
    }

    #[test]
    fn test_left_join_no_collision_keeps_names() {
        let left = orders().drop("country").unwrap();
        let joined =
            safe_left_join(&left, &users(), &["user_id"], JoinValidation::ManyToOne, "_user")
                .unwrap();

        assert_eq!(
            strings(&joined, "country"),
            vec![Some("DE".to_string()), Some("US".to_string()), None, None]
        );
        assert!(joined.column("country_user").is_err());
    }

    #[test]
    fn test_duplicate_right_key_fails() {
        let mut right = users();
        right
            .vstack_mut(
                &df! {
                    "user_id" => ["u1"],
                    "country" => ["CA"],
                    "signup_date" => ["2023-04-01"],
                }
                .unwrap(),
            )
            .unwrap();

        let err = safe_left_join(&orders(), &right, &["user_id"], JoinValidation::ManyToOne, "_r")
            .unwrap_err();
        match err {
            EtlError::JoinCardinality {
                side,
                duplicates,
                validation,
                ..
            } => {
                assert_eq!(side, "right");
                assert_eq!(duplicates, 1);
                assert_eq!(validation, "many_to_one");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_one_to_one_checks_left() {
        let left = df! { "user_id" => ["u1", "u1"] }.unwrap();
        let err = safe_left_join(&left, &users(), &["user_id"], JoinValidation::OneToOne, "_r")
            .unwrap_err();
        assert!(matches!(err, EtlError::JoinCardinality { ref side, .. } if side == "left"));

        assert!(
            safe_left_join(&left, &users(), &["user_id"], JoinValidation::ManyToOne, "_r").is_ok()
        );
    }

    #[test]
    fn test_null_right_keys_never_match() {
        let right = df! {
            "user_id" => [None, Some("u1")],
            "tier" => ["ghost", "gold"],
        }
        .unwrap();
        let joined =
            safe_left_join(&orders(), &right, &["user_id"], JoinValidation::ManyToOne, "_r")
                .unwrap();
        assert_eq!(
            strings(&joined, "tier"),
            vec![None, Some("gold".to_string()), None, None]
        );
    }

    #[test]
    fn test_missing_key_column() {
        let right = df! { "id" => ["u1"] }.unwrap();
        let err = safe_left_join(&orders(), &right, &["user_id"], JoinValidation::ManyToOne, "_r")
            .unwrap_err();
        assert!(matches!(err, EtlError::MissingColumns { ref table, .. } if table == "right"));
    }

    #[test]
    fn test_composite_key() {
        let left = df! {
            "a" => ["x", "x", "y"],
            "b" => [1i64, 2, 1],
        }
        .unwrap();
        let right = df! {
            "a" => ["x", "y"],
            "b" => [2i64, 1],
            "v" => [20i64, 10],
        }
        .unwrap();

        let joined =
            safe_left_join(&left, &right, &["a", "b"], JoinValidation::ManyToOne, "_r").unwrap();
        let v: Vec<Option<i64>> = joined
            .column("v")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(v, vec![None, Some(20), Some(10)]);
    }
}
