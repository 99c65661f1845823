//! Property tests for the cleaning, outlier and join primitives.

use orders_etl::cleaner::{apply_mapping, enforce_schema, normalize_text, normalize_value};
use orders_etl::join::{JoinValidation, safe_left_join};
use orders_etl::stats::{add_outlier_flag, iqr_bounds};
use orders_etl::{EtlError, default_status_mapping};
use polars::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn strings(series: &Series) -> Vec<Option<String>> {
    series
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

proptest! {
    #[test]
    fn normalize_value_is_idempotent(raw in "[A-Za-z \t]{0,16}") {
        let once = normalize_value(&raw);
        prop_assert_eq!(normalize_value(&once), once);
    }

    #[test]
    fn normalize_text_keeps_nulls_and_length(
        values in prop::collection::vec(prop::option::of("[A-Za-z ]{0,8}"), 0..20)
    ) {
        let series = Series::new("status".into(), values.clone());
        let normalized = normalize_text(&series).unwrap();
        prop_assert_eq!(normalized.len(), values.len());
        for (raw, out) in values.iter().zip(strings(&normalized)) {
            prop_assert_eq!(raw.is_none(), out.is_none());
        }
        let twice = normalize_text(&normalized).unwrap();
        prop_assert_eq!(strings(&twice), strings(&normalized));
    }

    #[test]
    fn apply_mapping_passes_unknown_values_through(value in "[a-z]{1,10}") {
        let mapping = default_status_mapping();
        let series = Series::new("status".into(), &[value.as_str()]);
        let mapped = apply_mapping(&series, &mapping).unwrap();
        let expected = mapping.get(&value).cloned().unwrap_or_else(|| value.clone());
        prop_assert_eq!(strings(&mapped), vec![Some(expected)]);
    }

    #[test]
    fn enforce_schema_preserves_rows(
        amounts in prop::collection::vec(prop::option::of("(-?[0-9]{1,4}(\\.[0-9]{1,2})?|abc|NaN)"), 1..20)
    ) {
        let n = amounts.len();
        let ids: Vec<String> = (0..n).map(|i| format!("A{i}")).collect();
        let df = df! {
            "order_id" => ids.clone(),
            "user_id" => ids,
            "amount" => amounts,
            "quantity" => vec![Some("1"); n],
        }
        .unwrap();

        let (out, report) = enforce_schema(&df).unwrap();
        prop_assert_eq!(out.height(), n);
        prop_assert_eq!(report.get("amount").unwrap().total(), n);
        let amount = out.column("amount").unwrap().f64().unwrap();
        for v in amount.into_iter().flatten() {
            prop_assert!(v.is_finite());
        }
    }

    #[test]
    fn iqr_fence_is_ordered_and_flags_exactly_outside(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..50),
        k in 0.0f64..5.0,
    ) {
        let series = Series::new("amount".into(), values.clone());
        let (low, high) = iqr_bounds(&series, k).unwrap();
        prop_assert!(low <= high);

        let df = DataFrame::new(vec![series.into_column()]).unwrap();
        let flagged = add_outlier_flag(&df, "amount", k).unwrap();
        let flags: Vec<Option<bool>> = flagged
            .column("amount__is_outlier")
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        for (v, flag) in values.iter().zip(flags) {
            prop_assert_eq!(flag, Some(*v < low || *v > high));
        }
    }

    #[test]
    fn many_to_one_join_preserves_left_rows(
        left_keys in prop::collection::vec(prop::option::of(0u8..10), 0..30),
        right_size in 1usize..10,
    ) {
        let left_keys: Vec<Option<String>> = left_keys
            .into_iter()
            .map(|k| k.map(|k| format!("u{k}")))
            .collect();
        let left = df! {
            "order_id" => (0..left_keys.len()).map(|i| format!("A{i}")).collect::<Vec<_>>(),
            "user_id" => left_keys.clone(),
        }
        .unwrap();
        let right = df! {
            "user_id" => (0..right_size).map(|k| format!("u{k}")).collect::<Vec<_>>(),
            "country" => (0..right_size).map(|k| format!("C{k}")).collect::<Vec<_>>(),
        }
        .unwrap();

        let joined = safe_left_join(&left, &right, &["user_id"], JoinValidation::ManyToOne, "_user").unwrap();
        prop_assert_eq!(joined.height(), left.height());
        prop_assert_eq!(strings(joined.column("user_id").unwrap().as_materialized_series()), left_keys);
    }

    #[test]
    fn duplicated_right_key_is_rejected(dup in 0usize..5) {
        let left = df! { "user_id" => ["u0", "u1"] }.unwrap();
        let mut keys: Vec<String> = (0..5).map(|k| format!("u{k}")).collect();
        keys.push(format!("u{dup}"));
        let right = df! {
            "user_id" => keys,
            "country" => vec!["X"; 6],
        }
        .unwrap();

        let err = safe_left_join(&left, &right, &["user_id"], JoinValidation::ManyToOne, "_user").unwrap_err();
        let is_cardinality = matches!(err.root(), EtlError::JoinCardinality { .. });
        prop_assert!(is_cardinality);
    }
}

#[test]
fn mapping_with_custom_labels() {
    let mapping: BTreeMap<String, String> = [("ok".to_string(), "paid".to_string())].into_iter().collect();
    let series = Series::new("status".into(), &[Some("ok"), None, Some("odd")]);
    let mapped = apply_mapping(&series, &mapping).unwrap();
    assert_eq!(
        strings(&mapped),
        vec![Some("paid".to_string()), None, Some("odd".to_string())]
    );
}
