// tfredact-core/tests/plan_filter_tests.rs
use anyhow::Result;
use serde_json::{json, Value};

use tfredact_core::{
    filter_document, DocumentKind, FilterError, FilterPolicy, OmissionKind, PlatformFragment,
};

fn plan_fixture() -> Value {
    json!({
        "format_version": "1.2",
        "terraform_version": "1.7.5",
        "variables": {
            "region": {"value": "eu-west-1"},
            "db_password": {"value": "hunter2"}
        },
        "planned_values": {
            "outputs": {
                "db_endpoint": {"sensitive": false},
                "admin_token": {"sensitive": true}
            },
            "root_module": {
                "resources": [
                    {"address": "aws_db_instance.main", "mode": "managed", "type": "aws_db_instance",
                     "name": "main", "values": {"password": "new-pass", "engine": "postgres"},
                     "sensitive_values": {"password": true}},
                    {"address": "random_password.db", "mode": "managed", "type": "random_password",
                     "name": "db", "values": {"length": 24}, "sensitive_values": {"result": true}}
                ],
                "child_modules": [{
                    "address": "module.app",
                    "resources": [
                        {"address": "module.app.aws_lambda_function.fn", "mode": "managed",
                         "type": "aws_lambda_function", "name": "fn",
                         "values": {"environment": [{"variables": {"STRIPE_SECRET": "sk_live", "LOG_LEVEL": "info"}}]},
                         "sensitive_values": {}}
                    ]
                }]
            }
        },
        "resource_drift": [
            {
                "address": "aws_db_instance.main",
                "mode": "managed",
                "type": "aws_db_instance",
                "name": "main",
                "change": {
                    "actions": ["update"],
                    "before": {"password": "drift-pass", "engine": "postgres"},
                    "after": {"password": "old-pass", "engine": "postgres"},
                    "before_sensitive": {"password": true},
                    "after_sensitive": {"password": true}
                }
            }
        ],
        "output_changes": {
            "db_endpoint": {"actions": ["create"], "before": null, "after": "db.internal",
                            "before_sensitive": false, "after_sensitive": false},
            "db_password": {"actions": ["create"], "before": null, "after": "out-pass",
                            "before_sensitive": false, "after_sensitive": false},
            "admin_token": {"actions": ["create"], "before": null, "after": "sk_live_out",
                            "before_sensitive": false, "after_sensitive": true}
        },
        "resource_changes": [
            {
                "address": "aws_db_instance.main",
                "mode": "managed",
                "type": "aws_db_instance",
                "name": "main",
                "change": {
                    "actions": ["update"],
                    "before": {"password": "old-pass", "engine": "postgres", "master_user_secret": [{"kms_key_id": "k"}]},
                    "after": {"password": "new-pass", "engine": "postgres", "master_user_secret": []},
                    "after_unknown": {"master_user_secret": true},
                    "before_sensitive": {"password": true},
                    "after_sensitive": {"password": true}
                }
            },
            {
                "address": "random_password.db",
                "mode": "managed",
                "type": "random_password",
                "name": "db",
                "change": {"actions": ["create"], "before": null, "after": {"length": 24}}
            }
        ],
        "prior_state": {
            "format_version": "1.0",
            "terraform_version": "1.7.5",
            "values": {
                "root_module": {
                    "resources": [
                        {"address": "aws_db_instance.main", "mode": "managed", "type": "aws_db_instance",
                         "name": "main", "values": {"password": "old-pass", "engine": "postgres"},
                         "sensitive_values": {"password": true}}
                    ]
                }
            }
        }
    })
}

fn filter(policy: &FilterPolicy, doc: &Value) -> Result<(Value, tfredact_core::FilterResult)> {
    let raw = serde_json::to_vec(doc)?;
    let result = filter_document(DocumentKind::Plan, &raw, policy)?;
    let filtered: Value = serde_json::from_slice(&result.filtered_json)?;
    Ok((filtered, result))
}

#[test]
fn random_password_change_is_dropped_without_attribute_records() -> Result<()> {
    let doc = json!({"resource_changes": [{
        "address": "random_password.db", "mode": "managed", "type": "random_password", "name": "db",
        "change": {"actions": ["create"], "before": null, "after": {"result": "hunter2", "special": true}}
    }]});
    let (filtered, result) = filter(&FilterPolicy::default(), &doc)?;

    assert_eq!(filtered["resource_changes"], json!([]));
    assert_eq!(result.summary.omitted_resources, 1);
    assert_eq!(result.summary.omitted_attributes, 0);
    assert!(result.omissions.iter().all(|o| o.kind == OmissionKind::Resource));
    Ok(())
}

#[test]
fn no_secret_survives_anywhere_in_the_plan() -> Result<()> {
    let (_, result) = filter(&FilterPolicy::default(), &plan_fixture())?;
    let serialized = String::from_utf8(result.filtered_json.clone())?;
    for secret in ["hunter2", "old-pass", "new-pass", "drift-pass", "out-pass", "sk_live"] {
        assert!(!serialized.contains(secret), "{} leaked", secret);
    }
    Ok(())
}

#[test]
fn every_plan_section_reports_its_paths() -> Result<()> {
    let (filtered, result) = filter(&FilterPolicy::default(), &plan_fixture())?;
    let paths: Vec<&str> = result.omissions.iter().map(|o| o.path.as_str()).collect();

    for expected in [
        "aws_db_instance.main.before.password",
        "aws_db_instance.main.before.master_user_secret",
        "aws_db_instance.main.after.password",
        "random_password.db",
        "module.app.aws_lambda_function.fn.environment[0].variables.STRIPE_SECRET",
        "planned_values.outputs.admin_token",
        "output_changes.db_password",
        "output_changes.admin_token",
        "variables.db_password",
    ] {
        assert!(paths.contains(&expected), "missing {}", expected);
    }

    assert_eq!(filtered["variables"], json!({"region": {"value": "eu-west-1"}}));
    assert_eq!(
        filtered["output_changes"].as_object().map(|o| o.keys().cloned().collect::<Vec<_>>()),
        Some(vec!["db_endpoint".to_string()])
    );
    assert_eq!(
        filtered["resource_drift"][0]["change"]["before"],
        json!({"engine": "postgres"})
    );
    assert_eq!(
        filtered["planned_values"]["outputs"],
        json!({"db_endpoint": {"sensitive": false}})
    );
    assert_eq!(
        filtered["resource_changes"][0]["change"]["after_unknown"],
        json!({"master_user_secret": true})
    );
    Ok(())
}

#[test]
fn prior_state_decisions_are_merged() -> Result<()> {
    let (filtered, result) = filter(&FilterPolicy::default(), &plan_fixture())?;

    // two changes, one drift entry, three planned values and one prior-state resource
    assert_eq!(result.summary.total_resources, 7);
    assert!(result.summary.omitted_resources <= result.summary.total_resources);
    assert_eq!(
        filtered["prior_state"]["values"]["root_module"]["resources"][0]["values"],
        json!({"engine": "postgres"})
    );
    assert_eq!(
        result
            .omissions
            .iter()
            .filter(|o| o.path == "aws_db_instance.main.password")
            .count(),
        2,
        "planned value and prior state each record their own omission"
    );
    Ok(())
}

#[test]
fn refiltering_plan_is_idempotent() -> Result<()> {
    let policy = FilterPolicy::default();
    let (_, first) = filter(&policy, &plan_fixture())?;
    let second = filter_document(DocumentKind::Plan, &first.filtered_json, &policy)?;
    assert!(second.omissions.is_empty());
    Ok(())
}

#[test]
fn type_in_both_lists_is_attributed_to_platform() -> Result<()> {
    let mut policy = FilterPolicy::default();
    policy.apply_platform(&PlatformFragment {
        additional_omit_types: vec!["random_password".into()],
        ..PlatformFragment::default()
    });
    let (_, result) = filter(&policy, &plan_fixture())?;
    let rp: Vec<_> = result
        .omissions
        .iter()
        .filter(|o| o.path == "random_password.db")
        .collect();
    assert!(!rp.is_empty());
    assert!(rp.iter().all(|o| o.from_platform));
    Ok(())
}

#[test]
fn state_file_passed_as_plan_is_rejected() {
    let err = filter_document(
        DocumentKind::Plan,
        br#"{"version": 4, "resources": []}"#,
        &FilterPolicy::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FilterError::InvalidDocument { document: "plan", .. }));
}
