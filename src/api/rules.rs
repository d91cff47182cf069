//! Quality rule definitions.
//!
//! Rules are never executed; `test` returns a canned run and the statistics
//! only move when a client overwrites them.

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{ActionBody, ActionResponse, ApiError, AppState};
use crate::models::{AnomalyType, Rule, RuleConfig, RuleStatistics, RuleStatus};

/// Keys of a rule payload that are not configuration parameters.
const RULE_KEYS: [&str; 7] = ["id", "name", "type", "description", "status", "config", "statistics"];

#[derive(Debug, Default, Serialize)]
pub struct RuleSummary {
    pub total: usize,
    pub active: usize,
    pub paused: usize,
    pub draft: usize,
}

#[derive(Debug, Serialize)]
pub struct RuleListResponse {
    pub data: Vec<Rule>,
    pub total: usize,
    pub summary: RuleSummary,
}

/// GET /api/rules
pub async fn list_rules(State(state): State<AppState>) -> Json<RuleListResponse> {
    let rules = state.store.rules.read();
    let count = |status: RuleStatus| rules.iter().filter(|r| r.status == status).count();

    Json(RuleListResponse {
        data: rules.clone(),
        total: rules.len(),
        summary: RuleSummary {
            total: rules.len(),
            active: count(RuleStatus::Active),
            paused: count(RuleStatus::Paused),
            draft: count(RuleStatus::Draft),
        },
    })
}

// ===== Actions =====

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuleAction {
    Create { data: RuleDraft },
    Update { data: RulePatch },
    Toggle { data: RuleRef },
    Test { data: RuleRef },
}

/// A new rule. Form fields sent next to `name`/`type` (e.g.
/// `maxChangePercent`) are folded into `config`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AnomalyType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: Option<RuleConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePatch {
    pub id: i64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<AnomalyType>,
    pub description: Option<String>,
    pub status: Option<RuleStatus>,
    pub config: Option<RuleConfig>,
    /// Replaces the counters wholesale.
    pub statistics: Option<RuleStatistics>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct RuleRef {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct ToggleAck {
    pub id: i64,
    pub status: RuleStatus,
}

#[derive(Debug, Serialize)]
pub struct SampleException {
    #[serde(rename = "stockCode")]
    pub stock_code: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub execution_time: &'static str,
    pub records_processed: u64,
    pub exceptions_found: u64,
    pub sample_exceptions: Vec<SampleException>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAck {
    pub id: i64,
    pub test_result: TestResult,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RuleActionData {
    Rule(Rule),
    Toggle(ToggleAck),
    Test(TestAck),
}

/// Merge `base`, then an explicit config, then loose form fields.
fn fold_config(base: Option<RuleConfig>, extra: Map<String, Value>) -> Option<RuleConfig> {
    let loose: Map<String, Value> = extra
        .into_iter()
        .filter(|(k, _)| !RULE_KEYS.contains(&k.as_str()))
        .collect();

    match (base, loose.is_empty()) {
        (base, true) => base,
        (base, false) => {
            let mut merged = base.map(RuleConfig::into_map).unwrap_or_default();
            merged.extend(loose);
            Some(RuleConfig::from_map(merged))
        }
    }
}

/// Timestamp id, bumped past every existing id so same-millisecond creates
/// stay unique.
fn next_rule_id(rules: &[Rule], now: DateTime<Utc>) -> i64 {
    let max_id = rules.iter().map(|r| r.id).max().unwrap_or(0);
    now.timestamp_millis().max(max_id + 1)
}

fn canned_test_result() -> TestResult {
    TestResult {
        execution_time: "2.3s",
        records_processed: 1234,
        exceptions_found: 5,
        sample_exceptions: vec![
            SampleException {
                stock_code: "000001",
                message: "价格波动超过阈值",
            },
            SampleException {
                stock_code: "600519",
                message: "成交量数据缺失",
            },
        ],
    }
}

pub fn apply_rule_action(
    rules: &mut Vec<Rule>,
    action: RuleAction,
    now: DateTime<Utc>,
) -> Result<ActionResponse<RuleActionData>, ApiError> {
    match action {
        RuleAction::Create { data } => {
            let rule = Rule {
                id: next_rule_id(rules, now),
                name: data.name,
                kind: data.kind,
                description: data.description,
                status: RuleStatus::Draft,
                config: fold_config(data.config, data.extra)
                    .unwrap_or_else(|| RuleConfig::Custom(Map::new())),
                statistics: RuleStatistics::default(),
            };
            info!(id = rule.id, name = %rule.name, "Rule created");
            rules.push(rule.clone());

            Ok(ActionResponse::ok("规则创建成功", RuleActionData::Rule(rule)))
        }
        RuleAction::Update { data } => {
            let Some(rule) = rules.iter_mut().find(|r| r.id == data.id) else {
                debug!(id = data.id, "update on unknown rule");
                return Err(ApiError::InvalidAction);
            };
            if let Some(name) = data.name {
                rule.name = name;
            }
            if let Some(kind) = data.kind {
                rule.kind = kind;
            }
            if let Some(description) = data.description {
                rule.description = description;
            }
            if let Some(status) = data.status {
                rule.status = status;
            }
            if let Some(statistics) = data.statistics {
                rule.statistics = statistics;
            }
            let base = data.config.unwrap_or_else(|| rule.config.clone());
            if let Some(config) = fold_config(Some(base), data.extra) {
                rule.config = config;
            }
            info!(id = rule.id, "Rule updated");

            Ok(ActionResponse::ok("规则更新成功", RuleActionData::Rule(rule.clone())))
        }
        RuleAction::Toggle { data } => {
            let Some(rule) = rules.iter_mut().find(|r| r.id == data.id) else {
                debug!(id = data.id, "toggle on unknown rule");
                return Err(ApiError::InvalidAction);
            };
            rule.status = match rule.status {
                RuleStatus::Active => RuleStatus::Paused,
                RuleStatus::Paused => RuleStatus::Active,
                RuleStatus::Draft => {
                    debug!(id = data.id, "toggle on draft rule");
                    return Err(ApiError::InvalidAction);
                }
            };
            info!(id = rule.id, status = rule.status.as_str(), "Rule toggled");

            let verb = if rule.status == RuleStatus::Active { "启用" } else { "暂停" };
            Ok(ActionResponse::ok(
                format!("规则已{}", verb),
                RuleActionData::Toggle(ToggleAck {
                    id: rule.id,
                    status: rule.status,
                }),
            ))
        }
        RuleAction::Test { data } => {
            debug!(id = data.id, "Canned rule test");
            Ok(ActionResponse::ok(
                "规则测试运行完成",
                RuleActionData::Test(TestAck {
                    id: data.id,
                    test_result: canned_test_result(),
                }),
            ))
        }
    }
}

/// POST /api/rules
pub async fn post_rule_action(
    State(state): State<AppState>,
    ActionBody(action): ActionBody<RuleAction>,
) -> Result<Json<ActionResponse<RuleActionData>>, ApiError> {
    let mut rules = state.store.rules.write();
    apply_rule_action(&mut rules, action, Utc::now()).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::seed_rules;
    use crate::models::PriceChangeConfig;
    use serde_json::json;

    fn action(value: Value) -> RuleAction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_toggle_twice_restores_status() {
        let mut rules = seed_rules(Utc::now());
        let initial: Vec<_> = rules.iter().map(|r| r.status).collect();
        for id in 1..=4 {
            for _ in 0..2 {
                apply_rule_action(&mut rules, action(json!({"action": "toggle", "data": {"id": id}})), Utc::now())
                    .unwrap();
            }
        }
        let after: Vec<_> = rules.iter().map(|r| r.status).collect();
        assert_eq!(initial, after);
    }

    #[test]
    fn test_toggle_rejects_draft_and_unknown() {
        let mut rules = seed_rules(Utc::now());
        rules[0].status = RuleStatus::Draft;
        assert!(apply_rule_action(&mut rules, action(json!({"action": "toggle", "data": {"id": 1}})), Utc::now()).is_err());
        assert_eq!(rules[0].status, RuleStatus::Draft);
        assert!(apply_rule_action(&mut rules, action(json!({"action": "toggle", "data": {"id": 77}})), Utc::now()).is_err());
    }

    #[test]
    fn test_create_folds_form_fields() {
        let mut rules = seed_rules(Utc::now());
        let now = Utc::now();
        let resp = apply_rule_action(
            &mut rules,
            action(json!({
                "action": "create",
                "data": {
                    "name": "涨跌幅检查",
                    "type": "价格异常",
                    "description": "自定义",
                    "maxChangePercent": 8,
                    "minChangePercent": -8
                }
            })),
            now,
        )
        .unwrap();

        let RuleActionData::Rule(rule) = resp.data else {
            panic!("expected rule");
        };
        assert_eq!(rule.status, RuleStatus::Draft);
        assert_eq!(rule.statistics, RuleStatistics::default());
        assert!(rule.id >= now.timestamp_millis());
        assert_eq!(
            rule.config,
            RuleConfig::PriceChange(PriceChangeConfig {
                max_change_percent: 8.0,
                min_change_percent: -8.0,
                check_frequency: None,
            })
        );
        assert_eq!(rules.len(), 5);
    }

    #[test]
    fn test_create_ids_are_unique() {
        let mut rules = seed_rules(Utc::now());
        let now = Utc::now();
        for _ in 0..3 {
            apply_rule_action(
                &mut rules,
                action(json!({"action": "create", "data": {"name": "x", "type": "规则违反"}})),
                now,
            )
            .unwrap();
        }
        let mut ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 7);
    }

    #[test]
    fn test_update_merges_fields() {
        let mut rules = seed_rules(Utc::now());
        apply_rule_action(
            &mut rules,
            action(json!({
                "action": "update",
                "data": {
                    "id": 1,
                    "description": "新描述",
                    "maxChangePercent": 12,
                    "statistics": {
                        "totalExecutions": 1,
                        "triggeredCount": 0,
                        "accuracyRate": 100.0,
                        "lastExecution": null
                    }
                }
            })),
            Utc::now(),
        )
        .unwrap();

        let rule = &rules[0];
        assert_eq!(rule.description, "新描述");
        assert_eq!(rule.name, "价格波动检查");
        assert_eq!(
            rule.statistics,
            RuleStatistics {
                total_executions: 1,
                triggered_count: 0,
                accuracy_rate: 100.0,
                last_execution: None,
            }
        );
        match &rule.config {
            RuleConfig::PriceChange(c) => {
                assert_eq!(c.max_change_percent, 12.0);
                assert_eq!(c.min_change_percent, -10.0);
                assert_eq!(c.check_frequency.as_deref(), Some("realtime"));
            }
            other => panic!("unexpected config {:?}", other),
        }
    }

    #[test]
    fn test_update_keeps_keys_outside_known_shape() {
        let mut rules = seed_rules(Utc::now());
        apply_rule_action(
            &mut rules,
            action(json!({"action": "update", "data": {"id": 1, "window": 5}})),
            Utc::now(),
        )
        .unwrap();

        let config = serde_json::to_value(&rules[0].config).unwrap();
        assert!(matches!(rules[0].config, RuleConfig::Custom(_)));
        assert_eq!(config["window"], json!(5));
        assert_eq!(config["maxChangePercent"], json!(10.0));
        assert_eq!(config["checkFrequency"], json!("realtime"));
    }

    #[test]
    fn test_create_keeps_keys_outside_known_shape() {
        let mut rules = seed_rules(Utc::now());
        let resp = apply_rule_action(
            &mut rules,
            action(json!({
                "action": "create",
                "data": {
                    "name": "窗口检查",
                    "type": "价格异常",
                    "maxChangePercent": 8,
                    "minChangePercent": -8,
                    "window": 5
                }
            })),
            Utc::now(),
        )
        .unwrap();

        let RuleActionData::Rule(rule) = resp.data else {
            panic!("expected rule");
        };
        let config = serde_json::to_value(&rule.config).unwrap();
        assert_eq!(config, json!({"maxChangePercent": 8, "minChangePercent": -8, "window": 5}));
    }

    #[test]
    fn test_update_unknown_rule() {
        let mut rules = seed_rules(Utc::now());
        let result = apply_rule_action(
            &mut rules,
            action(json!({"action": "update", "data": {"id": 9, "name": "x"}})),
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_canned_test_run() {
        let mut rules = seed_rules(Utc::now());
        let resp = apply_rule_action(&mut rules, action(json!({"action": "test", "data": {"id": 3}})), Utc::now())
            .unwrap();
        let value = serde_json::to_value(&resp.data).unwrap();
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["testResult"]["recordsProcessed"], json!(1234));
        assert_eq!(value["testResult"]["sampleExceptions"][1]["stockCode"], json!("600519"));
    }
}
