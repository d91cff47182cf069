use crate::models::{
    AnomalyType, CompletenessConfig, PriceChangeConfig, Rule, RuleConfig, RuleStatistics,
    RuleStatus, SourceConsistencyConfig, ValuationConfig,
};
use chrono::{DateTime, Utc};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn stats(total: u64, triggered: u64, accuracy: f64, now: DateTime<Utc>) -> RuleStatistics {
    RuleStatistics {
        total_executions: total,
        triggered_count: triggered,
        accuracy_rate: accuracy,
        last_execution: Some(now),
    }
}

/// The four built-in checks the desk ships with.
pub fn seed_rules(now: DateTime<Utc>) -> Vec<Rule> {
    vec![
        Rule {
            id: 1,
            name: "价格波动检查".to_string(),
            kind: AnomalyType::PriceAnomaly,
            description: "检查股价日涨跌幅是否超过合理范围".to_string(),
            status: RuleStatus::Active,
            config: RuleConfig::PriceChange(PriceChangeConfig {
                max_change_percent: 10.0,
                min_change_percent: -10.0,
                check_frequency: Some("realtime".to_string()),
            }),
            statistics: stats(15234, 127, 92.5, now),
        },
        Rule {
            id: 2,
            name: "数据完整性检查".to_string(),
            kind: AnomalyType::MissingData,
            description: "检查必要字段是否存在空值".to_string(),
            status: RuleStatus::Active,
            config: RuleConfig::Completeness(CompletenessConfig {
                required_fields: strings(&["开盘价", "收盘价", "最高价", "最低价", "成交量"]),
                tolerance: 0.0,
            }),
            statistics: stats(8934, 45, 88.9, now),
        },
        Rule {
            id: 3,
            name: "市盈率合理性检查".to_string(),
            kind: AnomalyType::FinancialAnomaly,
            description: "检查市盈率是否在合理范围内".to_string(),
            status: RuleStatus::Paused,
            config: RuleConfig::Valuation(ValuationConfig {
                min_pe: -100.0,
                max_pe: 200.0,
                exclude_negative_earnings: false,
            }),
            statistics: stats(4567, 89, 76.4, now),
        },
        Rule {
            id: 4,
            name: "多源价格一致性检查".to_string(),
            kind: AnomalyType::SourceMismatch,
            description: "检查不同数据源的价格差异是否超过阈值".to_string(),
            status: RuleStatus::Active,
            config: RuleConfig::SourceConsistency(SourceConsistencyConfig {
                max_diff_percent: 0.1,
                data_sources: strings(&["Wind", "Bloomberg", "交易所"]),
                base_source: Some("交易所".to_string()),
            }),
            statistics: stats(2341, 23, 94.2, now),
        },
    ]
}
