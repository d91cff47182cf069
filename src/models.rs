use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Category shared by exceptions and the rules that raise them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyType {
    #[serde(rename = "价格异常")]
    PriceAnomaly,
    #[serde(rename = "数据缺失")]
    MissingData,
    #[serde(rename = "财务异常")]
    FinancialAnomaly,
    #[serde(rename = "多源差异")]
    SourceMismatch,
    #[serde(rename = "规则违反")]
    RuleViolation,
}

impl AnomalyType {
    pub const ALL: [AnomalyType; 5] = [
        AnomalyType::PriceAnomaly,
        AnomalyType::MissingData,
        AnomalyType::FinancialAnomaly,
        AnomalyType::SourceMismatch,
        AnomalyType::RuleViolation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::PriceAnomaly => "价格异常",
            AnomalyType::MissingData => "数据缺失",
            AnomalyType::FinancialAnomaly => "财务异常",
            AnomalyType::SourceMismatch => "多源差异",
            AnomalyType::RuleViolation => "规则违反",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionStatus {
    Pending,
    Processing,
    Resolved,
}

impl ExceptionStatus {
    pub const ALL: [ExceptionStatus; 3] = [
        ExceptionStatus::Pending,
        ExceptionStatus::Processing,
        ExceptionStatus::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionStatus::Pending => "pending",
            ExceptionStatus::Processing => "processing",
            ExceptionStatus::Resolved => "resolved",
        }
    }
}

/// Type-specific payload attached to an exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExceptionDetails {
    Price(PriceDetails),
    Missing(MissingDetails),
    SourceMismatch(SourceMismatchDetails),
    Generic(GenericDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDetails {
    pub current_price: String,
    pub expected_range: [String; 2],
    pub change_percent: String,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDetails {
    pub missing_fields: Vec<String>,
    pub last_valid_time: DateTime<Utc>,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMismatchDetails {
    pub wind_price: String,
    pub bloomberg_price: String,
    pub exchange_price: String,
    pub max_diff: String,
    pub threshold: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericDetails {
    pub description: String,
    pub suggestion: String,
}

/// A detected data-quality anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub id: i64,
    pub stock_code: String,
    pub stock_name: String,
    #[serde(rename = "type")]
    pub kind: AnomalyType,
    pub severity: Severity,
    pub status: ExceptionStatus,
    pub message: String,
    pub time: DateTime<Utc>,
    pub details: ExceptionDetails,
}

// ===== Events =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "拆股事件")]
    StockSplit,
    #[serde(rename = "财报发布")]
    EarningsRelease,
    #[serde(rename = "除权除息")]
    ExDividend,
    #[serde(rename = "股本变更")]
    ShareCapitalChange,
    #[serde(rename = "重大资产重组")]
    Restructuring,
    #[serde(rename = "停牌复牌")]
    TradingHalt,
    #[serde(rename = "更名")]
    Rename,
    #[serde(rename = "行业调整")]
    IndustryReclassification,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::StockSplit,
        EventType::EarningsRelease,
        EventType::ExDividend,
        EventType::ShareCapitalChange,
        EventType::Restructuring,
        EventType::TradingHalt,
        EventType::Rename,
        EventType::IndustryReclassification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::StockSplit => "拆股事件",
            EventType::EarningsRelease => "财报发布",
            EventType::ExDividend => "除权除息",
            EventType::ShareCapitalChange => "股本变更",
            EventType::Restructuring => "重大资产重组",
            EventType::TradingHalt => "停牌复牌",
            EventType::Rename => "更名",
            EventType::IndustryReclassification => "行业调整",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Completed,
    Processing,
    Failed,
    Pending,
}

impl EventStatus {
    pub const ALL: [EventStatus; 4] = [
        EventStatus::Completed,
        EventStatus::Processing,
        EventStatus::Failed,
        EventStatus::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Completed => "completed",
            EventStatus::Processing => "processing",
            EventStatus::Failed => "failed",
            EventStatus::Pending => "pending",
        }
    }
}

/// One step in an event's audit log. Entries are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub time: DateTime<Utc>,
    pub action: String,
    pub details: String,
    pub actor: String,
    pub status: EventStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedTable {
    pub name: String,
    pub fields: Vec<String>,
    pub records_affected: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffectedData {
    pub tables: Vec<AffectedTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventImpact {
    pub severity: Severity,
    pub records_affected: u64,
    pub duration: String,
}

/// A corporate-action or data-lifecycle occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub stock_code: String,
    pub stock_name: String,
    pub description: String,
    pub trigger_time: DateTime<Utc>,
    pub status: EventStatus,
    pub timeline: Vec<TimelineEntry>,
    pub affected_data: AffectedData,
    pub impact: EventImpact,
}

// ===== Rules =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Draft,
    Active,
    Paused,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Draft => "draft",
            RuleStatus::Active => "active",
            RuleStatus::Paused => "paused",
        }
    }
}

/// Check parameters; the shape depends on the rule type.
///
/// Shapes are tried in declaration order. Typed shapes reject extra keys, so
/// anything that is not exactly one of them is kept verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleConfig {
    PriceChange(PriceChangeConfig),
    Completeness(CompletenessConfig),
    Valuation(ValuationConfig),
    SourceConsistency(SourceConsistencyConfig),
    Custom(Map<String, Value>),
}

impl RuleConfig {
    pub fn into_map(self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        serde_json::from_value(Value::Object(map.clone())).unwrap_or(RuleConfig::Custom(map))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PriceChangeConfig {
    pub max_change_percent: f64,
    pub min_change_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_frequency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompletenessConfig {
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValuationConfig {
    #[serde(rename = "minPE")]
    pub min_pe: f64,
    #[serde(rename = "maxPE")]
    pub max_pe: f64,
    #[serde(default)]
    pub exclude_negative_earnings: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SourceConsistencyConfig {
    pub max_diff_percent: f64,
    #[serde(default)]
    pub data_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_source: Option<String>,
}

/// Simulated execution counters. Nothing real updates these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStatistics {
    pub total_executions: u64,
    pub triggered_count: u64,
    pub accuracy_rate: f64,
    pub last_execution: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AnomalyType,
    pub description: String,
    pub status: RuleStatus,
    pub config: RuleConfig,
    pub statistics: RuleStatistics,
}

// ===== Comparisons =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareType {
    #[serde(rename = "价格数据")]
    Price,
    #[serde(rename = "财务数据")]
    Financial,
    #[serde(rename = "基础信息")]
    Reference,
    #[serde(rename = "行情数据")]
    Market,
}

impl CompareType {
    pub const ALL: [CompareType; 4] = [
        CompareType::Price,
        CompareType::Financial,
        CompareType::Reference,
        CompareType::Market,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareType::Price => "价格数据",
            CompareType::Financial => "财务数据",
            CompareType::Reference => "基础信息",
            CompareType::Market => "行情数据",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Consistent,
    Inconsistent,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStatus::Consistent => "consistent",
            ComparisonStatus::Inconsistent => "inconsistent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub field: String,
    /// Value reported by each data source, keyed by source name.
    pub values: BTreeMap<String, String>,
    pub max_difference: String,
    pub threshold: String,
}

/// A cross-source consistency check of one stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub id: i64,
    pub stock_code: String,
    pub stock_name: String,
    pub compare_type: CompareType,
    pub compare_time: DateTime<Utc>,
    pub status: ComparisonStatus,
    pub discrepancies: Vec<Discrepancy>,
    pub data_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    pub code: String,
    pub name: String,
    pub industry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldResult {
    pub field: String,
    pub values: BTreeMap<String, String>,
    pub status: ComparisonStatus,
    pub difference: String,
    pub threshold: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSummary {
    pub total_fields: usize,
    pub consistent_fields: usize,
    pub inconsistent_fields: usize,
    pub consistency_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDetail {
    pub stock_info: StockInfo,
    pub compare_type: CompareType,
    pub data_sources: Vec<String>,
    pub compare_time: DateTime<Utc>,
    pub results: Vec<FieldResult>,
    pub summary: DetailSummary,
}

// ===== Dashboard =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_stocks: usize,
    pub total_records: u64,
    pub last_update_time: DateTime<Utc>,
    pub system_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceStatus {
    pub name: String,
    pub status: String,
    pub last_sync: DateTime<Utc>,
    pub reliability: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub summary: DashboardSummary,
    pub exception_trend: Vec<TrendPoint>,
    pub data_source_status: Vec<DataSourceStatus>,
}
