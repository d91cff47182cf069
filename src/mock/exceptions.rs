use super::{fixed2, pick, random_past, DATA_SOURCES, STOCKS};
use crate::filter::sort_newest_first;
use crate::models::{
    AnomalyType, Exception, ExceptionDetails, ExceptionStatus, GenericDetails, MissingDetails,
    PriceDetails, Severity, SourceMismatchDetails,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

const MISSING_FIELDS: [&str; 3] = ["成交量", "成交额", "换手率"];

fn messages(kind: AnomalyType) -> &'static [&'static str] {
    match kind {
        AnomalyType::PriceAnomaly => &[
            "收盘价异常波动超过10%",
            "开盘价与昨收价差异过大",
            "盘中价格出现异常跳空",
        ],
        AnomalyType::MissingData => &["成交量数据缺失", "财务数据未及时更新", "行情数据传输中断"],
        AnomalyType::FinancialAnomaly => &["市盈率计算异常", "净利润数据异常", "财务指标超出合理范围"],
        AnomalyType::SourceMismatch => &[
            "不同数据源价格差异超过阈值",
            "成交量数据不一致",
            "财务数据存在差异",
        ],
        AnomalyType::RuleViolation => &["连续3日无成交数据", "数据更新延迟超过限制", "必填字段存在空值"],
    }
}

/// Generate `count` exceptions with ids `1..=count`, newest first.
pub fn generate_exceptions<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Exception> {
    let mut exceptions: Vec<Exception> = (1..=count as i64)
        .map(|id| {
            let stock = pick(rng, &STOCKS);
            let kind = *pick(rng, &AnomalyType::ALL);
            Exception {
                id,
                stock_code: stock.code.to_string(),
                stock_name: stock.name.to_string(),
                kind,
                severity: *pick(rng, &Severity::ALL),
                status: *pick(rng, &ExceptionStatus::ALL),
                message: pick(rng, messages(kind)).to_string(),
                time: random_past(rng, now, Duration::days(7)),
                details: details_for(rng, kind, now),
            }
        })
        .collect();

    sort_newest_first(&mut exceptions, |e| e.time);
    exceptions
}

fn details_for<R: Rng + ?Sized>(
    rng: &mut R,
    kind: AnomalyType,
    now: DateTime<Utc>,
) -> ExceptionDetails {
    match kind {
        AnomalyType::PriceAnomaly => ExceptionDetails::Price(PriceDetails {
            current_price: fixed2(rng.gen_range(10.0..110.0)),
            expected_range: [
                fixed2(rng.gen_range(10.0..100.0)),
                fixed2(rng.gen_range(10.0..120.0)),
            ],
            change_percent: format!("{}%", fixed2(rng.gen_range(-10.0..10.0))),
            data_source: pick(rng, &DATA_SOURCES).to_string(),
        }),
        AnomalyType::MissingData => {
            let n = rng.gen_range(1..=MISSING_FIELDS.len());
            ExceptionDetails::Missing(MissingDetails {
                missing_fields: MISSING_FIELDS[..n].iter().map(|f| f.to_string()).collect(),
                last_valid_time: random_past(rng, now, Duration::days(1)),
                data_source: pick(rng, &["Wind", "Bloomberg"]).to_string(),
            })
        }
        AnomalyType::SourceMismatch => {
            let base: f64 = rng.gen_range(10.0..110.0);
            ExceptionDetails::SourceMismatch(SourceMismatchDetails {
                wind_price: fixed2(base),
                bloomberg_price: fixed2(base + rng.gen_range(-0.25..0.25)),
                exchange_price: fixed2(base + rng.gen_range(-0.15..0.15)),
                max_diff: fixed2(rng.gen_range(0.0..0.5)),
                threshold: "0.10".to_string(),
            })
        }
        AnomalyType::FinancialAnomaly | AnomalyType::RuleViolation => {
            ExceptionDetails::Generic(GenericDetails {
                description: "详细信息".to_string(),
                suggestion: "请检查数据源".to_string(),
            })
        }
    }
}
