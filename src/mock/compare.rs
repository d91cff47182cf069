use super::{find_stock, fixed2, pick, random_past, DATA_SOURCES, STOCKS};
use crate::filter::sort_newest_first;
use crate::models::{
    CompareType, Comparison, ComparisonDetail, ComparisonStatus, DetailSummary, Discrepancy,
    FieldResult, StockInfo,
};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Maximum relative spread (percent) before a field counts as inconsistent.
pub const THRESHOLD_PERCENT: f64 = 0.10;

/// Fields checked for each compare type, with the range their values are drawn from.
fn field_catalogue(kind: CompareType) -> &'static [(&'static str, f64, f64)] {
    match kind {
        CompareType::Price => &[
            ("开盘价", 10.0, 200.0),
            ("收盘价", 10.0, 200.0),
            ("最高价", 10.0, 200.0),
            ("最低价", 10.0, 200.0),
            ("成交量", 1.0e6, 1.0e8),
        ],
        CompareType::Financial => &[
            ("营业收入", 1.0e8, 1.0e11),
            ("净利润", 1.0e7, 1.0e10),
            ("总资产", 1.0e9, 1.0e12),
            ("净资产", 1.0e8, 1.0e11),
            ("市盈率", 5.0, 80.0),
        ],
        CompareType::Reference => &[
            ("总股本", 1.0e8, 2.0e10),
            ("流通股本", 1.0e8, 2.0e10),
            ("总市值", 1.0e9, 3.0e12),
            ("流通市值", 1.0e9, 3.0e12),
        ],
        CompareType::Market => &[
            ("成交额", 1.0e7, 1.0e10),
            ("换手率", 0.1, 20.0),
            ("振幅", 0.5, 15.0),
            ("量比", 0.2, 5.0),
        ],
    }
}

/// Per-source readings of one field. Inconsistent fields get one source
/// pushed 0.15%..2% away from the base; consistent ones stay within 0.04%.
fn readings<R: Rng + ?Sized>(
    rng: &mut R,
    base: f64,
    sources: &[String],
    inconsistent: bool,
) -> Vec<(String, f64)> {
    let outlier = if inconsistent && sources.len() > 1 {
        Some(rng.gen_range(1..sources.len()))
    } else {
        None
    };

    sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let offset = if i == 0 {
                0.0
            } else if Some(i) == outlier {
                let pct = rng.gen_range(0.15..2.0);
                if rng.gen_bool(0.5) { pct } else { -pct }
            } else {
                rng.gen_range(-0.04..0.04)
            };
            (source.clone(), base * (1.0 + offset / 100.0))
        })
        .collect()
}

/// Spread between the highest and lowest reading, as a percentage of `base`.
fn spread_percent(base: f64, values: &[(String, f64)]) -> f64 {
    let max = values.iter().map(|(_, v)| *v).fold(f64::MIN, f64::max);
    let min = values.iter().map(|(_, v)| *v).fold(f64::MAX, f64::min);
    if values.is_empty() || base == 0.0 {
        0.0
    } else {
        (max - min) / base * 100.0
    }
}

fn formatted(values: &[(String, f64)]) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(source, v)| (source.clone(), fixed2(*v)))
        .collect()
}

fn percent(value: f64) -> String {
    format!("{}%", fixed2(value))
}

/// Generate `count` comparison records, newest first. A record is
/// `inconsistent` exactly when it lists at least one discrepancy.
pub fn generate_comparisons<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Comparison> {
    let mut comparisons: Vec<Comparison> = (1..=count as i64)
        .map(|id| {
            let stock = pick(rng, &STOCKS);
            let compare_type = *pick(rng, &CompareType::ALL);
            let source_count = rng.gen_range(2..=DATA_SOURCES.len());
            let data_sources: Vec<String> = DATA_SOURCES
                .choose_multiple(rng, source_count)
                .map(|s| s.to_string())
                .collect();

            let discrepancy_count = if rng.gen_bool(0.35) {
                rng.gen_range(1..=2)
            } else {
                0
            };
            let discrepancies: Vec<Discrepancy> = field_catalogue(compare_type)
                .choose_multiple(rng, discrepancy_count)
                .map(|(field, lo, hi)| {
                    let base = rng.gen_range(*lo..*hi);
                    let values = readings(rng, base, &data_sources, true);
                    Discrepancy {
                        field: field.to_string(),
                        values: formatted(&values),
                        max_difference: percent(spread_percent(base, &values)),
                        threshold: percent(THRESHOLD_PERCENT),
                    }
                })
                .collect();

            let status = if discrepancies.is_empty() {
                ComparisonStatus::Consistent
            } else {
                ComparisonStatus::Inconsistent
            };

            Comparison {
                id,
                stock_code: stock.code.to_string(),
                stock_name: stock.name.to_string(),
                compare_type,
                compare_time: random_past(rng, now, Duration::days(7)),
                status,
                discrepancies,
                data_sources,
            }
        })
        .collect();

    sort_newest_first(&mut comparisons, |c| c.compare_time);
    comparisons
}

/// Field-by-field comparison of one stock across `sources`.
pub fn detail_comparison<R: Rng + ?Sized>(
    rng: &mut R,
    stock_code: &str,
    compare_type: CompareType,
    sources: Vec<String>,
    now: DateTime<Utc>,
) -> ComparisonDetail {
    let stock_info = find_stock(stock_code)
        .map(StockInfo::from)
        .unwrap_or_else(|| StockInfo {
            code: stock_code.to_string(),
            name: "未知股票".to_string(),
            industry: "未知".to_string(),
        });

    let results: Vec<FieldResult> = field_catalogue(compare_type)
        .iter()
        .map(|(field, lo, hi)| {
            let base = rng.gen_range(*lo..*hi);
            let inconsistent = rng.gen_bool(0.2);
            let values = readings(rng, base, &sources, inconsistent);
            let spread = spread_percent(base, &values);
            let status = if spread > THRESHOLD_PERCENT {
                ComparisonStatus::Inconsistent
            } else {
                ComparisonStatus::Consistent
            };
            FieldResult {
                field: field.to_string(),
                values: formatted(&values),
                status,
                difference: percent(spread),
                threshold: percent(THRESHOLD_PERCENT),
            }
        })
        .collect();

    let total_fields = results.len();
    let consistent_fields = results
        .iter()
        .filter(|r| r.status == ComparisonStatus::Consistent)
        .count();
    let consistency_rate = if total_fields > 0 {
        consistent_fields as f64 / total_fields as f64 * 100.0
    } else {
        100.0
    };

    ComparisonDetail {
        stock_info,
        compare_type,
        data_sources: sources,
        compare_time: now,
        results,
        summary: DetailSummary {
            total_fields,
            consistent_fields,
            inconsistent_fields: total_fields - consistent_fields,
            consistency_rate,
        },
    }
}
