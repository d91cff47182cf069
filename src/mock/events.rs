use super::{find_stock, pick, random_past, STOCKS};
use crate::models::{
    AffectedData, AffectedTable, Event, EventImpact, EventStatus, EventType, Severity,
    TimelineEntry,
};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

pub const SYSTEM_ACTOR: &str = "系统";

const TABLES: [(&str, &[&str]); 5] = [
    ("股票基础信息表", &["总股本", "流通股本"]),
    ("历史价格表", &["开盘价", "收盘价", "最高价", "最低价"]),
    ("财务指标表", &["营业收入", "净利润", "每股收益"]),
    ("分红送转表", &["每股派息", "送股比例"]),
    ("证券信息表", &["证券简称", "所属行业"]),
];

/// Processing steps in the order they are logged.
const STEPS: [(&str, &str); 4] = [
    ("事件触发", "接收到公告文件"),
    ("数据验证", "验证公告内容与生效日期"),
    ("数据更新", "更新受影响的数据表"),
    ("结果校验", "校验更新后的数据一致性"),
];

fn descriptions(kind: EventType) -> &'static [&'static str] {
    match kind {
        EventType::StockSplit => &["1拆2股票拆分", "10转5股本拆分"],
        EventType::EarningsRelease => &["2023年年报发布", "2024年一季报发布", "2024年半年报发布"],
        EventType::ExDividend => &["每10股派发现金红利5元", "每10股送红股2股"],
        EventType::ShareCapitalChange => &["限售股解禁上市流通", "定向增发新股上市"],
        EventType::Restructuring => &["发行股份购买资产", "重大资产出售"],
        EventType::TradingHalt => &["重大事项停牌", "停牌期满复牌"],
        EventType::Rename => &["证券简称变更"],
        EventType::IndustryReclassification => &["申万行业分类调整", "证监会行业分类调整"],
    }
}

/// Two fixed historical events followed by generated ones, `count` in total.
/// The first four generated events cover every status.
pub fn generate_events<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let mut events = fixed_events(now);
    events.truncate(count);

    let mut id = events.len() as i64;
    while events.len() < count {
        id += 1;
        let generated = events.len() - 2;
        let status = EventStatus::ALL
            .get(generated)
            .copied()
            .unwrap_or_else(|| *pick(rng, &EventStatus::ALL));
        events.push(random_event(rng, id, status, now));
    }

    events
}

fn fixed_events(now: DateTime<Utc>) -> Vec<Event> {
    let split_time = now - Duration::days(3);
    let split_stock = find_stock("000001").unwrap_or(&STOCKS[0]);
    let earnings_time = now - Duration::days(5);
    let earnings_stock = find_stock("600519").unwrap_or(&STOCKS[5]);

    vec![
        Event {
            id: 1,
            kind: EventType::StockSplit,
            stock_code: split_stock.code.to_string(),
            stock_name: split_stock.name.to_string(),
            description: "1拆2股票拆分".to_string(),
            trigger_time: split_time,
            status: EventStatus::Completed,
            timeline: vec![
                entry(split_time, "事件触发", "接收到拆股公告文件", EventStatus::Completed),
                entry(
                    split_time + Duration::minutes(1),
                    "数据验证",
                    "验证拆股比例和生效日期",
                    EventStatus::Completed,
                ),
            ],
            affected_data: AffectedData {
                tables: vec![
                    table("股票基础信息表", &["总股本", "流通股本"], 1),
                    table("历史价格表", &["开盘价", "收盘价"], 1247),
                ],
            },
            impact: EventImpact {
                severity: Severity::High,
                records_affected: 1248,
                duration: "15分钟".to_string(),
            },
        },
        Event {
            id: 2,
            kind: EventType::EarningsRelease,
            stock_code: earnings_stock.code.to_string(),
            stock_name: earnings_stock.name.to_string(),
            description: "2023年年报发布".to_string(),
            trigger_time: earnings_time,
            status: EventStatus::Completed,
            timeline: vec![
                entry(earnings_time, "事件触发", "接收到年报公告文件", EventStatus::Completed),
                entry(
                    earnings_time + Duration::minutes(2),
                    "数据更新",
                    "更新财务指标数据",
                    EventStatus::Completed,
                ),
            ],
            affected_data: AffectedData {
                tables: vec![table("财务指标表", &["营业收入", "净利润", "每股收益"], 12)],
            },
            impact: EventImpact {
                severity: Severity::Medium,
                records_affected: 12,
                duration: "5分钟".to_string(),
            },
        },
    ]
}

fn random_event<R: Rng + ?Sized>(
    rng: &mut R,
    id: i64,
    status: EventStatus,
    now: DateTime<Utc>,
) -> Event {
    let kind = *pick(rng, &EventType::ALL);
    let stock = pick(rng, &STOCKS);
    let trigger_time = random_past(rng, now, Duration::days(30));

    let table_count = rng.gen_range(1..=2);
    let tables: Vec<AffectedTable> = TABLES
        .choose_multiple(rng, table_count)
        .map(|(name, fields)| table(name, fields, rng.gen_range(1..=5000)))
        .collect();
    let records_affected = tables.iter().map(|t| t.records_affected).sum();

    Event {
        id,
        kind,
        stock_code: stock.code.to_string(),
        stock_name: stock.name.to_string(),
        description: pick(rng, descriptions(kind)).to_string(),
        trigger_time,
        status,
        timeline: timeline_for(rng, status, trigger_time),
        affected_data: AffectedData { tables },
        impact: EventImpact {
            severity: *pick(rng, &Severity::ALL),
            records_affected,
            duration: format!("{}分钟", rng.gen_range(1..=90)),
        },
    }
}

/// Timeline whose last entry carries the event status.
fn timeline_for<R: Rng + ?Sized>(
    rng: &mut R,
    status: EventStatus,
    start: DateTime<Utc>,
) -> Vec<TimelineEntry> {
    let steps = match status {
        EventStatus::Pending => 1,
        EventStatus::Processing | EventStatus::Failed => 3,
        EventStatus::Completed => STEPS.len(),
    };

    let mut time = start;
    let mut timeline = Vec::with_capacity(steps);
    for (i, (action, details)) in STEPS.iter().take(steps).enumerate() {
        let step_status = if i + 1 == steps {
            status
        } else {
            EventStatus::Completed
        };
        timeline.push(entry(time, action, details, step_status));
        time += Duration::minutes(rng.gen_range(1..=5));
    }
    timeline
}

pub(crate) fn entry(
    time: DateTime<Utc>,
    action: &str,
    details: &str,
    status: EventStatus,
) -> TimelineEntry {
    TimelineEntry {
        time,
        action: action.to_string(),
        details: details.to_string(),
        actor: SYSTEM_ACTOR.to_string(),
        status,
    }
}

fn table(name: &str, fields: &[&str], records_affected: u64) -> AffectedTable {
    AffectedTable {
        name: name.to_string(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
        records_affected,
    }
}
