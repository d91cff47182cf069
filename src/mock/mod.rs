//! Synthetic data generators.
//!
//! Every generator takes the RNG and the reference time explicitly so a
//! seeded store reproduces the same data set.

pub mod compare;
pub mod dashboard;
pub mod events;
pub mod exceptions;
pub mod rules;

use crate::models::StockInfo;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

pub use compare::{detail_comparison, generate_comparisons};
pub use dashboard::generate_dashboard;
pub use events::generate_events;
pub use exceptions::generate_exceptions;
pub use rules::seed_rules;

#[derive(Debug, Clone, Copy)]
pub struct Stock {
    pub code: &'static str,
    pub name: &'static str,
    pub industry: &'static str,
}

pub static STOCKS: [Stock; 10] = [
    Stock { code: "000001", name: "平安银行", industry: "银行" },
    Stock { code: "000002", name: "万科A", industry: "房地产" },
    Stock { code: "000858", name: "五粮液", industry: "白酒" },
    Stock { code: "002415", name: "海康威视", industry: "安防" },
    Stock { code: "600036", name: "招商银行", industry: "银行" },
    Stock { code: "600519", name: "贵州茅台", industry: "白酒" },
    Stock { code: "000333", name: "美的集团", industry: "家电" },
    Stock { code: "002594", name: "比亚迪", industry: "汽车" },
    Stock { code: "300750", name: "宁德时代", industry: "新能源" },
    Stock { code: "603259", name: "药明康德", industry: "医药" },
];

pub const DATA_SOURCES: [&str; 3] = ["Wind", "Bloomberg", "交易所"];

impl From<&Stock> for StockInfo {
    fn from(stock: &Stock) -> Self {
        Self {
            code: stock.code.to_string(),
            name: stock.name.to_string(),
            industry: stock.industry.to_string(),
        }
    }
}

pub fn find_stock(code: &str) -> Option<&'static Stock> {
    STOCKS.iter().find(|s| s.code == code)
}

/// Uniform pick from a non-empty constant vocabulary.
pub(crate) fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

/// A random instant within `max_age` before `now`.
pub(crate) fn random_past<R: Rng + ?Sized>(
    rng: &mut R,
    now: DateTime<Utc>,
    max_age: Duration,
) -> DateTime<Utc> {
    let max_ms = max_age.num_milliseconds().max(1);
    now - Duration::milliseconds(rng.gen_range(0..max_ms))
}

pub(crate) fn fixed2(value: f64) -> String {
    format!("{:.2}", value)
}
