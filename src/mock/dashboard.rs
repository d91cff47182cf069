use super::{DATA_SOURCES, STOCKS};
use crate::models::{DashboardData, DashboardSummary, DataSourceStatus, TrendPoint};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

const RELIABILITY: [u8; 3] = [95, 92, 98];

/// Headline numbers, a seven-day exception trend ending today, and the
/// status of each data source.
pub fn generate_dashboard<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> DashboardData {
    let exception_trend = (0..7)
        .rev()
        .map(|days_ago| TrendPoint {
            date: (now - Duration::days(days_ago))
                .date_naive()
                .format("%Y-%m-%d")
                .to_string(),
            count: rng.gen_range(5..25),
        })
        .collect();

    let data_source_status = DATA_SOURCES
        .iter()
        .zip(RELIABILITY)
        .map(|(name, reliability)| DataSourceStatus {
            name: name.to_string(),
            status: "online".to_string(),
            last_sync: now,
            reliability,
        })
        .collect();

    DashboardData {
        summary: DashboardSummary {
            total_stocks: STOCKS.len() * 100,
            total_records: rng.gen_range(1_000_000..2_000_000),
            last_update_time: now,
            system_status: "normal".to_string(),
        },
        exception_trend,
        data_source_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_trend_covers_last_seven_days() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        let data = generate_dashboard(&mut rng, now);

        let dates: Vec<&str> = data.exception_trend.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates.first(), Some(&"2024-03-04"));
        assert_eq!(dates.last(), Some(&"2024-03-10"));
        assert!(data.exception_trend.iter().all(|p| (5..25).contains(&p.count)));
    }

    #[test]
    fn test_summary() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let data = generate_dashboard(&mut rng, Utc::now());
        assert_eq!(data.summary.total_stocks, 1000);
        assert_eq!(data.summary.system_status, "normal");
        assert!((1_000_000..2_000_000).contains(&data.summary.total_records));
        assert_eq!(data.data_source_status.len(), 3);
    }
}
