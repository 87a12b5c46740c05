use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use crate::entities::order::{self, Entity as OrderEntity};
use crate::errors::ServiceError;

const MAX_RANDOM_ATTEMPTS: usize = 10;

/// `DH` + full-year date prefix for order numbers minted on `date`.
pub fn day_prefix(date: DateTime<Utc>) -> String {
    format!("DH{}", date.format("%Y%m%d"))
}

/// Next sequential suffix after `last_number`, wrapping at 9999. Used when
/// the random attempts are exhausted for a day prefix.
fn sequential_suffix(last_number: Option<&str>) -> u32 {
    match last_number.and_then(|n| n.get(n.len().saturating_sub(4)..)) {
        Some(last4) => match last4.parse::<u32>() {
            Ok(seq) => (seq + 1) % 10_000,
            Err(_) => 1,
        },
        None => 1,
    }
}

/// Mints a unique order number: `DH` + `YYYYMMDD` + 4 random digits, retried
/// up to ten times against existing numbers, then falling back to the next
/// sequential suffix for the day prefix. The unique index on
/// `orders.order_number` remains the final arbiter under concurrency.
pub async fn generate_order_number<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let prefix = day_prefix(now);

    for _ in 0..MAX_RANDOM_ATTEMPTS {
        let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
        let candidate = format!("{}{:04}", prefix, suffix);

        let taken = OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(candidate.clone()))
            .count(conn)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
    }

    let last = OrderEntity::find()
        .filter(order::Column::OrderNumber.starts_with(prefix.clone()))
        .order_by_desc(order::Column::OrderNumber)
        .one(conn)
        .await?;

    let seq = sequential_suffix(last.as_ref().map(|o| o.order_number.as_str()));
    Ok(format!("{}{:04}", prefix, seq))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn prefix_uses_full_year_date() {
        let date = Utc.with_ymd_and_hms(2026, 8, 7, 10, 30, 0).unwrap();
        assert_eq!(day_prefix(date), "DH20260807");
    }

    #[test]
    fn sequential_suffix_increments_the_day_maximum() {
        assert_eq!(sequential_suffix(Some("DH202608070041")), 42);
        assert_eq!(sequential_suffix(Some("DH202608070000")), 1);
    }

    #[test]
    fn sequential_suffix_wraps_at_9999() {
        assert_eq!(sequential_suffix(Some("DH202608079999")), 0);
    }

    #[test]
    fn sequential_suffix_starts_at_one_for_a_fresh_day() {
        assert_eq!(sequential_suffix(None), 1);
    }
}
