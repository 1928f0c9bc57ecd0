//! # Derived Statistics
//!
//! Pure functions over a collection snapshot. Nothing here caches: every
//! figure is recomputed from the slice it is given, so two calls on the same
//! input always agree.

use serde::{Deserialize, Serialize};

use crate::models::{BalanceHolder, CreditCard, Sale, UsageTracked};
use crate::operations::round_cents;

pub fn total<T>(items: &[T], key: impl Fn(&T) -> f64) -> f64 {
    round_cents(items.iter().map(key).sum())
}

/// Mean of `key` over `items`; zero for an empty slice
pub fn average<T>(items: &[T], key: impl Fn(&T) -> f64) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    round_cents(items.iter().map(key).sum::<f64>() / items.len() as f64)
}

/// `numerator / denominator`, zero when the denominator is zero
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn count_where<T>(items: &[T], predicate: impl Fn(&T) -> bool) -> usize {
    items.iter().filter(|&item| predicate(item)).count()
}

/// The `n` items with the highest `key`, highest first. Ties keep the order in
/// which the items appear in the collection; a NaN key ranks last.
pub fn top_n_by<T>(items: &[T], n: usize, key: impl Fn(&T) -> f64) -> Vec<&T> {
    let rank = |item: &T| {
        let value = key(item);
        if value.is_nan() {
            f64::NEG_INFINITY
        } else {
            value
        }
    };
    let mut ranked: Vec<&T> = items.iter().collect();
    // sort_by is stable, so equal keys keep collection order
    ranked.sort_by(|a, b| rank(b).total_cmp(&rank(a)));
    ranked.truncate(n);
    ranked
}

/// Totals for any balance-holding domain
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub count: usize,
    pub active_count: usize,
    pub total_balance: f64,
    pub average_balance: f64,
}

impl BalanceSummary {
    pub fn from_items<E: BalanceHolder>(items: &[E]) -> Self {
        Self {
            count: items.len(),
            active_count: count_where(items, |e| e.is_active()),
            total_balance: total(items, |e| e.balance()),
            average_balance: average(items, |e| e.balance()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreditCardSummary {
    pub card_count: usize,
    pub total_limit: f64,
    pub total_outstanding: f64,
    pub total_available: f64,
    /// Outstanding over limit across all cards, as a percentage
    pub utilization: f64,
}

impl CreditCardSummary {
    pub fn from_cards(cards: &[CreditCard]) -> Self {
        let total_limit = total(cards, |c| c.credit_limit);
        let total_outstanding = total(cards, |c| c.outstanding());
        Self {
            card_count: cards.len(),
            total_limit,
            total_outstanding,
            total_available: total(cards, |c| c.available_credit()),
            utilization: round_cents(ratio(total_outstanding, total_limit) * 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    pub daily_used: f64,
    pub monthly_used: f64,
    /// Entities whose daily usage reached their daily limit
    pub daily_exhausted: usize,
}

impl UsageSummary {
    pub fn from_items<E: UsageTracked>(items: &[E]) -> Self {
        Self {
            daily_used: total(items, |e| e.usage().daily_used),
            monthly_used: total(items, |e| e.usage().monthly_used),
            daily_exhausted: count_where(items, |e| {
                let usage = e.usage();
                usage.daily_limit.is_some_and(|limit| usage.daily_used >= limit)
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SalesSummary {
    pub sale_count: usize,
    pub revenue: f64,
    pub profit: f64,
    pub average_sale: f64,
    /// Profit over revenue, as a percentage
    pub margin: f64,
}

impl SalesSummary {
    pub fn from_sales(sales: &[Sale]) -> Self {
        let revenue = total(sales, |s| s.amount);
        let profit = total(sales, |s| s.profit());
        Self {
            sale_count: sales.len(),
            revenue,
            profit,
            average_sale: average(sales, |s| s.amount),
            margin: round_cents(ratio(profit, revenue) * 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BankAccount, PrepaidCard};
    use crate::schema::EntityStatus;

    fn account(name: &str, balance: f64) -> BankAccount {
        BankAccount {
            id: name.to_string(),
            name: name.to_string(),
            bank_name: "NBE".to_string(),
            balance,
            ..Default::default()
        }
    }

    #[test]
    fn test_top_accounts_by_balance() {
        let accounts = vec![account("a", 500.0), account("b", 1500.0), account("c", 800.0)];
        let top: Vec<f64> = top_n_by(&accounts, 3, |a| a.balance)
            .iter()
            .map(|a| a.balance)
            .collect();
        assert_eq!(top, vec![1500.0, 800.0, 500.0]);
    }

    #[test]
    fn test_top_n_is_stable_for_ties() {
        let accounts = vec![
            account("first", 100.0),
            account("big", 900.0),
            account("second", 100.0),
            account("third", 100.0),
        ];
        let top: Vec<&str> = top_n_by(&accounts, 3, |a| a.balance)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(top, vec!["big", "first", "second"]);
    }

    #[test]
    fn test_top_n_ranks_nan_last() {
        let accounts = vec![
            account("nan", f64::NAN),
            account("low", -50.0),
            account("high", 700.0),
            account("also-nan", f64::NAN),
        ];
        let top: Vec<&str> = top_n_by(&accounts, 4, |a| a.balance)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(top, vec!["high", "low", "nan", "also-nan"]);
    }

    #[test]
    fn test_top_n_larger_than_collection() {
        let accounts = vec![account("a", 1.0)];
        assert_eq!(top_n_by(&accounts, 5, |a| a.balance).len(), 1);
        assert!(top_n_by::<BankAccount>(&[], 5, |a| a.balance).is_empty());
    }

    #[test]
    fn test_averages_and_ratios_handle_empty_input() {
        assert_eq!(average::<BankAccount>(&[], |a| a.balance), 0.0);
        assert_eq!(ratio(10.0, 0.0), 0.0);
        assert_eq!(BalanceSummary::from_items::<BankAccount>(&[]), BalanceSummary::default());
    }

    #[test]
    fn test_balance_summary_recomputes_consistently() {
        let mut accounts = vec![account("a", 500.0), account("b", 1500.0)];
        accounts[1].status = EntityStatus::Suspended;

        let first = BalanceSummary::from_items(&accounts);
        let second = BalanceSummary::from_items(&accounts);
        assert_eq!(first, second);
        assert_eq!(first.count, 2);
        assert_eq!(first.active_count, 1);
        assert_eq!(first.total_balance, 2000.0);
        assert_eq!(first.average_balance, 1000.0);

        accounts.push(account("c", 1000.0));
        assert_eq!(BalanceSummary::from_items(&accounts).average_balance, 1000.0);
    }

    #[test]
    fn test_credit_card_summary() {
        let cards = vec![
            CreditCard { credit_limit: 10000.0, balance: -2500.0, ..Default::default() },
            CreditCard { credit_limit: 5000.0, balance: 0.0, ..Default::default() },
        ];
        let summary = CreditCardSummary::from_cards(&cards);
        assert_eq!(summary.total_limit, 15000.0);
        assert_eq!(summary.total_outstanding, 2500.0);
        assert_eq!(summary.total_available, 12500.0);
        assert_eq!(summary.utilization, 16.67);
    }

    #[test]
    fn test_usage_summary() {
        let cards = vec![
            PrepaidCard {
                daily_used: 500.0,
                monthly_used: 1200.0,
                daily_limit: Some(500.0),
                ..Default::default()
            },
            PrepaidCard { daily_used: 100.0, monthly_used: 300.0, ..Default::default() },
        ];
        let summary = UsageSummary::from_items(&cards);
        assert_eq!(summary.daily_used, 600.0);
        assert_eq!(summary.monthly_used, 1500.0);
        assert_eq!(summary.daily_exhausted, 1);
    }

    #[test]
    fn test_sales_summary() {
        let sales = vec![
            Sale { amount: 1000.0, cost: 600.0, ..Default::default() },
            Sale { amount: 500.0, cost: 400.0, ..Default::default() },
        ];
        let summary = SalesSummary::from_sales(&sales);
        assert_eq!(summary.revenue, 1500.0);
        assert_eq!(summary.profit, 500.0);
        assert_eq!(summary.average_sale, 750.0);
        assert_eq!(summary.margin, 33.33);
    }
}
