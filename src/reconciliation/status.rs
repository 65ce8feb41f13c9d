//! Monthly payment status per tenant

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::types::*;

/// Aggregate state of a tenant's rent for one month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Partial,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Unpaid => "unpaid",
        }
    }

    /// Classify a month given what was due and what arrived
    pub fn classify(expected: &BigDecimal, paid: &BigDecimal) -> Self {
        let zero = BigDecimal::from(0);
        if paid >= expected {
            PaymentStatus::Paid
        } else if *paid > zero {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cell of the payment grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPaymentStatus {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub period: YearMonth,
    pub expected: BigDecimal,
    pub paid: BigDecimal,
    pub status: PaymentStatus,
}

impl MonthlyPaymentStatus {
    /// Amount still missing for the month, never negative
    pub fn shortfall(&self) -> BigDecimal {
        let missing = &self.expected - &self.paid;
        if missing > BigDecimal::from(0) {
            missing
        } else {
            BigDecimal::from(0)
        }
    }
}

/// Status of `tenant` for `month`, summing every payment attributed to it
pub fn monthly_status(
    tenant: &RentTenant,
    payments: &[RentPayment],
    month: YearMonth,
) -> MonthlyPaymentStatus {
    let paid: BigDecimal = payments
        .iter()
        .filter(|p| p.tenant_id == tenant.id && p.applies_to() == month)
        .map(|p| &p.amount)
        .sum();

    MonthlyPaymentStatus {
        tenant_id: tenant.id,
        tenant_name: tenant.name.clone(),
        period: month,
        status: PaymentStatus::classify(&tenant.monthly_rent, &paid),
        expected: tenant.monthly_rent.clone(),
        paid,
    }
}

/// Outstanding rent of one tenant over a ledger's range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantArrears {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub expected: BigDecimal,
    pub paid: BigDecimal,
    /// Expected minus paid, floored at zero
    pub arrears: BigDecimal,
    pub unpaid_months: usize,
    pub partial_months: usize,
}

/// Tenant-by-month grid of payment statuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLedger {
    pub from: YearMonth,
    pub to: YearMonth,
    /// Tenant order as given, months ascending within each tenant
    pub rows: Vec<MonthlyPaymentStatus>,
}

impl PaymentLedger {
    /// Build the grid for `tenants` between two months, inclusive.
    ///
    /// An inverted range yields an empty grid.
    pub fn build(
        tenants: &[RentTenant],
        payments: &[RentPayment],
        from: YearMonth,
        to: YearMonth,
    ) -> Self {
        // Bucket once instead of scanning every payment per cell
        let mut buckets: HashMap<(Uuid, YearMonth), BigDecimal> = HashMap::new();
        for payment in payments {
            *buckets
                .entry((payment.tenant_id, payment.applies_to()))
                .or_insert_with(|| BigDecimal::from(0)) += &payment.amount;
        }

        let mut rows = Vec::new();
        if from <= to {
            for tenant in tenants {
                for period in from.through(to) {
                    let paid = buckets
                        .get(&(tenant.id, period))
                        .cloned()
                        .unwrap_or_else(|| BigDecimal::from(0));
                    rows.push(MonthlyPaymentStatus {
                        tenant_id: tenant.id,
                        tenant_name: tenant.name.clone(),
                        period,
                        status: PaymentStatus::classify(&tenant.monthly_rent, &paid),
                        expected: tenant.monthly_rent.clone(),
                        paid,
                    });
                }
            }
        }

        Self { from, to, rows }
    }

    pub fn statuses(&self) -> &[MonthlyPaymentStatus] {
        &self.rows
    }

    pub fn for_tenant(&self, tenant_id: Uuid) -> impl Iterator<Item = &MonthlyPaymentStatus> {
        self.rows.iter().filter(move |row| row.tenant_id == tenant_id)
    }

    pub fn for_month(&self, period: YearMonth) -> impl Iterator<Item = &MonthlyPaymentStatus> {
        self.rows.iter().filter(move |row| row.period == period)
    }

    /// Months covered by the grid
    pub fn months(&self) -> Vec<YearMonth> {
        if self.from > self.to {
            return Vec::new();
        }
        self.from.through(self.to).collect()
    }

    /// Per-tenant arrears in the order tenants appear in the grid
    pub fn arrears(&self) -> Vec<TenantArrears> {
        let mut order: Vec<Uuid> = Vec::new();
        let mut totals: HashMap<Uuid, TenantArrears> = HashMap::new();

        for row in &self.rows {
            let entry = totals.entry(row.tenant_id).or_insert_with(|| {
                order.push(row.tenant_id);
                TenantArrears {
                    tenant_id: row.tenant_id,
                    tenant_name: row.tenant_name.clone(),
                    expected: BigDecimal::from(0),
                    paid: BigDecimal::from(0),
                    arrears: BigDecimal::from(0),
                    unpaid_months: 0,
                    partial_months: 0,
                }
            });
            entry.expected += &row.expected;
            entry.paid += &row.paid;
            match row.status {
                PaymentStatus::Unpaid => entry.unpaid_months += 1,
                PaymentStatus::Partial => entry.partial_months += 1,
                PaymentStatus::Paid => {}
            }
        }

        order
            .into_iter()
            .filter_map(|id| totals.remove(&id))
            .map(|mut tenant| {
                let owed = &tenant.expected - &tenant.paid;
                if owed > BigDecimal::from(0) {
                    tenant.arrears = owed;
                }
                tenant
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn month(value: &str) -> YearMonth {
        value.parse().unwrap()
    }

    fn pay(tenant: &RentTenant, y: i32, m: u32, d: u32, amount: &str) -> RentPayment {
        RentPayment::new(
            "owner".to_string(),
            tenant.id,
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            dec(amount),
        )
    }

    #[test]
    fn test_classify() {
        assert_eq!(PaymentStatus::classify(&dec("900"), &dec("900")), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::classify(&dec("900"), &dec("950")), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::classify(&dec("900"), &dec("0.01")), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::classify(&dec("900"), &dec("0")), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_monthly_status_sums_split_payments() {
        let tenant = RentTenant::new("owner".to_string(), "John Smith".to_string(), dec("900"));
        let payments = vec![
            pay(&tenant, 2024, 3, 1, "400"),
            pay(&tenant, 2024, 3, 15, "500"),
            pay(&tenant, 2024, 4, 2, "100"),
        ];

        let march = monthly_status(&tenant, &payments, month("2024-03"));
        assert_eq!(march.paid, dec("900"));
        assert_eq!(march.status, PaymentStatus::Paid);

        let april = monthly_status(&tenant, &payments, month("2024-04"));
        assert_eq!(april.status, PaymentStatus::Partial);
        assert_eq!(april.shortfall(), dec("800"));
    }

    #[test]
    fn test_explicit_period_overrides_payment_date() {
        let tenant = RentTenant::new("owner".to_string(), "John Smith".to_string(), dec("900"));
        let mut late = pay(&tenant, 2024, 4, 3, "900");
        late.period = Some(month("2024-03"));

        let payments = vec![late];
        assert_eq!(
            monthly_status(&tenant, &payments, month("2024-03")).status,
            PaymentStatus::Paid
        );
        assert_eq!(
            monthly_status(&tenant, &payments, month("2024-04")).status,
            PaymentStatus::Unpaid
        );
    }

    #[test]
    fn test_ledger_grid_and_arrears() {
        let john = RentTenant::new("owner".to_string(), "John Smith".to_string(), dec("900"));
        let maria = RentTenant::new("owner".to_string(), "Maria Garcia".to_string(), dec("1100"));
        let payments = vec![
            pay(&john, 2024, 1, 1, "900"),
            pay(&john, 2024, 2, 1, "450"),
            pay(&maria, 2024, 1, 3, "1100"),
            pay(&maria, 2024, 2, 3, "1100"),
            pay(&maria, 2024, 3, 3, "1200"),
        ];

        let ledger = PaymentLedger::build(
            &[john.clone(), maria.clone()],
            &payments,
            month("2024-01"),
            month("2024-03"),
        );
        assert_eq!(ledger.rows.len(), 6);
        assert_eq!(ledger.months().len(), 3);

        let john_row: Vec<PaymentStatus> = ledger.for_tenant(john.id).map(|r| r.status).collect();
        assert_eq!(
            john_row,
            vec![PaymentStatus::Paid, PaymentStatus::Partial, PaymentStatus::Unpaid]
        );
        assert_eq!(ledger.for_month(month("2024-02")).count(), 2);

        let arrears = ledger.arrears();
        assert_eq!(arrears[0].tenant_id, john.id);
        assert_eq!(arrears[0].arrears, dec("1350"));
        assert_eq!(arrears[0].unpaid_months, 1);
        assert_eq!(arrears[0].partial_months, 1);
        // Overpayment does not go negative
        assert_eq!(arrears[1].arrears, dec("0"));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let john = RentTenant::new("owner".to_string(), "John Smith".to_string(), dec("900"));
        let ledger = PaymentLedger::build(&[john], &[], month("2024-05"), month("2024-01"));
        assert!(ledger.rows.is_empty());
        assert!(ledger.months().is_empty());
    }
}
