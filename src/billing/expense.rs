//! Expense and supplier bill tracking

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

use crate::tax::TaxRate;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_name, validate_positive_amount};

/// Input for recording an expense
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub vendor: String,
    pub category: String,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// Gross amount including tax
    pub amount: BigDecimal,
    pub tax_rate: TaxRate,
    pub receipt_ref: Option<String>,
}

impl NewExpense {
    pub fn new(
        vendor: impl Into<String>,
        category: impl Into<String>,
        expense_date: NaiveDate,
        amount: BigDecimal,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            category: category.into(),
            description: None,
            expense_date,
            due_date: None,
            amount,
            tax_rate: TaxRate::zero(),
            receipt_ref: None,
        }
    }
}

/// Spend in one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub count: usize,
    pub net_amount: BigDecimal,
    pub tax_amount: BigDecimal,
    pub gross_amount: BigDecimal,
}

/// Expense manager
pub struct ExpenseManager<S: BillingStorage> {
    pub(crate) storage: S,
}

impl<S: BillingStorage> ExpenseManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Record an unpaid expense, splitting the gross amount into net and tax
    pub async fn create_expense(&mut self, owner_id: &str, input: NewExpense) -> BillingResult<Expense> {
        validate_name("Vendor", &input.vendor)?;
        validate_name("Category", &input.category)?;
        validate_positive_amount(&input.amount)?;

        if input.due_date.is_some_and(|due| due < input.expense_date) {
            return Err(BillingError::Validation(
                "Bill due date precedes the expense date".to_string(),
            ));
        }

        let mut expense = Expense::new(
            owner_id.to_string(),
            input.vendor.trim().to_string(),
            input.category.trim().to_string(),
            input.expense_date,
            input.amount,
            input.tax_rate,
        )?;
        expense.description = input.description;
        expense.due_date = input.due_date;
        expense.receipt_ref = input.receipt_ref;

        self.storage.save_expense(&expense).await?;
        info!(owner_id, vendor = %expense.vendor, amount = %expense.amount, "expense recorded");
        Ok(expense)
    }

    pub async fn get_expense(&self, owner_id: &str, expense_id: Uuid) -> BillingResult<Option<Expense>> {
        self.storage.get_expense(owner_id, expense_id).await
    }

    pub async fn get_expense_required(&self, owner_id: &str, expense_id: Uuid) -> BillingResult<Expense> {
        self.storage
            .get_expense(owner_id, expense_id)
            .await?
            .ok_or_else(|| BillingError::not_found("expense", expense_id))
    }

    /// Expenses matching `filter`, oldest first
    pub async fn list_expenses(&self, owner_id: &str, filter: &ExpenseFilter) -> BillingResult<Vec<Expense>> {
        let mut expenses = self.storage.list_expenses(owner_id, filter).await?;
        expenses.sort_by_key(|e| e.expense_date);
        Ok(expenses)
    }

    /// Settle a bill
    pub async fn mark_paid(
        &mut self,
        owner_id: &str,
        expense_id: Uuid,
        paid_date: NaiveDate,
    ) -> BillingResult<Expense> {
        let mut expense = self.get_expense_required(owner_id, expense_id).await?;
        if expense.status == ExpenseStatus::Paid {
            return Err(BillingError::Validation(format!(
                "Expense {} is already paid",
                expense_id
            )));
        }

        expense.status = ExpenseStatus::Paid;
        expense.paid_date = Some(paid_date);
        expense.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_expense(&expense).await?;

        info!(owner_id, %expense_id, "expense marked paid");
        Ok(expense)
    }

    pub async fn delete_expense(&mut self, owner_id: &str, expense_id: Uuid) -> BillingResult<()> {
        self.get_expense_required(owner_id, expense_id).await?;
        self.storage.delete_expense(owner_id, expense_id).await
    }

    /// Unpaid bills past their due date, most overdue first
    pub async fn overdue_bills(&self, owner_id: &str, today: NaiveDate) -> BillingResult<Vec<Expense>> {
        let filter = ExpenseFilter {
            status: Some(ExpenseStatus::Unpaid),
            ..ExpenseFilter::default()
        };
        let mut bills: Vec<Expense> = self
            .storage
            .list_expenses(owner_id, &filter)
            .await?
            .into_iter()
            .filter(|e| e.is_overdue_on(today))
            .collect();
        bills.sort_by_key(|e| e.due_date);
        Ok(bills)
    }

    /// Spend per category between two dates, inclusive, sorted by category
    pub async fn totals_by_category(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> BillingResult<Vec<CategoryTotal>> {
        let filter = ExpenseFilter {
            from: Some(from),
            to: Some(to),
            ..ExpenseFilter::default()
        };
        let expenses = self.storage.list_expenses(owner_id, &filter).await?;
        Ok(summarize_by_category(&expenses))
    }
}

/// Group expenses by category
pub fn summarize_by_category(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut groups: BTreeMap<&str, CategoryTotal> = BTreeMap::new();
    for expense in expenses {
        let entry = groups
            .entry(expense.category.as_str())
            .or_insert_with(|| CategoryTotal {
                category: expense.category.clone(),
                count: 0,
                net_amount: BigDecimal::from(0),
                tax_amount: BigDecimal::from(0),
                gross_amount: BigDecimal::from(0),
            });
        entry.count += 1;
        entry.net_amount += &expense.net_amount;
        entry.tax_amount += &expense.tax_amount;
        entry.gross_amount += &expense.amount;
    }
    groups.into_values().collect()
}
