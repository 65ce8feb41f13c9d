//! Integration tests for invoicing-core

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use invoicing_core::{
    export, parse_statement,
    utils::{EnhancedClientValidator, EnhancedDocumentValidator, MemoryStorage},
    Billing, BillingConfig, BillingError, BillingResult, BillingStorage, CategorizationService,
    Categorizer, DocumentValidator, Frequency, Invoice, InvoiceFilter, InvoiceStatus, KeywordCategorizer, LineItem, MatchResult,
    NewClient, NewExpense, NewInvoice, NewQuote, NewTemplate, PaymentInput, PaymentMethod,
    PaymentStatus, Quote, QuoteStatus, RentManager, TaxRate, YearMonth,
};
use std::str::FromStr;

fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn line(description: &str, quantity: &str, price: &str, rate: &str) -> LineItem {
    LineItem::new(
        description.to_string(),
        dec(quantity),
        dec(price),
        TaxRate::new(dec(rate)).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_quote_to_paid_invoice_workflow() {
    let storage = MemoryStorage::new();
    let mut billing = Billing::new(storage.clone(), BillingConfig::default());

    let client = billing
        .create_client("studio", NewClient::named("Acme Ltd").email("ap@acme.com"))
        .await
        .unwrap();

    // Quote with a 10% discount across mixed tax rates
    let mut input = NewQuote::new(
        client.id,
        date(2024, 4, 2),
        vec![
            line("Brand design", "1", "1000", "20"),
            line("Print run", "250", "0.80", "0"),
        ],
    );
    input.discount_percent = dec("10");
    let quote = billing.create_quote("studio", input).await.unwrap();
    assert_eq!(quote.totals.subtotal, dec("1200"));
    assert_eq!(quote.totals.discount, dec("120"));
    assert_eq!(quote.totals.tax, dec("180"));
    assert_eq!(quote.totals.total, dec("1260"));

    let sent = billing.send_quote("studio", quote.id).await.unwrap();
    let token = sent.acceptance_token.unwrap();
    let accepted = billing.accept_quote(&token, date(2024, 4, 10)).await.unwrap();
    assert_eq!(accepted.status, QuoteStatus::Accepted);

    let (_, invoice) = billing
        .convert_quote("studio", quote.id, date(2024, 4, 12))
        .await
        .unwrap();
    assert_eq!(invoice.number, "INV-2024-0001");
    assert_eq!(invoice.due_date, date(2024, 5, 12));

    billing.send_invoice("studio", invoice.id).await.unwrap();
    billing
        .record_payment(
            "studio",
            invoice.id,
            PaymentInput::new(dec("260"), date(2024, 4, 20), PaymentMethod::Card),
        )
        .await
        .unwrap();
    let paid = billing
        .record_payment(
            "studio",
            invoice.id,
            PaymentInput::new(dec("1000"), date(2024, 5, 1), PaymentMethod::BankTransfer),
        )
        .await
        .unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.balance_due(), dec("0"));

    // Paid invoices are frozen
    let cancel = billing.invoices().cancel_invoice("studio", invoice.id).await;
    assert!(matches!(cancel, Err(BillingError::InvalidTransition { .. })));

    let paid_only = billing
        .list_invoices("studio", &InvoiceFilter::status(InvoiceStatus::Paid))
        .await
        .unwrap();
    assert_eq!(paid_only.len(), 1);
}

#[tokio::test]
async fn test_owner_isolation() {
    let storage = MemoryStorage::new();
    let mut billing = Billing::new(storage.clone(), BillingConfig::default());

    let client = billing
        .create_client("owner-a", NewClient::named("Acme"))
        .await
        .unwrap();

    // Another owner cannot bill the client or see it
    let foreign = billing
        .create_invoice(
            "owner-b",
            NewInvoice::new(client.id, date(2024, 1, 1), vec![line("Work", "1", "10", "0")]),
        )
        .await;
    assert!(matches!(foreign, Err(BillingError::NotFound { .. })));
    assert!(billing.list_clients("owner-b").await.unwrap().is_empty());
    assert!(storage.get_client("owner-b", client.id).await.unwrap().is_none());

    // Numbering is per owner
    let client_b = billing
        .create_client("owner-b", NewClient::named("Bravo"))
        .await
        .unwrap();
    for (owner, client_id) in [("owner-a", client.id), ("owner-b", client_b.id), ("owner-a", client.id)] {
        billing
            .create_invoice(
                owner,
                NewInvoice::new(client_id, date(2024, 1, 1), vec![line("Work", "1", "10", "0")]),
            )
            .await
            .unwrap();
    }
    let numbers: Vec<String> = billing
        .list_invoices("owner-b", &InvoiceFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.number)
        .collect();
    assert_eq!(numbers, vec!["INV-2024-0001"]);
}

#[tokio::test]
async fn test_recurring_job_across_owners() {
    let storage = MemoryStorage::new();
    let mut billing = Billing::new(storage.clone(), BillingConfig::default());

    for owner in ["owner-a", "owner-b"] {
        let client = billing
            .create_client(owner, NewClient::named("Tenant Co"))
            .await
            .unwrap();
        billing
            .create_template(
                owner,
                NewTemplate::new(
                    client.id,
                    "Hosting",
                    vec![line("Managed hosting", "1", "49", "20")],
                    Frequency::Monthly,
                    date(2024, 1, 15),
                ),
            )
            .await
            .unwrap();
    }

    let report = billing.run_recurring(date(2024, 3, 20)).await.unwrap();
    assert_eq!(report.templates_processed, 2);
    assert_eq!(report.invoices_created.len(), 6);
    assert!(report.is_clean());

    let rerun = billing.run_recurring(date(2024, 3, 20)).await.unwrap();
    assert!(rerun.invoices_created.is_empty());

    let invoices = billing
        .list_invoices("owner-a", &InvoiceFilter::default())
        .await
        .unwrap();
    let numbers: Vec<&str> = invoices.iter().map(|i| i.number.as_str()).collect();
    assert_eq!(numbers, vec!["INV-2024-0001", "INV-2024-0002", "INV-2024-0003"]);
    assert!(invoices.iter().all(|i| i.totals.total == dec("58.80")));
}

#[tokio::test]
async fn test_custom_validators() {
    let mut billing = Billing::with_validators(
        MemoryStorage::new(),
        BillingConfig::default(),
        Box::new(EnhancedClientValidator),
        Box::new(EnhancedDocumentValidator),
        Box::new(EnhancedDocumentValidator),
    );
    let client = billing
        .create_client("owner", NewClient::named("Acme"))
        .await
        .unwrap();

    // A free invoice is rejected by the enhanced rules
    let free = billing
        .create_invoice(
            "owner",
            NewInvoice::new(client.id, date(2024, 1, 1), vec![line("Freebie", "1", "0", "0")]),
        )
        .await;
    assert!(matches!(free, Err(BillingError::Validation(_))));
}

/// Accepts quotes, refuses every invoice
struct NoInvoices;

impl DocumentValidator for NoInvoices {
    fn validate_quote(&self, _quote: &Quote) -> BillingResult<()> {
        Ok(())
    }

    fn validate_invoice(&self, _invoice: &Invoice) -> BillingResult<()> {
        Err(BillingError::Validation("invoicing is frozen".to_string()))
    }
}

#[tokio::test]
async fn test_invoice_validator_covers_conversion_and_recurring() {
    let storage = MemoryStorage::new();
    let mut billing = Billing::with_validators(
        storage.clone(),
        BillingConfig::default(),
        Box::new(EnhancedClientValidator),
        Box::new(EnhancedDocumentValidator),
        Box::new(NoInvoices),
    );
    let client = billing
        .create_client("owner", NewClient::named("Acme"))
        .await
        .unwrap();

    // Quote conversion
    let quote = billing
        .create_quote(
            "owner",
            NewQuote::new(client.id, date(2024, 2, 1), vec![line("Audit", "1", "300", "0")]),
        )
        .await
        .unwrap();
    let token = billing
        .send_quote("owner", quote.id)
        .await
        .unwrap()
        .acceptance_token
        .unwrap();
    billing.accept_quote(&token, date(2024, 2, 2)).await.unwrap();
    let converted = billing.convert_quote("owner", quote.id, date(2024, 2, 3)).await;
    assert!(matches!(converted, Err(BillingError::Validation(_))));
    let quote = billing.quotes().get_quote_required("owner", quote.id).await.unwrap();
    assert_eq!(quote.status, QuoteStatus::Accepted);

    // Recurring run
    let template = billing
        .create_template(
            "owner",
            NewTemplate::new(
                client.id,
                "Retainer",
                vec![line("Support", "1", "100", "0")],
                Frequency::Monthly,
                date(2024, 2, 1),
            ),
        )
        .await
        .unwrap();
    let report = billing.run_recurring(date(2024, 2, 1)).await.unwrap();
    assert!(report.invoices_created.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].template_id, template.id);

    let invoices = billing
        .list_invoices("owner", &InvoiceFilter::default())
        .await
        .unwrap();
    assert!(invoices.is_empty());
}

#[tokio::test]
async fn test_rent_reconciliation_from_csv() {
    let storage = MemoryStorage::new();
    let mut rent = RentManager::new(storage.clone(), BillingConfig::default().matcher);

    let john = rent
        .create_tenant("landlord", "John Smith", dec("950"), vec![])
        .await
        .unwrap();
    let maria = rent
        .create_tenant("landlord", "Maria Garcia", dec("1100"), vec!["Garcia M".to_string()])
        .await
        .unwrap();

    let statement = "\
Date,Description,Amount,Reference
2024-03-01,FASTER PAYMENT J SMITH,950.00,RENT
2024-03-03,GARCIA M,600.00,MARCH
2024-03-04,DIRECT DEBIT INSURANCE,-45.00,
2024-03-15,CASH DEPOSIT,1100.00,
2024-04-01,FASTER PAYMENT JOHN SMITH,950.00,RENT
";
    let entries = parse_statement(statement.as_bytes()).unwrap();
    let (results, summary) = rent.reconcile("landlord", &entries).await.unwrap();
    assert_eq!(summary.matched, 3);
    assert_eq!(summary.amount_only, 1);
    assert_eq!(summary.ignored, 1);
    assert!(matches!(results[3], MatchResult::AmountOnly { .. }));

    rent.confirm_matches("landlord", &results).await.unwrap();

    // The cash deposit is booked by hand after checking with the tenant
    rent.confirm("landlord", results[3].entry(), maria.id, None)
        .await
        .unwrap()
        .unwrap();

    let ledger = rent
        .payment_ledger(
            "landlord",
            YearMonth::new(2024, 3).unwrap(),
            YearMonth::new(2024, 4).unwrap(),
        )
        .await
        .unwrap();

    let john_row: Vec<PaymentStatus> = ledger.for_tenant(john.id).map(|r| r.status).collect();
    assert_eq!(john_row, vec![PaymentStatus::Paid, PaymentStatus::Paid]);
    let maria_row: Vec<PaymentStatus> = ledger.for_tenant(maria.id).map(|r| r.status).collect();
    assert_eq!(maria_row, vec![PaymentStatus::Paid, PaymentStatus::Unpaid]);

    let arrears = ledger.arrears();
    let maria_arrears = arrears.iter().find(|a| a.tenant_id == maria.id).unwrap();
    assert_eq!(maria_arrears.arrears, dec("500"));

    // Re-importing the same statement books nothing twice
    let (_, summary) = rent.reconcile("landlord", &entries).await.unwrap();
    assert_eq!(summary.ignored, 5);

    let mut csv = Vec::new();
    export::write_payment_ledger(&mut csv, &ledger).unwrap();
    let csv = String::from_utf8(csv).unwrap();
    assert!(csv.contains("Maria Garcia,2024-03,1100.00,1700.00,paid"));
}

struct ScriptedCategorizer;

#[async_trait::async_trait]
impl Categorizer for ScriptedCategorizer {
    async fn categorize(
        &self,
        descriptions: &[String],
        _categories: &[String],
    ) -> BillingResult<Vec<Option<String>>> {
        Ok(descriptions
            .iter()
            .map(|d| d.contains("retainer").then(|| "consulting".to_string()))
            .collect())
    }
}

#[tokio::test]
async fn test_categorize_and_report_sales() {
    let mut billing = Billing::new(MemoryStorage::new(), BillingConfig::default());
    let client = billing
        .create_client("owner", NewClient::named("Acme"))
        .await
        .unwrap();

    let service = CategorizationService::new(
        vec!["Consulting".to_string(), "Design".to_string()],
        KeywordCategorizer::with_default_rules(),
    )
    .with_primary(Box::new(ScriptedCategorizer));

    for (description, price) in [("Monthly retainer", "500"), ("Logo design", "800"), ("Snacks", "20")] {
        let invoice = billing
            .create_invoice(
                "owner",
                NewInvoice::new(client.id, date(2024, 6, 1), vec![line(description, "1", price, "0")]),
            )
            .await
            .unwrap();
        billing.send_invoice("owner", invoice.id).await.unwrap();
        let categorized = billing
            .categorize_invoice("owner", invoice.id, &service)
            .await
            .unwrap();
        assert_eq!(categorized.status, InvoiceStatus::Sent);
        assert_eq!(categorized.totals.total, dec(price));
    }

    let invoices = billing
        .list_invoices("owner", &InvoiceFilter::default())
        .await
        .unwrap();
    let sales = invoicing_core::sales_by_category(&invoices, date(2024, 6, 1), date(2024, 6, 30));
    let summary: Vec<(&str, String)> = sales
        .iter()
        .map(|s| (s.category.as_str(), s.total_amount.to_string()))
        .collect();
    assert_eq!(summary[0].0, "Design");
    assert_eq!(summary[1].0, "Consulting");
    assert_eq!(summary[2].0, "Uncategorized");
}

#[tokio::test]
async fn test_expenses_and_dashboard() {
    let mut billing = Billing::new(MemoryStorage::new(), BillingConfig::default());

    let mut bill = NewExpense::new("Cloud Co", "Hosting", date(2024, 5, 1), dec("120"));
    bill.tax_rate = TaxRate::new(dec("20")).unwrap();
    bill.due_date = Some(date(2024, 5, 15));
    let bill = billing.create_expense("owner", bill).await.unwrap();
    assert_eq!(bill.net_amount, dec("100"));

    let overdue = billing
        .expenses()
        .overdue_bills("owner", date(2024, 5, 20))
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);

    let dashboard = billing.dashboard("owner", date(2024, 5, 20)).await.unwrap();
    assert_eq!(dashboard.unpaid_bills_count, 1);
    assert_eq!(dashboard.unpaid_bills_amount, dec("120"));

    billing
        .expenses()
        .mark_paid("owner", bill.id, date(2024, 5, 21))
        .await
        .unwrap();
    let dashboard = billing.dashboard("owner", date(2024, 5, 22)).await.unwrap();
    assert_eq!(dashboard.unpaid_bills_count, 0);
}
