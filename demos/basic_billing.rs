//! Basic billing example: quote, invoice, payments and a recurring run

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use invoicing_core::utils::MemoryStorage;
use invoicing_core::{
    export, telemetry, Billing, BillingConfig, Frequency, InvoiceFilter, LineItem, NewClient,
    NewQuote, NewTemplate, PaymentInput, PaymentMethod, TaxRate,
};

fn item(description: &str, quantity: i64, price: i64, rate: i64) -> Result<LineItem, Box<dyn std::error::Error>> {
    Ok(LineItem::new(
        description.to_string(),
        BigDecimal::from(quantity),
        BigDecimal::from(price),
        TaxRate::new(BigDecimal::from(rate))?,
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BillingConfig::load()?;
    telemetry::init(&config.telemetry)?;

    println!("🧾 Invoicing Core - Basic Billing Example\n");

    let owner = "studio-1";
    let mut billing = Billing::new(MemoryStorage::new(), config);

    // 1. Client and quote
    let client = billing
        .create_client(owner, NewClient::named("Acme Ltd").email("accounts@acme.example"))
        .await?;
    println!("👤 Client: {} ({})", client.name, client.id);

    let issued = NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("bad date")?;
    let quote = billing
        .create_quote(
            owner,
            NewQuote::new(
                client.id,
                issued,
                vec![item("Website design", 1, 2400, 20)?, item("Hosting setup", 1, 150, 20)?],
            ),
        )
        .await?;
    println!(
        "📝 Quote {}: subtotal {} tax {} total {}",
        quote.number, quote.totals.subtotal, quote.totals.tax, quote.totals.total
    );

    // 2. The client signs off through the emailed token
    let sent = billing.send_quote(owner, quote.id).await?;
    let token = sent.acceptance_token.ok_or("quote has no token")?;
    billing.accept_quote(&token, issued).await?;

    let (_, invoice) = billing.convert_quote(owner, quote.id, issued).await?;
    billing.send_invoice(owner, invoice.id).await?;
    println!("📨 Invoice {} due {}", invoice.number, invoice.due_date);

    // 3. Two instalments settle it
    let half = &invoice.totals.total / BigDecimal::from(2);
    for day in [10, 25] {
        let paid_on = NaiveDate::from_ymd_opt(2024, 3, day).ok_or("bad date")?;
        let updated = billing
            .record_payment(owner, invoice.id, PaymentInput::new(half.clone(), paid_on, PaymentMethod::BankTransfer))
            .await?;
        println!("  💰 {} received, status {}", half, updated.status);
    }

    // 4. A monthly retainer caught up to today
    billing
        .create_template(
            owner,
            NewTemplate::new(
                client.id,
                "Support retainer",
                vec![item("Monthly support", 1, 300, 20)?],
                Frequency::Monthly,
                issued,
            ),
        )
        .await?;
    let today = NaiveDate::from_ymd_opt(2024, 5, 15).ok_or("bad date")?;
    let report = billing.run_recurring(today).await?;
    println!("\n🔁 Recurring run created {} invoices", report.invoices_created.len());

    let dashboard = billing.dashboard(owner, today).await?;
    println!("📊 Outstanding {} ({} drafts)", dashboard.outstanding, dashboard.draft_count);

    // 5. Invoice register as CSV
    let invoices = billing.list_invoices(owner, &InvoiceFilter::default()).await?;
    let clients = billing.list_clients(owner).await?;
    println!("\n📄 Invoice register:");
    export::write_invoices(std::io::stdout(), &invoices, &clients)?;

    Ok(())
}
