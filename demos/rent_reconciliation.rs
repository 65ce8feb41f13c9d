//! Rent reconciliation example: import a statement and build the payment grid

use bigdecimal::BigDecimal;
use invoicing_core::utils::MemoryStorage;
use invoicing_core::{export, parse_statement, telemetry, BillingConfig, MatchResult, RentManager, YearMonth};

const STATEMENT: &str = "\
Date,Description,Amount,Reference
01/03/2024,FASTER PAYMENT J SMITH,950.00,RENT MARCH
02/03/2024,GARCIA M,1100.00,FLAT 2
04/03/2024,DIRECT DEBIT INSURANCE,-45.00,
15/03/2024,CASH DEPOSIT,700.00,
01/04/2024,FASTER PAYMENT JOHN SMITH,950.00,RENT APRIL
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BillingConfig::load()?;
    telemetry::init(&config.telemetry)?;

    println!("🏠 Invoicing Core - Rent Reconciliation Example\n");

    let owner = "landlord-1";
    let mut rent = RentManager::new(MemoryStorage::new(), config.matcher.clone());

    rent.create_tenant(owner, "John Smith", BigDecimal::from(950), vec![]).await?;
    rent.create_tenant(owner, "Maria Garcia", BigDecimal::from(1100), vec!["Garcia M".to_string()])
        .await?;
    rent.create_tenant(owner, "Ali Khan", BigDecimal::from(700), vec![]).await?;

    let entries = parse_statement(STATEMENT.as_bytes())?;
    let (results, summary) = rent.reconcile(owner, &entries).await?;

    for result in &results {
        let entry = result.entry();
        let outcome = match result {
            MatchResult::Matched { candidate, .. } => {
                format!("✓ {} (score {:.2})", candidate.tenant_name, candidate.score)
            }
            MatchResult::Ambiguous { candidates, .. } => format!("? {} candidates", candidates.len()),
            MatchResult::AmountOnly { candidate, .. } => format!("~ {} by amount", candidate.tenant_name),
            MatchResult::Unmatched { .. } => "✗ no match".to_string(),
            MatchResult::Ignored { reason, .. } => format!("- ignored ({:?})", reason),
        };
        println!("  {} {:>10} {:<30} {}", entry.date, entry.amount, entry.description, outcome);
    }
    println!(
        "\n📈 {} of {} entries matched ({:.0}%)",
        summary.matched,
        summary.total(),
        summary.match_rate() * 100.0
    );

    let booked = rent.confirm_matches(owner, &results).await?;
    println!("💾 Booked {} payments\n", booked.len());

    let from = YearMonth::new(2024, 3).ok_or("bad month")?;
    let to = YearMonth::new(2024, 4).ok_or("bad month")?;
    let ledger = rent.payment_ledger(owner, from, to).await?;

    println!("📅 Payment grid:");
    export::write_payment_ledger(std::io::stdout(), &ledger)?;

    println!("\n⚠️  Arrears:");
    for tenant in ledger.arrears() {
        if tenant.arrears > BigDecimal::from(0) {
            println!("  {} owes {}", tenant.tenant_name, tenant.arrears);
        }
    }

    Ok(())
}
