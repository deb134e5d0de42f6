//! Basic accounting usage example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use fiscal_core::journal::entry::{LineInput, NewEntry};
use fiscal_core::{
    Account, AccountType, AccountingEngine, BankTransaction, DeclarationType, MatchType,
    MemoryStorage, ReconciliationRule,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Fiscal Core - Basic Accounting Example\n");

    // Create a new engine with in-memory storage
    let mut engine = AccountingEngine::new(MemoryStorage::new());

    // 1. Set up a minimal chart of accounts (Spanish PGC codes)
    println!("📊 Setting up Chart of Accounts...");
    for (code, name, kind) in [
        ("572000", "Bancos", AccountType::Asset),
        ("430000", "Clientes", AccountType::Asset),
        ("472000", "IVA soportado", AccountType::Asset),
        ("100000", "Capital social", AccountType::Equity),
        ("477000", "IVA repercutido", AccountType::Liability),
        ("700000", "Ventas", AccountType::Income),
        ("600000", "Compras", AccountType::Expense),
    ] {
        engine
            .save_account(&Account::new(code, name, kind))
            .await?;
        println!("  ✓ Created account: {code} - {name} ({kind:?})");
    }
    println!();

    // 2. Seed the fiscal year with monthly periods
    println!("📅 Seeding fiscal year 2025...");
    let periods = engine.create_year(2025).await?;
    println!("  ✓ {} periods, {} .. {}\n", periods.len(), periods[0].name, periods[11].name);

    // 3. Record some business activity
    println!("💰 Recording Business Transactions...\n");

    let investment = engine
        .create_entry(NewEntry::new(
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            "Aportación de capital",
            vec![
                LineInput::debit("572000", BigDecimal::from(10000)),
                LineInput::credit("100000", BigDecimal::from(10000)),
            ],
        ))
        .await?;
    engine.post_entry(investment.id).await?;
    println!("  ✓ Posted: capital contribution of €10,000");

    let sale = engine
        .create_entry(NewEntry::new(
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            "Factura emitida",
            vec![
                LineInput::debit("430000", BigDecimal::from(1210)),
                LineInput::credit("700000", BigDecimal::from(1000)),
                LineInput::credit("477000", BigDecimal::from(210)),
            ],
        ))
        .await?;
    engine.post_entry(sale.id).await?;
    println!("  ✓ Posted: sale of €1,000 + €210 VAT");

    let purchase = engine
        .create_entry(NewEntry::new(
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            "Factura recibida",
            vec![
                LineInput::debit("600000", BigDecimal::from(400)),
                LineInput::debit("472000", BigDecimal::from(84)),
                LineInput::credit("572000", BigDecimal::from(484)),
            ],
        ))
        .await?;
    engine.post_entry(purchase.id).await?;
    println!("  ✓ Posted: purchase of €400 + €84 VAT\n");

    // 4. Generate statements
    println!("📈 Financial Statements...");
    let trial_balance = engine.trial_balance(periods[0].id).await?;
    println!(
        "  Trial balance ({}): {} rows, balanced = {}",
        trial_balance.period_name,
        trial_balance.rows.len(),
        trial_balance.balanced
    );

    let end_of_january = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let balance_sheet = engine.balance_sheet(end_of_january).await?;
    println!(
        "  Balance sheet: assets = {}, net result = {}",
        balance_sheet.total_assets, balance_sheet.net_result
    );

    let income = engine
        .income_statement(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), end_of_january)
        .await?;
    println!(
        "  Income statement: income = {}, expenses = {}, net = {}\n",
        income.total_income, income.total_expenses, income.net_profit
    );

    // 5. Reconcile a bank statement
    println!("🏦 Bank Reconciliation...");
    let bank_account = Uuid::new_v4();
    engine
        .save_rule(&ReconciliationRule::new(
            1,
            "description",
            MatchType::Contains,
            "AMAZON",
            "Compras online",
        ))
        .await?;
    engine
        .save_bank_transaction(&BankTransaction::new(
            bank_account,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            "AMAZON WEB SERVICES EMEA",
            BigDecimal::from(-120),
        ))
        .await?;
    let outcome = engine.auto_reconcile(bank_account).await?;
    println!(
        "  ✓ Reconciled {} transaction(s), {} unmatched\n",
        outcome.reconciled.len(),
        outcome.unmatched.len()
    );

    // 6. Compute the January VAT declaration (modelo 303)
    println!("🧮 VAT Declaration...");
    let declaration = engine
        .generate_declaration(DeclarationType::Modelo303, periods[0].id)
        .await?;
    println!(
        "  ✓ {} due {}: result = {}",
        declaration.declaration_period, declaration.due_date, declaration.total_amount
    );

    Ok(())
}
