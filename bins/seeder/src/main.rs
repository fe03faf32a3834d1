//! Seeder for Caixa development databases.
//!
//! Seeds the payment-method catalog and, with `--demo`, walks one session
//! through open, supply, withdrawal, payment and close.
//!
//! Usage: seeder [--demo]

use std::sync::Arc;

use anyhow::Context;
use caixa_core::cash_register::{CashRegisterService, DeclaredValue, PaymentMethod};
use caixa_db::{CashRegisterRepository, connect};
use caixa_shared::AppConfig;
use caixa_shared::types::{PaymentReferenceId, TenantId, UserId};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Catalog seeded into every environment.
const PAYMENT_METHODS: [(&str, &str); 3] = [("CASH", "Dinheiro"), ("CARD", "Cartao"), ("PIX", "Pix")];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caixa=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let repo = CashRegisterRepository::new(db);

    let mut catalog = Vec::with_capacity(PAYMENT_METHODS.len());
    for (code, name) in PAYMENT_METHODS {
        let method = repo.ensure_payment_method(code, name).await?;
        info!(code, payment_method_id = %method.id, "Payment method ready");
        catalog.push(method);
    }

    if std::env::args().any(|arg| arg == "--demo") {
        let service = CashRegisterService::new(Arc::new(repo), &config.cash_register);
        run_demo(&service, &catalog).await?;
    }

    info!("Seeding complete");
    Ok(())
}

fn method<'a>(catalog: &'a [PaymentMethod], code: &str) -> anyhow::Result<&'a PaymentMethod> {
    catalog
        .iter()
        .find(|pm| pm.code == code)
        .with_context(|| format!("payment method {code} missing from catalog"))
}

async fn run_demo(
    service: &CashRegisterService<CashRegisterRepository>,
    catalog: &[PaymentMethod],
) -> anyhow::Result<()> {
    let cash = method(catalog, "CASH")?;
    let card = method(catalog, "CARD")?;
    let tenant = TenantId::new();
    let operator = UserId::new();

    let session = service
        .open_session(tenant, operator, Decimal::new(10_000, 2), Some("demo".into()))
        .await?;
    service
        .record_supply(session.id, Decimal::new(5_000, 2), None, operator)
        .await?;
    service
        .record_withdrawal(session.id, Decimal::new(3_000, 2), Some("sangria".into()), operator)
        .await?;
    service
        .record_payment(session.id, card.id, Decimal::new(2_000, 2), PaymentReferenceId::new())
        .await?;

    for row in service.compute_expected_values(session.id).await? {
        info!(method = %row.code, expected = %row.expected, "Expected value");
    }

    let declared = vec![
        DeclaredValue::new(cash.id, Decimal::new(11_500, 2)),
        DeclaredValue::new(card.id, Decimal::new(2_000, 2)),
    ];
    service
        .close_session(session.id, Some("demo close".into()), declared)
        .await?;

    for row in service.closing_report(session.id).await? {
        info!(
            method = %row.code,
            expected = %row.expected,
            declared = %row.declared,
            difference = %row.difference,
            "Closing report"
        );
    }

    info!(session_id = %session.id, sequence_number = session.sequence_number, "Demo session closed");
    Ok(())
}
