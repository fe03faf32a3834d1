//! Property-based tests for the reconciliation engine.

use caixa_shared::types::{
    CashSessionId, MovementId, PaymentMethodId, PaymentReferenceId, PositiveAmount, TenantId,
    UserId,
};
use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::reconciliation::{compare, expected_values};
use super::types::{
    CashSession, DeclaredValue, ExpectedValueRow, LedgerMovement, MovementKind, PaymentMethod,
    RecordState, SessionStatus,
};

const CASH: &str = "CASH";

fn catalog() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod::new("CASH", "Cash"),
        PaymentMethod::new("CARD", "Card"),
        PaymentMethod::new("PIX", "Pix"),
    ]
}

fn session(opening: Decimal) -> CashSession {
    CashSession {
        id: CashSessionId::new(),
        sequence_number: 1,
        tenant_id: TenantId::new(),
        operator_id: UserId::new(),
        opened_at: Utc::now(),
        closed_at: None,
        opening_amount: opening,
        opening_note: None,
        closing_note: None,
        status: SessionStatus::Open,
        record_state: RecordState::Active,
    }
}

/// Strategy for strictly positive amounts with two decimal places.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for non-negative opening floats.
fn opening_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..500_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// (kind, catalog index for payments, amount)
fn movement_spec_strategy() -> impl Strategy<Value = (MovementKind, usize, Decimal)> {
    (
        prop_oneof![
            Just(MovementKind::Withdrawal),
            Just(MovementKind::Supply),
            Just(MovementKind::Payment),
        ],
        0usize..3,
        amount_strategy(),
    )
}

fn build_movements(
    session: &CashSession,
    catalog: &[PaymentMethod],
    specs: &[(MovementKind, usize, Decimal)],
) -> Vec<LedgerMovement> {
    specs
        .iter()
        .zip(1i64..)
        .map(|(&(kind, method_idx, amount), seq)| LedgerMovement {
            id: MovementId::new(),
            session_id: session.id,
            sequence_number: seq,
            kind,
            payment_method_id: (kind == MovementKind::Payment).then(|| catalog[method_idx].id),
            amount: PositiveAmount::new(amount).unwrap(),
            note: None,
            payment_reference_id: (kind == MovementKind::Payment).then(PaymentReferenceId::new),
            authorized_by: (kind != MovementKind::Payment).then(UserId::new),
            record_state: RecordState::Active,
            created_at: Utc::now(),
        })
        .collect()
}

fn total_for(rows: &[ExpectedValueRow], id: PaymentMethodId) -> Decimal {
    rows.iter()
        .find(|r| r.payment_method_id == id)
        .map_or(Decimal::ZERO, |r| r.expected)
}

fn target_method(movement: &LedgerMovement, cash_id: PaymentMethodId) -> PaymentMethodId {
    if movement.targets_cash() {
        cash_id
    } else {
        movement.payment_method_id.unwrap_or(cash_id)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Computing twice over the same inputs yields identical rows.
    #[test]
    fn prop_expected_values_idempotent(
        opening in opening_strategy(),
        specs in prop::collection::vec(movement_spec_strategy(), 0..30),
    ) {
        let catalog = catalog();
        let s = session(opening);
        let movements = build_movements(&s, &catalog, &specs);

        let first = expected_values(&s, &movements, &catalog, CASH).unwrap();
        let second = expected_values(&s, &movements, &catalog, CASH).unwrap();
        prop_assert_eq!(first, second);
    }

    /// The grand total equals opening + supplies + payments - withdrawals.
    #[test]
    fn prop_expected_total_matches_signed_sum(
        opening in opening_strategy(),
        specs in prop::collection::vec(movement_spec_strategy(), 0..30),
    ) {
        let catalog = catalog();
        let s = session(opening);
        let movements = build_movements(&s, &catalog, &specs);

        let rows = expected_values(&s, &movements, &catalog, CASH).unwrap();
        let total: Decimal = rows.iter().map(|r| r.expected).sum();
        let signed: Decimal = movements.iter().map(LedgerMovement::signed_amount).sum();
        prop_assert_eq!(total, opening + signed);
    }

    /// Soft-deleting one movement shifts exactly its own method by its signed amount.
    #[test]
    fn prop_removal_reverts_exact_contribution(
        opening in opening_strategy(),
        specs in prop::collection::vec(movement_spec_strategy(), 1..30),
        pick in any::<prop::sample::Index>(),
    ) {
        let catalog = catalog();
        let cash_id = catalog[0].id;
        let s = session(opening);
        let mut movements = build_movements(&s, &catalog, &specs);

        let before = expected_values(&s, &movements, &catalog, CASH).unwrap();

        let idx = pick.index(movements.len());
        movements[idx].record_state = RecordState::Deleted;
        let removed = movements[idx].clone();

        let after = expected_values(&s, &movements, &catalog, CASH).unwrap();

        let target = target_method(&removed, cash_id);
        for pm in &catalog {
            let delta = total_for(&before, pm.id) - total_for(&after, pm.id);
            if pm.id == target {
                prop_assert_eq!(delta, removed.signed_amount());
            } else {
                prop_assert_eq!(delta, Decimal::ZERO);
            }
        }
    }

    /// Declaring exactly the expected amounts yields zero variance everywhere.
    #[test]
    fn prop_declaring_expected_balances(
        opening in opening_strategy(),
        specs in prop::collection::vec(movement_spec_strategy(), 0..30),
    ) {
        let catalog = catalog();
        let s = session(opening);
        let movements = build_movements(&s, &catalog, &specs);

        let expected = expected_values(&s, &movements, &catalog, CASH).unwrap();
        let declared: Vec<DeclaredValue> = expected
            .iter()
            .map(|r| DeclaredValue::new(r.payment_method_id, r.expected))
            .collect();

        let rows = compare(&expected, &declared, &catalog).unwrap();
        prop_assert_eq!(rows.len(), expected.len());
        prop_assert!(rows.iter().all(|r| r.difference.is_zero()));
    }
}
