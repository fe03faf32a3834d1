//! End-to-end tests of the cash register service over the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use caixa_shared::types::{CashSessionId, PaymentReferenceId, TenantId, UserId};
use caixa_shared::{CashRegisterConfig, ErrorKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::memory::InMemoryLedgerStore;
use super::service::CashRegisterService;
use super::types::{DeclaredValue, PaymentMethod, RecordState, SessionStatus};

struct Till {
    service: CashRegisterService<InMemoryLedgerStore>,
    cash: PaymentMethod,
    card: PaymentMethod,
    tenant: TenantId,
    operator: UserId,
}

fn till() -> Till {
    let cash = PaymentMethod::new("CASH", "Dinheiro");
    let card = PaymentMethod::new("CARD", "Cartao");
    let store = Arc::new(InMemoryLedgerStore::with_payment_methods(vec![
        cash.clone(),
        card.clone(),
    ]));
    Till {
        service: CashRegisterService::new(store, &CashRegisterConfig::default()),
        cash,
        card,
        tenant: TenantId::new(),
        operator: UserId::new(),
    }
}

/// Opens with 100.00 and records supply 50, withdrawal 30, card payment 20.
async fn scenario_a(t: &Till) -> CashSessionId {
    let session = t
        .service
        .open_session(t.tenant, t.operator, dec!(100.00), None)
        .await
        .unwrap();

    t.service
        .record_supply(session.id, dec!(50.00), None, t.operator)
        .await
        .unwrap();
    t.service
        .record_withdrawal(session.id, dec!(30.00), None, t.operator)
        .await
        .unwrap();
    t.service
        .record_payment(session.id, t.card.id, dec!(20.00), PaymentReferenceId::new())
        .await
        .unwrap();

    session.id
}

fn expected_for(rows: &[super::types::ExpectedValueRow], code: &str) -> Decimal {
    rows.iter()
        .find(|r| r.code == code)
        .map_or(Decimal::ZERO, |r| r.expected)
}

#[tokio::test]
async fn test_scenario_a_expected_values() {
    let t = till();
    let session_id = scenario_a(&t).await;

    let rows = t.service.compute_expected_values(session_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(expected_for(&rows, "CASH"), dec!(120.00));
    assert_eq!(expected_for(&rows, "CARD"), dec!(20.00));
}

#[tokio::test]
async fn test_scenario_b_variance_does_not_block_close() {
    let t = till();
    let session_id = scenario_a(&t).await;
    let declared = vec![
        DeclaredValue::new(t.cash.id, dec!(115.00)),
        DeclaredValue::new(t.card.id, dec!(20.00)),
    ];

    let variance = t
        .service
        .compare_at_close(session_id, &declared)
        .await
        .unwrap();
    let cash_row = variance.iter().find(|r| r.code == "CASH").unwrap();
    let card_row = variance.iter().find(|r| r.code == "CARD").unwrap();
    assert_eq!(cash_row.difference, dec!(-5.00));
    assert_eq!(card_row.difference, dec!(0.00));

    t.service
        .close_session(session_id, Some("faltou troco".into()), declared)
        .await
        .unwrap();

    let session = t.service.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Closed);

    let report = t.service.closing_report(session_id).await.unwrap();
    assert_eq!(report, variance);
}

#[tokio::test]
async fn test_scenario_c_no_writes_after_close() {
    let t = till();
    let session_id = scenario_a(&t).await;
    t.service
        .close_session(session_id, None, vec![])
        .await
        .unwrap();
    let before = t.service.compute_expected_values(session_id).await.unwrap();

    let err = t
        .service
        .record_withdrawal(session_id, dec!(10.00), None, t.operator)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let after = t.service.compute_expected_values(session_id).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(
        t.service
            .list_movements(session_id, true)
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scenario_d_concurrent_supplies_get_distinct_numbers() {
    let t = Arc::new(till());
    let session_id = t
        .service
        .open_session(t.tenant, t.operator, dec!(0), None)
        .await
        .unwrap()
        .id;

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                t.service
                    .record_supply(session_id, dec!(10.00), None, t.operator)
                    .await
            })
        })
        .collect();

    let mut seqs = HashSet::new();
    for handle in handles {
        let movement = handle.await.unwrap().unwrap();
        seqs.insert(movement.sequence_number);
    }
    assert_eq!(seqs, HashSet::from([1, 2]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_records_are_dense() {
    let t = Arc::new(till());
    let session_id = t
        .service
        .open_session(t.tenant, t.operator, dec!(0), None)
        .await
        .unwrap()
        .id;

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let t = Arc::clone(&t);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    t.service
                        .record_supply(session_id, dec!(1), None, t.operator)
                        .await
                } else {
                    t.service
                        .record_payment(session_id, t.card.id, dec!(1), PaymentReferenceId::new())
                        .await
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let seqs: Vec<i64> = t
        .service
        .list_movements(session_id, true)
        .await
        .unwrap()
        .iter()
        .map(|m| m.sequence_number)
        .collect();
    assert_eq!(seqs, (1..=50).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_invalid_amount_writes_nothing() {
    let t = till();
    let session_id = scenario_a(&t).await;

    let err = t
        .service
        .record_supply(session_id, dec!(0), None, t.operator)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(
        t.service
            .list_movements(session_id, true)
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn test_closed_iff_closed_at_iff_declared_rows() {
    let t = till();
    let session_id = scenario_a(&t).await;

    let open = t.service.get_session(session_id).await.unwrap();
    assert_eq!(open.status, SessionStatus::Open);
    assert!(open.closed_at.is_none());
    assert!(t.service.declared_values(session_id).await.unwrap().is_empty());

    t.service
        .close_session(
            session_id,
            None,
            vec![DeclaredValue::new(t.cash.id, dec!(120.00))],
        )
        .await
        .unwrap();

    let closed = t.service.get_session(session_id).await.unwrap();
    assert_eq!(closed.status, SessionStatus::Closed);
    assert!(closed.closed_at.is_some());
    assert_eq!(t.service.declared_values(session_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_close_leaves_session_open() {
    let t = till();
    let session_id = scenario_a(&t).await;

    let err = t
        .service
        .close_session(
            session_id,
            None,
            vec![DeclaredValue::new(t.cash.id, dec!(-1))],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = t
        .service
        .close_session(
            session_id,
            None,
            vec![DeclaredValue::new(
                caixa_shared::types::PaymentMethodId::new(),
                dec!(1),
            )],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let session = t.service.get_session(session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Open);
    assert!(session.closed_at.is_none());
    assert!(t.service.declared_values(session_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_double_close_is_invalid_state() {
    let t = till();
    let session_id = scenario_a(&t).await;
    t.service
        .close_session(session_id, None, vec![])
        .await
        .unwrap();

    let err = t
        .service
        .close_session(session_id, None, vec![])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_remove_after_close_changes_expected() {
    let t = till();
    let session_id = scenario_a(&t).await;
    let withdrawal = t
        .service
        .list_movements(session_id, false)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.sequence_number == 2)
        .unwrap();

    t.service
        .close_session(session_id, None, vec![])
        .await
        .unwrap();
    t.service.remove_movement(withdrawal.id).await.unwrap();

    let rows = t.service.compute_expected_values(session_id).await.unwrap();
    assert_eq!(expected_for(&rows, "CASH"), dec!(150.00));

    let removed = t
        .service
        .list_movements(session_id, true)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.id == withdrawal.id)
        .unwrap();
    assert_eq!(removed.record_state, RecordState::Deleted);

    let err = t.service.remove_movement(withdrawal.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_closing_report_requires_closed_session() {
    let t = till();
    let session_id = scenario_a(&t).await;

    let err = t.service.closing_report(session_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_current_session_tracks_lifecycle() {
    let t = till();
    assert!(
        t.service
            .current_session(t.tenant, t.operator)
            .await
            .unwrap()
            .is_none()
    );

    let first = t
        .service
        .open_session(t.tenant, t.operator, dec!(10), None)
        .await
        .unwrap();
    let current = t
        .service
        .current_session(t.tenant, t.operator)
        .await
        .unwrap();
    assert_eq!(current.map(|s| s.id), Some(first.id));

    t.service
        .close_session(first.id, None, vec![])
        .await
        .unwrap();
    assert!(
        t.service
            .current_session(t.tenant, t.operator)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_current_session_falls_back_to_latest_open() {
    let t = till();
    let first = t
        .service
        .open_session(t.tenant, t.operator, dec!(10), None)
        .await
        .unwrap();
    let second = t
        .service
        .open_session(t.tenant, t.operator, dec!(20), None)
        .await
        .unwrap();

    t.service.delete_session(second.id).await.unwrap();

    let current = t
        .service
        .current_session(t.tenant, t.operator)
        .await
        .unwrap();
    assert_eq!(current.map(|s| s.id), Some(first.id));
}

#[tokio::test]
async fn test_current_session_ignores_other_operators() {
    let t = till();
    t.service
        .open_session(t.tenant, UserId::new(), dec!(10), None)
        .await
        .unwrap();

    assert!(
        t.service
            .current_session(t.tenant, t.operator)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_delete_session_twice_is_not_found() {
    let t = till();
    let session_id = scenario_a(&t).await;

    t.service.delete_session(session_id).await.unwrap();
    let err = t.service.delete_session(session_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let session = t.service.get_session(session_id).await.unwrap();
    assert_eq!(session.record_state, RecordState::Deleted);
    assert!(t.service.list_open_sessions(t.tenant).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_cash_method_is_not_found() {
    let card = PaymentMethod::new("CARD", "Cartao");
    let service = CashRegisterService::new(
        Arc::new(InMemoryLedgerStore::with_payment_methods(vec![card])),
        &CashRegisterConfig::default(),
    );
    let session = service
        .open_session(TenantId::new(), UserId::new(), dec!(10), None)
        .await
        .unwrap();

    let err = service
        .compute_expected_values(session.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_out_of_range_amounts_are_validation_errors() {
    let t = till();
    let session = t
        .service
        .open_session(t.tenant, t.operator, dec!(0), None)
        .await
        .unwrap();

    let open = t
        .service
        .open_session(t.tenant, t.operator, Decimal::MAX, None)
        .await
        .unwrap_err();
    assert_eq!(open.kind(), ErrorKind::Validation);

    let supply = t
        .service
        .record_supply(session.id, dec!(0.00001), None, t.operator)
        .await
        .unwrap_err();
    assert_eq!(supply.kind(), ErrorKind::Validation);

    let close = t
        .service
        .close_session(
            session.id,
            None,
            vec![DeclaredValue::new(t.cash.id, dec!(1.23456))],
        )
        .await
        .unwrap_err();
    assert_eq!(close.kind(), ErrorKind::Validation);
    assert_eq!(
        t.service.get_session(session.id).await.unwrap().status,
        SessionStatus::Open
    );
}

#[tokio::test]
async fn test_overflowing_totals_return_errors() {
    use super::store::LedgerStore;
    use super::types::{NewCashSession, NewMovement};
    use caixa_shared::types::PositiveAmount;

    let cash = PaymentMethod::new("CASH", "Dinheiro");
    let store = Arc::new(InMemoryLedgerStore::with_payment_methods(vec![cash.clone()]));
    let service = CashRegisterService::new(Arc::clone(&store), &CashRegisterConfig::default());
    let operator = UserId::new();
    let large = PositiveAmount::new(dec!(999999999999999)).unwrap();

    let huge = store
        .create_session(NewCashSession {
            tenant_id: TenantId::new(),
            operator_id: operator,
            opening_amount: Decimal::MAX,
            opening_note: None,
        })
        .await
        .unwrap();
    store
        .append_movement(NewMovement::supply(huge.id, large, None, operator))
        .await
        .unwrap();
    let err = service.compute_expected_values(huge.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let session = service
        .open_session(TenantId::new(), operator, dec!(0), None)
        .await
        .unwrap();
    service
        .record_withdrawal(session.id, large.get(), None, operator)
        .await
        .unwrap();
    let err = service
        .compare_at_close(session.id, &[DeclaredValue::new(cash.id, Decimal::MAX)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
