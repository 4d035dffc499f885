//! Database-backed stock tests
//!
//! Run with a PostgreSQL `DATABASE_URL` and `cargo test -- --ignored`. Each
//! test gets a fresh database with the migrations applied.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    AdjustmentReason, CreateAdjustmentInput, CreateMaterialInput, CreateStockInInput,
    CreateStockOutInput, CreateSupplierInput, DateRange, MaterialUnit,
};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use warehouse_inventory_backend::{
    error::AppError,
    services::{
        Actor, AdjustmentService, MaterialService, StockInService, StockOutService,
        SupplierService,
    },
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

async fn seed_material(pool: &PgPool, opening_stock: &str) -> (Uuid, Uuid) {
    let supplier = SupplierService::new(pool.clone())
        .create(
            &Actor::default(),
            CreateSupplierInput {
                name: "CV Sumber Makmur".to_string(),
                contact_person: None,
                phone: None,
                email: None,
                address: None,
            },
        )
        .await
        .unwrap();

    let material_id = add_material(pool, "RM-001", supplier.id, opening_stock).await;
    (material_id, supplier.id)
}

async fn add_material(pool: &PgPool, code: &str, supplier_id: Uuid, opening_stock: &str) -> Uuid {
    let material = MaterialService::new(pool.clone())
        .create(
            &Actor::default(),
            CreateMaterialInput {
                code: code.to_string(),
                name: "Steel Sheet".to_string(),
                description: None,
                category_id: None,
                default_supplier_id: Some(supplier_id),
                unit: MaterialUnit::Pcs,
                min_stock: Some(dec("10")),
                reorder_point: Some(dec("20")),
                unit_price: Some(dec("1500")),
                opening_stock: Some(dec(opening_stock)),
            },
            today(),
        )
        .await
        .unwrap();

    material.material.id
}

async fn current_stock(pool: &PgPool, material_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT current_stock FROM materials WHERE id = $1")
        .bind(material_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn receipt(material_id: Uuid, supplier_id: Uuid, quantity: &str, reference: Option<&str>) -> CreateStockInInput {
    CreateStockInInput {
        material_id,
        supplier_id,
        quantity: dec(quantity),
        unit_price: dec("1500"),
        transaction_date: Some(today()),
        reference_number: reference.map(str::to_string),
        invoice_number: None,
        notes: None,
    }
}

fn issue(material_id: Uuid, quantity: &str) -> CreateStockOutInput {
    issue_for(material_id, quantity, "production")
}

fn issue_for(material_id: Uuid, quantity: &str, usage_type: &str) -> CreateStockOutInput {
    CreateStockOutInput {
        material_id,
        quantity: dec(quantity),
        usage_type: usage_type.to_string(),
        destination: None,
        transaction_date: Some(today()),
        reference_number: None,
        notes: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_receive_issue_count_and_unwind(pool: PgPool) {
    let actor = Actor::default();
    let (material_id, supplier_id) = seed_material(&pool, "50").await;
    assert_eq!(current_stock(&pool, material_id).await, dec("50"));

    let stock_in = StockInService::new(pool.clone());
    let stock_out = StockOutService::new(pool.clone());
    let adjustments = AdjustmentService::new(pool.clone());

    let received = stock_in
        .create(&actor, receipt(material_id, supplier_id, "20", None), today())
        .await
        .unwrap();
    assert_eq!(received.stock_before, dec("50"));
    assert_eq!(received.stock_after, dec("70"));
    assert_eq!(received.record.reference_number, "IN202401150001");
    assert_eq!(received.record.total_price, dec("30000"));

    let issued = stock_out
        .create(&actor, issue(material_id, "30"), today())
        .await
        .unwrap();
    assert_eq!(issued.stock_after, dec("40"));

    let counted = adjustments
        .create(
            &actor,
            CreateAdjustmentInput {
                material_id,
                new_stock: dec("35"),
                reason: AdjustmentReason::Damage,
                notes: None,
            },
            today(),
        )
        .await
        .unwrap();
    assert_eq!(counted.record.difference, dec("-5"));
    assert_eq!(current_stock(&pool, material_id).await, dec("35"));

    // The receipt predates the count, so it cannot be removed yet
    let err = stock_in.delete(&actor, received.record.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::BusinessRule { code: "OUT_OF_ORDER_DELETION", .. }
    ));

    adjustments.delete(&actor, counted.record.id).await.unwrap();
    assert_eq!(current_stock(&pool, material_id).await, dec("40"));

    stock_out.delete(&actor, issued.record.id).await.unwrap();
    assert_eq!(current_stock(&pool, material_id).await, dec("70"));

    let undone = stock_in.delete(&actor, received.record.id).await.unwrap();
    assert_eq!(undone.stock_after, dec("50"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_overdraw_leaves_stock_untouched(pool: PgPool) {
    let (material_id, _) = seed_material(&pool, "10").await;

    let err = StockOutService::new(pool.clone())
        .create(&Actor::default(), issue(material_id, "15"), today())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert_eq!(current_stock(&pool, material_id).await, dec("10"));

    let issues: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_out")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(issues, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_concurrent_issues_never_overdraw(pool: PgPool) {
    let (material_id, _) = seed_material(&pool, "50").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = StockOutService::new(pool.clone());
        handles.push(tokio::spawn(async move {
            service
                .create(&Actor::default(), issue(material_id, "10"), today())
                .await
        }));
    }

    let mut succeeded = 0;
    let mut references = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(movement) => {
                succeeded += 1;
                references.push(movement.record.reference_number);
            }
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 5);
    assert_eq!(current_stock(&pool, material_id).await, Decimal::ZERO);

    references.sort();
    references.dedup();
    assert_eq!(references.len(), 5);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_references_sequence_and_reject_duplicates(pool: PgPool) {
    let actor = Actor::default();
    let (material_id, supplier_id) = seed_material(&pool, "0").await;
    let service = StockInService::new(pool.clone());

    let first = service
        .create(&actor, receipt(material_id, supplier_id, "1", None), today())
        .await
        .unwrap();
    let second = service
        .create(&actor, receipt(material_id, supplier_id, "1", None), today())
        .await
        .unwrap();
    assert_eq!(first.record.reference_number, "IN202401150001");
    assert_eq!(second.record.reference_number, "IN202401150002");
    assert!(second.record.stock_version > first.record.stock_version);

    let supplied = service
        .create(
            &actor,
            receipt(material_id, supplier_id, "1", Some("PO-2024-77")),
            today(),
        )
        .await
        .unwrap();
    assert_eq!(supplied.record.reference_number, "PO-2024-77");

    let err = service
        .create(
            &actor,
            receipt(material_id, supplier_id, "1", Some("PO-2024-77")),
            today(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateEntry(_)));

    let err = service
        .create(
            &actor,
            receipt(material_id, supplier_id, "1", Some("IN202401154294967295")),
            today(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let third = service
        .create(&actor, receipt(material_id, supplier_id, "1", None), today())
        .await
        .unwrap();
    assert_eq!(third.record.reference_number, "IN202401150003");
    assert_eq!(current_stock(&pool, material_id).await, dec("4"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_reversal_below_zero_blocked(pool: PgPool) {
    let actor = Actor::default();
    let (material_id, supplier_id) = seed_material(&pool, "0").await;

    let received = StockInService::new(pool.clone())
        .create(&actor, receipt(material_id, supplier_id, "20", None), today())
        .await
        .unwrap();
    StockOutService::new(pool.clone())
        .create(&actor, issue(material_id, "15"), today())
        .await
        .unwrap();

    let err = StockInService::new(pool.clone())
        .delete(&actor, received.record.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::BusinessRule { code: "REVERSAL_BELOW_ZERO", .. }
    ));
    assert_eq!(current_stock(&pool, material_id).await, dec("5"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_concurrent_adjustment_and_receipt_keep_both_effects(pool: PgPool) {
    let (material_id, supplier_id) = seed_material(&pool, "50").await;

    let adjustments = AdjustmentService::new(pool.clone());
    let stock_in = StockInService::new(pool.clone());

    let counted = tokio::spawn(async move {
        adjustments
            .create(
                &Actor::default(),
                CreateAdjustmentInput {
                    material_id,
                    new_stock: dec("30"),
                    reason: AdjustmentReason::CountCorrection,
                    notes: None,
                },
                today(),
            )
            .await
    });
    let received = tokio::spawn(async move {
        stock_in
            .create(&Actor::default(), receipt(material_id, supplier_id, "20", None), today())
            .await
    });

    let counted = counted.await.unwrap().unwrap().record;
    let received = received.await.unwrap().unwrap();

    assert_eq!(counted.old_stock + counted.difference, dec("30"));
    let final_stock = current_stock(&pool, material_id).await;

    if counted.stock_version > received.record.stock_version {
        // The count saw the receipt
        assert_eq!(counted.old_stock, dec("70"));
        assert_eq!(counted.difference, dec("-40"));
        assert_eq!(final_stock, dec("30"));
    } else {
        // The receipt landed on top of the count
        assert_eq!(counted.old_stock, dec("50"));
        assert_eq!(counted.difference, dec("-20"));
        assert_eq!(received.stock_before, dec("30"));
        assert_eq!(final_stock, dec("50"));
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_report_usage_breakdown_follows_material_filter(pool: PgPool) {
    let actor = Actor::default();
    let (steel, supplier_id) = seed_material(&pool, "50").await;
    let bolts = add_material(&pool, "RM-002", supplier_id, "50").await;

    let service = StockOutService::new(pool.clone());
    service
        .create(&actor, issue_for(steel, "10", "production"), today())
        .await
        .unwrap();
    service
        .create(&actor, issue_for(bolts, "5", "maintenance"), today())
        .await
        .unwrap();

    let range = DateRange::new(today(), today()).unwrap();

    let steel_only = service.report(range, Some(steel)).await.unwrap();
    assert_eq!(steel_only.total_transactions, 1);
    assert_eq!(steel_only.total_quantity, dec("10"));
    assert_eq!(steel_only.by_usage_type.len(), 1);
    assert_eq!(steel_only.by_usage_type[0].usage_type, "production");
    assert_eq!(steel_only.by_usage_type[0].total_quantity, dec("10"));

    let everything = service.report(range, None).await.unwrap();
    assert_eq!(everything.total_transactions, 2);
    assert_eq!(everything.by_usage_type.len(), 2);
}
