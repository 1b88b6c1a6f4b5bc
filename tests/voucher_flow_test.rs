mod common;

use std::collections::BTreeMap;

use sea_orm::EntityTrait;

use karni_inventory_api::entities::stock_movement::{self, MovementDirection};
use karni_inventory_api::entities::{stock_location_total, voucher, voucher_line};
use karni_inventory_api::errors::ServiceError;
use karni_inventory_api::services::products::ProductKey;
use karni_inventory_api::services::stock_queries::{StockRow, StockView};
use karni_inventory_api::services::vouchers::{
    PostIncomingRequest, PostSaleRequest, PostTransferRequest, VoucherLineInput,
};

use common::TestApp;

fn line(item: &str, quantity: i64) -> VoucherLineInput {
    VoucherLineInput {
        item: item.to_string(),
        series: "A".to_string(),
        category: "Shirt".to_string(),
        quantity,
        size_breakdown: None,
    }
}

fn line_with_sizes(item: &str, quantity: i64, sizes: &[(&str, i64)]) -> VoucherLineInput {
    VoucherLineInput {
        size_breakdown: Some(
            sizes
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..line(item, quantity)
    }
}

fn incoming(location: &str, lines: Vec<VoucherLineInput>) -> PostIncomingRequest {
    PostIncomingRequest {
        location: location.to_string(),
        external_ref: None,
        posted_by: "tester".to_string(),
        lines,
    }
}

fn sale(location: &str, lines: Vec<VoucherLineInput>) -> PostSaleRequest {
    PostSaleRequest {
        location: location.to_string(),
        customer: "M/s Sharma Textiles".to_string(),
        external_ref: None,
        posted_by: "tester".to_string(),
        lines,
    }
}

fn transfer(from: &str, to: &str, lines: Vec<VoucherLineInput>) -> PostTransferRequest {
    PostTransferRequest {
        from_location: from.to_string(),
        to_location: to.to_string(),
        posted_by: "tester".to_string(),
        lines,
    }
}

fn key(item: &str) -> ProductKey {
    ProductKey::new(item, "A", "Shirt").unwrap()
}

#[tokio::test]
async fn incoming_registers_products_and_builds_stock() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    let receipt = vouchers
        .post_incoming(incoming(
            "Jaipur",
            vec![line("1001", 10), line("1002", 4)],
        ))
        .await
        .unwrap();
    assert_eq!(receipt.line_count, 2);
    assert_eq!(receipt.movement_count, 2);
    assert_eq!(receipt.products_created, 2);

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("1001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, 10);
    assert_eq!(detail.by_location.len(), 1);
    assert_eq!(detail.by_location[0].location, "Jaipur");
    assert_eq!(detail.by_location[0].quantity, 10);

    // A second incoming for a known triple does not create it again.
    let receipt = vouchers
        .post_incoming(incoming("Jaipur", vec![line("1001", 5)]))
        .await
        .unwrap();
    assert_eq!(receipt.products_created, 0);

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("1001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, 15);
}

#[tokio::test]
async fn receive_sell_transfer_walkthrough() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;
    let stock = &app.state.services.stock;

    vouchers
        .post_incoming(incoming("Jaipur", vec![line("7001", 10)]))
        .await
        .unwrap();
    let detail = stock.stock_for_product(&key("7001")).await.unwrap();
    assert_eq!(detail.total_quantity, 10);
    assert_eq!(detail.by_location[0].quantity, 10);

    vouchers
        .post_sale(sale("Jaipur", vec![line("7001", 4)]))
        .await
        .unwrap();
    let detail = stock.stock_for_product(&key("7001")).await.unwrap();
    assert_eq!(detail.total_quantity, 6);

    vouchers
        .post_transfer(transfer("Jaipur", "Kolkata", vec![line("7001", 2)]))
        .await
        .unwrap();
    let detail = stock.stock_for_product(&key("7001")).await.unwrap();
    assert_eq!(detail.total_quantity, 6);
    let by_location: BTreeMap<_, _> = detail
        .by_location
        .iter()
        .map(|l| (l.location.clone(), l.quantity))
        .collect();
    assert_eq!(by_location["Jaipur"], 4);
    assert_eq!(by_location["Kolkata"], 2);
}

#[tokio::test]
async fn sale_of_unknown_product_rolls_back_whole_voucher() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    vouchers
        .post_incoming(incoming("Jaipur", vec![line("1001", 10)]))
        .await
        .unwrap();

    // Second line names a product that was never registered; the first
    // line must not be applied either.
    let err = vouchers
        .post_sale(sale("Jaipur", vec![line("1001", 3), line("9999", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ProductNotFound(_)));

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("1001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, 10);

    // Only the incoming voucher exists; the failed sale left no rows.
    let headers = voucher::Entity::find().all(&*app.state.db_pool).await.unwrap();
    assert_eq!(headers.len(), 1);
    let lines = voucher_line::Entity::find()
        .all(&*app.state.db_pool)
        .await
        .unwrap();
    assert_eq!(lines.len(), 1);
    let movements = stock_movement::Entity::find()
        .all(&*app.state.db_pool)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn transfer_moves_stock_without_changing_the_total() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    vouchers
        .post_incoming(incoming("Jaipur", vec![line("1001", 10)]))
        .await
        .unwrap();

    let receipt = vouchers
        .post_transfer(transfer("Jaipur", "Kolkata", vec![line("1001", 4)]))
        .await
        .unwrap();
    // One line, two ledger legs.
    assert_eq!(receipt.line_count, 1);
    assert_eq!(receipt.movement_count, 2);

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("1001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, 10);
    let by_location: BTreeMap<_, _> = detail
        .by_location
        .iter()
        .map(|l| (l.location.clone(), l.quantity))
        .collect();
    assert_eq!(by_location["Jaipur"], 6);
    assert_eq!(by_location["Kolkata"], 4);

    let legs = app
        .state
        .services
        .movements
        .movements_for_voucher(receipt.voucher_id)
        .await
        .unwrap();
    assert_eq!(legs.len(), 2);
    assert!(legs
        .iter()
        .any(|m| m.direction == "out" && m.location == "Jaipur"));
    assert!(legs
        .iter()
        .any(|m| m.direction == "in" && m.location == "Kolkata"));
}

#[tokio::test]
async fn transfer_between_identical_locations_is_rejected() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .vouchers
        .post_transfer(transfer("Jaipur", "Jaipur", vec![line("1001", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn transfer_of_unknown_product_fails() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .vouchers
        .post_transfer(transfer("Jaipur", "Kolkata", vec![line("404", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ProductNotFound(_)));
}

#[tokio::test]
async fn stock_may_go_negative() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    vouchers
        .post_incoming(incoming("Jaipur", vec![line("1001", 2)]))
        .await
        .unwrap();
    // Oversold on the shop floor; the ledger records it as-is.
    vouchers
        .post_sale(sale("Jaipur", vec![line("1001", 5)]))
        .await
        .unwrap();

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("1001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, -3);
}

#[tokio::test]
async fn size_totals_track_only_the_online_location() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    // Kolkata is not the online location; sizes are ignored there.
    vouchers
        .post_incoming(incoming(
            "Kolkata",
            vec![line_with_sizes("2001", 10, &[("M", 4), ("L", 6)])],
        ))
        .await
        .unwrap();
    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("2001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, 10);
    assert!(detail.by_size.is_empty());

    // At Jaipur the per-size projection is maintained on both sides.
    vouchers
        .post_incoming(incoming(
            "Jaipur",
            vec![line_with_sizes("2001", 10, &[("M", 4), ("L", 6)])],
        ))
        .await
        .unwrap();
    vouchers
        .post_sale(sale(
            "Jaipur",
            vec![line_with_sizes("2001", 3, &[("M", 1), ("L", 2)])],
        ))
        .await
        .unwrap();

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("2001"))
        .await
        .unwrap();
    let by_size: BTreeMap<_, _> = detail
        .by_size
        .iter()
        .map(|s| (s.size_code.clone(), s.quantity))
        .collect();
    assert_eq!(by_size["M"], 3);
    assert_eq!(by_size["L"], 4);
}

#[tokio::test]
async fn mismatched_size_breakdown_is_rejected_before_posting() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .vouchers
        .post_incoming(incoming(
            "Jaipur",
            vec![line_with_sizes("2002", 10, &[("M", 3), ("L", 6)])],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Nothing was written.
    let headers = voucher::Entity::find().all(&*app.state.db_pool).await.unwrap();
    assert!(headers.is_empty());
}

#[tokio::test]
async fn empty_voucher_is_rejected() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .vouchers
        .post_incoming(incoming("Jaipur", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn aggregates_equal_the_ledger_fold() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    vouchers
        .post_incoming(incoming(
            "Jaipur",
            vec![line("3001", 20), line("3002", 7)],
        ))
        .await
        .unwrap();
    vouchers
        .post_transfer(transfer("Jaipur", "Kolkata", vec![line("3001", 5)]))
        .await
        .unwrap();
    vouchers
        .post_sale(sale("Kolkata", vec![line("3001", 2)]))
        .await
        .unwrap();
    vouchers
        .post_sale(sale("Jaipur", vec![line("3002", 7)]))
        .await
        .unwrap();

    for item in ["3001", "3002"] {
        let folded: i64 = stock_movement::Entity::find()
            .all(&*app.state.db_pool)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.item == item)
            .map(|m| {
                MovementDirection::from_str(&m.direction)
                    .expect("ledger holds a valid direction")
                    .sign()
                    * m.quantity
            })
            .sum();

        let detail = app
            .state
            .services
            .stock
            .stock_for_product(&key(item))
            .await
            .unwrap();
        assert_eq!(detail.total_quantity, folded, "item {item}");

        // Location rows always sum back to the global figure.
        let location_sum: i64 = detail.by_location.iter().map(|l| l.quantity).sum();
        assert_eq!(location_sum, detail.total_quantity, "item {item}");
    }

    // And no location row exists without a product behind it.
    let location_rows = stock_location_total::Entity::find()
        .all(&*app.state.db_pool)
        .await
        .unwrap();
    assert_eq!(location_rows.len(), 3); // 3001 in two places, 3002 in one
}

#[tokio::test]
async fn availability_view_hides_quantities() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    vouchers
        .post_incoming(incoming("Jaipur", vec![line("4001", 6)]))
        .await
        .unwrap();
    vouchers
        .post_incoming(incoming("Jaipur", vec![line("4002", 5)]))
        .await
        .unwrap();

    let (rows, total) = app
        .state
        .services
        .stock
        .list_summary(StockView::Availability, 1, 50)
        .await
        .unwrap();
    assert_eq!(total, 2);

    let mut seen = BTreeMap::new();
    for row in rows {
        match row {
            StockRow::Availability {
                item, availability, ..
            } => {
                seen.insert(item, availability);
            }
            other => panic!("expected availability rows, got {other:?}"),
        }
    }
    // Strictly above the threshold counts as available; at it does not.
    assert_eq!(seen["4001"], "Available");
    assert_eq!(seen["4002"], "Out of stock");

    let (rows, total) = app
        .state
        .services
        .stock
        .list_summary(StockView::Hidden, 1, 50)
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn hidden_view_lists_nothing_even_with_stock() {
    let app = TestApp::new().await;
    app.state
        .services
        .vouchers
        .post_incoming(incoming("Jaipur", vec![line("8001", 30)]))
        .await
        .unwrap();

    let (rows, total) = app
        .state
        .services
        .stock
        .list_summary(StockView::Hidden, 1, 50)
        .await
        .unwrap();
    assert!(rows.is_empty(), "hidden view must list nothing");
    assert_eq!(total, 0);

    // The same caller still sees nothing on later pages.
    let (rows, _) = app
        .state
        .services
        .stock
        .list_summary(StockView::Hidden, 2, 10)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn incoming_and_sale_commute_across_submission_order() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    vouchers
        .post_incoming(incoming(
            "Jaipur",
            vec![line("9001", 10), line("9002", 10)],
        ))
        .await
        .unwrap();

    // The same +5/-3 pair, submitted in opposite orders.
    vouchers
        .post_incoming(incoming("Jaipur", vec![line("9001", 5)]))
        .await
        .unwrap();
    vouchers
        .post_sale(sale("Jaipur", vec![line("9001", 3)]))
        .await
        .unwrap();

    vouchers
        .post_sale(sale("Jaipur", vec![line("9002", 3)]))
        .await
        .unwrap();
    vouchers
        .post_incoming(incoming("Jaipur", vec![line("9002", 5)]))
        .await
        .unwrap();

    let stock = &app.state.services.stock;
    let a = stock.stock_for_product(&key("9001")).await.unwrap();
    let b = stock.stock_for_product(&key("9002")).await.unwrap();
    assert_eq!(a.total_quantity, 12);
    assert_eq!(b.total_quantity, a.total_quantity);
    assert_eq!(a.by_location[0].quantity, b.by_location[0].quantity);
}

#[tokio::test]
async fn concurrent_sales_lose_no_deltas() {
    let app = TestApp::new().await;
    let vouchers = app.state.services.vouchers.clone();

    vouchers
        .post_incoming(incoming("Jaipur", vec![line("6001", 100)]))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let vouchers = vouchers.clone();
        handles.push(tokio::spawn(async move {
            vouchers
                .post_sale(sale("Jaipur", vec![line("6001", 3)]))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("6001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, 70);
}

#[tokio::test]
async fn whitespace_in_the_triple_resolves_to_the_same_product() {
    let app = TestApp::new().await;
    let vouchers = &app.state.services.vouchers;

    vouchers
        .post_incoming(incoming("Jaipur", vec![line("5001", 4)]))
        .await
        .unwrap();

    let padded = VoucherLineInput {
        item: " 5001 ".to_string(),
        series: "A ".to_string(),
        category: " Shirt".to_string(),
        quantity: 2,
        size_breakdown: None,
    };
    let receipt = vouchers
        .post_incoming(incoming("Jaipur", vec![padded]))
        .await
        .unwrap();
    assert_eq!(receipt.products_created, 0);

    let detail = app
        .state
        .services
        .stock
        .stock_for_product(&key("5001"))
        .await
        .unwrap();
    assert_eq!(detail.total_quantity, 6);
}
