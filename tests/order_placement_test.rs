//! Checkout flow over the full router: stock reservation, totals and
//! all-or-nothing behaviour.

mod common;

use axum::http::{Method, StatusCode};
use common::{money, shipping_address, TestApp};
use regex::Regex;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn place(app: &TestApp, items: Value) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        "/api/orders",
        Some(json!({
            "items": items,
            "shippingAddress": shipping_address(),
            "deliveryType": "delivery",
        })),
        None,
    )
    .await
}

#[tokio::test]
async fn order_within_stock_decrements_the_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("PIN-001", 450, 5, None).await;
    let id = product["id"].as_str().unwrap();

    let (status, body) = place(
        &app,
        json!([{ "productId": id, "size": "M", "quantity": 3 }]),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["paymentMethod"], "cash-on-delivery");
    assert_eq!(order["items"][0]["color"], "Default");
    assert_eq!(order["items"][0]["sku"], "PIN-001");
    assert_eq!(order["items"][0]["image"], "/img/PIN-001-front.jpg");

    let pattern = Regex::new(r"^ORD-[0-9A-Z]+-[0-9A-Z]{4}$").unwrap();
    assert!(pattern.is_match(order["orderNumber"].as_str().unwrap()));

    assert_eq!(app.stock_of(id, "M", "Default").await, 2);
}

#[tokio::test]
async fn order_beyond_stock_fails_without_side_effects() {
    let app = TestApp::new().await;
    let product = app.seed_product("PIN-002", 450, 2, None).await;
    let id = product["id"].as_str().unwrap();

    let (status, body) = place(
        &app,
        json!([{ "productId": id, "size": "M", "quantity": 5 }]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(
        body["message"].as_str().unwrap().contains("Available: 2"),
        "{body}"
    );
    assert_eq!(app.stock_of(id, "M", "Default").await, 2);

    let (_, orders) = app
        .request_authenticated(Method::GET, "/api/orders/admin/all", None)
        .await;
    assert_eq!(orders["total"], 0);
}

#[tokio::test]
async fn failing_line_rolls_back_earlier_lines() {
    let app = TestApp::new().await;
    let first = app.seed_product("KIT-001", 300, 10, None).await;
    let second = app.seed_product("KIT-002", 300, 1, None).await;
    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();

    let (status, _) = place(
        &app,
        json!([
            { "productId": first_id, "size": "M", "quantity": 4 },
            { "productId": second_id, "size": "M", "quantity": 2 },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(first_id, "M", "Default").await, 10);
    assert_eq!(app.stock_of(second_id, "M", "Default").await, 1);
}

#[tokio::test]
async fn repeated_lines_for_one_product_share_the_stock() {
    let app = TestApp::new().await;
    let product = app.seed_product("SOCK-01", 80, 5, None).await;
    let id = product["id"].as_str().unwrap();

    let (status, body) = place(
        &app,
        json!([
            { "productId": id, "size": "M", "quantity": 3 },
            { "product": id, "size": "M", "quantity": 3 },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Available: 2"));
    assert_eq!(app.stock_of(id, "M", "Default").await, 5);
}

#[tokio::test]
async fn shipping_is_charged_up_to_the_threshold() {
    let app = TestApp::new().await;
    let cheap = app.seed_product("TIE-001", 250, 10, None).await;
    let blazer = app.seed_product("BLZ-001", 1600, 10, None).await;

    let (status, body) = place(
        &app,
        json!([{ "productId": cheap["id"], "size": "M", "quantity": 2 }]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(money(&body["data"]["subtotal"]), dec!(500));
    assert_eq!(money(&body["data"]["shippingCharges"]), dec!(99));
    assert_eq!(money(&body["data"]["total"]), dec!(599));

    let (status, body) = place(
        &app,
        json!([{ "productId": blazer["id"], "size": "M", "quantity": 2 }]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(money(&body["data"]["subtotal"]), dec!(3200));
    assert_eq!(money(&body["data"]["shippingCharges"]), dec!(0));
    assert_eq!(money(&body["data"]["total"]), dec!(3200));
}

#[tokio::test]
async fn empty_cart_and_unknown_products_are_rejected() {
    let app = TestApp::new().await;

    let (status, body) = place(&app, json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order must have at least one item");

    let missing = uuid::Uuid::new_v4();
    let (status, body) = place(
        &app,
        json!([{ "productId": missing, "size": "M", "quantity": 1 }]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("not found or inactive"));
}

#[tokio::test]
async fn retired_products_cannot_be_ordered() {
    let app = TestApp::new().await;
    let product = app.seed_product("OLD-001", 200, 5, None).await;
    let id = product["id"].as_str().unwrap();

    let (status, _) = app
        .request_authenticated(Method::DELETE, &format!("/api/products/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = place(&app, json!([{ "productId": id, "size": "M", "quantity": 1 }])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.stock_of(id, "M", "Default").await, 5);
}

#[tokio::test]
async fn store_pickup_requires_a_pickup_time() {
    let app = TestApp::new().await;
    let product = app.seed_product("BAG-001", 700, 5, None).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(json!({
                "items": [{ "productId": product["id"], "size": "M", "quantity": 1 }],
                "shippingAddress": shipping_address(),
                "deliveryType": "store-pickup",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(json!({
                "items": [{ "productId": product["id"], "size": "M", "quantity": 1 }],
                "shippingAddress": shipping_address(),
                "deliveryType": "store-pickup",
                "pickupTime": "2030-06-01T10:00:00Z",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["deliveryType"], "store-pickup");
    assert!(body["data"]["pickupTime"].is_string());
}

#[tokio::test]
async fn orders_are_found_by_number_and_managed_by_admins() {
    let app = TestApp::new().await;
    let product = app.seed_product("SHOE-01", 1200, 5, None).await;

    let (_, body) = place(
        &app,
        json!([{ "productId": product["id"], "size": "M", "quantity": 1 }]),
    )
    .await;
    let number = body["data"]["orderNumber"].as_str().unwrap().to_string();
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, found) = app
        .request(Method::GET, &format!("/api/orders/number/{number}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["data"]["id"], order_id.as_str());

    let (status, _) = app
        .request(Method::GET, "/api/orders/number/ORD-NOPE-0000", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/orders/admin/{order_id}"),
            Some(json!({ "status": "shipped", "paymentStatus": "paid" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["data"]["status"], "shipped");

    let (status, body) = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/orders/admin/{order_id}"),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot change order status from shipped to confirmed");

    let (status, stats) = app
        .request_authenticated(Method::GET, "/api/orders/admin/stats", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["data"]["totalOrders"], 1);
    assert_eq!(stats["data"]["pendingOrders"], 0);
    assert_eq!(money(&stats["data"]["totalRevenue"]), dec!(1299));
}

#[tokio::test]
async fn order_admin_routes_require_a_token() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(Method::GET, "/api/orders/admin/all", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, no token");
}

#[tokio::test]
async fn checkout_ignores_a_client_supplied_user_and_expands_products() {
    let app = TestApp::new().await;
    let product = app.seed_product("CAP-001", 150, 4, None).await;
    let id = product["id"].as_str().unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(json!({
                "items": [{ "productId": id, "size": "M", "quantity": 1 }],
                "shippingAddress": shipping_address(),
                "userId": uuid::Uuid::new_v4(),
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"]["userId"].is_null());

    let line = &body["data"]["items"][0];
    assert_eq!(line["productId"], id);
    assert_eq!(line["product"]["id"], id);
    assert_eq!(line["product"]["sku"], "CAP-001");
    assert_eq!(line["product"]["isActive"], true);
    assert!(line["product"].get("stock").is_none());

    let number = body["data"]["orderNumber"].as_str().unwrap();
    let (_, found) = app
        .request(Method::GET, &format!("/api/orders/number/{number}"), None, None)
        .await;
    assert_eq!(found["data"]["items"][0]["product"]["sku"], "CAP-001");
}
