//! `/Order` endpoints.
//!
//! State transitions (cancel, sold, refund) are plain POSTs carrying the
//! order id; the backend decides the resulting `OrderStateId`.

use crate::api::{self, ApiClient, ApiError};
use crate::models::{Order, OrderCost, OrderDraft, OrderRange, OrderRef};

pub async fn get_by_id(client: &ApiClient, order_id: i64) -> Result<Order, ApiError> {
    super::fetch(
        client,
        &format!("get order {order_id}"),
        &format!("/Order/{order_id}"),
    )
    .await
}

/// Orders the backend considers inside `[dt_begin, dt_end]` (`YYYY-MM-DD`).
pub async fn get_range(
    client: &ApiClient,
    dt_begin: &str,
    dt_end: &str,
) -> Result<OrderRange, ApiError> {
    super::fetch(
        client,
        "get order range",
        &format!("/Order/Range?dtBegin={dt_begin}&dtEnd={dt_end}"),
    )
    .await
}

pub async fn create(client: &ApiClient, draft: &OrderDraft) -> Result<Option<Order>, ApiError> {
    post_order(client, "create order", "/Order/Create", draft).await
}

pub async fn create_editable(
    client: &ApiClient,
    draft: &OrderDraft,
) -> Result<Option<Order>, ApiError> {
    post_order(client, "create editable order", "/Order/CreateEditable", draft).await
}

/// Price a draft without creating it.
pub async fn cost(client: &ApiClient, draft: &OrderDraft) -> Result<OrderCost, ApiError> {
    let result: Result<OrderCost, ApiError> = async {
        let value = client.post("/Order/Cost", draft).await?;
        api::decode("/Order/Cost", value)
    }
    .await;
    result.inspect_err(|e| api::log_failure("order cost", e))
}

pub async fn cancel(client: &ApiClient, order_id: i64) -> Result<Option<Order>, ApiError> {
    transition(client, "cancel", "/Order/Cancel", order_id).await
}

pub async fn sold(client: &ApiClient, order_id: i64) -> Result<Option<Order>, ApiError> {
    transition(client, "sell", "/Order/Sold", order_id).await
}

pub async fn refund(client: &ApiClient, order_id: i64) -> Result<Option<Order>, ApiError> {
    transition(client, "refund", "/Order/Refund", order_id).await
}

async fn post_order(
    client: &ApiClient,
    operation: &str,
    path: &str,
    draft: &OrderDraft,
) -> Result<Option<Order>, ApiError> {
    let result: Result<Option<Order>, ApiError> = async {
        if draft.items.is_empty() {
            return Err(ApiError::Validation("Order has no line items".into()));
        }
        let value = client.post(path, draft).await?;
        api::decode_optional(path, value)
    }
    .await;
    match &result {
        Ok(_) => api::log_success(operation),
        Err(e) => api::log_failure(operation, e),
    }
    result
}

async fn transition(
    client: &ApiClient,
    action: &str,
    path: &str,
    order_id: i64,
) -> Result<Option<Order>, ApiError> {
    let operation = format!("{action} order {order_id}");
    let result: Result<Option<Order>, ApiError> = async {
        if order_id <= 0 {
            return Err(ApiError::Validation(format!("Missing OrderId to {action}")));
        }
        let value = client.post(path, &OrderRef { order_id }).await?;
        api::decode_optional(path, value)
    }
    .await;
    match &result {
        Ok(_) => api::log_success(&operation),
        Err(e) => api::log_failure(&operation, e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderItem;
    use crate::test_support::CannedServer;

    #[tokio::test]
    async fn range_passes_dates_as_query() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"Order":[{"OrderId":5,"OrderStateId":1,"Service":[{"ServiceId":2,"DtVisit":"2025-05-02"}]}]}"#.into(),
        )])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        let range = get_range(&client, "2025-05-01", "2025-05-31").await.unwrap();
        assert_eq!(range.order.len(), 1);
        assert_eq!(
            server.requests()[0].path,
            "/api/Order/Range?dtBegin=2025-05-01&dtEnd=2025-05-31"
        );
    }

    #[tokio::test]
    async fn sold_posts_order_id_with_idempotency_key() {
        let server = CannedServer::start(vec![(200, String::new())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let result = sold(&client, 77).await.unwrap();
        assert!(result.is_none());

        let req = &server.requests()[0];
        assert_eq!(req.path, "/api/Order/Sold");
        assert_eq!(req.json()["OrderId"], 77);
        assert!(req.header("idempotency-key").is_some());
    }

    #[tokio::test]
    async fn create_editable_posts_draft_and_decodes_order() {
        let server = CannedServer::start(vec![(
            200,
            r#"{"OrderId":31,"OrderStateId":4,"Service":[{"ServiceId":6,"Quantity":3,"Price":150.0}]}"#
                .into(),
        )])
        .await;
        let client = ApiClient::new(&server.config()).unwrap();
        let draft = OrderDraft {
            items: vec![OrderItem {
                service_id: 6,
                service_name: None,
                dt_visit: Some("2025-06-01".into()),
                category_visitor_id: None,
                quantity: 3,
                price: 150.0,
            }],
        };
        let order = create_editable(&client, &draft).await.unwrap().unwrap();
        assert_eq!(order.order_id, 31);
        assert_eq!(order.total(), 450.0);

        let req = &server.requests()[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/api/Order/CreateEditable");
        assert_eq!(req.json()["Service"][0]["ServiceId"], 6);
        assert!(req.header("idempotency-key").is_some());
    }

    #[tokio::test]
    async fn empty_draft_is_rejected_locally() {
        let server = CannedServer::start(vec![]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let err = create(&client, &OrderDraft { items: vec![] }).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn cost_decodes_sum() {
        let server = CannedServer::start(vec![(200, r#"{"Sum":1250.5}"#.into())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let draft = OrderDraft {
            items: vec![OrderItem {
                service_id: 3,
                service_name: None,
                dt_visit: Some("2025-06-01".into()),
                category_visitor_id: Some(1),
                quantity: 2,
                price: 0.0,
            }],
        };
        let cost = cost(&client, &draft).await.unwrap();
        assert_eq!(cost.sum, 1250.5);
        assert_eq!(server.requests()[0].json()["Service"][0]["Quantity"], 2);
    }

    #[tokio::test]
    async fn refund_surfaces_backend_status() {
        let server =
            CannedServer::start(vec![(409, r#"{"message":"Order already refunded"}"#.into())]).await;
        let client = ApiClient::new(&server.config()).unwrap();
        let err = refund(&client, 9).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Order already refunded (HTTP 409)");
    }
}
