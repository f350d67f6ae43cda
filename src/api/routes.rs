//! Router assembly.

use axum::{Router, http::HeaderName, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{
    REQUEST_ID_HEADER, auth_middleware, global_error_handler, logging_middleware,
    optional_auth_middleware, request_id_middleware,
};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// # Middleware order (outermost first)
/// 1. request ID
/// 2. request logging
/// 3. compression
/// 4. CORS
/// 5. error normalization, which needs the request ID and must see bodies
///    before compression
/// 6. request timeout
/// 7. per-group authentication
///
/// OpenAPI documents are served at `/api-docs/openapi.json`, with Swagger UI
/// at `/swagger-ui`.
pub fn create_router(state: AppState) -> Router {
    let protected = handlers::cart::cart_mutation_routes()
        .merge(handlers::orders::order_mutation_routes())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let readable = handlers::cart::cart_read_routes()
        .merge(handlers::orders::order_read_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_auth_middleware,
        ));

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(handlers::auth::auth_routes())
        .merge(protected)
        .merge(readable)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(middleware::from_fn(global_error_handler))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Settings, StorageBackend};
    use crate::repositories::MemoryUserRepository;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let mut settings = Settings::default();
            settings.database.backend = StorageBackend::Memory;
            settings.jwt.secret = "http-test-secret-0123456789abcdef".to_string();
            let state = AppState::new(Arc::new(MemoryUserRepository::new()), &settings).unwrap();
            Self {
                router: create_router(state.clone()),
                state,
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => builder.body(Body::empty()),
            }
            .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        /// Registers `email` and returns its id and token.
        async fn register(&self, email: &str) -> (i64, String) {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/register",
                    None,
                    Some(json!({ "email": email, "password": "correct-horse" })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{}", body);
            (
                body["user"]["id"].as_i64().unwrap(),
                body["accessToken"].as_str().unwrap().to_string(),
            )
        }

        async fn add(&self, email: &str, token: &str, name: &str) -> (StatusCode, Value) {
            self.send(
                Method::POST,
                &format!("/addtocart/{}", email),
                Some(token),
                Some(json!({ "product": { "productName": name, "productPrice": "9.50" } })),
            )
            .await
        }
    }

    fn names(cart: &Value) -> Vec<&str> {
        cart.as_array()
            .unwrap()
            .iter()
            .map(|item| item["productName"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let app = TestApp::new();
        app.register("ana@example.com").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({ "email": "ana@example.com", "password": "correct-horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "ana@example.com");

        let (status, body) = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({ "email": "ana@example.com", "password": "wrong-horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, body) = app
            .send(
                Method::POST,
                "/register",
                None,
                Some(json!({ "email": "ana@example.com", "password": "another-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "DUPLICATE_ENTRY");
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_body() {
        let app = TestApp::new();
        let (status, body) = app
            .send(
                Method::POST,
                "/register",
                None,
                Some(json!({ "email": "not-an-email", "password": "short" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mutations_require_a_valid_token() {
        let app = TestApp::new();
        app.register("bo@example.com").await;
        let body = json!({ "product": { "productName": "Mug", "productPrice": 3 } });

        let (status, error) = app
            .send(Method::POST, "/addtocart/bo@example.com", None, Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error["code"], "MISSING_CREDENTIAL");
        assert!(error["requestId"].is_string());

        let (status, error) = app
            .send(
                Method::POST,
                "/addtocart/bo@example.com",
                Some("not.a.jwt"),
                Some(body.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error["code"], "INVALID_CREDENTIAL");
        assert!(!error.to_string().contains("not.a.jwt"));

        let ghost = app
            .state
            .services
            .auth
            .verifier()
            .issue(9_999, "ghost@example.com")
            .unwrap();
        let (status, error) = app
            .send(
                Method::POST,
                "/addtocart/ghost@example.com",
                Some(&ghost),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["code"], "PRINCIPAL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_cannot_touch_another_users_cart() {
        let app = TestApp::new();
        let (_, alice) = app.register("alice@example.com").await;
        app.register("bob@example.com").await;

        let (status, error) = app.add("bob@example.com", &alice, "Mug").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error["code"], "FORBIDDEN");

        let (status, _) = app
            .send(Method::GET, "/getcart/bob@example.com", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .send(Method::GET, "/getcart/bob@example.com", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usercart"], json!([]));
    }

    #[tokio::test]
    async fn test_cart_and_order_flow() {
        let app = TestApp::new();
        let (id, token) = app.register("cy@example.com").await;
        let owner = "cy@example.com";

        let (status, body) = app.add(owner, &token, "Mug").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product added to cart");
        assert_eq!(body["usercart"][0]["cartQuantity"], 1);

        let (status, body) = app.add(owner, &token, "Classic Tee").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(names(&body["usercart"]), vec!["Mug", "Classic Tee"]);

        let (status, error) = app.add(owner, &token, "Mug").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], "DUPLICATE_ITEM");

        let (status, body) = app
            .send(Method::PUT, &format!("/cartplus/Mug/{}", owner), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usercart"][0]["cartQuantity"], 2);

        let uri = format!("/cartminus/Mug/{}", id);
        let (status, body) = app.send(Method::PUT, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usercart"][0]["cartQuantity"], 1);

        let (status, error) = app.send(Method::PUT, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["code"], "MINIMUM_QUANTITY_REACHED");

        let (status, error) = app
            .send(Method::PUT, &format!("/cartplus/Lamp/{}", owner), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["code"], "PRODUCT_NOT_IN_CART");

        let (status, body) = app
            .send(
                Method::POST,
                &format!("/orderFinal/%5B%22Mug%22%5D/{}", owner),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Order placed");
        assert_eq!(names(&body["order"]["products"]), vec!["Mug"]);

        let (_, body) = app
            .send(Method::GET, &format!("/getcart/{}", owner), Some(&token), None)
            .await;
        assert_eq!(names(&body["usercart"]), vec!["Classic Tee"]);

        let (status, body) = app
            .send(Method::GET, &format!("/getorders/{}", owner), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let orders = body["userorders"].as_array().unwrap();
        assert_eq!(orders.len(), 1);
        assert!(orders[0]["placedAt"].as_str().unwrap().ends_with("+05:30"));

        for _ in 0..2 {
            let (status, body) = app
                .send(
                    Method::DELETE,
                    &format!("/removepcart/Classic%20Tee/{}", owner),
                    Some(&token),
                    None,
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["usercart"], json!([]));
        }
    }

    #[tokio::test]
    async fn test_finalize_matches_exact_names_only() {
        let app = TestApp::new();
        let (_, token) = app.register("di@example.com").await;
        app.add("di@example.com", &token, "tshirt").await;

        let (status, placed) = app
            .send(
                Method::POST,
                "/orderFinal/shirt/di@example.com",
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(placed["message"], "Order placed");
        assert_eq!(placed["order"]["products"], json!([]));

        let (_, body) = app
            .send(Method::GET, "/getcart/di@example.com", None, None)
            .await;
        assert_eq!(names(&body["usercart"]), vec!["tshirt"]);
        let (_, body) = app
            .send(Method::GET, "/getorders/di@example.com", None, None)
            .await;
        assert_eq!(body["userorders"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["userorders"][0]["products"], json!([]));
    }

    #[tokio::test]
    async fn test_add_to_cart_body_errors() {
        let app = TestApp::new();
        let (_, token) = app.register("ed@example.com").await;

        let (status, error) = app
            .send(
                Method::POST,
                "/addtocart/ed@example.com",
                Some(&token),
                Some(json!({ "product": { "productPrice": "1.00" } })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], "MISSING_REQUIRED_FIELD");
        assert_eq!(error["details"]["field"], "productName");

        let (status, error) = app
            .send(
                Method::POST,
                "/addtocart/ed@example.com",
                Some(&token),
                Some(json!({ "product": { "productName": "Mug", "productPrice": "-2" } })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], "VALIDATION_ERROR");

        for product in [
            json!({ "productName": "Mug", "productPrice": "0.005" }),
            json!({ "productName": "Mug", "productPrice": "10000000000" }),
            json!({ "productName": "Mug", "productPrice": "1", "productImage": "x".repeat(1025) }),
        ] {
            let (status, error) = app
                .send(
                    Method::POST,
                    "/addtocart/ed@example.com",
                    Some(&token),
                    Some(json!({ "product": product })),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(error["code"], "VALIDATION_ERROR");
        }

        let (_, body) = app
            .send(Method::GET, "/getcart/ed@example.com", None, None)
            .await;
        assert_eq!(body["usercart"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_user_and_route() {
        let app = TestApp::new();
        let (status, error) = app
            .send(Method::GET, "/getorders/nobody@example.com", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["code"], "USER_NOT_FOUND");

        let (status, error) = app.send(Method::GET, "/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_openapi_document_lists_routes() {
        let app = TestApp::new();
        let (status, doc) = app
            .send(Method::GET, "/api-docs/openapi.json", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        for path in [
            "/addtocart/{userRef}",
            "/orderFinal/{selection}/{userRef}",
            "/getorders/{userRef}",
            "/register",
        ] {
            assert!(doc["paths"].get(path).is_some(), "missing {}", path);
        }
    }
}
