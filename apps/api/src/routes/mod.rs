pub mod health;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::brand_kits::handlers as brand_kits;
use crate::onepagers::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/health", get(health::health_handler))
        // Documents
        .route(
            "/api/v1/onepagers",
            get(handlers::handle_list).post(handlers::handle_create),
        )
        .route(
            "/api/v1/onepagers/:id",
            get(handlers::handle_get).delete(handlers::handle_delete),
        )
        .route("/api/v1/onepagers/:id/iterate", post(handlers::handle_iterate))
        .route("/api/v1/onepagers/:id/template", put(handlers::handle_set_template))
        .route("/api/v1/onepagers/:id/layout", put(handlers::handle_apply_layout))
        // Blocks
        .route("/api/v1/onepagers/:id/blocks", post(handlers::handle_insert_block))
        .route("/api/v1/onepagers/:id/blocks/order", put(handlers::handle_reorder))
        .route(
            "/api/v1/onepagers/:id/blocks/:block_id",
            patch(handlers::handle_update_block).delete(handlers::handle_delete_block),
        )
        // Rendering
        .route("/api/v1/onepagers/:id/slots", get(handlers::handle_slots))
        .route("/api/v1/onepagers/:id/tokens", get(handlers::handle_tokens))
        .route("/api/v1/onepagers/:id/wireframe", get(handlers::handle_wireframe))
        .route("/api/v1/onepagers/:id/styled", get(handlers::handle_styled))
        .route("/api/v1/onepagers/:id/export/pdf", get(handlers::handle_export_pdf))
        // Versions
        .route(
            "/api/v1/onepagers/:id/versions",
            get(handlers::handle_list_versions).post(handlers::handle_create_snapshot),
        )
        .route("/api/v1/onepagers/:id/versions/:v", get(handlers::handle_get_version))
        .route(
            "/api/v1/onepagers/:id/versions/:v/restore",
            post(handlers::handle_restore),
        )
        // Brand kits
        .route(
            "/api/v1/brand-kits",
            get(brand_kits::handle_list).post(brand_kits::handle_create),
        )
        .route(
            "/api/v1/brand-kits/:id",
            get(brand_kits::handle_get)
                .put(brand_kits::handle_update)
                .delete(brand_kits::handle_delete),
        )
        .route(
            "/api/v1/brand-kits/:id/audiences",
            post(brand_kits::handle_add_audience),
        )
        .route(
            "/api/v1/brand-kits/:id/audiences/:index",
            delete(brand_kits::handle_remove_audience),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::content::{BlockContent, ContentBlock, DocumentContent};
    use crate::generation::backend::fakes::ScriptedBackend;
    use crate::persistence::{DocumentStore, MemoryBrandKitStore, MemoryDocumentStore};
    use crate::render::styled::fakes::EchoTemplateEngine;
    use crate::render::MemoryMarkupCache;

    fn make_content() -> DocumentContent {
        let mut content = DocumentContent::new("Launch day");
        content.blocks = vec![
            ContentBlock::new("l1", BlockContent::List(vec!["A".into(), "B".into()]), 0),
            ContentBlock::new("t1", BlockContent::Text("Body".into()), 1),
        ];
        content
    }

    fn make_state(backend: ScriptedBackend) -> (AppState, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        let state = AppState::new(
            store.clone(),
            Arc::new(MemoryBrandKitStore::new()),
            Arc::new(backend),
            Arc::new(EchoTemplateEngine::default()),
            Arc::new(MemoryMarkupCache::default()),
        );
        (state, store)
    }

    async fn send(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        build_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn create(state: &AppState) -> Uuid {
        let response = send(
            state,
            Method::POST,
            "/api/v1/onepagers",
            Some(json!({"title": "Launch", "prompt": "A one-pager for our launch event"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        body["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let response = send(&state, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_get_list_delete() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;

        let response = send(&state, Method::GET, &format!("/api/v1/onepagers/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["content"]["headline"], "Launch day");
        assert_eq!(body["version_history"], json!([]));

        let list = json_body(send(&state, Method::GET, "/api/v1/onepagers", None).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let uri = format!("/api/v1/onepagers/{id}");
        assert_eq!(send(&state, Method::DELETE, &uri, None).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&state, Method::GET, &uri, None).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&state, Method::DELETE, &uri, None).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_rejects_short_prompt() {
        let (state, store) = make_state(ScriptedBackend::succeeding(make_content()));
        let response = send(
            &state,
            Method::POST,
            "/api/v1/onepagers",
            Some(json!({"title": "Launch", "prompt": "short"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_falls_back_when_generation_fails() {
        let (state, _) = make_state(ScriptedBackend::failing());
        let id = create(&state).await;
        let body =
            json_body(send(&state, Method::GET, &format!("/api/v1/onepagers/{id}"), None).await)
                .await;
        assert_eq!(body["content"]["headline"], "Your Marketing One-Pager");
    }

    #[tokio::test]
    async fn test_block_edits_and_validation() {
        let (state, store) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;
        let blocks = format!("/api/v1/onepagers/{id}/blocks");

        let response = send(
            &state,
            Method::POST,
            &blocks,
            Some(json!({"id": "l0", "type": "list", "content": ["X"], "order": 0})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let slots = json_body(
            send(&state, Method::GET, &format!("/api/v1/onepagers/{id}/slots"), None).await,
        )
        .await;
        let left = slots["regions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["region"] == "left")
            .unwrap();
        assert_eq!(left["fill"]["blocks"][0]["id"], "l0");

        let before = store.get(id).await.unwrap().unwrap();
        let response = send(
            &state,
            Method::PATCH,
            &format!("{blocks}/t1"),
            Some(json!({"content": ["not", "text"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.get(id).await.unwrap().unwrap(), before);

        let response = send(
            &state,
            Method::PUT,
            &format!("{blocks}/order"),
            Some(json!({"ordered_ids": ["t1", "l1"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &state,
            Method::PUT,
            &format!("{blocks}/order"),
            Some(json!({"ordered_ids": ["t1", "l1", "l0"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = store.get(id).await.unwrap().unwrap();
        assert_eq!(doc.content.ordered_ids(), vec!["t1", "l1", "l0"]);

        let response = send(&state, Method::DELETE, &format!("{blocks}/l0"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.get(id).await.unwrap().unwrap().content.blocks.len(), 2);
    }

    #[tokio::test]
    async fn test_iterate_snapshot_and_restore() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;

        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/onepagers/{id}/iterate"),
            Some(json!({"feedback": "More energy"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["snapshot_version"], 1);
        assert_eq!(body["document"]["generation"]["iterations"], 1);

        let versions = json_body(
            send(&state, Method::GET, &format!("/api/v1/onepagers/{id}/versions"), None).await,
        )
        .await;
        assert_eq!(versions[0]["version"], 1);
        assert_eq!(versions[0]["description"], "More energy");

        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/onepagers/{id}/versions/1/restore"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["current_version"], 1);
        assert_eq!(body["version"], 1);

        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/onepagers/{id}/versions/9/restore"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_iterate_conflicts_while_in_flight() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;

        let _running = state.iterations.claim(id).unwrap();
        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/onepagers/{id}/iterate"),
            Some(json!({"feedback": "Again"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_failed_iteration_leaves_document_untouched() {
        let (state, store) = make_state(ScriptedBackend::failing());
        let id = create(&state).await;
        let before = store.get(id).await.unwrap().unwrap();

        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/onepagers/{id}/iterate"),
            Some(json!({"feedback": "Again"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(store.get(id).await.unwrap().unwrap(), before);
        assert!(!state.iterations.is_running(id));
    }

    #[tokio::test]
    async fn test_render_endpoints() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;

        let wireframe = text_body(
            send(
                &state,
                Method::GET,
                &format!("/api/v1/onepagers/{id}/wireframe?template=business"),
                None,
            )
            .await,
        )
        .await;
        assert!(wireframe.contains("data-region=\"metrics\""));

        let styled = text_body(
            send(&state, Method::GET, &format!("/api/v1/onepagers/{id}/styled"), None).await,
        )
        .await;
        assert!(styled.contains("data-template=\"minimalist\""));

        let tokens = json_body(
            send(&state, Method::GET, &format!("/api/v1/onepagers/{id}/tokens"), None).await,
        )
        .await;
        assert_eq!(tokens["css_variables"]["--layout-section-gap"], "20px");

        let response = send(
            &state,
            Method::GET,
            &format!("/api/v1/onepagers/{id}/slots?template=retro"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_layout_update_creates_snapshot() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;
        let uri = format!("/api/v1/onepagers/{id}/layout");

        let response = send(
            &state,
            Method::PUT,
            &uri,
            Some(json!({"layout_params": {"typography": {"h1_scale": 1.2}}})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["version"], 1);
        assert_eq!(body["layout_params"]["typography"]["h1_scale"], 1.2);

        let response = send(
            &state,
            Method::PUT,
            &uri,
            Some(json!({"layout_params": {"typography": {"h1_scale": 9.0}}})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_open_session_persists_through_store() {
        tokio::time::pause();
        let (state, store) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;
        let document = store.get(id).await.unwrap().unwrap();

        let mut session = state.open_session(document);
        session
            .insert_block(ContentBlock::new("t9", BlockContent::Text("new".into()), 9))
            .unwrap();
        let saved_before = store.save_count();
        session.flush().await.unwrap();
        assert_eq!(store.save_count(), saved_before + 1);
        assert!(store.get(id).await.unwrap().unwrap().content.find("t9").is_some());
    }

    #[tokio::test]
    async fn test_open_session_uses_configured_debounce() {
        tokio::time::pause();
        let (state, store) = make_state(ScriptedBackend::succeeding(make_content()));
        let state = state.with_autosave_debounce(std::time::Duration::from_millis(50));
        let id = create(&state).await;
        let document = store.get(id).await.unwrap().unwrap();

        let mut session = state.open_session(document);
        let saved_before = store.save_count();
        session
            .insert_block(ContentBlock::new("t9", BlockContent::Text("new".into()), 9))
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(store.save_count(), saved_before + 1);
    }

    #[tokio::test]
    async fn test_malformed_bodies_return_json_400() {
        let (state, store) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;
        let before = store.get(id).await.unwrap().unwrap();

        let response = send(
            &state,
            Method::POST,
            &format!("/api/v1/onepagers/{id}/blocks"),
            Some(json!({"id": "bad", "type": "list", "content": "not a list", "order": 0})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("expects"));
        assert_eq!(store.get(id).await.unwrap().unwrap(), before);

        let response = send(
            &state,
            Method::PUT,
            &format!("/api/v1/onepagers/{id}/template"),
            Some(json!({"template": "retro"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_export_pdf() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let id = create(&state).await;

        let response = send(
            &state,
            Method::GET,
            &format!("/api/v1/onepagers/{id}/export/pdf?format=a4"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(headers["content-type"], "application/pdf");
        assert_eq!(
            headers["content-disposition"],
            "attachment; filename=\"Launch_a4.pdf\""
        );
        let body = text_body(response).await;
        assert!(body.starts_with("%PDF-1.4 a4 default"));

        let response = send(
            &state,
            Method::GET,
            &format!("/api/v1/onepagers/{id}/export/pdf?format=legal"),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &state,
            Method::GET,
            &format!("/api/v1/onepagers/{}/export/pdf", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_brand_kit_crud_and_audiences() {
        let (state, _) = make_state(ScriptedBackend::succeeding(make_content()));
        let response = send(
            &state,
            Method::POST,
            "/api/v1/brand-kits",
            Some(json!({
                "company_name": "Acme",
                "target_audiences": [{"name": "CTO", "description": "Technical buyers"}],
                "color_palette": {"primary": "#112233"}
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let kit = json_body(response).await;
        let kit_id = kit["id"].as_str().unwrap().to_string();
        let kit_uri = format!("/api/v1/brand-kits/{kit_id}");

        // Removing the only audience leaves one empty row.
        let response = send(&state, Method::DELETE, &format!("{kit_uri}/audiences/0"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["target_audiences"], json!([{"name": "", "description": ""}]));

        let response = send(
            &state,
            Method::POST,
            &format!("{kit_uri}/audiences"),
            Some(json!({"name": "CFO", "description": "Budget owners"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["target_audiences"].as_array().unwrap().len(), 1);
        assert_eq!(body["target_audiences"][0]["name"], "CFO");

        let response = send(&state, Method::DELETE, &format!("{kit_uri}/audiences/5"), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &state,
            Method::PUT,
            &kit_uri,
            Some(json!({"company_name": "Acme Corp", "color_palette": {"accent": "orange"}})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            send(&state, Method::PUT, &kit_uri, Some(json!({"company_name": "Acme Corp"}))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["company_name"], "Acme Corp");

        // One-pagers generated against a stored kit keep the reference and its palette.
        let response = send(
            &state,
            Method::POST,
            "/api/v1/onepagers",
            Some(json!({
                "title": "Branded",
                "prompt": "A one-pager for our launch event",
                "brand_kit_id": kit_id
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let doc = json_body(response).await;
        assert_eq!(doc["brand_kit_id"], kit_id.as_str());
        assert_eq!(doc["layout_params"]["color_scheme"]["primary"], "#112233");

        let pdf = text_body(
            send(
                &state,
                Method::GET,
                &format!("/api/v1/onepagers/{}/export/pdf", doc["id"].as_str().unwrap()),
                None,
            )
            .await,
        )
        .await;
        assert!(pdf.starts_with("%PDF-1.4 letter Acme Corp"));

        let list = json_body(send(&state, Method::GET, "/api/v1/brand-kits", None).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        assert_eq!(send(&state, Method::DELETE, &kit_uri, None).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&state, Method::GET, &kit_uri, None).await.status(), StatusCode::NOT_FOUND);

        let response = send(
            &state,
            Method::POST,
            "/api/v1/onepagers",
            Some(json!({
                "title": "Orphan",
                "prompt": "A one-pager for our launch event",
                "brand_kit_id": kit_id
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
