use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use trellis::api::{create_router, AppState};
use trellis::registry::{Registry, RegistryHandle};

fn setup() -> TestServer {
    let registry = RegistryHandle::new(Registry::new());
    let app = create_router(AppState::new(registry));
    TestServer::new(app).expect("Failed to create test server")
}

async fn create_test_model(server: &TestServer, path: &str, fields: Value) {
    server
        .post(&format!("/api/v1/models{path}"))
        .json(&fields)
        .await
        .assert_status(StatusCode::CREATED);
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();

        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
    }
}

mod models {
    use super::*;

    #[tokio::test]
    async fn creating_a_model_returns_its_values() {
        let server = setup();

        let response = server
            .post("/api/v1/models/lights/kitchen")
            .json(&json!({ "brightness": 80, "on": true }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(
            response.json::<Value>(),
            json!({ "brightness": 80, "on": true })
        );
    }

    #[tokio::test]
    async fn binding_the_same_path_twice_conflicts() {
        let server = setup();
        create_test_model(&server, "/lights/kitchen", json!({ "on": true })).await;

        let response = server
            .post("/api/v1/models/lights/kitchen")
            .json(&json!({ "on": false }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn non_object_bodies_are_rejected() {
        let server = setup();

        let response = server
            .post("/api/v1/models/lights/kitchen")
            .json(&json!(42))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn deleting_a_model_prunes_its_path() {
        let server = setup();
        create_test_model(&server, "/lights/kitchen", json!({ "on": true })).await;

        server
            .delete("/api/v1/models/lights/kitchen")
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get("/api/v1/values/lights/kitchen")
            .await
            .assert_status_not_found();
        assert!(server.get("/api/v1/keys").await.json::<Vec<String>>().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_missing_model_is_not_found() {
        let server = setup();

        let response = server.delete("/api/v1/models/lights/kitchen").await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn deleting_spares_siblings_behind_a_shared_prefix() {
        let server = setup();
        create_test_model(&server, "/a/b/c", json!({ "n": 1 })).await;
        create_test_model(&server, "/a/b/d", json!({ "n": 2 })).await;

        server
            .delete("/api/v1/models/a/b/c")
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let mut keys = server.get("/api/v1/keys").await.json::<Vec<String>>();
        keys.sort();
        assert_eq!(keys, vec!["/a", "/a/b", "/a/b/d"]);

        let response = server.get("/api/v1/values/a/b/d").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "n": 2 }));
    }
}

mod keys {
    use super::*;

    #[tokio::test]
    async fn returns_empty_list_when_nothing_is_bound() {
        let server = setup();

        let response = server.get("/api/v1/keys").await;

        response.assert_status_ok();
        assert!(response.json::<Vec<String>>().is_empty());
    }

    #[tokio::test]
    async fn lists_every_path() {
        let server = setup();
        create_test_model(&server, "/a/b", json!({ "n": 1 })).await;
        create_test_model(&server, "/a/c", json!({ "n": 2 })).await;

        let mut keys = server.get("/api/v1/keys").await.json::<Vec<String>>();
        keys.sort();
        assert_eq!(keys, vec!["/a", "/a/b", "/a/c"]);
    }

    #[tokio::test]
    async fn lists_child_segments_of_a_node() {
        let server = setup();
        create_test_model(&server, "/a/b", json!({ "n": 1 })).await;
        create_test_model(&server, "/a/c", json!({ "n": 2 })).await;

        let response = server.get("/api/v1/keys/a").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<String>>(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn missing_nodes_are_not_found() {
        let server = setup();

        let response = server.get("/api/v1/keys/missing").await;

        response.assert_status_not_found();
    }
}

mod values {
    use super::*;

    #[tokio::test]
    async fn resolves_current_field_values() {
        let server = setup();
        create_test_model(&server, "/lights/kitchen", json!({ "brightness": 80 })).await;

        let response = server.get("/api/v1/values/lights/kitchen").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "brightness": 80 }));
    }

    #[tokio::test]
    async fn updates_fields_through_the_node() {
        let server = setup();
        create_test_model(
            &server,
            "/lights/kitchen",
            json!({ "brightness": 80, "on": true }),
        )
        .await;

        let response = server
            .put("/api/v1/values/lights/kitchen")
            .json(&json!({ "brightness": 30 }))
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>(),
            json!({ "brightness": 30, "on": true })
        );

        let response = server.get("/api/v1/values/lights/kitchen").await;
        assert_eq!(
            response.json::<Value>(),
            json!({ "brightness": 30, "on": true })
        );
    }

    #[tokio::test]
    async fn unknown_fields_are_rejected() {
        let server = setup();
        create_test_model(&server, "/lights/kitchen", json!({ "brightness": 80 })).await;

        let response = server
            .put("/api/v1/values/lights/kitchen")
            .json(&json!({ "volume": 11 }))
            .await;

        response.assert_status_bad_request();

        // Nothing was written.
        let response = server.get("/api/v1/values/lights/kitchen").await;
        assert_eq!(response.json::<Value>(), json!({ "brightness": 80 }));
    }

    #[tokio::test]
    async fn missing_nodes_are_not_found() {
        let server = setup();

        let response = server.get("/api/v1/values/lights/kitchen").await;

        response.assert_status_not_found();
    }
}

mod tree {
    use super::*;

    #[tokio::test]
    async fn returns_nested_keys() {
        let server = setup();
        create_test_model(&server, "/x/y", json!({ "n": 1 })).await;
        create_test_model(&server, "/x/z", json!({ "n": 2 })).await;

        let response = server.get("/api/v1/tree").await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<Value>(),
            json!({ "x": { "y": {}, "z": {} } })
        );
    }

    #[tokio::test]
    async fn subtrees_are_path_relative() {
        let server = setup();
        create_test_model(&server, "/x/y", json!({ "n": 1 })).await;
        create_test_model(&server, "/x/z", json!({ "n": 2 })).await;

        let response = server.get("/api/v1/tree/x").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "y": {}, "z": {} }));
    }

    #[tokio::test]
    async fn missing_subtrees_are_not_found() {
        let server = setup();

        let response = server.get("/api/v1/tree/missing").await;

        response.assert_status_not_found();
    }
}
