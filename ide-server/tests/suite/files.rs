use ide_test_support::{TestServer, json_body};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

async fn demo_server() -> TestServer {
    let server = TestServer::start().await;
    server.create_project("demo").await;
    server
}

async fn read(server: &TestServer, file: &str) -> (u16, Value) {
    let resp = server
        .client
        .get(server.url(&format!("/api/projects/demo/file/{file}")))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, json_body(resp).await)
}

#[tokio::test]
async fn create_then_read_round_trips() {
    let server = demo_server().await;
    let resp = server
        .client
        .post(server.url("/api/projects/demo/file"))
        .json(&json!({ "fileName": "main.c", "content": "int main(void) { return 0; }\n" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    assert_eq!(
        json_body(resp).await,
        json!({ "message": "File: main.c created!" })
    );

    assert_eq!(
        read(&server, "main.c").await,
        (200, json!({ "data": "int main(void) { return 0; }\n" }))
    );
}

#[tokio::test]
async fn empty_content_is_valid_text() {
    let server = demo_server().await;
    server.create_file("demo", "empty.txt", "").await;
    assert_eq!(read(&server, "empty.txt").await, (200, json!({ "data": "" })));
}

#[tokio::test]
async fn duplicate_create_keeps_existing_content() {
    let server = demo_server().await;
    server.create_file("demo", "a.txt", "original").await;

    let resp = server
        .client
        .post(server.url("/api/projects/demo/file"))
        .json(&json!({ "fileName": "a.txt", "content": "clobbered" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "File already exists." })
    );
    assert_eq!(read(&server, "a.txt").await.1, json!({ "data": "original" }));
}

#[tokio::test]
async fn non_string_content_is_rejected() {
    let server = demo_server().await;
    for content in [json!([1, 2, 3]), json!({ "bytes": "AAEC" }), json!(7), Value::Null] {
        let resp = server
            .client
            .post(server.url("/api/projects/demo/file"))
            .json(&json!({ "fileName": "bin.dat", "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{content}");
        assert_eq!(
            json_body(resp).await,
            json!({ "error": "Content must be text only, no binary data allowed." })
        );
    }
    assert!(!server.root().join("demo/bin.dat").exists());
}

#[tokio::test]
async fn unknown_project_is_404_before_anything_else() {
    let server = demo_server().await;

    let resp = server
        .client
        .post(server.url("/api/projects/ghost/file"))
        .json(&json!({ "fileName": "../x", "content": [0] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "Project does not exist." })
    );

    for path in [
        "/api/projects/ghost/files",
        "/api/projects/ghost/file/a.txt",
    ] {
        let resp = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 404, "{path}");
    }
}

#[tokio::test]
async fn traversal_in_body_is_rejected() {
    let server = demo_server().await;

    for name in ["..", ".", "../escape.txt", "sub/a.txt", "a\\b", ""] {
        let resp = server
            .client
            .post(server.url("/api/projects/demo/file"))
            .json(&json!({ "fileName": name, "content": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "{name:?}");
    }
    assert!(!server.root().join("escape.txt").exists());
    assert!(server.root().join("demo").is_dir());
}

#[tokio::test]
async fn traversal_in_path_is_rejected() {
    let server = demo_server().await;
    server.create_file("demo", "a.txt", "x").await;

    for method in ["GET", "PUT", "DELETE"] {
        let (status, body) = server
            .send_raw(method, "/api/projects/demo/file/..")
            .await;
        assert_eq!(status, 400, "{method}");
        assert!(body["error"].is_string(), "{method}: {body}");
    }

    let resp = server
        .client
        .get(server.url("/api/projects/demo/file/..%2F..%2Fetc%2Fpasswd"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let (status, _) = server
        .send_raw("POST", "/api/projects/demo/compile/%2e%2e")
        .await;
    assert_eq!(status, 400);

    assert!(server.root().join("demo").is_dir());
    assert_eq!(read(&server, "a.txt").await.0, 200);
}

#[tokio::test]
async fn update_replaces_content_and_is_idempotent() {
    let server = demo_server().await;
    server
        .create_file("demo", "a.txt", "a much longer original body")
        .await;

    for _ in 0..2 {
        let resp = server
            .client
            .put(server.url("/api/projects/demo/file/a.txt"))
            .json(&json!({ "fileName": "a.txt", "content": "short" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            json_body(resp).await,
            json!({ "message": "a.txt has been updated." })
        );
        assert_eq!(read(&server, "a.txt").await.1, json!({ "data": "short" }));
    }

    let resp = server
        .client
        .put(server.url("/api/projects/demo/file/a.txt"))
        .json(&json!({ "content": "without a name" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        read(&server, "a.txt").await.1,
        json!({ "data": "without a name" })
    );
}

#[tokio::test]
async fn update_checks_existence_name_and_content() {
    let server = demo_server().await;

    let resp = server
        .client
        .put(server.url("/api/projects/demo/file/ghost.txt"))
        .json(&json!({ "fileName": "ghost.txt", "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert!(!server.root().join("demo/ghost.txt").exists());

    server.create_file("demo", "a.txt", "keep").await;
    let resp = server
        .client
        .put(server.url("/api/projects/demo/file/a.txt"))
        .json(&json!({ "fileName": "b.txt", "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = server
        .client
        .put(server.url("/api/projects/demo/file/a.txt"))
        .json(&json!({ "fileName": "a.txt", "content": [1] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(read(&server, "a.txt").await.1, json!({ "data": "keep" }));
}

#[tokio::test]
async fn delete_is_terminal() {
    let server = demo_server().await;
    server.create_file("demo", "a.txt", "x").await;

    let resp = server
        .client
        .delete(server.url("/api/projects/demo/file/a.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        json_body(resp).await,
        json!({ "message": "a.txt has been deleted." })
    );

    assert_eq!(read(&server, "a.txt").await.0, 404);
    let resp = server
        .client
        .delete(server.url("/api/projects/demo/file/a.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(
        json_body(resp).await,
        json!({ "error": "File does not exist in the project." })
    );
}

#[tokio::test]
async fn list_files_reports_name_size_and_modified() {
    let server = demo_server().await;
    server.create_file("demo", "b.txt", "four").await;
    server.create_file("demo", "a.c", "").await;
    std::fs::create_dir(server.root().join("demo/nested")).unwrap();

    let resp = server
        .client
        .get(server.url("/api/projects/demo/files"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = json_body(resp).await;
    let files = body["files"].as_array().unwrap();

    let names: Vec<&str> = files.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["a.c", "b.txt"]);
    assert_eq!(files[0]["size"], json!(0));
    assert_eq!(files[1]["size"], json!(4));
    for file in files {
        let modified = file["modified"].as_str().unwrap();
        assert!(modified.ends_with('Z'), "{modified}");
        assert!(is_millis_timestamp(modified), "{modified}");
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
fn is_millis_timestamp(ts: &str) -> bool {
    ts.len() == 24 && ts.as_bytes()[10] == b'T' && ts.as_bytes()[19] == b'.'
}
