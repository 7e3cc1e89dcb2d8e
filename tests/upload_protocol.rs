use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use zeabur_deploy::config::DeployConfig;
use zeabur_deploy::upload::{package, FileEntry, PackagedUpload, UploadResult, Uploader};

fn uploader_for(server: &ServerGuard) -> Uploader {
    Uploader::new(&DeployConfig::with_api_base_url(server.url())).unwrap()
}

fn packaged(entries: &[FileEntry]) -> PackagedUpload {
    package(entries).unwrap()
}

async fn mock_create_session(
    server: &mut ServerGuard,
    packaged: &PackagedUpload,
    upload_id: &str,
) -> mockito::Mock {
    let presign_url = format!("{}/presigned/{}", server.url(), upload_id);
    server
        .mock("POST", "/v2/upload")
        .match_body(Matcher::Json(json!({
            "content_hash": packaged.digest.as_str(),
            "content_hash_algorithm": "sha256",
            "content_length": packaged.archive.len(),
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "presign_url": presign_url,
                "presign_header": {"x-amz-meta-origin": "deploy"},
                "upload_id": upload_id,
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await
}

#[tokio::test]
async fn test_successful_upload_calls_each_endpoint_once() {
    let mut server = Server::new_async().await;
    let entries = vec![
        FileEntry::new("index.html", "<h1>Hello</h1>"),
        FileEntry::new("app.js", "console.log('hi')"),
    ];
    let expected = packaged(&entries);

    let create = mock_create_session(&mut server, &expected, "up-1").await;
    let transfer = server
        .mock("PUT", "/presigned/up-1")
        .match_header("x-amz-meta-origin", "deploy")
        .match_header("content-length", expected.archive.len().to_string().as_str())
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let prepare = server
        .mock("POST", "/v2/upload/up-1/prepare")
        .match_body(Matcher::Json(json!({"upload_type": "new_project"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"url":"https://zeabur.com/projects/new?upload=up-1"}"#)
        .expect(1)
        .create_async()
        .await;

    let code_array = json!([["index.html", "<h1>Hello</h1>"], ["app.js", "console.log('hi')"]]);
    let result = uploader_for(&server).perform_upload(&code_array).await;

    assert_eq!(result, UploadResult::success("https://zeabur.com/projects/new?upload=up-1"));
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"success": true, "url": "https://zeabur.com/projects/new?upload=up-1"})
    );
    create.assert_async().await;
    transfer.assert_async().await;
    prepare.assert_async().await;
}

#[tokio::test]
async fn test_prepare_failure_reports_server_error() {
    let mut server = Server::new_async().await;
    let entries = vec![FileEntry::new("main.py", "print('hi')")];
    let expected = packaged(&entries);

    let _create = mock_create_session(&mut server, &expected, "up-2").await;
    let _transfer = server.mock("PUT", "/presigned/up-2").with_status(200).create_async().await;
    let _prepare = server
        .mock("POST", "/v2/upload/up-2/prepare")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"quota exceeded"}"#)
        .create_async()
        .await;

    let result = uploader_for(&server)
        .perform_upload(&json!([["main.py", "print('hi')"]]))
        .await;

    assert_eq!(result, UploadResult::failure("Failed to prepare upload: quota exceeded"));
}

#[tokio::test]
async fn test_prepare_failure_with_unparseable_body_keeps_status() {
    let mut server = Server::new_async().await;
    let entries = vec![FileEntry::new("main.py", "print('hi')")];
    let expected = packaged(&entries);

    let _create = mock_create_session(&mut server, &expected, "up-3").await;
    let _transfer = server.mock("PUT", "/presigned/up-3").with_status(200).create_async().await;
    let _prepare = server
        .mock("POST", "/v2/upload/up-3/prepare")
        .with_status(502)
        .with_body("<html>bad gateway</html>")
        .create_async()
        .await;

    let result = uploader_for(&server)
        .perform_upload(&json!([["main.py", "print('hi')"]]))
        .await;

    assert_eq!(result, UploadResult::failure("Failed to prepare upload: HTTP 502 Bad Gateway"));
}

#[tokio::test]
async fn test_invalid_input_makes_no_requests() {
    let mut server = Server::new_async().await;
    let create = server.mock("POST", "/v2/upload").expect(0).create_async().await;
    let prepare = server
        .mock("POST", Matcher::Regex(r"^/v2/upload/.+/prepare$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let uploader = uploader_for(&server);
    let invalid_inputs = [
        json!(null),
        json!({}),
        json!("x"),
        json!([["only-path"]]),
        json!([["", "x"]]),
    ];
    for invalid in invalid_inputs {
        let result = uploader.perform_upload(&invalid).await;
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"error": "Invalid code format"})
        );
    }

    create.assert_async().await;
    prepare.assert_async().await;
}

#[tokio::test]
async fn test_session_failure_stops_before_transfer() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/v2/upload")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let transfer = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let prepare = server
        .mock("POST", Matcher::Regex(r"^/v2/upload/.+/prepare$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let result = uploader_for(&server)
        .perform_upload(&json!([["index.html", "x"]]))
        .await;

    assert_eq!(result, UploadResult::failure("Failed to create upload session"));
    create.assert_async().await;
    transfer.assert_async().await;
    prepare.assert_async().await;
}

#[tokio::test]
async fn test_session_without_upload_id_is_session_failure() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/v2/upload")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"presign_url":"http://example.invalid/put"}"#)
        .create_async()
        .await;

    let result = uploader_for(&server)
        .perform_upload(&json!([["index.html", "x"]]))
        .await;

    assert_eq!(result, UploadResult::failure("Failed to create upload session"));
}

#[tokio::test]
async fn test_transfer_failure_skips_prepare() {
    let mut server = Server::new_async().await;
    let entries = vec![FileEntry::new("index.html", "x")];
    let expected = packaged(&entries);

    let _create = mock_create_session(&mut server, &expected, "up-4").await;
    let transfer = server
        .mock("PUT", "/presigned/up-4")
        .with_status(403)
        .expect(1)
        .create_async()
        .await;
    let prepare = server
        .mock("POST", "/v2/upload/up-4/prepare")
        .expect(0)
        .create_async()
        .await;

    let result = uploader_for(&server)
        .perform_upload(&json!([["index.html", "x"]]))
        .await;

    assert_eq!(result, UploadResult::failure("Failed to upload file"));
    transfer.assert_async().await;
    prepare.assert_async().await;
}

#[tokio::test]
async fn test_duplicate_paths_upload_last_content() {
    let mut server = Server::new_async().await;
    // Archive built from the deduplicated list must match what the uploader sends
    let expected = packaged(&[FileEntry::new("a.txt", "second"), FileEntry::new("b.txt", "b")]);

    let create = mock_create_session(&mut server, &expected, "up-5").await;
    let _transfer = server.mock("PUT", "/presigned/up-5").with_status(200).create_async().await;
    let _prepare = server
        .mock("POST", "/v2/upload/up-5/prepare")
        .with_status(200)
        .with_body(r#"{"url":"https://zeabur.com/p/5"}"#)
        .create_async()
        .await;

    let result = uploader_for(&server)
        .perform_upload(&json!([["a.txt", "first"], ["b.txt", "b"], ["a.txt", "second"]]))
        .await;

    assert_eq!(result, UploadResult::success("https://zeabur.com/p/5"));
    create.assert_async().await;
}

#[tokio::test]
async fn test_numeric_presign_header_is_sent_as_text() {
    let mut server = Server::new_async().await;
    let presign_url = format!("{}/presigned/up-6", server.url());

    let _create = server
        .mock("POST", "/v2/upload")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "presign_url": presign_url,
                "presign_header": {"x-amz-meta-size": 123, "x-amz-meta-public": true},
                "upload_id": "up-6",
            })
            .to_string(),
        )
        .create_async()
        .await;
    let transfer = server
        .mock("PUT", "/presigned/up-6")
        .match_header("x-amz-meta-size", "123")
        .match_header("x-amz-meta-public", "true")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let _prepare = server
        .mock("POST", "/v2/upload/up-6/prepare")
        .with_status(200)
        .with_body(r#"{"url":"https://zeabur.com/p/6"}"#)
        .create_async()
        .await;

    let result = uploader_for(&server)
        .perform_upload(&json!([["index.html", "<h1>Hi</h1>"]]))
        .await;

    assert_eq!(result, UploadResult::success("https://zeabur.com/p/6"));
    transfer.assert_async().await;
}
