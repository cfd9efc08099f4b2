use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use garou::{Config, create_app};
use serde_json::json;
use tempfile::TempDir;

fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.upload_directory = temp.path().join("uploads");
    config.storage.data_file = temp.path().join("data/paintings.json");
    config.static_files.directory = temp.path().join("public");
    std::fs::create_dir_all(&config.storage.upload_directory).unwrap();
    std::fs::create_dir_all(config.storage.data_file.parent().unwrap()).unwrap();
    std::fs::create_dir_all(&config.static_files.directory).unwrap();
    config
}

async fn server_with(config: Config) -> TestServer {
    TestServer::new(create_app(config).await).unwrap()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([40, 120, 200]),
    ));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

async fn upload_painting(server: &TestServer, name: &str) -> serde_json::Value {
    let part = Part::bytes(png_bytes(32, 32))
        .file_name(name.to_owned())
        .mime_type("image/png");
    let response = server
        .post("/api/upload")
        .multipart(MultipartForm::new().add_part("painting", part))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    body["painting"].clone()
}

#[tokio::test]
async fn listing_starts_empty() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    let response = server.get("/api/paintings").await;
    response.assert_status_ok();
    let listed: Vec<serde_json::Value> = response.json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn get_unknown_painting_is_404() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    let response = server.get("/api/paintings/no-such-id").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_unknown_painting_is_404_and_leaves_store_alone() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    upload_painting(&server, "keep-me.png").await;

    let response = server.delete("/api/paintings/no-such-id").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    let listed: Vec<serde_json::Value> = server.get("/api/paintings").await.json();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn delete_removes_record_and_backing_file() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    let uploads = config.storage.upload_directory.clone();
    let server = server_with(config).await;

    let painting = upload_painting(&server, "short-lived.png").await;
    let id = painting["id"].as_str().unwrap();
    let filename = painting["filename"].as_str().unwrap();
    assert!(uploads.join(filename).exists());

    let response = server.delete(&format!("/api/paintings/{}", id)).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);

    assert!(!uploads.join(filename).exists());
    server
        .get(&format!("/api/paintings/{}", id))
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_date_controls_listing_order() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    let first = upload_painting(&server, "first.png").await;
    let second = upload_painting(&server, "second.png").await;

    // Push the second upload far into the past; it must sort last.
    let response = server
        .put(&format!(
            "/api/paintings/{}",
            second["id"].as_str().unwrap()
        ))
        .json(&json!({ "date": "2001-01-01T00:00:00Z" }))
        .await;
    response.assert_status_ok();
    let updated: serde_json::Value = response.json();
    let updated_date: chrono::DateTime<chrono::Utc> =
        updated["date"].as_str().unwrap().parse().unwrap();
    assert_eq!(
        updated_date,
        "2001-01-01T00:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap()
    );

    let listed: Vec<serde_json::Value> = server.get("/api/paintings").await.json();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], first["id"]);
    assert_eq!(listed[1]["id"], second["id"]);
}

#[tokio::test]
async fn update_with_malformed_date_is_400() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    let painting = upload_painting(&server, "dated.png").await;
    let response = server
        .put(&format!(
            "/api/paintings/{}",
            painting["id"].as_str().unwrap()
        ))
        .json(&json!({ "date": "last tuesday" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn update_unknown_painting_is_404() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    let response = server
        .put("/api/paintings/ghost")
        .json(&json!({ "date": "2001-01-01T00:00:00Z" }))
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_reflect_the_catalog() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    let empty: serde_json::Value = server.get("/api/stats").await.json();
    assert_eq!(empty["totalPaintings"], 0);
    assert_eq!(empty["totalSize"], 0);
    assert!(empty["firstPainting"].is_null());

    let a = upload_painting(&server, "a.png").await;
    let b = upload_painting(&server, "b.png").await;
    let expected_size = a["size"].as_u64().unwrap() + b["size"].as_u64().unwrap();

    let stats: serde_json::Value = server.get("/api/stats").await.json();
    assert_eq!(stats["totalPaintings"], 2);
    assert_eq!(stats["totalSize"].as_u64().unwrap(), expected_size);
    assert!(stats["firstPainting"].is_string());
    assert!(stats["latestPainting"].is_string());
}

#[tokio::test]
async fn uploaded_image_is_served_back() {
    let temp = TempDir::new().unwrap();
    let server = server_with(test_config(&temp)).await;

    let painting = upload_painting(&server, "served.png").await;
    let url = painting["imageUrl"].as_str().unwrap();

    let response = server.get(url).await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "image/jpeg"
    );
}

#[tokio::test]
async fn index_page_is_served_from_public_directory() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    std::fs::write(
        config.static_files.directory.join("index.html"),
        "<h1>My Paintings</h1>",
    )
    .unwrap();
    let server = server_with(config).await;

    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("My Paintings"));
}

#[tokio::test]
async fn corrupt_data_file_is_absorbed_as_empty() {
    let temp = TempDir::new().unwrap();
    let config = test_config(&temp);
    std::fs::write(&config.storage.data_file, "]]]]").unwrap();
    let server = server_with(config).await;

    let response = server.get("/api/paintings").await;
    response.assert_status_ok();
    let listed: Vec<serde_json::Value> = response.json();
    assert!(listed.is_empty());
}
