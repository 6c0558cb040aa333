use anyhow::Result;
use httpmock::prelude::*;
use pending_import::domain::model::{PersistedPart, PersistedRecord, UploadFile};
use pending_import::domain::ports::{ImportSource, RecordBackend};
use pending_import::{ApiClient, AppError, PendingRecord};
use serde_json::json;

#[tokio::test]
async fn test_list_basic_info() -> Result<()> {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/basic_info");
            then.status(200).json_body(json!([
                {
                    "id": 1,
                    "shipment_date": "25/08/01",
                    "order_number": "1234567",
                    "delivery_number": "00000000",
                    "person_in_charge": "田中",
                    "shipping_cost": 300,
                    "total_amount": 601,
                    "created_at": "2025-08-10 09:00:00"
                }
            ]));
        })
        .await;

    let client = ApiClient::new(server.base_url());
    let records = client.list_basic_info().await?;

    api_mock.assert_async().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].order_number, "1234567");
    assert_eq!(records[0].total_amount, 601.0);
    Ok(())
}

#[tokio::test]
async fn test_save_records_sends_localized_keys() -> Result<()> {
    let server = MockServer::start_async().await;
    let api_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/save_data")
                .body_contains("\"受注番号\":\"1234567\"")
                .body_contains("\"数量\":[2]");
            then.status(200)
                .json_body(json!({"success": true, "session_id": "abc-123"}));
        })
        .await;

    let mut record = PendingRecord {
        order_number: "1234567".to_string(),
        ..PendingRecord::default()
    };
    record.set_lines(vec![pending_import::LineItem::priced("A", "パッキン", 2.0, 150.0)]);

    let client = ApiClient::new(format!("{}/", server.base_url()));
    let receipt = client.save_records(&[record]).await?;

    api_mock.assert_async().await;
    assert!(receipt.success);
    assert_eq!(receipt.session_id.as_deref(), Some("abc-123"));
    Ok(())
}

#[tokio::test]
async fn test_backend_error_message_is_surfaced() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/save_data");
            then.status(500)
                .json_body(json!({"error": "UNIQUE constraint failed"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/purchase_list");
            then.status(502).body("bad gateway");
        })
        .await;

    let client = ApiClient::new(server.base_url());

    match client.save_records(&[PendingRecord::default()]).await {
        Err(AppError::BackendError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "UNIQUE constraint failed");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    match client.list_purchases().await {
        Err(AppError::BackendError { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "HTTP error! status: 502");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_endpoints() -> Result<()> {
    let server = MockServer::start_async().await;
    let update_record = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/basic_info/7")
                .body_contains("\"person_in_charge\":\"佐藤\"");
            then.status(200).json_body(json!({"success": true}));
        })
        .await;
    let update_part = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/parts_info/3")
                .body_contains("\"sales_amount\":1200");
            then.status(200).json_body(json!({"success": true}));
        })
        .await;
    let delete_record = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/basic_info/7");
            then.status(200).json_body(json!({"success": true}));
        })
        .await;
    let delete_part = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/parts_info/99");
            then.status(404).json_body(json!({"error": "Part not found"}));
        })
        .await;

    let client = ApiClient::new(server.base_url());

    let record = PersistedRecord {
        id: 7,
        person_in_charge: "佐藤".to_string(),
        ..PersistedRecord::default()
    };
    client.update_record(7, &record).await?;

    let part = PersistedPart {
        id: 3,
        quantity: 4.0,
        unit_price: 300.0,
        sales_amount: 1200.0,
        ..PersistedPart::default()
    };
    client.update_part(3, &part).await?;
    client.delete_record(7).await?;

    let err = client.delete_part(99).await.unwrap_err();
    assert_eq!(err.user_friendly_message(), "Part not found");

    update_record.assert_async().await;
    update_part.assert_async().await;
    delete_record.assert_async().await;
    delete_part.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_upload_wraps_single_object() -> Result<()> {
    let server = MockServer::start_async().await;
    let upload_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/upload").body_contains("slips.json");
            then.status(200).json_body(json!({
                "success": true,
                "data": {"受注番号": "1234567"}
            }));
        })
        .await;

    let client = ApiClient::new(server.base_url());
    let raw = client
        .upload_file(UploadFile {
            file_name: "slips.json".to_string(),
            mime: "application/json",
            bytes: b"{}".to_vec(),
        })
        .await?;

    upload_mock.assert_async().await;
    assert_eq!(raw, vec![json!({"受注番号": "1234567"})]);
    Ok(())
}

#[tokio::test]
async fn test_analyze_failure_joins_errors() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/dify/fetch-data-multiple");
            then.status(200).json_body(json!({
                "success": false,
                "errors": ["slip1.png: timeout", "slip2.png: unreadable"]
            }));
        })
        .await;

    let client = ApiClient::new(server.base_url());
    let files = vec![UploadFile {
        file_name: "slip1.png".to_string(),
        mime: "image/png",
        bytes: vec![0x89, b'P', b'N', b'G'],
    }];

    match client.analyze_images(files).await {
        Err(AppError::BackendError { message, .. }) => {
            assert_eq!(message, "slip1.png: timeout; slip2.png: unreadable");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}
