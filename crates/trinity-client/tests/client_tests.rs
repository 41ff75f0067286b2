// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};
use trinity_app::{AgreeOutcome, AgreeRejection, ItemId, ListQuery};
use trinity_client::{Client, USER_HEADER};

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_server_error_contains_remediation() {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .fetch_page(&ListQuery::first_page(trinity_app::ViewMode::Card))
        .expect_err("fetch should fail for unreachable endpoint");
    assert!(error.to_string().contains("trinity serve"));
}

#[test]
fn fetch_page_decodes_items_and_has_more() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/its?page=2&per_page=12&field=Economics");
        let body = r#"{
            "items": [{
                "id": 42,
                "name": "Mundell-Fleming Trilemma",
                "field": "Economics",
                "element1": "Fixed exchange rate",
                "element2": "Free capital movement",
                "element3": "Independent monetary policy",
                "element3_sacrifice_explanation": "Rates follow the anchor",
                "agree_count": 5,
                "comments_count": 2,
                "created_at": "2026-02-19T12:34:56Z"
            }],
            "has_more": false,
            "next_page": null
        }"#;
        request
            .respond(json_response(body, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let page = client.fetch_page(&ListQuery {
        page: 2,
        per_page: 12,
        field: Some("Economics".to_owned()),
        search: None,
    })?;
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_more);
    let item = &page.items[0];
    assert_eq!(item.id, ItemId::new(42));
    assert_eq!(item.description, None);
    assert_eq!(item.element1_sacrifice_explanation, None);
    assert_eq!(
        item.element3_sacrifice_explanation.as_deref(),
        Some("Rates follow the anchor")
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn malformed_page_body_is_an_error() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"html":"<div></div>"}"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .fetch_page(&ListQuery::first_page(trinity_app::ViewMode::Table))
        .expect_err("missing fields should fail to decode");
    assert!(error.to_string().contains("decode page 1 response"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn server_error_surfaces_message() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"error":"database is locked"}"#, 500))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    let error = client
        .fetch_page(&ListQuery::first_page(trinity_app::ViewMode::Card))
        .expect_err("500 should fail");
    assert_eq!(error.to_string(), "server error (500): database is locked");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn agree_posts_with_user_header() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/agree/42");
        let user = request
            .headers()
            .iter()
            .find(|header| header.field.equiv(USER_HEADER))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(user.as_deref(), Some("alice"));
        request
            .respond(json_response(
                r#"{"success":true,"count":8,"message":"Thanks for your agreement!"}"#,
                200,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?.with_user(Some("alice"));
    assert_eq!(client.agree(ItemId::new(42))?, AgreeOutcome::agreed(8));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn agree_rejection_is_an_outcome_not_an_error() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(
                r#"{"success":false,"message":"You have already agreed to this."}"#,
                409,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?.with_user(Some("alice"));
    assert_eq!(
        client.agree(ItemId::new(42))?,
        AgreeOutcome::rejected(AgreeRejection::AlreadyAgreed)
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn agree_success_without_count_is_malformed() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        for body in [r#"{"success":true}"#, ""] {
            let request = server.recv().expect("request expected");
            request
                .respond(json_response(body, 200))
                .expect("response should succeed");
        }
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    assert!(client.agree(ItemId::new(1)).is_err());
    let empty = client
        .agree(ItemId::new(1))
        .expect_err("empty body should fail");
    assert!(empty.to_string().contains("empty body"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn list_fields_decodes_string_array() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/fields");
        request
            .respond(json_response(r#"["Economics","Physics"]"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, Duration::from_secs(1))?;
    assert_eq!(
        client.list_fields()?,
        vec!["Economics".to_owned(), "Physics".to_owned()]
    );

    handle.join().expect("server thread should join");
    Ok(())
}
