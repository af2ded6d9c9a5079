//! End-to-end batches over HTTP against a wiremock server

mod common;

use batch_loader::{LoadOptions, RequestHeader, Resource};
use common::{EventLog, Recorded, serve_status, serve_text, text_scheduler};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn at(server: &MockServer, route: &str) -> Resource {
    Resource::new(format!("{}{}", server.uri(), route))
}

#[tokio::test]
async fn text_batch_loads_every_item() {
    let server = MockServer::start().await;
    serve_text(&server, "/a.txt", "alpha").await;
    serve_text(&server, "/b.txt", "beta").await;

    let mut scheduler = text_scheduler();
    let log = EventLog::attach(&mut scheduler);

    let summary = scheduler
        .load(
            vec![at(&server, "/a.txt"), at(&server, "/b.txt")],
            LoadOptions {
                batch_size: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(summary.is_complete());
    let milestones = log.milestones();
    assert!(matches!(milestones.first(), Some(Recorded::Start(s)) if s.len() == 2));
    assert!(milestones.contains(&Recorded::Item {
        index: 0,
        data: "alpha".into()
    }));
    assert!(milestones.contains(&Recorded::Item {
        index: 1,
        data: "beta".into()
    }));
    assert_eq!(
        &milestones[milestones.len() - 2..],
        &[
            Recorded::Load,
            Recorded::End {
                loaded: 2,
                errored: 0
            }
        ]
    );
    assert!(log.count(|e| matches!(e, Recorded::Progress { .. })) >= 2);
}

#[tokio::test]
async fn http_404_is_an_error_event_with_status() {
    let server = MockServer::start().await;
    serve_text(&server, "/a.txt", "alpha").await;
    serve_status(&server, "/missing.txt", 404).await;

    let mut scheduler = text_scheduler();
    let log = EventLog::attach(&mut scheduler);

    let missing = at(&server, "/missing.txt");
    let summary = scheduler
        .load(
            vec![at(&server, "/a.txt"), missing.clone()],
            LoadOptions::default(),
        )
        .await
        .unwrap();

    let errors: Vec<_> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Recorded::Error { source, message } => Some((source, message)),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, missing.locator);
    assert!(errors[0].1.contains("404"));
    assert!(errors[0].1.contains("Not Found"));

    assert_eq!(log.count(|e| *e == Recorded::Load), 0);
    assert_eq!(log.count(|e| matches!(e, Recorded::End { .. })), 1);
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.errored, 1);
}

#[tokio::test]
async fn batch_and_resource_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .and(header("Authorization", "Bearer token"))
        .and(header("X-Item", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alpha"))
        .expect(1)
        .mount(&server)
        .await;

    let mut scheduler = text_scheduler();
    let summary = scheduler
        .load(
            vec![at(&server, "/a.txt").with_header("X-Item", "a")],
            LoadOptions {
                request_headers: vec![RequestHeader::new("Authorization", "Bearer token")],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(summary.is_complete());
}

#[tokio::test]
async fn locator_credentials_follow_with_credentials_flag() {
    let server = MockServer::start().await;
    serve_text(&server, "/secret.txt", "s3cret").await;
    let with_userinfo = format!(
        "{}/secret.txt",
        server.uri().replacen("http://", "http://user:pw@", 1)
    );

    let mut scheduler = text_scheduler();
    let _ = scheduler
        .load(vec![Resource::new(with_userinfo.clone())], LoadOptions::default())
        .await
        .unwrap();
    let _ = scheduler
        .load(
            vec![Resource::new(with_userinfo)],
            LoadOptions {
                with_credentials: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("authorization").is_none());
    let auth = requests[1]
        .headers
        .get("authorization")
        .expect("credentials should be sent")
        .to_str()
        .unwrap();
    assert!(auth.starts_with("Basic "));
}

#[tokio::test]
async fn default_charset_overrides_response_charset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latin.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/plain; charset=utf-8")
                .set_body_bytes(vec![0x63, 0x61, 0x66, 0xE9]),
        )
        .mount(&server)
        .await;

    let mut scheduler = text_scheduler();
    scheduler.set_default_character_set(Some("ISO-8859-1".to_string()));
    let log = EventLog::attach(&mut scheduler);

    let _ = scheduler
        .load(vec![at(&server, "/latin.txt")], LoadOptions::default())
        .await
        .unwrap();

    assert!(log.events().contains(&Recorded::Item {
        index: 0,
        data: "café".into()
    }));
}

#[tokio::test]
async fn windows_1252_response_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cp1252.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/plain; charset=windows-1252")
                .set_body_bytes(b"caf\xE9 \x80".to_vec()),
        )
        .mount(&server)
        .await;

    let mut scheduler = text_scheduler();
    let log = EventLog::attach(&mut scheduler);
    let summary = scheduler
        .load(vec![at(&server, "/cp1252.txt")], LoadOptions::default())
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert_eq!(log.count(|e| matches!(e, Recorded::Error { .. })), 0);
    assert!(log.events().contains(&Recorded::Item {
        index: 0,
        data: "café €".into()
    }));
}

#[tokio::test]
async fn unknown_response_charset_falls_back_to_utf8() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/odd.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/plain; charset=x-unheard-of")
                .set_body_bytes(b"hello".to_vec()),
        )
        .mount(&server)
        .await;

    let mut scheduler = text_scheduler();
    let log = EventLog::attach(&mut scheduler);
    let summary = scheduler
        .load(vec![at(&server, "/odd.txt")], LoadOptions::default())
        .await
        .unwrap();

    assert!(summary.is_complete());
    assert!(log.events().contains(&Recorded::Item {
        index: 0,
        data: "hello".into()
    }));
}

#[tokio::test]
async fn unreachable_host_is_an_error_not_a_failure_of_load() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut scheduler = text_scheduler();
    let log = EventLog::attach(&mut scheduler);

    let summary = scheduler
        .load(
            vec![Resource::new(format!("http://127.0.0.1:{port}/a.txt"))],
            LoadOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(summary.errored, 1);
    assert_eq!(log.count(|e| matches!(e, Recorded::Error { .. })), 1);
    assert_eq!(
        log.milestones().last(),
        Some(&Recorded::End {
            loaded: 0,
            errored: 1
        })
    );
}

#[tokio::test]
async fn progress_never_exceeds_full_scale() {
    let server = MockServer::start().await;
    let big = "x".repeat(256 * 1024);
    for route in ["/1.txt", "/2.txt", "/3.txt"] {
        serve_text(&server, route, &big).await;
    }

    let mut scheduler = text_scheduler();
    let log = EventLog::attach(&mut scheduler);
    let _ = scheduler
        .load(
            vec![
                at(&server, "/1.txt"),
                at(&server, "/2.txt"),
                at(&server, "/3.txt"),
            ],
            LoadOptions {
                batch_size: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let loaded: Vec<f64> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            Recorded::Progress { loaded, .. } => Some(loaded),
            _ => None,
        })
        .collect();
    assert!(!loaded.is_empty());
    assert!(loaded.iter().all(|l| (0.0..=100.0).contains(l)));
    assert!(loaded.windows(2).all(|w| w[0] <= w[1]));
}
