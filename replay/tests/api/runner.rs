use std::time::Duration;

use replay::{
  config::{ReplayConfig, SuccessRange},
  domain::{
    request::{RawDescriptor, RequestDescriptor},
    response::{AnalysisStatus, Outcome, RequestFailure},
  },
  ReplayApi,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::{
  matchers::{method, path, query_param},
  Mock, MockServer, ResponseTemplate,
};

use crate::helpers::{
  spawn_test_app, spawn_test_app_with, test_config, unreachable_url, EventLog, ANALYZE_PATH,
};

fn analysis_ok() -> ResponseTemplate {
  ResponseTemplate::new(200).set_body_json(json!({
    "status": "OK",
    "message": "Conditions are within the ideal range",
    "action": "No action needed"
  }))
}

fn test_date(request: &wiremock::Request) -> Option<String> {
  request
    .url
    .query_pairs()
    .find(|(key, _)| key == "test_date")
    .map(|(_, value)| value.into_owned())
}

#[tokio::test]
async fn sends_one_request_per_descriptor_in_file_order() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .and(path(ANALYZE_PATH))
    .respond_with(analysis_ok())
    .expect(3)
    .mount(&test_app.test_server)
    .await;

  let mut events = EventLog::default();
  let summary = test_app
    .app
    .run(
      test_app.load_test_requests(),
      &CancellationToken::new(),
      |event| events.record(event),
    )
    .await;

  assert_eq!(events.started, Some(3));
  assert_eq!(events.sending, vec![1, 2, 3]);
  assert_eq!(events.completed, vec![(1, true), (2, true), (3, true)]);
  assert!(events.finished);

  let received = test_app.test_server.received_requests().await.unwrap();
  let dates: Vec<Option<String>> = received.iter().map(test_date).collect();
  assert_eq!(
    dates,
    vec![
      Some(String::from("2024-01-15T08:00:00")),
      Some(String::from("2024-01-15T14:00:00")),
      None
    ]
  );
  let temperatures: Vec<Value> = received
    .iter()
    .map(|r| r.body_json::<Value>().unwrap()["temperature"].clone())
    .collect();
  assert_eq!(temperatures, vec![json!(21.5), json!(27.8), json!(18.4)]);

  assert_eq!(summary.total, 3);
  assert_eq!(summary.successful, 3);
  assert_eq!(summary.failed, 0);
  assert!(summary.all_succeeded());
}

#[tokio::test]
async fn body_is_sent_verbatim_as_json() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200))
    .mount(&test_app.test_server)
    .await;

  let descriptors = test_app.load_test_requests();
  let expected = descriptors[0].body.clone().unwrap();
  let _ = test_app
    .app
    .run(descriptors, &CancellationToken::new(), |_| {})
    .await;

  let received = test_app.test_server.received_requests().await.unwrap();
  let first = &received[0];
  assert_eq!(first.body_json::<Value>().unwrap(), expected);
  let content_type = first.headers.get("content-type").unwrap();
  assert_eq!(content_type.to_str().unwrap(), "application/json");
}

#[tokio::test]
async fn empty_file_sends_nothing() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .respond_with(analysis_ok())
    .expect(0)
    .mount(&test_app.test_server)
    .await;

  let mut events = EventLog::default();
  let summary = test_app
    .app
    .run(Vec::new(), &CancellationToken::new(), |event| {
      events.record(event)
    })
    .await;

  assert_eq!(events.started, Some(0));
  assert!(events.completed.is_empty());
  assert_eq!(summary.total, 0);
  assert_eq!(summary.successful, 0);
  assert_eq!(summary.failed, 0);
  assert_eq!(summary.average_per_request(), None);
}

#[tokio::test]
async fn unreachable_endpoint_fails_every_descriptor_without_aborting() {
  let api = ReplayApi::new(&test_config(unreachable_url())).unwrap();
  let descriptors =
    ReplayApi::parse_descriptors(include_str!("test_requests.json")).unwrap();

  let mut events = EventLog::default();
  let summary = api
    .run(descriptors, &CancellationToken::new(), |event| {
      events.record(event)
    })
    .await;

  assert_eq!(events.completed, vec![(1, false), (2, false), (3, false)]);
  assert_eq!(summary.successful, 0);
  assert_eq!(summary.failed, 3);
  assert_eq!(
    summary.failed_labels,
    vec!["2024-01-15T08:00:00", "2024-01-15T14:00:00", "#3"]
  );
}

#[tokio::test]
async fn network_failures_carry_no_status() {
  let api = ReplayApi::new(&test_config(unreachable_url())).unwrap();
  let descriptors = ReplayApi::parse_descriptors(
    r#"[{ "date": "2024-01-15T08:00:00", "body": { "humidity": 40 } }]"#,
  )
  .unwrap();
  let descriptor: RequestDescriptor = descriptors[0].clone().try_into().unwrap();

  let outcome = api.send_descriptor(1, &descriptor).await;
  assert_eq!(outcome.http_status, None);
  assert!(matches!(
    outcome.outcome,
    Outcome::Failure(RequestFailure::Network(_))
  ));
}

#[tokio::test]
async fn date_is_passed_through_as_test_date() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .and(path(ANALYZE_PATH))
    .and(query_param("test_date", "2024-01-15T08:00:00"))
    .respond_with(analysis_ok())
    .expect(1)
    .mount(&test_app.test_server)
    .await;

  let descriptors = ReplayApi::parse_descriptors(
    r#"[{ "date": "2024-01-15T08:00:00", "body": { "plant_id": "basil-001" } }]"#,
  )
  .unwrap();
  let summary = test_app
    .app
    .run(descriptors, &CancellationToken::new(), |_| {})
    .await;
  assert_eq!(summary.successful, 1);
}

#[tokio::test]
async fn missing_date_sends_no_query() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .respond_with(analysis_ok())
    .mount(&test_app.test_server)
    .await;

  let descriptors =
    ReplayApi::parse_descriptors(r#"[{ "body": { "plant_id": "tomato-123" } }]"#).unwrap();
  let _ = test_app
    .app
    .run(descriptors, &CancellationToken::new(), |_| {})
    .await;

  let received = test_app.test_server.received_requests().await.unwrap();
  assert_eq!(received.len(), 1);
  assert_eq!(received[0].url.query(), None);
}

#[tokio::test]
async fn descriptor_without_body_is_recorded_and_skipped() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .respond_with(analysis_ok())
    .expect(2)
    .mount(&test_app.test_server)
    .await;

  let descriptors = ReplayApi::parse_descriptors(
    r#"[
      { "date": "2024-01-15T08:00:00", "body": { "humidity": 40 } },
      { "date": "2024-01-15T09:00:00" },
      { "date": "2024-01-15T10:00:00", "body": { "humidity": 42 } }
    ]"#,
  )
  .unwrap();

  let mut events = EventLog::default();
  let summary = test_app
    .app
    .run(descriptors, &CancellationToken::new(), |event| {
      events.record(event)
    })
    .await;

  assert_eq!(events.sending, vec![1, 3]);
  assert_eq!(events.completed, vec![(1, true), (2, false), (3, true)]);
  assert_eq!(summary.successful, 2);
  assert_eq!(summary.failed, 1);
  assert_eq!(summary.failed_labels, vec!["2024-01-15T09:00:00"]);
}

#[tokio::test]
async fn error_status_is_a_failure_and_the_run_continues() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .and(query_param("test_date", "2024-01-15T08:00:00"))
    .respond_with(
      ResponseTemplate::new(503).set_body_json(json!({ "detail": "Database unavailable" })),
    )
    .mount(&test_app.test_server)
    .await;
  Mock::given(method("POST"))
    .respond_with(analysis_ok())
    .mount(&test_app.test_server)
    .await;

  let mut outcomes = Vec::new();
  let summary = test_app
    .app
    .run(
      test_app.load_test_requests(),
      &CancellationToken::new(),
      |event| {
        if let replay::RunEvent::Completed { outcome, .. } = event {
          outcomes.push(outcome.clone());
        }
      },
    )
    .await;

  assert_eq!(outcomes.len(), 3);
  assert_eq!(outcomes[0].http_status, Some(503));
  assert_eq!(
    outcomes[0].outcome,
    Outcome::Failure(RequestFailure::UnexpectedStatus {
      status: 503,
      detail: Some(String::from("Database unavailable")),
    })
  );
  match &outcomes[1].outcome {
    Outcome::Success {
      analysis: Some(analysis),
    } => assert_eq!(analysis.status, AnalysisStatus::Ok),
    other => panic!("expected analysis, got {:?}", other),
  }
  assert_eq!(summary.successful, 2);
  assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn success_range_decides_what_counts_as_success() {
  let strict = spawn_test_app_with(SuccessRange::OkOnly).await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(201))
    .mount(&strict.test_server)
    .await;
  let summary = strict
    .app
    .run(strict.load_test_requests(), &CancellationToken::new(), |_| {})
    .await;
  assert_eq!(summary.successful, 0);
  assert_eq!(summary.failed, 3);

  let lenient = spawn_test_app_with(SuccessRange::Any2xx).await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(201))
    .mount(&lenient.test_server)
    .await;
  let summary = lenient
    .app
    .run(lenient.load_test_requests(), &CancellationToken::new(), |_| {})
    .await;
  assert_eq!(summary.successful, 3);
}

#[tokio::test]
async fn slow_responses_time_out_as_network_failures() {
  let test_server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
    .mount(&test_server)
    .await;
  let config = ReplayConfig {
    timeout_secs: 1,
    ..test_config(format!("{}{}", test_server.uri(), ANALYZE_PATH))
  };
  let api = ReplayApi::new(&config).unwrap();
  let descriptor: RequestDescriptor = RawDescriptor {
    date: None,
    body: Some(json!({ "humidity": 40 })),
  }
  .try_into()
  .unwrap();

  let outcome = api.send_descriptor(1, &descriptor).await;
  assert_eq!(
    outcome.outcome,
    Outcome::Failure(RequestFailure::Network(String::from(
      "request timed out after 1 seconds"
    )))
  );
}

#[tokio::test]
async fn waits_between_requests_but_not_after_the_last() {
  let test_server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200))
    .mount(&test_server)
    .await;
  let config = ReplayConfig {
    request_delay_secs: 0.5,
    ..test_config(format!("{}{}", test_server.uri(), ANALYZE_PATH))
  };
  let api = ReplayApi::new(&config).unwrap();
  let descriptors = ReplayApi::parse_descriptors(
    r#"[{ "body": { "humidity": 40 } }, { "body": { "humidity": 41 } }]"#,
  )
  .unwrap();

  let summary = api.run(descriptors, &CancellationToken::new(), |_| {}).await;
  assert_eq!(summary.successful, 2);
  assert!(summary.elapsed >= Duration::from_millis(500));
  assert!(summary.elapsed < Duration::from_millis(1000));
}

#[tokio::test]
async fn cancelled_before_start_sends_nothing() {
  let test_app = spawn_test_app().await;
  Mock::given(method("POST"))
    .respond_with(analysis_ok())
    .expect(0)
    .mount(&test_app.test_server)
    .await;

  let cancel = CancellationToken::new();
  cancel.cancel();
  let summary = test_app
    .app
    .run(test_app.load_test_requests(), &cancel, |_| {})
    .await;

  assert!(summary.interrupted);
  assert_eq!(summary.not_attempted, 3);
  assert_eq!(summary.successful, 0);
  assert_eq!(summary.failed, 0);
  assert!(!summary.all_succeeded());
}

#[tokio::test]
async fn cancelling_during_the_delay_stops_after_the_current_request() {
  let test_server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(analysis_ok())
    .expect(1)
    .mount(&test_server)
    .await;
  let config = ReplayConfig {
    request_delay_secs: 30.0,
    ..test_config(format!("{}{}", test_server.uri(), ANALYZE_PATH))
  };
  let api = ReplayApi::new(&config).unwrap();
  let descriptors = ReplayApi::parse_descriptors(include_str!("test_requests.json")).unwrap();

  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(300)).await;
    trigger.cancel();
  });

  let summary = tokio::time::timeout(Duration::from_secs(10), api.run(descriptors, &cancel, |_| {}))
    .await
    .expect("run stops once cancelled");

  assert!(summary.interrupted);
  assert_eq!(summary.successful, 1);
  assert_eq!(summary.not_attempted, 2);
}

#[tokio::test]
async fn skipped_descriptors_do_not_add_a_delay() {
  let test_server = MockServer::start().await;
  Mock::given(method("POST"))
    .respond_with(analysis_ok())
    .expect(2)
    .mount(&test_server)
    .await;
  let config = ReplayConfig {
    request_delay_secs: 0.5,
    ..test_config(format!("{}{}", test_server.uri(), ANALYZE_PATH))
  };
  let api = ReplayApi::new(&config).unwrap();

  for requests in [
    r#"[{ "body": { "humidity": 40 } }, { "date": "2024-01-15T09:00:00" }]"#,
    r#"[{ "date": "2024-01-15T09:00:00", "body": {} }, { "body": { "humidity": 41 } }]"#,
  ] {
    let descriptors = ReplayApi::parse_descriptors(requests).unwrap();
    let summary = api.run(descriptors, &CancellationToken::new(), |_| {}).await;
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 1);
    assert!(
      summary.elapsed < Duration::from_millis(500),
      "waited {:?} for {}",
      summary.elapsed,
      requests
    );
  }
}
