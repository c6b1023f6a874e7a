//! Integration tests for the harness lifecycle.
//!
//! Covers registration bracketing, failure injection and isolation of
//! concurrent harnesses.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::containers::{FailingContainerFactory, UnstoppableContainerFactory};
use common::resources::{HeaderEchoResource, PeopleResource, PropertiesResource, StampProvider};
use helios_rest_testing::{
    ConfigurationRegistry, ErrorMessage, HarnessState, ResourceTestHarness, TestClient,
    TestConfiguration, TestingError,
};
use serde_json::{Value, json};

#[tokio::test]
async fn test_echo_round_trip() {
    let mut harness = ResourceTestHarness::start_with(common::echo_builder().build())
        .await
        .expect("harness starts");

    let response = harness.client().get("/echo").send().await.unwrap();
    response.assert_status(StatusCode::OK);
    assert_eq!(response.text(), "test");

    harness.close().await.unwrap();
}

#[tokio::test]
async fn test_registry_entry_lives_exactly_while_running() {
    let mut harness = ResourceTestHarness::new(common::echo_builder().build());
    let id = harness.id();
    assert!(!ConfigurationRegistry::global().contains(id));

    harness.start().await.unwrap();
    assert!(ConfigurationRegistry::global().contains(id));

    harness.close().await.unwrap();
    assert!(!ConfigurationRegistry::global().contains(id));
}

#[tokio::test]
async fn test_start_failure_leaves_registry_clean() {
    let factory = FailingContainerFactory::new();
    let observed = factory.observed();
    let configuration = common::echo_builder()
        .container_factory(Arc::new(factory))
        .build();
    let id = configuration.id();

    let mut harness = ResourceTestHarness::new(configuration);
    let err = harness.start().await.unwrap_err();

    assert!(matches!(err, TestingError::Container(_)));
    assert_eq!(
        err.to_string(),
        format!("test container failure: {}", FailingContainerFactory::MESSAGE)
    );
    assert_eq!(harness.state(), HarnessState::Failed);
    assert!(!ConfigurationRegistry::global().contains(id));

    let observed = observed.lock();
    assert_eq!(observed.id, Some(id));
    assert!(observed.registered_at_start);
}

#[tokio::test]
async fn test_close_after_failed_start_is_noop() {
    let configuration = common::echo_builder()
        .container_factory(Arc::new(FailingContainerFactory::new()))
        .build();
    let mut harness = ResourceTestHarness::new(configuration);
    assert!(harness.start().await.is_err());

    harness.close().await.unwrap();
    assert_eq!(harness.state(), HarnessState::Failed);
}

#[tokio::test]
async fn test_stop_failure_still_unregisters() {
    let configuration = common::echo_builder()
        .container_factory(Arc::new(UnstoppableContainerFactory))
        .build();
    let id = configuration.id();
    let mut harness = ResourceTestHarness::start_with(configuration).await.unwrap();

    let err = harness.close().await.unwrap_err();
    assert!(err.to_string().contains("injected stop failure"));
    assert_eq!(harness.state(), HarnessState::Closed);
    assert!(!ConfigurationRegistry::global().contains(id));
}

#[tokio::test]
async fn test_double_close() {
    let mut harness = ResourceTestHarness::start_with(common::echo_builder().build())
        .await
        .unwrap();
    harness.close().await.unwrap();
    harness.close().await.unwrap();
    assert_eq!(harness.state(), HarnessState::Closed);
}

#[tokio::test]
async fn test_same_builder_yields_distinct_ids() {
    let builder = common::echo_builder();
    let mut first = ResourceTestHarness::start_with(builder.build()).await.unwrap();
    let mut second = ResourceTestHarness::start_with(builder.build()).await.unwrap();

    assert_ne!(first.id(), second.id());
    assert!(ConfigurationRegistry::global().contains(first.id()));
    assert!(ConfigurationRegistry::global().contains(second.id()));

    first.close().await.unwrap();
    assert!(ConfigurationRegistry::global().contains(second.id()));
    second.close().await.unwrap();
}

fn tagged(tag: usize) -> TestConfiguration {
    common::echo_builder()
        .add_resource(Arc::new(PropertiesResource))
        .add_property("tag", tag)
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_harnesses_are_isolated() {
    let tasks: Vec<_> = (0..16)
        .map(|tag| {
            tokio::spawn(async move {
                let mut harness = ResourceTestHarness::start_with(tagged(tag)).await.unwrap();
                let id = harness.id();

                for _ in 0..5 {
                    let response = harness.client().get("/properties/tag").send().await.unwrap();
                    response.assert_status(StatusCode::OK);
                    assert_eq!(response.json::<Value>().unwrap(), json!(tag));
                }

                harness.close().await.unwrap();
                id
            })
        })
        .collect();

    for task in tasks {
        let id = task.await.unwrap();
        assert!(!ConfigurationRegistry::global().contains(id));
    }
}

async fn assert_unrouted(client: &TestClient, path: &str) {
    let response = client.get(path).send().await.unwrap();
    response.assert_status(StatusCode::NOT_FOUND);
    let body: ErrorMessage = response.json().unwrap();
    assert_eq!(body.message, format!("HTTP 404 Not Found: {}", path));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_harnesses_do_not_share_resources_or_providers() {
    let stamped = common::echo_builder()
        .add_resource(Arc::new(PeopleResource))
        .add_provider(Arc::new(StampProvider))
        .build();
    let plain = common::echo_builder()
        .add_resource(Arc::new(HeaderEchoResource))
        .build();

    let (stamped, plain) = tokio::join!(
        ResourceTestHarness::start_with(stamped),
        ResourceTestHarness::start_with(plain)
    );
    let (mut stamped, mut plain) = (stamped.unwrap(), plain.unwrap());

    for _ in 0..5 {
        let (people, echo) = tokio::join!(
            stamped.client().get("/people/ada").send(),
            plain.client().get("/echo").send()
        );
        let (people, echo) = (people.unwrap(), echo.unwrap());
        people.assert_status(StatusCode::OK);
        assert_eq!(people.header(StampProvider::HEADER.as_str()), Some("stamp"));
        echo.assert_status(StatusCode::OK);
        assert_eq!(echo.header(StampProvider::HEADER.as_str()), None);

        assert_unrouted(stamped.client(), "/headers/x-test").await;
        assert_unrouted(plain.client(), "/people/ada").await;
    }

    stamped.close().await.unwrap();
    plain.close().await.unwrap();
}

#[tokio::test]
async fn test_unknown_property_is_not_found() {
    let mut harness = ResourceTestHarness::start_with(tagged(1)).await.unwrap();
    harness
        .client()
        .get("/properties/missing")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    harness.close().await.unwrap();
}
