//! Binding a harness to the lifetime of a test.
//!
//! [`ResourceTestRule`] starts a fresh deployment before the test body and
//! closes it afterwards, whether the body returned or panicked.
//!
//! # Example
//!
//! ```rust,ignore
//! static RULE: LazyLock<ResourceTestRule> = LazyLock::new(|| {
//!     ResourceTestRule::new(
//!         TestConfiguration::builder().add_resource(Arc::new(EchoResource)),
//!     )
//! });
//!
//! #[tokio::test]
//! async fn echo() {
//!     RULE.run(|client| async move {
//!         let response = client.get("/echo").send().await.unwrap();
//!         assert_eq!(response.text(), "test");
//!     })
//!     .await
//!     .unwrap();
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::TestClient;
use crate::configuration::{ClientCustomizer, TestConfigurationBuilder};
use crate::error::{TestingError, TestingResult};
use crate::harness::ResourceTestHarness;
use crate::json::JsonMapper;
use crate::validation::Validator;

/// Runs test bodies against a freshly started deployment.
///
/// Every invocation builds its own configuration from the builder, so tests
/// sharing one rule run in parallel without colliding in the registry.
#[derive(Debug, Clone)]
pub struct ResourceTestRule {
    builder: TestConfigurationBuilder,
}

impl ResourceTestRule {
    /// Creates a rule deploying what `builder` describes.
    pub fn new(builder: TestConfigurationBuilder) -> Self {
        Self { builder }
    }

    /// The builder each invocation is built from.
    pub fn builder(&self) -> &TestConfigurationBuilder {
        &self.builder
    }

    /// Starts a harness for one test.
    pub async fn before(&self) -> TestingResult<ResourceTestHarness> {
        ResourceTestHarness::start_with(self.builder.build()).await
    }

    /// Closes a harness returned by [`before`](Self::before).
    pub async fn after(&self, mut harness: ResourceTestHarness) -> TestingResult<()> {
        harness.close().await
    }

    /// Runs `body` with the client of a fresh deployment.
    ///
    /// The body runs on its own task. The deployment is closed before this
    /// returns; a panic of the body is then resumed on the caller.
    pub async fn run<F, Fut, T>(&self, body: F) -> TestingResult<T>
    where
        F: FnOnce(TestClient) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let harness = self.before().await?;
        let client = harness.client().clone();
        debug!(id = %harness.id(), "Running test body");

        let outcome = tokio::spawn(body(client)).await;
        let closed = self.after(harness).await;

        match outcome {
            Ok(value) => closed.map(|()| value),
            Err(err) if err.is_panic() => {
                if let Err(close_err) = &closed {
                    warn!(
                        error = %close_err,
                        "Closing the deployment failed after the test body panicked"
                    );
                }
                std::panic::resume_unwind(err.into_panic())
            }
            Err(err) => {
                closed?;
                Err(TestingError::TestAborted(err))
            }
        }
    }

    /// The JSON mapper of the deployments.
    pub fn json_mapper(&self) -> &Arc<dyn JsonMapper> {
        self.builder.current_json_mapper()
    }

    /// The validator of the deployments.
    pub fn validator(&self) -> &Arc<dyn Validator> {
        self.builder.current_validator()
    }

    /// The client customizer of the deployments.
    pub fn client_customizer(&self) -> &ClientCustomizer {
        self.builder.current_client_customizer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{ConfigurationId, ConfigurationRegistry};
    use crate::container::InMemoryTestContainerFactory;
    use crate::error::ClientError;
    use crate::providers::Resource;
    use axum::{Router, routing::get};
    use parking_lot::{Mutex, const_mutex};

    struct Echo;

    impl Resource for Echo {
        fn routes(self: Arc<Self>) -> Router {
            Router::new().route("/echo", get(|| async { "test" }))
        }
    }

    fn rule() -> ResourceTestRule {
        ResourceTestRule::new(
            TestConfigurationBuilder::new()
                .add_resource(Arc::new(Echo))
                .container_factory(Arc::new(InMemoryTestContainerFactory::new())),
        )
    }

    #[tokio::test]
    async fn test_run_returns_body_value() {
        let text = rule()
            .run(|client| async move { client.get("/echo").send().await.unwrap().text() })
            .await
            .unwrap();
        assert_eq!(text, "test");
    }

    #[tokio::test]
    async fn test_each_invocation_uses_fresh_id() {
        let rule = rule();
        let first = rule.before().await.unwrap();
        let second = rule.before().await.unwrap();
        assert_ne!(first.id(), second.id());

        let ids: [ConfigurationId; 2] = [first.id(), second.id()];
        rule.after(first).await.unwrap();
        rule.after(second).await.unwrap();
        for id in ids {
            assert!(!ConfigurationRegistry::global().contains(id));
        }
    }

    #[tokio::test]
    async fn test_panicking_body_still_closes() {
        static SEEN: Mutex<Option<TestClient>> = const_mutex(None);

        let rule = rule();
        let result = tokio::spawn(async move {
            rule.run(|client| async move {
                *SEEN.lock() = Some(client);
                panic!("assertion failed in test body");
            })
            .await
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.is_panic());

        let client = SEEN.lock().take().expect("body ran");
        let sent = client.get("/echo").send().await;
        assert!(matches!(sent, Err(ClientError::Disconnected)));
    }

    #[test]
    fn test_accessors_expose_builder_settings() {
        let rule = rule();
        assert!(Arc::ptr_eq(
            rule.json_mapper(),
            rule.builder().build().json_mapper()
        ));
    }
}
