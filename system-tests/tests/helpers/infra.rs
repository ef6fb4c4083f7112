// system-tests/tests/helpers/infra.rs
// ============================================================================
// Module: System Test Infrastructure
// Description: S3 service fixture for the harness system-tests.
// Purpose: Provide a reachable mock S3 endpoint and matching harness config.
// Dependencies: testcontainers, fixture-bench-core, fixture-bench-s3
// ============================================================================

//! ## Overview
//! [`S3Fixture`] resolves an S3-compatible endpoint, either from `S3_ENDPOINT`
//! or by starting a LocalStack container with only the S3 service enabled.
//! The container lives as long as the fixture.

use std::path::PathBuf;
use std::sync::Arc;

use fixture_bench_core::HarnessConfig;
use fixture_bench_core::HarnessEventSink;
use fixture_bench_core::TestContext;
use fixture_bench_s3::S3ObjectStoreClient;
use system_tests::config::SystemTestConfig;
use testcontainers::ContainerAsync;
use testcontainers::GenericImage;
use testcontainers::ImageExt;
use testcontainers::core::IntoContainerPort;
use testcontainers::core::WaitFor;
use testcontainers::runners::AsyncRunner;

/// LocalStack edge port.
const LOCALSTACK_PORT: u16 = 4566;

/// Running (or external) S3 service.
pub struct S3Fixture {
    /// Base URL of the service.
    pub endpoint: String,
    /// Container handle; `None` for an external endpoint.
    _container: Option<ContainerAsync<GenericImage>>,
}

impl S3Fixture {
    /// Connects to `S3_ENDPOINT` or starts LocalStack.
    pub async fn start(config: &SystemTestConfig) -> Result<Self, String> {
        if let Some(endpoint) = &config.endpoint {
            return Ok(Self {
                endpoint: endpoint.clone(),
                _container: None,
            });
        }

        ensure_docker_available()?;
        let mut request = GenericImage::new("localstack/localstack", &config.localstack_tag)
            .with_exposed_port(LOCALSTACK_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready."))
            .with_env_var("SERVICES", "s3")
            .with_env_var("EAGER_SERVICE_LOADING", "1");
        if let Some(timeout) = config.startup_timeout {
            request = request.with_startup_timeout(timeout);
        }
        let container = request
            .start()
            .await
            .map_err(|err| format!("failed to start localstack container: {err}"))?;
        let port = container
            .get_host_port_ipv4(LOCALSTACK_PORT.tcp())
            .await
            .map_err(|err| format!("failed to resolve localstack port: {err}"))?;
        Ok(Self {
            endpoint: format!("http://127.0.0.1:{port}"),
            _container: Some(container),
        })
    }

    /// Harness config pointing at this endpoint and the checked-in fixtures.
    pub fn harness_config(&self, bucket: &str) -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.storage.endpoint = self.endpoint.clone();
        config.storage.bucket = bucket.to_string();
        config.fixtures.root = fixture_root();
        config
    }

    /// Builds a context on the real S3 client.
    pub fn context(
        &self,
        config: &HarnessConfig,
        sink: Arc<dyn HarnessEventSink>,
    ) -> Result<TestContext, String> {
        let client = S3ObjectStoreClient::new(&config.storage)
            .map_err(|err| format!("s3 client failed: {err}"))?;
        TestContext::setup(config, Arc::new(client), sink)
            .map_err(|err| format!("harness setup failed: {err}"))
    }
}

/// Fixture tree owned by `fixture-bench-core` and shared with its harness tests.
pub fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../crates/fixture-bench-core/tests/resources/s3")
}

/// Fails with a `docker info failed` message when Docker is unreachable.
fn ensure_docker_available() -> Result<(), String> {
    let output = std::process::Command::new("docker")
        .arg("info")
        .output()
        .map_err(|err| format!("docker info failed: {err}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("docker info failed: {stderr}"));
    }
    Ok(())
}
