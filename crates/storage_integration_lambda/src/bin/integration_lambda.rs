use std::time::Duration;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use storage_integration_lambda::adapters::callback::{presigned_put, CallbackTransport};
use storage_integration_lambda::adapters::iam::RoleProvisioner;
use storage_integration_lambda::adapters::secrets::SecretSource;
use storage_integration_lambda::adapters::snowflake::SnowflakeConnector;
use storage_integration_lambda::handlers::lifecycle::{
    handle_lifecycle_event, HandlerDependencies, InvocationContext,
};
use tracing_subscriber::EnvFilter;

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

struct SecretsManagerSource {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretSource for SecretsManagerSource {
    fn get_secret(&self, name: &str) -> Result<String, String> {
        let client = self.client.clone();
        let secret_id = name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_secret_value()
                    .secret_id(secret_id)
                    .send()
                    .await
                    .map_err(|error| format!("failed to read secret: {error}"))?;
                output
                    .secret_string()
                    .map(str::to_string)
                    .ok_or_else(|| "secret has no SecretString value".to_string())
            })
        })
    }
}

struct IamRoleProvisioner {
    client: aws_sdk_iam::Client,
}

impl RoleProvisioner for IamRoleProvisioner {
    fn create_policy(&self, name: &str, document: &str) -> Result<String, String> {
        let client = self.client.clone();
        let policy_name = name.to_string();
        let policy_document = document.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_policy()
                    .policy_name(policy_name)
                    .policy_document(policy_document)
                    .send()
                    .await
                    .map_err(|error| format!("failed to create policy: {error}"))?;
                output
                    .policy()
                    .and_then(|policy| policy.arn())
                    .map(str::to_string)
                    .ok_or_else(|| "create_policy response did not include an ARN".to_string())
            })
        })
    }

    fn create_role(&self, name: &str, trust_document: &str) -> Result<String, String> {
        let client = self.client.clone();
        let role_name = name.to_string();
        let assume_role_policy = trust_document.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_role()
                    .role_name(role_name)
                    .assume_role_policy_document(assume_role_policy)
                    .send()
                    .await
                    .map_err(|error| format!("failed to create role: {error}"))?;
                output
                    .role()
                    .map(|role| role.arn().to_string())
                    .ok_or_else(|| "create_role response did not include a role".to_string())
            })
        })
    }

    fn attach_role_policy(&self, role_name: &str, policy_arn: &str) -> Result<(), String> {
        let client = self.client.clone();
        let role_name = role_name.to_string();
        let policy_arn = policy_arn.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .attach_role_policy()
                    .role_name(role_name)
                    .policy_arn(policy_arn)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to attach role policy: {error}"))
            })
        })
    }
}

struct HttpCallbackTransport {
    client: reqwest::Client,
}

impl CallbackTransport for HttpCallbackTransport {
    fn put(&self, url: &str, body: &str) -> Result<u16, String> {
        let client = self.client.clone();
        let url = url.to_string();
        let body = body.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                presigned_put(&client, &url, body)
                    .send()
                    .await
                    .map(|response| response.status().as_u16())
                    .map_err(|error| format!("failed to send callback: {error}"))
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<String, Error> {
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let secrets = SecretsManagerSource {
        client: aws_sdk_secretsmanager::Client::new(&aws_config),
    };
    let iam = IamRoleProvisioner {
        client: aws_sdk_iam::Client::new(&aws_config),
    };
    let warehouse = SnowflakeConnector::new(std::env::var("SNOW_HOST").ok()).map_err(Error::from)?;
    let callback = HttpCallbackTransport {
        client: reqwest::Client::builder()
            .timeout(CALLBACK_TIMEOUT)
            .build()
            .map_err(|error| Error::from(format!("failed to build callback client: {error}")))?,
    };

    let invocation = InvocationContext {
        request_id: event.context.request_id.clone(),
        log_stream_name: event.context.env_config.log_stream.clone(),
    };
    let deps = HandlerDependencies {
        secrets: &secrets,
        warehouse: &warehouse,
        iam: &iam,
        callback: &callback,
    };
    let env = |name: &str| std::env::var(name).ok();

    handle_lifecycle_event(
        event.payload,
        &invocation,
        &env,
        &deps,
        &mut rand::thread_rng(),
    )
    .map_err(|error| Error::from(error.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_current_span(false)
        .without_time()
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
