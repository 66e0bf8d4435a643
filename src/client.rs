use std::time::Duration;

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use crate::proto::tensorflow::serving::{
    model_spec::VersionChoice, ModelSpec, PredictRequest, PredictResponse, PREDICT_PATH,
};
use crate::proto::tensorflow::TensorProto;
use crate::tensor::{self, ConversionError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// How long shutdown waits for in-flight connection tasks
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const MAX_MESSAGE_SIZE: usize = 200 * 1024 * 1024;

// Setup failures. These are fatal, unlike CallError.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid server address {uri}: {source}")]
    InvalidEndpoint {
        uri: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to start the client runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

// Failure of a single prediction call
#[derive(Error, Debug)]
pub enum CallError {
    #[error("request RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("response has no '{0}' output")]
    MissingOutput(String),

    #[error("cannot read '{name}' output: {source}")]
    Decode {
        name: String,
        #[source]
        source: ConversionError,
    },
}

// Which model, version and signature to query, and the tensor names it uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    pub name: String,
    pub version: i64,
    pub signature_name: String,
    pub input: String,
    pub output: String,
}

impl Default for ModelTarget {
    fn default() -> Self {
        ModelTarget {
            name: "mnist".into(),
            version: 1,
            signature_name: "predict_images".into(),
            input: "images".into(),
            output: "scores".into(),
        }
    }
}

impl ModelTarget {
    pub fn request(&self, tensor: TensorProto) -> PredictRequest {
        PredictRequest {
            model_spec: Some(ModelSpec {
                name: self.name.clone(),
                version_choice: Some(VersionChoice::Version(self.version)),
                signature_name: self.signature_name.clone(),
            }),
            inputs: [(self.input.clone(), tensor)].into_iter().collect(),
            output_filter: Vec::new(),
        }
    }

    // Pull the score vector out of a response
    pub fn scores(&self, response: &PredictResponse) -> Result<Vec<f32>, CallError> {
        let output = response
            .outputs
            .get(&self.output)
            .ok_or_else(|| CallError::MissingOutput(self.output.clone()))?;
        tensor::scores(output).map_err(|source| CallError::Decode {
            name: self.output.clone(),
            source,
        })
    }
}

// Anything that can turn an image tensor into class scores
pub trait Predictor {
    fn predict(&mut self, image: TensorProto) -> Result<Vec<f32>, CallError>;
}

// Blocking gRPC client for a TensorFlow Serving PredictionService.
//
// Owns a current-thread runtime and drives each call to completion with block_on, so
// calls are strictly sequential. Dropping the client closes the channel.
pub struct PredictionClient {
    // Declared before the runtime so the channel is dropped first
    grpc: Grpc<Channel>,
    target: ModelTarget,
    timeout: Duration,
    runtime: Runtime,
}

impl PredictionClient {
    // The channel connects lazily, so an unreachable server is reported per call
    pub fn connect(
        host: &str,
        port: u16,
        target: ModelTarget,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let uri = format!("http://{}:{}", host, port);
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|source| ClientError::InvalidEndpoint { uri: uri.clone(), source })?
            .connect_timeout(timeout)
            .timeout(timeout);

        // connect_lazy spawns the channel's worker onto the current runtime
        let channel = {
            let _guard = runtime.enter();
            endpoint.connect_lazy()
        };
        log::debug!("Lazy channel to {}", uri);

        Ok(PredictionClient {
            grpc: Grpc::new(channel).max_decoding_message_size(MAX_MESSAGE_SIZE),
            target,
            timeout,
            runtime,
        })
    }

    pub fn target(&self) -> &ModelTarget {
        &self.target
    }

    // Send one Predict call and wait for the response
    pub fn call(&mut self, request: PredictRequest) -> Result<PredictResponse, tonic::Status> {
        let mut request = tonic::Request::new(request);
        request.set_timeout(self.timeout);

        let grpc = &mut self.grpc;
        self.runtime.block_on(async move {
            grpc.ready()
                .await
                .map_err(|e| tonic::Status::unavailable(format!("service was not ready: {}", e)))?;
            let path = PathAndQuery::from_static(PREDICT_PATH);
            let response = grpc
                .unary(request, path, ProstCodec::default())
                .await?;
            Ok(response.into_inner())
        })
    }

    // Close the channel and give background tasks a moment to wind down
    pub fn shutdown(self) {
        let PredictionClient { grpc, runtime, .. } = self;
        drop(grpc);
        runtime.shutdown_timeout(SHUTDOWN_GRACE);
        log::debug!("Prediction client shut down");
    }
}

impl Predictor for PredictionClient {
    fn predict(&mut self, image: TensorProto) -> Result<Vec<f32>, CallError> {
        let request = self.target.request(image);
        let response = self.call(request)?;
        self.target.scores(&response)
    }
}
