//! The task's view of its host
//!
//! A [`Session`] is created once when the task starts and lives until the
//! process exits. It exposes what the host sent at startup and performs the
//! host requests. The channel sits behind an async mutex that is held from
//! the moment a request is written until its response has been read, so even
//! a session shared between futures never has two requests in flight.
//!
//! Operations are not cancel-safe. Dropping one after its request was written
//! leaves the response unread, and every later operation then fails with
//! [`IpcError::Desynchronized`](ivis_ipc::IpcError::Desynchronized).

use ivis_config::IvisConfig;
use ivis_ipc::{LineChannel, LineReader, RequestChannel, RequestMessage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bootstrap::{read_bootstrap, BootstrapPayload, SearchEndpoint};
use crate::error::TaskResult;
use crate::requests::{
    create_signal_request, create_signal_set_request, create_signals_request,
    store_state_request, Signal, SignalSet,
};
use crate::search::SearchClient;

/// Task session bound to a host request channel
pub struct Session<C> {
    endpoint: SearchEndpoint,
    parameters: JsonValue,
    entities: JsonValue,
    owned: JsonValue,
    prior_state: Option<JsonValue>,
    search: SearchClient,
    channel: Mutex<C>,
}

impl<R, W> Session<LineChannel<R, W>>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Read the bootstrap line from `reader`, then keep `reader` for responses
    /// and `writer` for requests.
    pub async fn bootstrap(reader: R, writer: W, config: &IvisConfig) -> TaskResult<Self> {
        let mut reader = LineReader::with_max_line_bytes(reader, config.channel.max_line_bytes);
        let payload = read_bootstrap(&mut reader).await?;
        let search = SearchClient::new(&payload.es, &config.search)?;

        info!(
            search_host = %payload.es.host,
            search_port = payload.es.port,
            resumed = payload.state.is_some(),
            response_timeout = ?config.channel.response_timeout,
            "Task session bootstrapped"
        );

        let channel = LineChannel::new(reader, writer)
            .with_response_timeout(config.channel.response_timeout);

        Ok(Self::from_parts(payload, channel, search))
    }
}

impl<C> Session<C>
where
    C: RequestChannel,
{
    /// Assemble a session from an already parsed payload and an open channel
    pub fn from_parts(payload: BootstrapPayload, channel: C, search: SearchClient) -> Self {
        Self {
            endpoint: payload.es,
            parameters: payload.params,
            entities: payload.entities,
            owned: payload.owned,
            prior_state: payload.state,
            search,
            channel: Mutex::new(channel),
        }
    }

    /// Task parameters supplied by the host
    pub fn parameters(&self) -> &JsonValue {
        &self.parameters
    }

    /// Deserialize the parameters into a task-specific type
    pub fn parameters_as<T: DeserializeOwned>(&self) -> TaskResult<T> {
        Ok(serde_json::from_value(self.parameters.clone())?)
    }

    /// Domain objects referenced by the task
    pub fn entities(&self) -> &JsonValue {
        &self.entities
    }

    /// Objects this task may modify
    pub fn owned(&self) -> &JsonValue {
        &self.owned
    }

    /// State stored by the previous run, if any
    pub fn prior_state(&self) -> Option<&JsonValue> {
        self.prior_state.as_ref()
    }

    /// Deserialize the prior state into a task-specific type
    pub fn prior_state_as<T: DeserializeOwned>(&self) -> TaskResult<Option<T>> {
        self.prior_state
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Search engine client for read queries
    pub fn search(&self) -> &SearchClient {
        &self.search
    }

    /// Search engine location from the bootstrap payload
    pub fn endpoint(&self) -> &SearchEndpoint {
        &self.endpoint
    }

    /// Create signal sets and/or signals. Absent arguments are left out of the
    /// request. Returns the host's identifiers for the created objects.
    pub async fn create_signals(
        &self,
        signal_sets: Option<JsonValue>,
        signals: Option<JsonValue>,
    ) -> TaskResult<JsonValue> {
        self.request(create_signals_request(signal_sets, signals)).await
    }

    /// Create one signal set
    pub async fn create_signal_set(&self, signal_set: &SignalSet) -> TaskResult<JsonValue> {
        self.request(create_signal_set_request(signal_set)).await
    }

    /// Create one signal inside the set identified by `signal_set_cid`
    pub async fn create_signal(
        &self,
        signal_set_cid: &str,
        signal: &Signal,
    ) -> TaskResult<JsonValue> {
        self.request(create_signal_request(signal_set_cid, signal)).await
    }

    /// Persist `state` with the host. May be called repeatedly to checkpoint.
    pub async fn store_state<S>(&self, state: &S) -> TaskResult<JsonValue>
    where
        S: Serialize + ?Sized,
    {
        self.request(store_state_request(state)?).await
    }

    /// Release the channel, e.g. to inspect a fabricated one in tests
    pub fn into_channel(self) -> C {
        self.channel.into_inner()
    }

    async fn request(&self, message: RequestMessage) -> TaskResult<JsonValue> {
        let mut channel = self.channel.lock().await;
        let response = channel.request(&message).await?;
        debug!(kind = %message.kind(), "Host acknowledged request");
        Ok(response)
    }
}
