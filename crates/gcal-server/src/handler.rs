//! Request/response dispatch handler.
//!
//! [`RequestHandler`] turns a `{method, params}` request into a
//! [`CalendarService`] call and the call's outcome into a [`Response`]. It
//! holds no state of its own; the daemon and the one-shot CLI share it.

use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use tracing::{Span, debug, warn};

use gcal_protocol::methods::{
    DEFAULT_FREE_SLOT_DAYS, DEFAULT_SEARCH_DAYS, DEFAULT_UPCOMING_DAYS, DEFAULT_UPCOMING_LIMIT,
};
use gcal_protocol::{
    Envelope, ErrorResponse, Method, ProtocolError, Request, Response, param,
};

use crate::error::{CommandError, CommandResult, ServerError, ServerResult};
use crate::params::Params;
use crate::service::{CalendarService, EventPatch, NewEvent};
use crate::socket::Connection;

pub struct RequestHandler {
    service: Arc<CalendarService>,
}

fn respond<T: Serialize>(result: CommandResult<T>) -> CommandResult<Response> {
    result.map(|value| Response::from_result(&value))
}

impl RequestHandler {
    pub fn new(service: Arc<CalendarService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &CalendarService {
        &self.service
    }

    /// Handles a single request and returns the response.
    #[tracing::instrument(skip_all, fields(method = %request.method, duration_ms))]
    pub async fn handle(&self, request: &Request) -> Response {
        let start = std::time::Instant::now();

        let response = match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                if matches!(err, CommandError::Provider(_)) {
                    warn!(error = %err, "provider call failed");
                } else {
                    debug!(error = %err, "request rejected");
                }
                Response::from_error(ErrorResponse::from(err))
            }
        };

        let elapsed = start.elapsed().as_millis();
        Span::current().record("duration_ms", elapsed);
        debug!(duration_ms = elapsed, ok = response.is_success(), "request handled");
        response
    }

    async fn dispatch(&self, request: &Request) -> CommandResult<Response> {
        let method: Method = request
            .method
            .parse()
            .map_err(|_| CommandError::UnknownMethod(request.method.clone()))?;
        let params = Params::new(&request.params);
        let offset = self.service.offset();

        match method {
            Method::Today => respond(self.service.today().await),
            Method::Upcoming => {
                let days = params.u32_or(param::DAYS, DEFAULT_UPCOMING_DAYS)?;
                let limit = params.u32_or(param::LIMIT, DEFAULT_UPCOMING_LIMIT)?;
                respond(self.service.upcoming(days, limit).await)
            }
            Method::Search => {
                let query = params.required_str(param::QUERY)?;
                let days = params.u32_or(param::DAYS, DEFAULT_SEARCH_DAYS)?;
                respond(self.service.search(query, days).await)
            }
            Method::Create => {
                let event = NewEvent {
                    summary: params.required_str(param::SUMMARY)?.to_string(),
                    start: params.required_instant(param::START, offset)?,
                    end: params.required_instant(param::END, offset)?,
                    description: params.optional_str(param::DESCRIPTION)?.map(String::from),
                    location: params.optional_str(param::LOCATION)?.map(String::from),
                    attendees: params.string_list(param::ATTENDEES)?,
                };
                respond(self.service.create(event).await)
            }
            Method::FreeSlots => {
                let duration = params.required_i64(param::DURATION_MINUTES)?;
                let days = params.u32_or(param::DAYS, DEFAULT_FREE_SLOT_DAYS)?;
                respond(self.service.free_slots(duration, days).await)
            }
            Method::Get => {
                let event_id = params.required_str(param::EVENT_ID)?;
                respond(self.service.get(event_id).await)
            }
            Method::Delete => {
                let event_id = params.required_str(param::EVENT_ID)?;
                respond(self.service.delete(event_id).await)
            }
            Method::Update => {
                let event_id = params.required_str(param::EVENT_ID)?;
                let patch = EventPatch {
                    summary: params.optional_str(param::SUMMARY)?.map(String::from),
                    start: params.optional_instant(param::START, offset)?,
                    end: params.optional_instant(param::END, offset)?,
                    description: params.optional_str(param::DESCRIPTION)?.map(String::from),
                    location: params.optional_str(param::LOCATION)?.map(String::from),
                };
                respond(self.service.update(event_id, patch).await)
            }
            Method::Quick => {
                let text = params.required_str(param::TEXT)?;
                respond(self.service.quick(text).await)
            }
            Method::Methods => respond(Ok(Method::catalogue())),
            Method::Health => respond(Ok(self.service.health())),
        }
    }

    /// Serves one connection until the peer hangs up.
    ///
    /// A frame that is not a valid request gets an `invalid_request` reply
    /// and the connection stays open; I/O failures and timeouts end it.
    pub async fn handle_connection(&self, mut conn: Connection) -> ServerResult<()> {
        loop {
            match conn.read_request().await {
                Ok(Some(envelope)) => {
                    let response = if envelope.is_compatible() {
                        self.handle(&envelope.payload).await
                    } else {
                        warn!(version = %envelope.protocol_version, "incompatible protocol version");
                        Response::from_error(ErrorResponse::invalid_request(
                            ProtocolError::UnsupportedVersion(envelope.protocol_version).to_string(),
                        ))
                    };
                    conn.respond(&envelope.request_id, response).await?;
                }
                Ok(None) => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(ServerError::Protocol(ProtocolError::Serialization(e))) => {
                    debug!(error = %e, "malformed request");
                    let response =
                        Response::from_error(ErrorResponse::invalid_request(e.to_string()));
                    conn.write_response(&Envelope::response("", response)).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

type ConnectionFuture = Pin<Box<dyn std::future::Future<Output = ()> + Send>>;

/// Creates a connection handler function for use with `SocketServer::run`.
pub fn make_connection_handler(
    handler: Arc<RequestHandler>,
) -> impl Fn(Connection) -> ConnectionFuture + Send + Sync + 'static {
    move |conn| {
        let handler = handler.clone();
        Box::pin(async move {
            if let Err(e) = handler.handle_connection(conn).await {
                warn!(error = %e, "connection handler error");
            }
        })
    }
}
