//! WebSocket Live Updates
//!
//! Pushes appointment changes to connected browser clients.
//!
//! ## Architecture
//!
//! - **ConnectionRegistry**: live connections and their bound identities
//! - **Session**: per-connection authentication handshake and replies
//! - **Broadcaster**: routes domain events to the right connections
//! - **Handler**: WebSocket upgrade and socket read/write loops
//!
//! ## Protocol
//!
//! Clients connect to `/ws`, receive `CONNECTION_ESTABLISHED`, then send
//! `AUTH` with their bearer token within the configured grace period.
//! Appointment events are delivered only to connections authenticated as
//! the appointment's owner.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:3000/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'AUTH', payload: token}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'APPOINTMENT_CREATED') addAppointment(msg.payload);
//! };
//! ```

mod broadcaster;
mod error;
mod handler;
mod messages;
mod registry;
mod session;

pub use broadcaster::{should_deliver, BroadcastReport, Broadcaster};
pub use error::HubError;
pub use handler::websocket_handler;
pub use messages::{
    ClientMessage, CloseReason, DomainEvent, EventFrame, EventKind, Outbound, ServerMessage,
};
pub use registry::{Connection, ConnectionId, ConnectionRegistry, Transport};
pub use session::{Flow, Session};
