pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod operation;
pub mod response;
pub mod soap;
pub mod telemetry;
pub mod token;

pub use client::{Client, HttpTransport, Transport, TransportError, TransportResponse};
pub use error::{Error, Result};
pub use operation::Operation;
pub use response::{FieldMapping, Outcome, OutcomeKind, RequestContext};
pub use token::Token;
