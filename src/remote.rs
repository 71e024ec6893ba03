//! Remote memory service client.
//!
//! The hook only talks to the service through [`MemoryApi`]; the HTTP
//! implementation lives in [`http`].

pub mod contract;
pub mod http;

pub use contract::{
    ChatQuery, ChatResponse, ContextQuery, CreatedMessage, DeductiveObservation,
    ExplicitObservation, MemoryApi, NewMessage, PeerContext, Representation, Session, Workspace,
};
pub use http::HttpMemoryApi;
