#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod middleware;
mod network;

pub use middleware::{CACHE_STATUS_HEADER, ShelterMiddleware};
pub use network::ReqwestNetwork;

pub use shelter::{FetchOutcome, Registration, Worker, WorkerConfig};
