//! Message broker subsystem.
//!
//! A single Kafka producer shared by the whole process. Messages are JSON
//! documents; `publish` waits for the broker acknowledgement.

pub mod producer;

pub use producer::{BrokerError, ProducerClient};
