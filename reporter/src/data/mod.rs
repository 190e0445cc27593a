//! Data layer
//!
//! - `point` - Point and field value model
//! - `batch` - Per-cycle write batch with set semantics
//! - `line_protocol` - InfluxDB line protocol rendering (plain and grouped)
//! - `senders` - Transports that ship a rendered batch

pub mod batch;
pub mod line_protocol;
pub mod point;
pub mod senders;

pub use batch::WriteBatch;
pub use line_protocol::LineProtocolSerializer;
pub use point::{FieldValue, Fields, Point, Tags};
pub use senders::{InfluxSender, SendError, Transport};
