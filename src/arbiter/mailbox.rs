//! Request mailbox — bounded queue of "read now" requests.
//!
//! ```text
//! ┌──────────────┐   Request    ┌──────────────┐
//! │ consumer task│─────────────▶│  poll task   │
//! │ (any thread) │◀─────────────│ (drains once │
//! └──────────────┘  reply Signal│  per cycle)  │
//! ```
//!
//! The completion object is an `Arc<Signal>`, not a stack borrow: a caller
//! that times out simply drops its clone, and a late `signal()` from the
//! poll task lands in a still-alive `Signal` nobody reads. There is no
//! abandoned-flag protocol because there is no dangling pointer to guard.

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use crate::error::ArbiterError;
use crate::reading::{Reading, SensorType};

/// What the poll task writes back to a waiting consumer.
pub type ReadOutcome = Result<Reading, ArbiterError>;

/// Completion signal shared between one consumer and the poll task.
pub type ReplySignal = Signal<CriticalSectionRawMutex, ReadOutcome>;

/// A pending "read now" request.
pub struct Request {
    pub sensor_type: SensorType,
    pub reply: Arc<ReplySignal>,
}

impl Request {
    pub fn new(sensor_type: SensorType) -> (Self, Arc<ReplySignal>) {
        let reply = Arc::new(Signal::new());
        (
            Self {
                sensor_type,
                reply: reply.clone(),
            },
            reply,
        )
    }
}

/// Bounded multi-producer queue drained by the poll task.
pub struct Mailbox<const N: usize> {
    channel: Channel<CriticalSectionRawMutex, Request, N>,
}

impl<const N: usize> Mailbox<N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue without blocking. A saturated mailbox is reported to the
    /// caller immediately; it never degrades the poll task.
    pub fn try_send(&self, request: Request) -> Result<(), ArbiterError> {
        self.channel
            .try_send(request)
            .map_err(|_| ArbiterError::QueueFull)
    }

    /// Non-blocking drain step.
    pub fn try_receive(&self) -> Option<Request> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_capacity_reports_queue_full() {
        let mailbox: Mailbox<2> = Mailbox::new();
        let (a, _ra) = Request::new(SensorType::Light);
        let (b, _rb) = Request::new(SensorType::Light);
        let (c, _rc) = Request::new(SensorType::Light);

        assert!(mailbox.try_send(a).is_ok());
        assert!(mailbox.try_send(b).is_ok());
        assert_eq!(mailbox.try_send(c).unwrap_err(), ArbiterError::QueueFull);
        assert_eq!(mailbox.len(), 2);
    }

    #[test]
    fn drain_is_fifo_and_nonblocking() {
        let mailbox: Mailbox<4> = Mailbox::new();
        let (a, _ra) = Request::new(SensorType::PowerCurrent);
        let (b, _rb) = Request::new(SensorType::WaterLevel);
        mailbox.try_send(a).unwrap();
        mailbox.try_send(b).unwrap();

        assert_eq!(mailbox.try_receive().unwrap().sensor_type, SensorType::PowerCurrent);
        assert_eq!(mailbox.try_receive().unwrap().sensor_type, SensorType::WaterLevel);
        assert!(mailbox.try_receive().is_none());
    }

    #[test]
    fn signalling_a_dropped_waiter_is_a_no_op() {
        let (request, reply) = Request::new(SensorType::Light);
        drop(reply); // consumer gave up waiting
        // The poll task's side survives and the signal write is harmless.
        request
            .reply
            .signal(Ok(Reading::Light { lux: 1.0, visible: 1, infrared: 0 }));
    }
}
