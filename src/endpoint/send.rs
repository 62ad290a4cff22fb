//! Subscriber-side send endpoint

use super::{FrameSink, SendFuture};
use crate::framing::Frame;
use crate::transport::{Session, SubscriberTransport};

/// Sends relayed frames to one subscribing session
#[derive(Debug)]
pub struct SendEndpoint<S> {
    transport: SubscriberTransport<S>,
}

impl<S: Session> SendEndpoint<S> {
    pub fn new(transport: SubscriberTransport<S>) -> Self {
        Self { transport }
    }

    /// Session this endpoint writes to
    pub fn session_id(&self) -> u64 {
        self.transport.session_id()
    }
}

impl<S: Session> FrameSink for SendEndpoint<S> {
    fn send<'a>(&'a self, frame: &'a Frame) -> SendFuture<'a> {
        Box::pin(self.transport.send(frame))
    }
}
