use std::sync::Arc;

use crate::{BurstId, BurstSummary, ClientId, Error, OverflowPolicy, SenderId, Topic};

pub(crate) enum MonitoringEvent<P> {
    BurstStarted(BurstId, Topic, SenderId, usize),
    BurstCompleted(BurstSummary),
    ItemRouted(Topic, SenderId, Arc<P>, usize),
    HandlerFailed(BurstId, Topic, Error),
    ClientConnected(ClientId, Vec<Topic>),
    ClientDisconnected(ClientId),
    Overflow(ClientId, Topic, OverflowPolicy),
}
