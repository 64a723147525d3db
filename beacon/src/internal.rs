mod adapter;
mod client_state;
mod dispatcher;
mod mailbox;
mod router;

pub(crate) use adapter::into_stream;
pub(crate) use client_state::{ClientState, Plan, PushOutcome};
pub(crate) use dispatcher::Dispatcher;
pub(crate) use mailbox::{MailboxReceiver, mailbox};
pub(crate) use router::Router;
