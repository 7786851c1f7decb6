//! Channel membership tracking
//!
//! [`ChannelLedger`] records which channel the local user is in, under which id, and
//! which remote users are currently online. It drives the engine's join and leave calls
//! and reports each outcome as one [`SessionEvent`].
//!
//! The online set contains the local user id exactly while the session is connected:
//! a successful join seeds it with the local id, and leave clears everything.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use crate::engine::{ENGINE_OK, RtcEngine};
use crate::error::{SessionError, SessionResult, codes};
use crate::events::{SessionEvent, SessionEventSink, emit};

/// Point-in-time view of channel membership
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    /// Empty when not joined
    pub channel_name: String,
    /// Empty when not joined
    pub local_user_id: String,
    pub online_users: BTreeSet<String>,
}

impl Membership {
    pub fn is_joined(&self) -> bool {
        !self.channel_name.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ChannelLedger {
    membership: Mutex<Membership>,
}

impl ChannelLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `channel` as `user_id`
    ///
    /// An empty `token` is forwarded to the engine as no token.
    pub fn join(
        &self,
        engine: Option<&dyn RtcEngine>,
        sink: Option<&dyn SessionEventSink>,
        channel: &str,
        user_id: &str,
        token: &str,
    ) -> SessionResult<()> {
        if channel.is_empty() {
            let err = SessionError::ChannelNameEmpty;
            emit(sink, SessionEvent::error(&err));
            return Err(err);
        }
        let Some(engine) = engine else {
            let err = SessionError::EngineNotInitialized;
            emit(sink, SessionEvent::error(&err));
            return Err(err);
        };

        let token = (!token.is_empty()).then_some(token);
        let engine_code = engine.join_channel(channel, user_id, token);
        if engine_code != ENGINE_OK {
            tracing::warn!(channel, user_id, engine_code, "Engine rejected channel join");
            emit(
                sink,
                SessionEvent::JoinChannelResult {
                    code: codes::JOIN_CHANNEL_FAILED,
                    channel: channel.to_string(),
                    user_id: user_id.to_string(),
                },
            );
            return Err(SessionError::JoinChannelFailed {
                channel: channel.to_string(),
                engine_code,
            });
        }

        {
            let mut membership = self.membership.lock();
            *membership = Membership {
                channel_name: channel.to_string(),
                local_user_id: user_id.to_string(),
                online_users: BTreeSet::from([user_id.to_string()]),
            };
        }
        tracing::info!(channel, user_id, "Joined channel");
        emit(
            sink,
            SessionEvent::JoinChannelResult {
                code: codes::OK,
                channel: channel.to_string(),
                user_id: user_id.to_string(),
            },
        );
        Ok(())
    }

    /// Leave the current channel
    ///
    /// Local membership is cleared whether or not the engine accepted the leave.
    pub fn leave(
        &self,
        engine: Option<&dyn RtcEngine>,
        sink: Option<&dyn SessionEventSink>,
    ) -> SessionResult<()> {
        let Some(engine) = engine else {
            let err = SessionError::EngineNotInitialized;
            emit(sink, SessionEvent::error(&err));
            return Err(err);
        };

        let engine_code = engine.leave_channel();
        let previous = std::mem::take(&mut *self.membership.lock());

        if engine_code != ENGINE_OK {
            tracing::warn!(
                channel = %previous.channel_name,
                engine_code,
                "Engine rejected channel leave, local membership cleared anyway"
            );
            emit(
                sink,
                SessionEvent::LeaveChannelResult {
                    code: codes::JOIN_CHANNEL_FAILED,
                },
            );
            return Err(SessionError::JoinChannelFailed {
                channel: previous.channel_name,
                engine_code,
            });
        }

        tracing::info!(channel = %previous.channel_name, "Left channel");
        emit(sink, SessionEvent::LeaveChannelResult { code: codes::OK });
        Ok(())
    }

    /// Re-join the last recorded channel as the last recorded user
    pub fn reconnect(
        &self,
        engine: Option<&dyn RtcEngine>,
        sink: Option<&dyn SessionEventSink>,
    ) -> SessionResult<()> {
        let (channel, user_id) = {
            let membership = self.membership.lock();
            (
                membership.channel_name.clone(),
                membership.local_user_id.clone(),
            )
        };
        if channel.is_empty() || user_id.is_empty() {
            let err = SessionError::NoPreviousChannel;
            tracing::warn!("Reconnect requested without a previous channel");
            emit(sink, SessionEvent::error(&err));
            return Err(err);
        }
        tracing::info!(channel = %channel, user_id = %user_id, "Reconnecting");
        self.join(engine, sink, &channel, &user_id, "")
    }

    /// A remote user entered the channel. Repeats are harmless.
    pub fn on_remote_user_joined(&self, user_id: &str, sink: Option<&dyn SessionEventSink>) {
        let inserted = self.membership.lock().online_users.insert(user_id.to_string());
        tracing::debug!(user_id, inserted, "Remote user joined");
        emit(
            sink,
            SessionEvent::RemoteUserJoined {
                user_id: user_id.to_string(),
            },
        );
    }

    /// A remote user left. Reported even when the user was never seen.
    pub fn on_remote_user_left(
        &self,
        user_id: &str,
        reason: i32,
        sink: Option<&dyn SessionEventSink>,
    ) {
        let removed = self.membership.lock().online_users.remove(user_id);
        tracing::debug!(user_id, reason, removed, "Remote user left");
        emit(
            sink,
            SessionEvent::RemoteUserLeft {
                user_id: user_id.to_string(),
                reason,
            },
        );
    }

    pub fn online_users(&self) -> BTreeSet<String> {
        self.membership.lock().online_users.clone()
    }

    pub fn snapshot(&self) -> Membership {
        self.membership.lock().clone()
    }

    /// Drop the online set after a failed join while keeping the last channel and
    /// user, so a later reconnect can retry them
    pub(crate) fn mark_disconnected(&self) {
        self.membership.lock().online_users.clear();
    }

    pub fn reset(&self) {
        *self.membership.lock() = Membership::default();
    }
}
