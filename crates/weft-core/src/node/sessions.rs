//! Session negotiation and stream writes.
//!
//! One session may exist per friend at a time. The local descriptor
//! tracks the forward-only lifecycle; the peer's decision arrives as a
//! `SessionReply` event, never as a return value: an accepted reply
//! advances the session to `Active`, a rejection closes it without ever
//! reaching `Active`.

use crate::node::error::{NodeError, Result};
use crate::node::node::{Node, NodeInner};
use crate::session::{Session, SessionState};
use weft_engine::{Command, Event, ReplyStatus, StreamMode, StreamTarget, StreamType};

impl Node {
    /// Allocate a session descriptor with a friend, in `Idle`.
    ///
    /// At most one live session per friend: a leftover `Closed`
    /// descriptor is discarded, a live one is an error.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidState`] if a live session already
    /// exists for the friend; otherwise propagates the engine's failure.
    pub async fn create_session(
        &self,
        friend_id: &str,
        stream_type: StreamType,
        stream_mode: StreamMode,
    ) -> Result<()> {
        if let Some(existing) = self.inner.sessions.get(friend_id) {
            if existing.is_live() {
                return Err(NodeError::invalid_state("session already exists for friend"));
            }
        }
        let value = self
            .inner
            .gateway
            .execute(Command::CreateSession {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                stream_type,
                stream_mode,
            })
            .await?;

        let mut session = Session::new(friend_id, stream_type, stream_mode);
        // Engines that assign the stream id up front report it here.
        if let Some(stream_id) = value.as_u64() {
            session.set_stream_id(stream_id as u32);
        }
        self.inner.sessions.insert(friend_id.to_string(), session);
        Ok(())
    }

    /// Send the session request to the peer; local state -> `Requested`.
    ///
    /// On engine failure the local state is left unchanged: the caller
    /// retries or abandons the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::SessionNotFound`] without a local descriptor;
    /// otherwise propagates the engine's failure.
    pub async fn session_request(&self, friend_id: &str) -> Result<()> {
        if !self.inner.sessions.contains_key(friend_id) {
            return Err(NodeError::SessionNotFound(friend_id.to_string()));
        }
        self.inner
            .gateway
            .execute(Command::SessionRequest {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
            })
            .await?;
        if let Some(mut session) = self.inner.sessions.get_mut(friend_id) {
            session.transition_to(SessionState::Requested)?;
        }
        Ok(())
    }

    /// Answer a session request received from a peer.
    ///
    /// Used on the receiver side; does not change local session state;
    /// the initiating side's state changes via its `SessionReply` event.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn session_reply_request(&self, friend_id: &str, status: ReplyStatus) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::SessionReplyRequest {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                status,
            })
            .await?;
        Ok(())
    }

    /// Write data onto a session stream.
    ///
    /// Valid only while the session is `Active`; off-state behavior is
    /// engine-defined and not validated by this layer.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn write_stream(&self, target: StreamTarget, data: Vec<u8>) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::WriteStream {
                node: self.inner.id.clone(),
                target,
                data,
            })
            .await?;
        Ok(())
    }

    /// Remove the session's stream; local state -> `Closed`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::SessionNotFound`] without a local descriptor;
    /// otherwise propagates the engine's failure.
    pub async fn remove_stream(&self, friend_id: &str) -> Result<()> {
        if !self.inner.sessions.contains_key(friend_id) {
            return Err(NodeError::SessionNotFound(friend_id.to_string()));
        }
        self.inner
            .gateway
            .execute(Command::RemoveStream {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
            })
            .await?;
        self.inner.close_local_session(friend_id);
        Ok(())
    }

    /// Close the session; local state -> `Closed`.
    ///
    /// The descriptor cannot be reused: communicating with the friend
    /// again requires a fresh [`Node::create_session`].
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::SessionNotFound`] without a local descriptor;
    /// otherwise propagates the engine's failure.
    pub async fn close_session(&self, friend_id: &str) -> Result<()> {
        if !self.inner.sessions.contains_key(friend_id) {
            return Err(NodeError::SessionNotFound(friend_id.to_string()));
        }
        self.inner
            .gateway
            .execute(Command::CloseSession {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
            })
            .await?;
        self.inner.close_local_session(friend_id);
        Ok(())
    }

    /// Current state of the session with a friend, if one exists.
    #[must_use]
    pub fn session_state(&self, friend_id: &str) -> Option<SessionState> {
        self.inner
            .sessions
            .get(friend_id)
            .map(|session| session.state())
    }

    /// Engine-assigned stream id of the session with a friend, once the
    /// engine has reported one.
    #[must_use]
    pub fn session_stream_id(&self, friend_id: &str) -> Option<u32> {
        self.inner
            .sessions
            .get(friend_id)
            .and_then(|session| session.stream_id())
    }
}

impl NodeInner {
    /// Close the local descriptor and drop everything nested in it.
    pub(crate) fn close_local_session(&self, friend_id: &str) {
        if let Some(mut session) = self.sessions.get_mut(friend_id) {
            if session.is_live() {
                // Closing is legal from every live state.
                let _ = session.transition_to(SessionState::Closed);
            }
        }
        self.channels.retain(|(owner, _), _| owner != friend_id);
        self.forwardings
            .retain(|_, tunnel| tunnel.friend_id != friend_id);
    }

    /// Advance the session machine from the peer's reply.
    pub(crate) fn apply_session_event(&self, event: &Event) {
        let Event::SessionReply { friend_id, status } = event else {
            return;
        };
        match status {
            ReplyStatus::Accepted => {
                if let Some(mut session) = self.sessions.get_mut(friend_id) {
                    let advanced = session
                        .transition_to(SessionState::Replied)
                        .and_then(|()| session.transition_to(SessionState::Active));
                    if let Err(err) = advanced {
                        tracing::warn!(friend = %friend_id, %err, "session reply ignored");
                    }
                } else {
                    tracing::warn!(friend = %friend_id, "session reply for unknown session");
                }
            }
            ReplyStatus::Rejected { reason } => {
                tracing::debug!(friend = %friend_id, %reason, "session rejected by peer");
                self.close_local_session(friend_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::dispatcher::Callbacks;
    use std::sync::Arc;
    use std::time::Duration;
    use weft_engine::{Engine, StubEngine};

    async fn befriended_pair(engine: &StubEngine) -> (Node, Node) {
        let handle: Arc<dyn Engine> = Arc::new(engine.clone());
        let alice = Node::new("alice", Arc::clone(&handle), Callbacks::new());
        let bob = Node::new("bob", handle, Callbacks::new());
        alice.start().await.unwrap();
        bob.start().await.unwrap();
        alice
            .add_friend(&StubEngine::derive_address("bob"), "hi")
            .await
            .unwrap();
        bob.accept_friend(&StubEngine::derive_node_id("alice"))
            .await
            .unwrap();
        settle().await;
        (alice, bob)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn accept_event_drives_session_active() {
        let engine = StubEngine::new();
        let (alice, bob) = befriended_pair(&engine).await;
        let bob_id = StubEngine::derive_node_id("bob");
        let alice_id = StubEngine::derive_node_id("alice");

        alice
            .create_session(&bob_id, StreamType::Application, StreamMode::RELIABLE)
            .await
            .unwrap();
        assert_eq!(alice.session_state(&bob_id), Some(SessionState::Idle));

        alice.session_request(&bob_id).await.unwrap();
        assert_eq!(alice.session_state(&bob_id), Some(SessionState::Requested));

        bob.session_reply_request(&alice_id, ReplyStatus::Accepted)
            .await
            .unwrap();
        settle().await;
        assert_eq!(alice.session_state(&bob_id), Some(SessionState::Active));
    }

    #[tokio::test]
    async fn reject_event_closes_without_active() {
        let engine = StubEngine::new();
        let (alice, bob) = befriended_pair(&engine).await;
        let bob_id = StubEngine::derive_node_id("bob");
        let alice_id = StubEngine::derive_node_id("alice");

        alice
            .create_session(&bob_id, StreamType::Application, StreamMode::RELIABLE)
            .await
            .unwrap();
        alice.session_request(&bob_id).await.unwrap();
        bob.session_reply_request(
            &alice_id,
            ReplyStatus::Rejected {
                reason: "busy".into(),
            },
        )
        .await
        .unwrap();
        settle().await;
        assert_eq!(alice.session_state(&bob_id), Some(SessionState::Closed));
    }

    #[tokio::test]
    async fn live_session_blocks_a_second_create() {
        let engine = StubEngine::new();
        let (alice, _bob) = befriended_pair(&engine).await;
        let bob_id = StubEngine::derive_node_id("bob");

        alice
            .create_session(&bob_id, StreamType::Application, StreamMode::RELIABLE)
            .await
            .unwrap();
        let err = alice
            .create_session(&bob_id, StreamType::Application, StreamMode::RELIABLE)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidState(_)));

        // A closed descriptor frees the slot.
        alice.close_session(&bob_id).await.unwrap();
        alice
            .create_session(&bob_id, StreamType::Application, StreamMode::RELIABLE)
            .await
            .unwrap();
        assert_eq!(alice.session_state(&bob_id), Some(SessionState::Idle));
    }

    #[tokio::test]
    async fn request_without_descriptor_is_not_found() {
        let engine = StubEngine::new();
        let (alice, _bob) = befriended_pair(&engine).await;
        let err = alice
            .session_request(&StubEngine::derive_node_id("bob"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn engine_failure_leaves_request_state_unchanged() {
        let engine = StubEngine::new();
        let handle: Arc<dyn Engine> = Arc::new(engine.clone());
        let alice = Node::new("alice", handle, Callbacks::new());
        alice.start().await.unwrap();
        let ghost = StubEngine::derive_node_id("ghost");

        // No friendship: the engine refuses the session.
        let err = alice
            .create_session(&ghost, StreamType::Application, StreamMode::RELIABLE)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Engine(_)));
        assert_eq!(alice.session_state(&ghost), None);
    }
}
