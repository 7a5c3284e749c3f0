//! Friend relationship management.
//!
//! The engine owns the authoritative friend list; the node keeps a local
//! mirror fed by the engine's result values and by `FriendAdded` /
//! `FriendRemoved` / `FriendPresence` events. Losing a friend also
//! forfeits any session, channels and tunnels with that friend.

use crate::node::decode;
use crate::node::error::{NodeError, Result};
use crate::node::node::{Node, NodeInner};
use weft_engine::{Command, Event, Friend, UserProfile};

impl Node {
    /// Send a friend request to a peer address.
    ///
    /// Completion only means the request was sent: the peer is NOT added
    /// to the friend list until an accept occurs on the other side and
    /// the engine reports it via `FriendAdded`.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn add_friend(&self, address: &str, greeting: &str) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::AddFriend {
                node: self.inner.id.clone(),
                address: address.to_string(),
                greeting: greeting.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Accept an incoming friend request.
    ///
    /// The relationship enters the friend list; the engine confirms with
    /// a `FriendAdded` event on both sides.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn accept_friend(&self, user_id: &str) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::AcceptFriend {
                node: self.inner.id.clone(),
                user_id: user_id.to_string(),
            })
            .await?;
        Ok(())
    }

    /// A friend's profile, from the engine.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn friend_info(&self, friend_id: &str) -> Result<UserProfile> {
        let value = self
            .inner
            .gateway
            .execute(Command::GetFriendInfo {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
            })
            .await?;
        decode(value)
    }

    /// Send a message to a friend, fire-and-forget.
    ///
    /// Delivery confirmation, if any, arrives as an asynchronous event,
    /// not as part of this call's result.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn send_message(&self, friend_id: &str, message: &str) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::SendFriendMessage {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                message: message.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Remove a friend relationship.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn remove_friend(&self, friend_id: &str) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::RemoveFriend {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
            })
            .await?;
        self.inner.forget_friend(friend_id);
        Ok(())
    }

    /// Set a local-only alias for a friend. No network effect.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn set_label(&self, friend_id: &str, label: &str) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::SetLabel {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                label: label.to_string(),
            })
            .await?;
        if let Some(mut friend) = self.inner.friends.get_mut(friend_id) {
            friend.label = label.to_string();
        }
        Ok(())
    }

    /// The friend list, from the engine.
    ///
    /// The local mirror is refreshed from the result.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn friend_list(&self) -> Result<Vec<Friend>> {
        let value = self
            .inner
            .gateway
            .execute(Command::GetFriendList {
                node: self.inner.id.clone(),
            })
            .await?;
        let friends: Vec<Friend> = decode(value)?;
        self.inner.friends.clear();
        for friend in &friends {
            self.inner
                .friends
                .insert(friend.friend_id.clone(), friend.clone());
        }
        Ok(friends)
    }

    /// Read one friend from the local mirror.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::FriendNotFound`] if the friend id does not
    /// resolve locally.
    pub fn friend(&self, friend_id: &str) -> Result<Friend> {
        self.inner
            .friends
            .get(friend_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| NodeError::FriendNotFound(friend_id.to_string()))
    }
}

impl NodeInner {
    /// Drop a friend and everything nested under the relationship.
    pub(crate) fn forget_friend(&self, friend_id: &str) {
        self.friends.remove(friend_id);
        if let Some(mut session) = self.sessions.get_mut(friend_id) {
            if session.is_live() {
                let _ = session.transition_to(crate::session::SessionState::Closed);
            }
        }
        self.sessions.remove(friend_id);
        self.channels.retain(|(owner, _), _| owner != friend_id);
        self.forwardings.retain(|_, tunnel| tunnel.friend_id != friend_id);
    }

    /// Mirror bookkeeping for friend-level events.
    pub(crate) fn apply_friend_event(&self, event: &Event) {
        match event {
            Event::FriendAdded { friend } => {
                self.friends.insert(friend.friend_id.clone(), friend.clone());
            }
            Event::FriendRemoved { friend_id } => {
                self.forget_friend(friend_id);
            }
            Event::FriendPresence {
                friend_id,
                presence,
            } => {
                if let Some(mut friend) = self.friends.get_mut(friend_id) {
                    friend.presence = *presence;
                } else {
                    tracing::debug!(friend = %friend_id, "presence for unknown friend ignored");
                }
            }
            _ => {}
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

    async fn started_pair(engine: &StubEngine) -> (Node, Node) {
        let handle: Arc<dyn Engine> = Arc::new(engine.clone());
        let alice = Node::new("alice", Arc::clone(&handle), Callbacks::new());
        let bob = Node::new("bob", handle, Callbacks::new());
        alice.start().await.unwrap();
        bob.start().await.unwrap();
        (alice, bob)
    }

    /// Let the dispatch tasks drain events emitted by the stub.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn request_does_not_populate_list_before_accept() {
        let engine = StubEngine::new();
        let (alice, bob) = started_pair(&engine).await;

        alice
            .add_friend(&StubEngine::derive_address("bob"), "hi bob")
            .await
            .unwrap();
        assert!(alice.friend_list().await.unwrap().is_empty());
        assert!(bob.friend_list().await.unwrap().is_empty());

        bob.accept_friend(&StubEngine::derive_node_id("alice"))
            .await
            .unwrap();
        settle().await;

        let friends = alice.friend_list().await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].friend_id, StubEngine::derive_node_id("bob"));
        assert!(alice.friend(&StubEngine::derive_node_id("bob")).is_ok());
    }

    #[tokio::test]
    async fn label_is_local_and_mirrored() {
        let engine = StubEngine::new();
        let (alice, bob) = started_pair(&engine).await;
        alice
            .add_friend(&StubEngine::derive_address("bob"), "hi")
            .await
            .unwrap();
        bob.accept_friend(&StubEngine::derive_node_id("alice"))
            .await
            .unwrap();
        settle().await;

        let bob_id = StubEngine::derive_node_id("bob");
        alice.set_label(&bob_id, "bobby").await.unwrap();
        assert_eq!(alice.friend(&bob_id).unwrap().label, "bobby");
        // The peer's view of the relationship is unaffected.
        let alice_id = StubEngine::derive_node_id("alice");
        assert_eq!(bob.friend(&alice_id).unwrap().label, "");
    }

    #[tokio::test]
    async fn removal_clears_the_relationship_on_both_sides() {
        let engine = StubEngine::new();
        let (alice, bob) = started_pair(&engine).await;
        alice
            .add_friend(&StubEngine::derive_address("bob"), "hi")
            .await
            .unwrap();
        bob.accept_friend(&StubEngine::derive_node_id("alice"))
            .await
            .unwrap();
        settle().await;

        alice
            .remove_friend(&StubEngine::derive_node_id("bob"))
            .await
            .unwrap();
        settle().await;

        assert!(alice.friend_list().await.unwrap().is_empty());
        assert!(bob.friend_list().await.unwrap().is_empty());
        assert!(
            bob.friend(&StubEngine::derive_node_id("alice"))
                .unwrap_err()
                .is_not_found()
        );
    }
}
