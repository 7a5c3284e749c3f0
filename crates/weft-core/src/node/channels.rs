//! Sub-channel and port-forwarding management.
//!
//! Channels nest inside an active session; pend/resume are explicit
//! cooperative flow-control signals with no automatic resume-on-drain.
//! Port-forwarding tunnels forward a friend's named service through the
//! session, conceptually one channel dedicated to proxying a TCP-like
//! endpoint.

use crate::channel::{Channel, ChannelState, PortForwarding};
use crate::node::error::{NodeError, Result};
use crate::node::node::{Node, NodeInner};
use weft_engine::{Command, Event, ForwardingState};

// ═══════════════════════════════════════════════════════════════════════════
// Channels
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// Open a sub-channel within the session with a friend.
    ///
    /// The cookie is handed opaquely to the peer for its own channel
    /// admission. The new channel starts writable.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, or [`NodeError::Decode`] if the
    /// engine does not return a channel id.
    pub async fn open_channel(&self, friend_id: &str, cookie: &str) -> Result<u32> {
        let value = self
            .inner
            .gateway
            .execute(Command::OpenChannel {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                cookie: cookie.to_string(),
            })
            .await?;
        let channel_id = value
            .as_u64()
            .map(|id| id as u32)
            .ok_or_else(|| NodeError::Decode("openChannel returned no channel id".into()))?;
        self.inner.channels.insert(
            (friend_id.to_string(), channel_id),
            Channel::new(friend_id, channel_id),
        );
        Ok(channel_id)
    }

    /// Close a sub-channel.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ChannelNotFound`] if the id does not resolve
    /// locally; otherwise propagates the engine's failure.
    pub async fn close_channel(&self, friend_id: &str, channel_id: u32) -> Result<()> {
        self.resolve_channel(friend_id, channel_id)?;
        self.inner
            .gateway
            .execute(Command::CloseChannel {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                channel_id,
            })
            .await?;
        self.inner
            .channels
            .remove(&(friend_id.to_string(), channel_id));
        Ok(())
    }

    /// Write data onto a sub-channel.
    ///
    /// Only meaningful while the channel is writable; this layer does
    /// not validate the state; a write on a pending channel is rejected
    /// or deferred per the engine's contract.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ChannelNotFound`] if the id does not resolve
    /// locally; otherwise propagates the engine's failure.
    pub async fn write_channel(&self, friend_id: &str, channel_id: u32, data: Vec<u8>) -> Result<()> {
        self.resolve_channel(friend_id, channel_id)?;
        self.inner
            .gateway
            .execute(Command::WriteChannel {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                channel_id,
                data,
            })
            .await?;
        Ok(())
    }

    /// Signal backpressure on a sub-channel; local state -> `Pending`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ChannelNotFound`] if the id does not resolve
    /// locally; otherwise propagates the engine's failure.
    pub async fn pend_channel(&self, friend_id: &str, channel_id: u32) -> Result<()> {
        self.resolve_channel(friend_id, channel_id)?;
        self.inner
            .gateway
            .execute(Command::PendChannel {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                channel_id,
            })
            .await?;
        self.transition_channel(friend_id, channel_id, ChannelState::Pending)
    }

    /// Lift backpressure on a sub-channel; local state -> `Active`.
    ///
    /// Resuming is an explicit caller action: nothing resumes a pended
    /// channel automatically.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ChannelNotFound`] if the id does not resolve
    /// locally, [`NodeError::InvalidState`] if the channel was not
    /// pended; otherwise propagates the engine's failure.
    pub async fn resume_channel(&self, friend_id: &str, channel_id: u32) -> Result<()> {
        self.resolve_channel(friend_id, channel_id)?;
        self.inner
            .gateway
            .execute(Command::ResumeChannel {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                channel_id,
            })
            .await?;
        self.transition_channel(friend_id, channel_id, ChannelState::Active)
    }

    /// Current state of a channel, if it resolves locally.
    #[must_use]
    pub fn channel_state(&self, friend_id: &str, channel_id: u32) -> Option<ChannelState> {
        self.inner
            .channels
            .get(&(friend_id.to_string(), channel_id))
            .map(|channel| channel.state())
    }

    fn resolve_channel(&self, friend_id: &str, channel_id: u32) -> Result<()> {
        if self
            .inner
            .channels
            .contains_key(&(friend_id.to_string(), channel_id))
        {
            Ok(())
        } else {
            Err(NodeError::ChannelNotFound {
                friend_id: friend_id.to_string(),
                channel_id,
            })
        }
    }

    fn transition_channel(
        &self,
        friend_id: &str,
        channel_id: u32,
        to: ChannelState,
    ) -> Result<()> {
        let mut channel = self
            .inner
            .channels
            .get_mut(&(friend_id.to_string(), channel_id))
            .ok_or_else(|| NodeError::ChannelNotFound {
                friend_id: friend_id.to_string(),
                channel_id,
            })?;
        channel.transition_to(to)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Services & port forwarding
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// Register a named local service eligible for forwarding.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn add_service(
        &self,
        friend_id: &str,
        service_name: &str,
        host: &str,
        port: u16,
    ) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::AddService {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                service_name: service_name.to_string(),
                host: host.to_string(),
                port,
            })
            .await?;
        Ok(())
    }

    /// Unregister a named local service.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn remove_service(&self, friend_id: &str, service_name: &str) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::RemoveService {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                service_name: service_name.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Open a tunnel forwarding a friend's named service.
    ///
    /// The tunnel proxies `host:port` locally through the friend's
    /// session.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, or [`NodeError::Decode`] if the
    /// engine does not return a forwarding id.
    pub async fn open_port_forwarding(
        &self,
        friend_id: &str,
        service_name: &str,
        host: &str,
        port: u16,
    ) -> Result<u32> {
        let value = self
            .inner
            .gateway
            .execute(Command::OpenPortForwarding {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                service_name: service_name.to_string(),
                host: host.to_string(),
                port,
            })
            .await?;
        let forwarding_id = value
            .as_u64()
            .map(|id| id as u32)
            .ok_or_else(|| NodeError::Decode("openPortFowarding returned no tunnel id".into()))?;
        self.inner.forwardings.insert(
            forwarding_id,
            PortForwarding {
                friend_id: friend_id.to_string(),
                service_name: service_name.to_string(),
                host: host.to_string(),
                port,
                forwarding_id,
            },
        );
        Ok(forwarding_id)
    }

    /// Tear down a forwarding tunnel.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ForwardingNotFound`] if the id does not
    /// resolve locally; otherwise propagates the engine's failure.
    pub async fn close_port_forwarding(&self, friend_id: &str, forwarding_id: u32) -> Result<()> {
        if !self.inner.forwardings.contains_key(&forwarding_id) {
            return Err(NodeError::ForwardingNotFound {
                friend_id: friend_id.to_string(),
                forwarding_id,
            });
        }
        self.inner
            .gateway
            .execute(Command::ClosePortForwarding {
                node: self.inner.id.clone(),
                friend_id: friend_id.to_string(),
                forwarding_id,
            })
            .await?;
        self.inner.forwardings.remove(&forwarding_id);
        Ok(())
    }

    /// Snapshot of the open forwarding tunnels.
    #[must_use]
    pub fn port_forwardings(&self) -> Vec<PortForwarding> {
        self.inner
            .forwardings
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl NodeInner {
    /// Mirror bookkeeping for channel- and tunnel-level events.
    pub(crate) fn apply_channel_event(&self, event: &Event) {
        match event {
            Event::ChannelOpened {
                friend_id,
                channel_id,
            } => {
                self.channels.insert(
                    (friend_id.clone(), *channel_id),
                    Channel::new(friend_id.clone(), *channel_id),
                );
            }
            Event::ChannelClosed {
                friend_id,
                channel_id,
            } => {
                self.channels.remove(&(friend_id.clone(), *channel_id));
            }
            Event::PortForwardingState {
                forwarding_id,
                state,
                ..
            } => {
                if matches!(state, ForwardingState::Closed | ForwardingState::Failed) {
                    self.forwardings.remove(forwarding_id);
                }
            }
            _ => {}
        }
    }
}
