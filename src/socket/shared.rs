//! State-guarded provider access shared by stream and datagram sockets

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use super::provider::{IoProvider, SocketHandle, SocketKind};
use super::state::{timeout_from_millis, SocketState};
use crate::addr::{IpAddress, SocketAddress};
use crate::error::{InetError, InetResult};

/// One provider handle plus its state machine
///
/// Sync provider calls (bind, shutdown, ttl) run under the state lock so the
/// guard check and the transition are atomic. Async provider calls run with
/// the lock released. `close` wakes an in-flight connect so it fails with
/// `SocketClosed` at once instead of waiting for the provider.
#[derive(Debug)]
pub(crate) struct SocketCore {
    kind: SocketKind,
    provider: Arc<dyn IoProvider>,
    handle: SocketHandle,
    state: Mutex<SocketState>,
    closed: Notify,
}

impl SocketCore {
    pub(crate) fn open(kind: SocketKind, provider: Arc<dyn IoProvider>) -> InetResult<Self> {
        let handle = provider.create(kind)?;
        debug!("Created {} socket {}", kind, handle);
        Ok(Self {
            kind,
            provider,
            handle,
            state: Mutex::new(SocketState::new()),
            closed: Notify::new(),
        })
    }

    pub(crate) fn handle(&self) -> SocketHandle {
        self.handle
    }

    pub(crate) fn provider(&self) -> &Arc<dyn IoProvider> {
        &self.provider
    }

    /// Copy of the current state
    pub(crate) fn state(&self) -> SocketState {
        self.state.lock().clone()
    }

    /// Run `f` under the state lock
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut SocketState) -> InetResult<R>) -> InetResult<R> {
        f(&mut self.state.lock())
    }

    pub(crate) fn bind(&self, local: &SocketAddress) -> InetResult<SocketAddress> {
        let mut state = self.state.lock();
        state.check_bind()?;
        let bound = self.provider.bind(self.handle, local)?;
        state.mark_bound(bound.clone());
        debug!("{} socket {} bound to {}", self.kind, self.handle, bound);
        Ok(bound)
    }

    /// Bind to the wildcard address of `family_of`'s family
    pub(crate) fn bind_wildcard_locked(
        &self,
        state: &mut SocketState,
        family_of: &IpAddress,
    ) -> InetResult<()> {
        let wildcard = SocketAddress::new(IpAddress::any(family_of.family()), 0);
        let bound = self.provider.bind(self.handle, &wildcard)?;
        debug!("{} socket {} implicitly bound to {}", self.kind, self.handle, bound);
        state.mark_bound(bound);
        Ok(())
    }

    /// Connect, binding implicitly first unless a proxy is used
    ///
    /// On provider failure the handle is released but the state is left
    /// unclosed; later operations report the provider's error.
    pub(crate) async fn connect(
        &self,
        remote: &SocketAddress,
        timeout_ms: i64,
        proxy: Option<&SocketAddress>,
    ) -> InetResult<()> {
        // Registered before the state check so a close after it is seen.
        let closed = self.closed.notified();
        let timeout = {
            let mut state = self.state.lock();
            state.ensure_open()?;
            let timeout = timeout_from_millis(timeout_ms)?;
            let needs_bind = state.begin_connect()?;
            if needs_bind && proxy.is_none() {
                if let Err(e) = self.bind_wildcard_locked(&mut state, remote.ip()) {
                    state.abort_connect();
                    return Err(e);
                }
            }
            timeout
        };

        let attempt = async {
            match proxy {
                Some(proxy) => {
                    self.provider
                        .connect_via_proxy(self.handle, proxy, remote, timeout)
                        .await
                }
                None => self.provider.connect(self.handle, remote, timeout).await,
            }
        };
        let result = tokio::select! {
            result = attempt => Some(result),
            () = closed => None,
        };

        let mut state = self.state.lock();
        match result {
            None => {
                state.abort_connect();
                debug!("{} socket {} closed while connecting to {}", self.kind, self.handle, remote);
                Err(InetError::SocketClosed)
            }
            Some(_) if state.is_closed() => {
                state.abort_connect();
                Err(InetError::SocketClosed)
            }
            Some(Ok(local)) => {
                debug!("{} socket {} connected {} -> {}", self.kind, self.handle, local, remote);
                state.complete_connect(local, remote.clone());
                Ok(())
            }
            Some(Err(e)) => {
                state.abort_connect();
                drop(state);
                debug!("{} socket {} connect to {} failed: {}", self.kind, self.handle, remote, e);
                self.provider.close(self.handle);
                Err(e)
            }
        }
    }

    /// Close; idempotent
    pub(crate) fn close(&self) {
        if self.state.lock().mark_closed() {
            self.provider.close(self.handle);
            self.closed.notify_waiters();
            debug!("{} socket {} closed", self.kind, self.handle);
        }
    }

    pub(crate) fn shutdown_input(&self) -> InetResult<()> {
        let mut state = self.state.lock();
        state.check_shutdown_input()?;
        self.provider.shutdown_input(self.handle)?;
        state.mark_input_shutdown();
        debug!("{} socket {} input shut down", self.kind, self.handle);
        Ok(())
    }

    pub(crate) fn shutdown_output(&self) -> InetResult<()> {
        let mut state = self.state.lock();
        state.check_shutdown_output()?;
        self.provider.shutdown_output(self.handle)?;
        state.mark_output_shutdown();
        debug!("{} socket {} output shut down", self.kind, self.handle);
        Ok(())
    }

    pub(crate) fn set_ttl(&self, ttl: u32) -> InetResult<()> {
        let state = self.state.lock();
        state.ensure_open()?;
        self.provider.set_ttl(self.handle, ttl)
    }

    pub(crate) fn set_receive_timeout(&self, ms: i64) -> InetResult<()> {
        self.state.lock().set_receive_timeout(ms)
    }
}

impl Drop for SocketCore {
    fn drop(&mut self) {
        self.close();
    }
}
