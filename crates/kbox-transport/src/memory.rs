use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

/// Callback invoked with every buffer written to a [`MemoryChannel`].
///
/// Whatever it returns is queued as inbound data, which lets tests stand in
/// for a device that answers requests.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

enum Inbound {
    Data(Vec<u8>),
    Timeout,
}

#[derive(Default)]
struct Shared {
    inbound: VecDeque<Inbound>,
    written: Vec<u8>,
    responder: Option<Responder>,
    closed: bool,
}

/// In-memory byte channel.
///
/// Reads are served from a script of byte chunks and explicit timeouts; an
/// empty script reads as a timeout immediately, without sleeping. All clones
/// share the same state, like handles to one port.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be returned by subsequent reads.
    pub fn push_bytes(&self, bytes: impl AsRef<[u8]>) {
        let bytes = bytes.as_ref();
        if !bytes.is_empty() {
            self.lock().inbound.push_back(Inbound::Data(bytes.to_vec()));
        }
    }

    /// Queue a read that returns nothing, as if the timeout expired.
    pub fn push_timeout(&self) {
        self.lock().inbound.push_back(Inbound::Timeout);
    }

    /// Install a responder that reacts to written bytes.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    /// Everything written to the channel so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Take and clear everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    /// Number of queued inbound entries not yet consumed.
    pub fn pending(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Close the channel: once the script is drained, reads fail with
    /// [`TransportError::Closed`] instead of timing out.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ByteChannel for MemoryChannel {
    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        let mut shared = self.lock();
        match shared.inbound.pop_front() {
            Some(Inbound::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    shared.inbound.push_front(Inbound::Data(rest));
                }
                Ok(n)
            }
            Some(Inbound::Timeout) => Ok(0),
            None if shared.closed => Err(TransportError::Closed),
            None => Ok(0),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.lock();
        let shared = &mut *guard;
        if shared.closed {
            return Err(TransportError::Closed);
        }
        shared.written.extend_from_slice(bytes);
        if let Some(responder) = shared.responder.as_mut() {
            let reply = responder(bytes);
            if !reply.is_empty() {
                shared.inbound.push_back(Inbound::Data(reply));
            }
        }
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl std::fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.lock();
        f.debug_struct("MemoryChannel")
            .field("pending", &shared.inbound.len())
            .field("written", &shared.written.len())
            .field("closed", &shared.closed)
            .finish()
    }
}
