use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use benchttp_http::{ClientOptions, HttpClient};
use tokio::sync::mpsc;

use super::error::{Error, Result};

#[derive(Debug)]
struct PoolShared {
    idle_tx: mpsc::Sender<HttpClient>,
    checked_out: AtomicUsize,
    peak_checked_out: AtomicUsize,
}

/// A fixed set of client handles; the only bound on how many calls run at once.
///
/// Handles are checked out with [`ClientPool::acquire`] and go back to the pool when the
/// returned [`PooledClient`] is released or dropped, including when the owning task panics.
#[derive(Debug)]
pub struct ClientPool {
    shared: Arc<PoolShared>,
    idle_rx: mpsc::Receiver<HttpClient>,
    size: usize,
}

impl ClientPool {
    pub fn new(size: usize, opts: &ClientOptions) -> Result<Self> {
        let clients = (0..size)
            .map(|_| HttpClient::new(opts))
            .collect::<benchttp_http::Result<Vec<_>>>()?;
        Self::from_clients(clients)
    }

    pub fn from_clients(clients: Vec<HttpClient>) -> Result<Self> {
        let size = clients.len();
        if size == 0 {
            return Err(Error::InvalidConcurrency);
        }

        let (idle_tx, idle_rx) = mpsc::channel(size);
        for client in clients {
            idle_tx.try_send(client).map_err(|_| Error::PoolClosed)?;
        }

        Ok(Self {
            shared: Arc::new(PoolShared {
                idle_tx,
                checked_out: AtomicUsize::new(0),
                peak_checked_out: AtomicUsize::new(0),
            }),
            idle_rx,
            size,
        })
    }

    /// Waits until a handle is idle and checks it out.
    ///
    /// The pool keeps a sender alive for its own lifetime, so this only fails if that
    /// invariant is broken.
    pub async fn acquire(&mut self) -> Result<PooledClient> {
        let client = self.idle_rx.recv().await.ok_or(Error::PoolClosed)?;

        let now = self.shared.checked_out.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak_checked_out.fetch_max(now, Ordering::SeqCst);

        Ok(PooledClient {
            client,
            shared: self.shared.clone(),
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn checked_out(&self) -> usize {
        self.shared.checked_out.load(Ordering::SeqCst)
    }

    /// Highest number of handles that were checked out at the same time.
    #[must_use]
    pub fn peak_checked_out(&self) -> usize {
        self.shared.peak_checked_out.load(Ordering::SeqCst)
    }
}

/// Exclusive ownership of one pool handle.
#[derive(Debug)]
pub struct PooledClient {
    client: HttpClient,
    shared: Arc<PoolShared>,
}

impl PooledClient {
    /// Returns the handle to the pool. Dropping has the same effect.
    pub fn release(self) {}
}

impl Deref for PooledClient {
    type Target = HttpClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl DerefMut for PooledClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client
    }
}

impl Drop for PooledClient {
    fn drop(&mut self) {
        // Decrement first so `checked_out` never exceeds the pool size.
        self.shared.checked_out.fetch_sub(1, Ordering::SeqCst);

        // Clones share the underlying connection pool, so the returned handle keeps its
        // keep-alive connections. The channel has room for every handle; a failed send
        // means the pool itself is gone.
        let mut client = self.client.clone();
        client.set_timeout(None);
        let _ = self.shared.idle_tx.try_send(client);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_waits_while_every_handle_is_checked_out() {
        let mut pool = ClientPool::new(2, &ClientOptions::default()).unwrap();
        assert_eq!(pool.size(), 2);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_eq!(pool.checked_out(), 2);

        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err(), "acquire must wait when the pool is exhausted");

        a.release();
        assert_eq!(pool.checked_out(), 1);

        let c = tokio::time::timeout(Duration::from_millis(50), pool.acquire())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pool.checked_out(), 2);

        drop(b);
        drop(c);
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.peak_checked_out(), 2);
    }

    #[tokio::test]
    async fn handle_returns_to_pool_when_task_panics() {
        let mut pool = ClientPool::new(1, &ClientOptions::default()).unwrap();
        let client = pool.acquire().await.unwrap();

        fn blow_up(_client: PooledClient) {
            panic!("request task blew up");
        }

        let joined = tokio::spawn(async move { blow_up(client) }).await;
        assert!(joined.is_err());

        let again = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(again.is_ok(), "handle leaked after a panic");
    }

    #[tokio::test]
    async fn released_handle_has_no_timeout() {
        let mut pool = ClientPool::new(1, &ClientOptions::default()).unwrap();

        let mut client = pool.acquire().await.unwrap();
        client.set_timeout(Some(Duration::from_millis(10)));
        client.release();

        let client = pool.acquire().await.unwrap();
        assert_eq!(client.timeout(), None);
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(
            ClientPool::from_clients(Vec::new()),
            Err(Error::InvalidConcurrency)
        ));
    }
}
