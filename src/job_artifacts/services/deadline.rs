//! Reader that fails once a file's scan deadline passes or the scan is
//! cancelled.
//!
//! Matchers see the expiry as an ordinary read error, so they can return
//! whatever they matched before it.

use crate::job_artifacts::ports::BlobReader;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};
use tokio::time::{Instant, Sleep};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

pub(super) struct DeadlineReader {
    inner: BlobReader,
    deadline: Pin<Box<Sleep>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    limit: Duration,
}

impl DeadlineReader {
    pub(super) fn new(
        inner: BlobReader,
        deadline: Instant,
        limit: Duration,
        cancel: &CancellationToken,
    ) -> Self {
        Self {
            inner,
            deadline: Box::pin(tokio::time::sleep_until(deadline)),
            cancelled: Box::pin(cancel.clone().cancelled_owned()),
            limit,
        }
    }

    fn expiry(&mut self, cx: &mut Context<'_>) -> Option<io::Error> {
        if self.cancelled.as_mut().poll(cx).is_ready() {
            return Some(io::Error::new(io::ErrorKind::Interrupted, "scan cancelled"));
        }
        if self.deadline.as_mut().poll(cx).is_ready() {
            return Some(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("scan timed out after {:?}", self.limit),
            ));
        }
        None
    }
}

impl AsyncRead for DeadlineReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(err) = this.expiry(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl AsyncBufRead for DeadlineReader {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        let this = self.get_mut();
        if let Some(err) = this.expiry(cx) {
            return Poll::Ready(Err(err));
        }
        Pin::new(&mut this.inner).poll_fill_buf(cx)
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        Pin::new(&mut self.get_mut().inner).consume(amt);
    }
}
