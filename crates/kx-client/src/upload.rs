//! Theme upload payloads and progress reporting.

use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Callback invoked with the percentage of the archive transferred.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Fields of a theme upload. `build_zip` is mandatory; the registry
/// client refuses to submit without it.
#[derive(Debug, Clone)]
pub struct ThemeUpload {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    /// `(filename, bytes)`
    pub thumbnail: Option<(String, Vec<u8>)>,
    /// `(filename, bytes)` of the build archive.
    pub build_zip: Option<(String, Vec<u8>)>,
}

impl ThemeUpload {
    /// Start an upload for `name`, deriving the slug from it.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = kx_build::slugify(&name);
        Self {
            name,
            slug,
            description: None,
            thumbnail: None,
            build_zip: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn thumbnail(mut self, filename: impl Into<String>, data: Vec<u8>) -> Self {
        self.thumbnail = Some((filename.into(), data));
        self
    }

    pub fn build_zip(mut self, filename: impl Into<String>, data: Vec<u8>) -> Self {
        self.build_zip = Some((filename.into(), data));
        self
    }
}

/// Upload chunk size: 64 KiB per progress report.
const CHUNK_SIZE: usize = 64 * 1024;

/// Byte stream over an in-memory archive that reports transfer progress
/// after every chunk handed to the HTTP client.
pub(crate) struct ProgressStream {
    data: Bytes,
    offset: usize,
    progress: ProgressFn,
    done: bool,
}

impl ProgressStream {
    pub(crate) fn new(data: Vec<u8>, progress: ProgressFn) -> Self {
        Self {
            data: Bytes::from(data),
            offset: 0,
            progress,
            done: false,
        }
    }
}

impl Stream for ProgressStream {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.data.is_empty() {
            this.done = true;
            (this.progress)(100);
            return Poll::Ready(None);
        }

        let end = (this.offset + CHUNK_SIZE).min(this.data.len());
        let chunk = this.data.slice(this.offset..end);
        this.offset = end;
        if end == this.data.len() {
            this.done = true;
        }

        let percent = (end * 100 / this.data.len()) as u8;
        (this.progress)(percent);

        Poll::Ready(Some(Ok(chunk)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::sync::Mutex;

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: ProgressFn = Arc::new(move |pct| sink.lock().unwrap().push(pct));
        (cb, seen)
    }

    #[test]
    fn derives_slug_from_name() {
        let upload = ThemeUpload::new("My  Theme!!");
        assert_eq!(upload.slug, "my-theme");
        assert!(upload.build_zip.is_none());
    }

    #[tokio::test]
    async fn streams_whole_payload_with_monotonic_progress() {
        let payload: Vec<u8> = (0..200_000u32).map(|i| i as u8).collect();
        let (cb, seen) = recorder();
        let mut stream = ProgressStream::new(payload.clone(), cb);

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(collected, payload);
        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress went backwards");
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[tokio::test]
    async fn empty_payload_still_reports_completion() {
        let (cb, seen) = recorder();
        let mut stream = ProgressStream::new(Vec::new(), cb);
        assert!(stream.next().await.is_none());
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }
}
