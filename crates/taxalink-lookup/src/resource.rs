//! Resource retrieval.

use crate::ResourceError;
use reqwest::blocking::Client;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use taxalink_cache::DurableCache;
use url::Url;

/// Retrieves the bytes behind a locator (path or URL).
pub trait ResourceService: Send + Sync {
    fn retrieve(&self, locator: &str) -> Result<Box<dyn Read + Send>, ResourceError>;
}

impl<T: ResourceService + ?Sized> ResourceService for Arc<T> {
    fn retrieve(&self, locator: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        (**self).retrieve(locator)
    }
}

impl<T: ResourceService + ?Sized> ResourceService for &T {
    fn retrieve(&self, locator: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        (**self).retrieve(locator)
    }
}

// ============================================================================
// Local files
// ============================================================================

/// Reads plain paths and `file://` URLs; relative paths resolve against
/// `base_dir`.
#[derive(Debug, Clone)]
pub struct LocalResourceService {
    base_dir: PathBuf,
}

impl LocalResourceService {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, locator: &str) -> Result<PathBuf, ResourceError> {
        if let Ok(url) = Url::parse(locator) {
            if url.scheme() == "file" {
                return url
                    .to_file_path()
                    .map_err(|_| ResourceError::UnsupportedLocator(locator.to_string()));
            }
            // single letters are windows drive prefixes, not schemes
            if url.scheme().len() > 1 {
                return Err(ResourceError::UnsupportedLocator(locator.to_string()));
            }
        }
        let path = Path::new(locator);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        })
    }
}

impl Default for LocalResourceService {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceService for LocalResourceService {
    fn retrieve(&self, locator: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        let path = self.resolve(locator)?;
        let file = std::fs::File::open(&path).map_err(|source| ResourceError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Box::new(std::io::BufReader::new(file)))
    }
}

// ============================================================================
// HTTP(S)
// ============================================================================

/// Fetches `http`/`https` locators with a blocking client. No retries.
#[derive(Debug, Clone)]
pub struct HttpResourceService {
    client: Client,
}

impl HttpResourceService {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, ResourceError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(concat!("taxalink/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ResourceError::Http {
                locator: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

impl ResourceService for HttpResourceService {
    fn retrieve(&self, locator: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        let url = Url::parse(locator)
            .map_err(|_| ResourceError::UnsupportedLocator(locator.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ResourceError::UnsupportedLocator(locator.to_string()));
        }
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|source| ResourceError::Http {
                locator: locator.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(ResourceError::Status {
                locator: locator.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(Box::new(resp))
    }
}

// ============================================================================
// Memoized retrieval
// ============================================================================

/// Memoizes retrieved bytes by locator in a [`DurableCache`].
pub struct CachingResourceService<R> {
    inner: R,
    cache: Arc<DurableCache>,
}

impl<R: ResourceService> CachingResourceService<R> {
    pub fn new(inner: R, cache: Arc<DurableCache>) -> Self {
        Self { inner, cache }
    }
}

impl<R: ResourceService> ResourceService for CachingResourceService<R> {
    fn retrieve(&self, locator: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
        if let Some(bytes) = self.cache.get(locator.as_bytes())? {
            tracing::debug!(locator, bytes = bytes.len(), "resource cache hit");
            return Ok(Box::new(Cursor::new(bytes)));
        }
        let mut bytes = Vec::new();
        self.inner
            .retrieve(locator)?
            .read_to_end(&mut bytes)
            .map_err(|source| ResourceError::Io {
                path: PathBuf::from(locator),
                source,
            })?;
        self.cache.put(locator.as_bytes(), &bytes)?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::JoinHandle;

    /// Answers a single request with `status_line` and hands back the raw
    /// request head together with the listener.
    fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<(String, TcpListener)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(std::time::Duration::from_secs(5)))
                .unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let reply = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
            stream.flush().unwrap();
            (String::from_utf8_lossy(&head).into_owned(), listener)
        });
        (base, handle)
    }

    /// Fails when a second connection is already waiting.
    fn assert_no_second_request(listener: TcpListener) {
        listener.set_nonblocking(true).unwrap();
        assert!(matches!(
            listener.accept(),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock
        ));
    }
    use taxalink_cache::CacheService;
    use tempfile::tempdir;

    fn read_all(mut r: Box<dyn Read + Send>) -> String {
        let mut s = String::new();
        r.read_to_string(&mut s).unwrap();
        s
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("names.tsv"), "a\tb\tc\td\n").unwrap();
        let service = LocalResourceService::new(dir.path());
        assert_eq!(read_all(service.retrieve("names.tsv").unwrap()), "a\tb\tc\td\n");
    }

    #[test]
    fn file_urls_are_supported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("names.csv");
        std::fs::write(&path, "x").unwrap();
        let url = Url::from_file_path(&path).unwrap();
        let service = LocalResourceService::default();
        assert_eq!(read_all(service.retrieve(url.as_str()).unwrap()), "x");
    }

    #[test]
    fn remote_urls_are_not_local() {
        let service = LocalResourceService::default();
        assert!(matches!(
            service.retrieve("https://example.org/names.tsv"),
            Err(ResourceError::UnsupportedLocator(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let service = LocalResourceService::new(dir.path());
        assert!(matches!(
            service.retrieve("absent.tsv"),
            Err(ResourceError::Io { .. })
        ));
    }

    struct Counting {
        calls: AtomicUsize,
    }

    impl ResourceService for Counting {
        fn retrieve(&self, _locator: &str) -> Result<Box<dyn Read + Send>, ResourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(b"payload".to_vec())))
        }
    }

    #[test]
    fn caching_service_retrieves_once() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(CacheService::new(dir.path()).init_db("resources").unwrap());
        let inner = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        let service = CachingResourceService::new(inner.clone(), cache.clone());

        assert_eq!(read_all(service.retrieve("mem://a").unwrap()), "payload");
        assert_eq!(read_all(service.retrieve("mem://a").unwrap()), "payload");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert!(cache.contains(b"mem://a"));
    }

    #[test]
    fn http_service_rejects_non_http_locators() {
        let service = HttpResourceService::new(Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        for locator in ["file:///tmp/taxa.tsv", "taxa.tsv"] {
            assert!(matches!(
                service.retrieve(locator),
                Err(ResourceError::UnsupportedLocator(_))
            ));
        }
    }

    fn http_service() -> HttpResourceService {
        HttpResourceService::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn http_service_reads_remote_table() {
        let (base, server) = serve_once("200 OK", "1\tHomo sapiens\tNCBI:9606\tHomo sapiens\n");
        let locator = format!("{base}/tables/taxa.tsv");

        let body = read_all(http_service().retrieve(&locator).unwrap());
        assert_eq!(body, "1\tHomo sapiens\tNCBI:9606\tHomo sapiens\n");

        let (request, _) = server.join().unwrap();
        assert!(request.starts_with("GET /tables/taxa.tsv HTTP/1.1\r\n"));
    }

    #[test]
    fn http_error_status_is_reported_after_one_request() {
        let (base, server) = serve_once("503 Service Unavailable", "busy");
        let locator = format!("{base}/tables/taxa.tsv");

        match http_service().retrieve(&locator) {
            Err(ResourceError::Status { locator: failed, status }) => {
                assert_eq!(status, 503);
                assert_eq!(failed, locator);
            }
            Err(other) => panic!("expected a status error, got {other:?}"),
            Ok(_) => panic!("expected a status error"),
        }

        let (_, listener) = server.join().unwrap();
        assert_no_second_request(listener);
    }
}
