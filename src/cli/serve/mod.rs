//! Repository HTTP server.
//!
//! Every request passes the access guard before the filesystem is touched:
//!
//! ```text
//! request ─→ shutting down? ─→ 503
//!         ─→ guard.authorize ─→ 429 (throttled) | 401 (denied)
//!         ─→ GET/HEAD only   ─→ 405
//!         ─→ resolve path    ─→ file | 404
//! ```

mod lifecycle;
mod response;

pub use lifecycle::{Workers, bind_with_retry};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Method, Request, Server};

use crate::access::{AccessDecision, AccessGuard, client_key};
use crate::config::RepoConfig;
use crate::core::Shutdown;
use crate::utils::path::resolve_request_path;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// Shared state of the request handlers.
pub struct ServeContext {
    root: PathBuf,
    guard: AccessGuard,
    trust_forwarded_for: bool,
    shutdown: Shutdown,
}

impl ServeContext {
    pub fn new(
        root: PathBuf,
        guard: AccessGuard,
        trust_forwarded_for: bool,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            root,
            guard,
            trust_forwarded_for,
            shutdown,
        }
    }

    pub fn from_config(config: &RepoConfig, shutdown: Shutdown) -> Self {
        let guard = AccessGuard::from_config(&config.auth);
        if guard.is_enabled() {
            log!("auth"; "basic auth on, {}", plural_count(config.auth.users.len(), "user"));
        }
        Self::new(
            config.repo.root.clone(),
            guard,
            config.auth.trust_forwarded_for,
            shutdown,
        )
    }
}

/// What to send back for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Unavailable,
    Throttled,
    Unauthorized,
    MethodNotAllowed,
    File(PathBuf),
    NotFound,
}

/// Request fields the routing decision depends on.
struct RequestInfo<'a> {
    method: &'a Method,
    url: &'a str,
    remote: Option<&'a SocketAddr>,
    authorization: Option<&'a str>,
    forwarded_for: Option<&'a str>,
}

impl<'a> RequestInfo<'a> {
    fn from_request(request: &'a Request) -> Self {
        Self {
            method: request.method(),
            url: request.url(),
            remote: request.remote_addr(),
            authorization: header_value(request, "Authorization"),
            forwarded_for: header_value(request, "X-Forwarded-For"),
        }
    }
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

fn route(ctx: &ServeContext, info: &RequestInfo<'_>) -> Reply {
    if ctx.shutdown.is_triggered() {
        return Reply::Unavailable;
    }

    let client = client_key(info.remote, info.forwarded_for, ctx.trust_forwarded_for);
    match ctx.guard.authorize(&client, info.authorization) {
        AccessDecision::Throttle => return Reply::Throttled,
        AccessDecision::Deny => return Reply::Unauthorized,
        AccessDecision::Allow => {}
    }

    if !matches!(info.method, Method::Get | Method::Head) {
        return Reply::MethodNotAllowed;
    }

    match resolve_request_path(info.url, &ctx.root) {
        Some(path) => Reply::File(path),
        None => Reply::NotFound,
    }
}

// =============================================================================
// Server
// =============================================================================

/// Bound server ready to accept requests.
pub struct BoundServer {
    server: Arc<Server>,
}

/// Bind the HTTP server without starting the request loop.
///
/// The server is registered with `shutdown` so Ctrl+C unblocks the accept loop.
pub fn bind_server(config: &RepoConfig, shutdown: &Shutdown) -> Result<BoundServer> {
    let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    shutdown.register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    if !config.repo.root.is_dir() {
        log!("warning"; "repository root {} does not exist yet", config.repo.root.display());
    }

    Ok(BoundServer { server })
}

impl BoundServer {
    /// Serve requests on `threads` workers until the server is unblocked.
    pub fn run(self, ctx: Arc<ServeContext>, threads: usize) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("http-{i}"))
            .build()
            .context("failed to create request thread pool")?;

        for request in self.server.incoming_requests() {
            let ctx = Arc::clone(&ctx);
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &ctx) {
                    debug!("serve"; "request error: {:#}", e);
                }
            });
        }
        Ok(())
    }
}

fn handle_request(request: Request, ctx: &ServeContext) -> Result<()> {
    let reply = route(ctx, &RequestInfo::from_request(&request));
    match reply {
        Reply::Unavailable => response::respond_unavailable(request),
        Reply::Throttled => response::respond_throttled(request),
        Reply::Unauthorized => response::respond_unauthorized(request),
        Reply::MethodNotAllowed => response::respond_method_not_allowed(request),
        Reply::File(path) => response::respond_file(request, &path),
        Reply::NotFound => response::respond_not_found(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::credentials::UserTable;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use rustc_hash::FxHashMap;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    const REMOTE: &str = "192.0.2.7:51000";

    fn repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("debian/dists/jammy");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("Release"), "Suite: jammy\n").unwrap();
        temp
    }

    fn guarded(root: &Path) -> ServeContext {
        let mut users = FxHashMap::default();
        users.insert("apt".to_string(), "hunter2".to_string());
        let guard = AccessGuard::new(UserTable::new(users), 5, Duration::from_secs(1800));
        ServeContext::new(root.to_path_buf(), guard, false, Shutdown::new())
    }

    fn open(root: &Path) -> ServeContext {
        ServeContext::new(root.to_path_buf(), AccessGuard::disabled(), false, Shutdown::new())
    }

    fn info<'a>(
        method: &'a Method,
        url: &'a str,
        remote: &'a SocketAddr,
        authorization: Option<&'a str>,
    ) -> RequestInfo<'a> {
        RequestInfo {
            method,
            url,
            remote: Some(remote),
            authorization,
            forwarded_for: None,
        }
    }

    #[test]
    fn test_open_repo_serves_files() {
        let temp = repo();
        let ctx = open(temp.path());
        let remote: SocketAddr = REMOTE.parse().unwrap();

        let reply = route(&ctx, &info(&Method::Get, "/debian/dists/jammy/Release", &remote, None));
        assert!(matches!(reply, Reply::File(path) if path.ends_with("Release")));

        let reply = route(&ctx, &info(&Method::Get, "/debian/dists/noble/Release", &remote, None));
        assert_eq!(reply, Reply::NotFound);

        let reply = route(&ctx, &info(&Method::Get, "/../etc/passwd", &remote, None));
        assert_eq!(reply, Reply::NotFound);

        let reply = route(&ctx, &info(&Method::Post, "/debian/dists/jammy/Release", &remote, None));
        assert_eq!(reply, Reply::MethodNotAllowed);
    }

    #[test]
    fn test_guarded_repo_denies_then_throttles() {
        let temp = repo();
        let ctx = guarded(temp.path());
        let remote: SocketAddr = REMOTE.parse().unwrap();
        let url = "/debian/dists/jammy/Release";
        let good = format!("Basic {}", STANDARD.encode("apt:hunter2"));

        let reply = route(&ctx, &info(&Method::Get, url, &remote, Some(&good)));
        assert!(matches!(reply, Reply::File(_)));

        for _ in 0..5 {
            assert_eq!(route(&ctx, &info(&Method::Get, url, &remote, None)), Reply::Unauthorized);
        }
        assert_eq!(
            route(&ctx, &info(&Method::Get, url, &remote, Some(&good))),
            Reply::Throttled
        );

        // Another client is unaffected.
        let other: SocketAddr = "192.0.2.8:51000".parse().unwrap();
        let reply = route(&ctx, &info(&Method::Get, url, &other, Some(&good)));
        assert!(matches!(reply, Reply::File(_)));
    }

    #[test]
    fn test_auth_checked_before_method_and_path() {
        let temp = repo();
        let ctx = guarded(temp.path());
        let remote: SocketAddr = REMOTE.parse().unwrap();
        assert_eq!(
            route(&ctx, &info(&Method::Post, "/missing", &remote, None)),
            Reply::Unauthorized
        );
    }

    #[test]
    fn test_shutting_down_is_unavailable() {
        let temp = repo();
        let ctx = open(temp.path());
        ctx.shutdown.trigger();
        let remote: SocketAddr = REMOTE.parse().unwrap();
        assert_eq!(
            route(&ctx, &info(&Method::Get, "/debian/dists/jammy/Release", &remote, None)),
            Reply::Unavailable
        );
    }

    fn http_get(addr: SocketAddr, path: &str, authorization: Option<&str>) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let auth = authorization
            .map(|value| format!("Authorization: {value}\r\n"))
            .unwrap_or_default();
        write!(
            stream,
            "GET {path} HTTP/1.1\r\nHost: localhost\r\n{auth}Connection: close\r\n\r\n"
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_server_end_to_end() {
        let temp = repo();
        let ctx = Arc::new(guarded(temp.path()));
        let shutdown = ctx.shutdown.clone();

        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        shutdown.register_server(Arc::clone(&server));
        let bound = BoundServer { server };
        let handle = std::thread::spawn(move || bound.run(ctx, 2));

        let denied = http_get(addr, "/debian/dists/jammy/Release", None);
        assert!(denied.starts_with("HTTP/1.1 401"));
        assert!(denied.contains("WWW-Authenticate: Basic realm=\"Restricted\""));

        let good = format!("Basic {}", STANDARD.encode("apt:hunter2"));
        let ok = http_get(addr, "/debian/dists/jammy/Release", Some(&good));
        assert!(ok.starts_with("HTTP/1.1 200"));
        assert!(ok.ends_with("Suite: jammy\n"));

        let missing = http_get(addr, "/debian/dists/jammy/InRelease", Some(&good));
        assert!(missing.starts_with("HTTP/1.1 404"));

        shutdown.trigger();
        handle.join().unwrap().unwrap();
    }
}
