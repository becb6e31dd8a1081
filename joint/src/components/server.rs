//! Line-oriented request handler over the store.
//!
//! The server is the top-level operator of the demo: it resolves every
//! authenticator and the store during its run phase, joins itself under
//! [`SERVER_KEY`], and `main` pulls it back out to serve requests.
//!
//! # Request format
//!
//! ```text
//! <token> <VERB> [KEY [VALUE...]]
//!
//! -     PING
//! t-1   GET greeting
//! t-1   PUT greeting hello world
//! t-1   DEL greeting
//! t-1   KEYS
//! t-1   WHOAMI
//! ```
//!
//! `-` is the anonymous token; only `PING` accepts it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use joint_common::options::Options;
use joint_runtime::logging::LOGGER_KEY;
use joint_runtime::{
    BoxError, Close, Context, InterfaceKey, Joinable, Logger, RegistryView, Starter, StarterError,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::auth::{AUTH_KEY, Authenticator, Identity};
use super::store::{DataStore, STORE_KEY};

/// Well-known key of the request server.
pub const SERVER_KEY: InterfaceKey = InterfaceKey::from_static("server");

/// Anonymous token.
pub const ANONYMOUS: &str = "-";

/// Parsed request verb and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    WhoAmI,
    Get(String),
    Put(String, String),
    Del(String),
    Keys,
}

impl Command {
    fn writes(&self) -> bool {
        matches!(self, Command::Put(..) | Command::Del(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub token: Option<String>,
    pub command: Command,
}

impl Request {
    /// Parse one request line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let token = match words.next() {
            Some(ANONYMOUS) => None,
            Some(token) => Some(token.to_string()),
            None => return Err("empty request".to_string()),
        };
        let verb = words
            .next()
            .ok_or_else(|| "missing verb".to_string())?
            .to_ascii_uppercase();
        let key = |k: Option<&str>| {
            k.map(str::to_string)
                .ok_or_else(|| format!("{verb} needs a key"))
        };

        let command = match verb.as_str() {
            "PING" => Command::Ping,
            "WHOAMI" => Command::WhoAmI,
            "KEYS" => Command::Keys,
            "GET" => Command::Get(key(words.next())?),
            "DEL" => Command::Del(key(words.next())?),
            "PUT" => {
                let k = key(words.next())?;
                let value = words.collect::<Vec<_>>().join(" ");
                if value.is_empty() {
                    return Err("PUT needs a value".to_string());
                }
                Command::Put(k, value)
            }
            other => return Err(format!("unknown verb '{other}'")),
        };
        Ok(Self { token, command })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok(Option<String>),
    NotFound,
    Denied,
    ReadOnly,
    BadRequest(String),
    Unavailable,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok(Some(body)) => write!(f, "OK {body}"),
            Response::Ok(None) => f.write_str("OK"),
            Response::NotFound => f.write_str("NOT_FOUND"),
            Response::Denied => f.write_str("DENIED"),
            Response::ReadOnly => f.write_str("READ_ONLY"),
            Response::BadRequest(reason) => write!(f, "ERR {reason}"),
            Response::Unavailable => f.write_str("UNAVAILABLE"),
        }
    }
}

/// Request handler bound to one store and every active authenticator.
pub struct Server {
    store: Arc<dyn DataStore>,
    authenticators: Vec<(InterfaceKey, Arc<dyn Authenticator>)>,
    logger: Logger,
    read_only: bool,
    served: AtomicU64,
    closed: AtomicBool,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backends: Vec<&str> = self.authenticators.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Server")
            .field("authenticators", &backends)
            .field("read_only", &self.read_only)
            .field("served", &self.served.load(Ordering::Relaxed))
            .finish()
    }
}

impl Server {
    pub fn new(
        store: Arc<dyn DataStore>,
        authenticators: Vec<(InterfaceKey, Arc<dyn Authenticator>)>,
        logger: Logger,
        read_only: bool,
    ) -> Self {
        Self {
            store,
            authenticators,
            logger,
            read_only,
            served: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Keys of the authenticators this server consults, in join order.
    pub fn authenticators(&self) -> Vec<&str> {
        self.authenticators.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// First authenticator, in join order, that accepts `token`.
    fn identify(&self, token: &str) -> Option<Identity> {
        self.authenticators
            .iter()
            .find_map(|(_, auth)| auth.authenticate(token))
    }

    pub fn handle(&self, request: &Request) -> Response {
        if self.closed.load(Ordering::SeqCst) {
            return Response::Unavailable;
        }
        let _entered = self.logger.enter();
        self.served.fetch_add(1, Ordering::Relaxed);

        if request.command == Command::Ping {
            return Response::Ok(Some("PONG".to_string()));
        }
        let Some(identity) = request.token.as_deref().and_then(|t| self.identify(t)) else {
            debug!(command = ?request.command, "request denied");
            return Response::Denied;
        };
        if self.read_only && request.command.writes() {
            return Response::ReadOnly;
        }

        match &request.command {
            Command::Ping => Response::Ok(Some("PONG".to_string())),
            Command::WhoAmI => Response::Ok(Some(format!("{}@{}", identity.user, identity.backend))),
            Command::Get(key) => self.store.get(key).map_or(Response::NotFound, |v| Response::Ok(Some(v))),
            Command::Put(key, value) => {
                self.store.put(key, value.clone());
                Response::Ok(None)
            }
            Command::Del(key) => self
                .store
                .remove(key)
                .map_or(Response::NotFound, |_| Response::Ok(None)),
            Command::Keys => Response::Ok(Some(self.store.keys().join(" "))),
        }
    }

    /// Parse and handle one line.
    pub fn handle_line(&self, line: &str) -> Response {
        match Request::parse(line) {
            Ok(request) => self.handle(&request),
            Err(reason) => Response::BadRequest(reason),
        }
    }
}

impl Close for Server {
    fn close(&self) -> Result<(), BoxError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            warn!("server closed twice");
        }
        info!(served = self.served(), "server stopped accepting requests");
        Ok(())
    }
}

// ─── Starter ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerSection {
    #[serde(default)]
    read_only: bool,
}

/// Starter for [`Server`].
///
/// Options: `store_key` (default [`STORE_KEY`]), `read_only` (overrides
/// `[server] read_only`), `interface_key` (default [`SERVER_KEY`]).
#[derive(Debug)]
pub struct ServerStarter {
    store_key: InterfaceKey,
    read_only: bool,
    interface_key: InterfaceKey,
}

pub fn starter() -> ServerStarter {
    ServerStarter {
        store_key: STORE_KEY,
        read_only: false,
        interface_key: SERVER_KEY,
    }
}

impl Starter for ServerStarter {
    fn name(&self) -> &str {
        "server"
    }

    fn init(&mut self, ctx: &Context<'_>, options: &Options) -> Result<Vec<Options>, StarterError> {
        let section: ServerSection = ctx.config.section("server")?.unwrap_or_default();
        self.read_only = options.bool("read_only").unwrap_or(section.read_only);
        self.store_key = options
            .string("store_key")
            .map(InterfaceKey::from)
            .unwrap_or(STORE_KEY);
        self.interface_key = options
            .string("interface_key")
            .map(InterfaceKey::from)
            .unwrap_or(SERVER_KEY);
        Ok(Vec::new())
    }

    fn run(&mut self, ctx: &Context<'_>, registry: &RegistryView<'_>) -> Result<(), StarterError> {
        let authenticators = registry.interfaces_all::<dyn Authenticator>();
        if authenticators.is_empty() {
            return Err(StarterError::DependencyMissing {
                key: AUTH_KEY,
                capability: std::any::type_name::<dyn Authenticator>(),
            });
        }
        let store = registry.require::<dyn DataStore>(&self.store_key)?;
        let logger = registry
            .interface::<Logger>(LOGGER_KEY)?
            .map(|logger| logger.component("server"))
            .unwrap_or_else(|| ctx.logger.clone());

        let server = Arc::new(Server::new(store, authenticators, logger, self.read_only));
        registry.join(
            Joinable::new(server.clone()).with_close(server.clone()),
            self.interface_key.clone(),
        )?;
        info!(
            key = %self.interface_key,
            authenticators = ?server.authenticators(),
            read_only = self.read_only,
            "server joined"
        );
        Ok(())
    }
}
