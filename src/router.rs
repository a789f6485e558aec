//! URI-based routing with method dispatch and middleware composition.
//!
//! Routes are registered against URI patterns whose segments are
//! literals, `:name` parameters, or a single trailing `*` wildcard.
//! Dispatch prefers exact matches over parameter matches over wildcard
//! matches; within a tier, first registration wins. The middleware
//! chain wraps every outcome - matched handlers, synthesized `OPTIONS`
//! responses, and 404/405 fallbacks alike - so cross-cutting layers see
//! all traffic.

use crate::errors::RouterError;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::StatusCode;
use crate::http::uri::{Uri, UriMatch};
use crate::io::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// A request handler.
///
/// Implemented by any `Fn(&Request, &mut Response) -> BoxFuture<()>`;
/// plain `fn` items coerce directly:
///
/// ```
/// use wharf::{BoxFuture, Request, Response, Router};
///
/// fn ping<'a>(_req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
///     Box::pin(async move { res.set_body("pong") })
/// }
///
/// let mut router = Router::new();
/// router.route("/ping", ping).unwrap();
/// ```
///
/// A handler may advertise the methods it serves via
/// [`allowed_methods`](Handler::allowed_methods); registration then
/// binds it per method instead of making it the pattern's catch-all.
/// Use the [`methods`] constructors rather than implementing that by
/// hand.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()>;

    /// Methods this handler is constrained to, or `None` for any.
    fn allowed_methods(&self) -> Option<Vec<String>> {
        None
    }
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a Request, &'a mut Response) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
        self(req, res)
    }
}

/// Wraps a handler with an explicit method list.
///
/// Built by the [`methods`] constructors; `methods::get(h)` binds `h`
/// to `GET` only, and [`MethodHandler::with_methods`] covers
/// multi-method bindings.
pub struct MethodHandler<H> {
    methods: Vec<String>,
    inner: H,
}

impl<H: Handler> MethodHandler<H> {
    pub fn with_methods(methods: &[&str], inner: H) -> Self {
        Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            inner,
        }
    }
}

impl<H: Handler> Handler for MethodHandler<H> {
    fn call<'a>(&'a self, req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
        self.inner.call(req, res)
    }

    fn allowed_methods(&self) -> Option<Vec<String>> {
        Some(self.methods.clone())
    }
}

/// Method-constrained handler constructors.
pub mod methods {
    use super::{Handler, MethodHandler};

    macro_rules! method_fns {
        ($($(#[$docs:meta])* $name:ident => $method:literal;)+) => {
            $(
                $(#[$docs])*
                pub fn $name<H: Handler>(handler: H) -> MethodHandler<H> {
                    MethodHandler::with_methods(&[$method], handler)
                }
            )+
        }
    }

    method_fns! {
        get => "GET";
        post => "POST";
        put => "PUT";
        delete => "DELETE";
        patch => "PATCH";
        head => "HEAD";
        options => "OPTIONS";
    }
}

/// A middleware layer.
///
/// Receives the request, the response, and [`Next`]; awaiting
/// `next.run(req, res)` descends toward the handler, and work on either
/// side of that await runs before/after the inner layers.
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, ()>;
}

impl<F> Middleware for F
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response, Next<'a>) -> BoxFuture<'a, ()>
        + Send
        + Sync
        + 'static,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut Request,
        res: &'a mut Response,
        next: Next<'a>,
    ) -> BoxFuture<'a, ()> {
        self(req, res, next)
    }
}

/// Advances the middleware chain; the innermost call invokes the
/// dispatched endpoint.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a Endpoint<'a>,
}

impl<'a> Next<'a> {
    pub fn run(self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match self.chain.split_first() {
                Some((middleware, rest)) => {
                    let next = Next {
                        chain: rest,
                        endpoint: self.endpoint,
                    };
                    middleware.handle(req, res, next).await;
                }
                None => self.endpoint.invoke(req, res).await,
            }
        })
    }
}

/// What dispatch resolved to, run at the center of the onion.
enum Endpoint<'r> {
    Handler(&'r dyn Handler),
    /// Synthesized `OPTIONS` response carrying the `Allow` value.
    Options(String),
    Status(StatusCode),
}

impl Endpoint<'_> {
    async fn invoke(&self, req: &mut Request, res: &mut Response) {
        match self {
            Endpoint::Handler(handler) => handler.call(req, res).await,
            Endpoint::Options(allow) => {
                res.status = StatusCode::OK;
                res.headers.set("Allow", allow.clone());
            }
            Endpoint::Status(status) => res.status = *status,
        }
    }
}

/// One registered pattern with its method bindings.
struct HandlerPath {
    pattern: Uri,
    method_handlers: HashMap<String, Arc<dyn Handler>>,
    global_handler: Option<Arc<dyn Handler>>,
}

/// The routing table.
///
/// Built once at startup, then shared read-only across connections
/// (`Arc<Router>`); no locking happens on the dispatch path.
///
/// # Examples
/// ```
/// use wharf::{methods, BoxFuture, Request, Response, Router};
///
/// fn list<'a>(_: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
///     Box::pin(async move { res.set_body("[]") })
/// }
/// fn show<'a>(req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
///     Box::pin(async move {
///         res.set_body(format!("user {}", req.path_param("id").unwrap()));
///     })
/// }
///
/// let mut router = Router::new();
/// router.route("/users", methods::get(list)).unwrap();
/// router.route("/users/:id", methods::get(show)).unwrap();
/// ```
#[derive(Default)]
pub struct Router {
    handlers: Vec<HandlerPath>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` at `pattern`.
    ///
    /// The pattern must parse as a URI and carry no query string. A
    /// handler advertising [`allowed_methods`](Handler::allowed_methods)
    /// is bound to each listed method; otherwise it becomes the
    /// pattern's catch-all for any method.
    ///
    /// # Errors
    ///
    /// [`RouterError::InvalidUri`] for unparseable patterns;
    /// [`RouterError::Collision`] when the registration overlaps an
    /// existing one (same method, or two catch-alls, at patterns that
    /// FULL_MATCH each other). Registration errors are meant to be
    /// fatal at startup.
    pub fn route(
        &mut self,
        pattern: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, RouterError> {
        let uri = Uri::parse(pattern)
            .filter(|uri| uri.query().is_empty())
            .ok_or_else(|| RouterError::InvalidUri(pattern.to_string()))?;

        let methods = handler.allowed_methods();

        for existing in &self.handlers {
            // Wildcard patterns classify as WILD_MATCH even against
            // themselves, so equal paths are checked explicitly.
            let overlaps = existing.pattern.matches(&uri) == UriMatch::FullMatch
                || existing.pattern.paths() == uri.paths();
            if !overlaps {
                continue;
            }
            let conflicts = match &methods {
                Some(methods) => methods
                    .iter()
                    .any(|m| existing.method_handlers.contains_key(m)),
                None => existing.global_handler.is_some(),
            };
            if conflicts {
                return Err(RouterError::Collision {
                    new: uri,
                    existing: existing.pattern.clone(),
                });
            }
        }

        let handler: Arc<dyn Handler> = Arc::new(handler);
        let slot = match self
            .handlers
            .iter_mut()
            .find(|h| h.pattern.paths() == uri.paths())
        {
            Some(slot) => slot,
            None => {
                self.handlers.push(HandlerPath {
                    pattern: uri,
                    method_handlers: HashMap::new(),
                    global_handler: None,
                });
                self.handlers.last_mut().unwrap()
            }
        };

        match methods {
            Some(methods) => {
                for method in methods {
                    slot.method_handlers.insert(method, handler.clone());
                }
            }
            None => slot.global_handler = Some(handler),
        }

        Ok(self)
    }

    /// Appends a middleware layer. The first `wrap` is the outermost.
    pub fn wrap(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Dispatches one request.
    ///
    /// Picks the best-matching pattern (exact > parameter > wildcard,
    /// first registration breaking ties), populates `path_params` and
    /// `wildcard_path` before any middleware runs, then drives the
    /// middleware chain down to the endpoint: the bound handler, the
    /// catch-all, a `GET` handler for a `HEAD` request (with the
    /// method rewritten to `GET`), a synthesized `OPTIONS` response,
    /// or a bare 404/405.
    pub async fn handle(&self, req: &mut Request, res: &mut Response) {
        let mut full = None;
        let mut param = None;
        let mut wild = None;

        for handler_path in &self.handlers {
            let slot = match handler_path.pattern.matches(&req.uri) {
                UriMatch::FullMatch => &mut full,
                UriMatch::ParamMatch => &mut param,
                UriMatch::WildMatch => &mut wild,
                UriMatch::NoMatch => continue,
            };
            if slot.is_none() {
                *slot = Some(handler_path);
            }
        }

        let mut method_not_allowed = false;
        let mut resolved: Option<(Endpoint<'_>, &HandlerPath)> = None;

        for handler_path in [full, param, wild].into_iter().flatten() {
            if let Some(handler) = handler_path.method_handlers.get(&req.method) {
                resolved = Some((Endpoint::Handler(handler.as_ref()), handler_path));
                break;
            }
            if let Some(handler) = &handler_path.global_handler {
                resolved = Some((Endpoint::Handler(handler.as_ref()), handler_path));
                break;
            }
            if req.method == "HEAD" {
                if let Some(handler) = handler_path.method_handlers.get("GET") {
                    req.method = "GET".to_string();
                    resolved = Some((Endpoint::Handler(handler.as_ref()), handler_path));
                    break;
                }
            }
            if req.method == "OPTIONS" {
                let allow = allow_header(handler_path);
                resolved = Some((Endpoint::Options(allow), handler_path));
                break;
            }
            method_not_allowed = true;
        }

        let endpoint = match resolved {
            Some((endpoint, handler_path)) => {
                populate_params(req, &handler_path.pattern);
                endpoint
            }
            None if method_not_allowed => Endpoint::Status(StatusCode::METHOD_NOT_ALLOWED),
            None => Endpoint::Status(StatusCode::NOT_FOUND),
        };

        let next = Next {
            chain: &self.middleware,
            endpoint: &endpoint,
        };
        next.run(req, res).await;
    }
}

/// Bound methods plus the always-answerable `OPTIONS` and `HEAD`,
/// sorted for a stable wire shape.
fn allow_header(handler_path: &HandlerPath) -> String {
    let mut methods: Vec<&str> = handler_path
        .method_handlers
        .keys()
        .map(String::as_str)
        .collect();
    for implied in ["OPTIONS", "HEAD"] {
        if !methods.contains(&implied) {
            methods.push(implied);
        }
    }
    methods.sort_unstable();
    methods.join(", ")
}

/// Walks the pattern alongside the request path: `:name` segments
/// capture, a trailing `*` swallows the remainder into
/// `wildcard_path`.
fn populate_params(req: &mut Request, pattern: &Uri) {
    let mut params = HashMap::new();
    let mut wildcard = String::new();

    for (index, segment) in pattern.paths().iter().enumerate() {
        if segment == "*" {
            wildcard = req.uri.paths()[index..].join("/");
            break;
        }
        if let Some(name) = segment.strip_prefix(':') {
            if let Some(value) = req.uri.paths().get(index) {
                params.insert(name.to_string(), value.clone());
            }
        }
    }

    req.path_params = params;
    req.wildcard_path = wildcard;
}
