//! Canonical request identity ("URN") used as cache key and policy lookup input.
//!
//! A URN is built from up to four dot-separated segments:
//!
//! ```text
//! namespace . api . method . params=<canonical json>
//!   steemd  . database_api . get_block . params=[1000]
//!   appbase . condenser_api . get_block . params=[1000]
//!   jsonrpc . get_methods
//! ```
//!
//! Shorter URNs are string prefixes of longer ones for the same method, so a policy table
//! can target a whole namespace, one api, one method, or one fully parameterised call.
//!
//! # Method name forms
//!
//! | Request `method`              | namespace | api            | method   |
//! |-------------------------------|-----------|----------------|----------|
//! | `get_block`                   | `steemd`  | `database_api` | `get_block` |
//! | `condenser_api.get_block`     | `appbase` | `condenser_api`| `get_block` |
//! | `call` + `[api, method, args]`| `steemd` or `appbase` | `api` | `method` |
//! | `steemd.get_block`            | `steemd`  | `database_api` | `get_block` |
//! | `jsonrpc.get_methods`         | `jsonrpc` | -              | `get_methods` |
//! | `hivemind.bridge.get_post`    | `hivemind`| `bridge`       | `get_post` |

use crate::{types::JsonRpcRequest, utils::write_canonical};
use serde_json::Value;
use std::fmt;

/// Namespace for bare and dotted methods that do not name one.
pub const DEFAULT_NAMESPACE: &str = "steemd";

/// Namespace for `<something>_api.<method>` calls.
pub const APPBASE_NAMESPACE: &str = "appbase";

/// Api assumed for bare `steemd` methods.
pub const DEFAULT_API: &str = "database_api";

const CONDENSER_API: &str = "condenser_api";

/// Segment separator, also the boundary used by policy prefix matching.
pub const SEPARATOR: char = '.';

/// A canonical, deterministic identity for a single JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn {
    namespace: String,
    api: Option<String>,
    method: String,
    rendered: String,
}

impl Urn {
    /// The full URN string, usable as a cache key.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn api(&self) -> Option<&str> {
        self.api.as_deref()
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.rendered
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl AsRef<str> for Urn {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

struct Parts<'a> {
    namespace: &'a str,
    api: Option<&'a str>,
    method: &'a str,
    params: Option<&'a Value>,
}

/// Derives the URN of a single request.
///
/// Never fails: every request with a method name produces a URN. A missing `method` is
/// rejected by envelope validation before this is called.
///
/// # Example
///
/// ```
/// use relay_core::{cache::urn::urn, types::JsonRpcRequest};
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("get_block", Some(json!([1000])), Some(json!(1)));
/// assert_eq!(urn(&request).as_str(), "steemd.database_api.get_block.params=[1000]");
///
/// let request = JsonRpcRequest::new("condenser_api.get_block", Some(json!([1000])), None);
/// assert_eq!(urn(&request).as_str(), "appbase.condenser_api.get_block.params=[1000]");
/// ```
#[must_use]
pub fn urn(request: &JsonRpcRequest) -> Urn {
    let parts = parse(&request.method, request.params.as_ref());

    let mut rendered = String::with_capacity(request.method.len() + 48);
    rendered.push_str(parts.namespace);
    if let Some(api) = parts.api {
        rendered.push(SEPARATOR);
        rendered.push_str(api);
    }
    rendered.push(SEPARATOR);
    rendered.push_str(parts.method);
    if let Some(params) = parts.params {
        rendered.push(SEPARATOR);
        rendered.push_str("params=");
        write_canonical(params, &mut rendered);
    }

    Urn {
        namespace: parts.namespace.to_string(),
        api: parts.api.map(str::to_string),
        method: parts.method.to_string(),
        rendered,
    }
}

fn parse<'a>(method: &'a str, params: Option<&'a Value>) -> Parts<'a> {
    if method == "call" {
        if let Some(parts) = parse_call(params) {
            return parts;
        }
    }

    let segments: Vec<&str> = method.split(SEPARATOR).collect();
    match *segments.as_slice() {
        [bare] => {
            Parts { namespace: DEFAULT_NAMESPACE, api: Some(DEFAULT_API), method: bare, params }
        }
        [api, name] if api.ends_with("_api") => {
            Parts { namespace: APPBASE_NAMESPACE, api: Some(api), method: name, params }
        }
        [namespace, name] => {
            let api = (namespace == DEFAULT_NAMESPACE).then_some(DEFAULT_API);
            Parts { namespace, api, method: name, params }
        }
        [namespace, api, name] => Parts { namespace, api: Some(api), method: name, params },
        _ => {
            // More than three segments: first is the namespace, last is the method, the
            // middle is kept verbatim as the api so nothing is lost from the identity.
            let namespace = segments.first().copied().unwrap_or(method);
            let name = segments.last().copied().unwrap_or(method);
            let api_start = namespace.len() + 1;
            let api_end = method.len().saturating_sub(name.len() + 1);
            let api = method.get(api_start..api_end);
            Parts { namespace, api, method: name, params }
        }
    }
}

/// `call` requests carry the real target in their params: `[api, method, args]`.
fn parse_call(params: Option<&Value>) -> Option<Parts<'_>> {
    let items = params?.as_array()?;
    let api = items.first()?.as_str()?;
    let method = items.get(1)?.as_str()?;
    let args = items.get(2);

    let namespace = if api == CONDENSER_API || args.is_some_and(Value::is_object) {
        APPBASE_NAMESPACE
    } else {
        DEFAULT_NAMESPACE
    };

    Some(Parts { namespace, api: Some(api), method, params: args })
}
