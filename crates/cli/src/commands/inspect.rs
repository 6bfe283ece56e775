use relay_core::{
    cache::{policy::PolicyTable, ttl::TtlResolver, urn::urn},
    types::{JsonRpcRequest, JsonRpcResponse},
};
use serde_json::Value;

use super::utils::{CliError, CliResult};

/// Parses and validates a single JSON-RPC request.
pub fn parse_request(raw: &str) -> CliResult<JsonRpcRequest> {
    let value: Value = serde_json::from_str(raw)?;
    if value.is_array() {
        return Err(CliError::Input("expected a single request, got a batch".to_string()));
    }
    let request: JsonRpcRequest = serde_json::from_value(value)?;
    request.validate().map_err(|e| CliError::Input(e.to_string()))?;
    Ok(request)
}

/// Accepts either a full response envelope or a bare `result` value.
pub fn parse_response(raw: &str) -> CliResult<JsonRpcResponse> {
    let value: Value = serde_json::from_str(raw)?;
    let is_envelope = value.get("jsonrpc").is_some()
        && (value.get("result").is_some() || value.get("error").is_some());
    if is_envelope {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(JsonRpcResponse::success(value, None))
    }
}

pub fn describe_urn(request: &JsonRpcRequest) -> String {
    let urn = urn(request);
    format!(
        "urn:       {}\nnamespace: {}\napi:       {}\nmethod:    {}\n",
        urn.as_str(),
        urn.namespace(),
        urn.api().unwrap_or("-"),
        urn.method()
    )
}

pub fn describe_ttl(
    table: PolicyTable,
    request: &JsonRpcRequest,
    last_irreversible_block_num: u64,
    response: Option<&JsonRpcResponse>,
) -> String {
    let urn = urn(request);
    let resolver = TtlResolver::new(table);
    let policies = resolver.policies();
    let matched = policies.longest_prefix(urn.as_str());
    let ttl = resolver.ttl_for(&urn, last_irreversible_block_num, response);

    let prefix = if matched.prefix.is_empty() { "(default)" } else { matched.prefix };
    format!(
        "urn:      {}\nprefix:   {prefix}\npolicy:   {}\nttl:      {ttl}\ndecision: {:?}\n",
        urn.as_str(),
        matched.ttl,
        ttl.cache_decision()
    )
}
