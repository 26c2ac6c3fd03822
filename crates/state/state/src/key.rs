//! Key builders for the two cache namespaces the gateway uses.

/// Key for a cached JSON:API resource: `jsonapi:{type}:{id}`.
#[must_use]
pub fn jsonapi_key(kind: &str, id: &str) -> String {
    format!("jsonapi:{kind}:{id}")
}

/// Key for a rate-limit counter: `ratelimit:{routeId}:{principal}`.
#[must_use]
pub fn rate_limit_key(route_id: &str, principal: &str) -> String {
    format!("ratelimit:{route_id}:{principal}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats() {
        assert_eq!(jsonapi_key("users", "9"), "jsonapi:users:9");
        assert_eq!(rate_limit_key("col-orders", "u1"), "ratelimit:col-orders:u1");
    }
}
