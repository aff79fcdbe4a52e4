/// Process configuration, read from the environment once at startup.
///
/// All three services share this shape; each reads only the fields it
/// needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub scylla_hosts: Vec<String>,
    pub keyspace: String,
    pub kafka_brokers: Vec<String>,
    pub topic: String,
    pub redis_addr: String,
    pub jwt_secret: String,
    /// Snowflake node id for this gateway instance. Must be unique per
    /// instance in production deployments.
    pub node_id: i64,
    pub gateway_bind: String,
    pub api_bind: String,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = env_or("JWT_SECRET", default_jwt_secret());
        if jwt_secret == default_jwt_secret() {
            tracing::warn!("JWT_SECRET not set; using the built-in development secret");
        }
        Self {
            scylla_hosts: split_hosts(&env_or("SCYLLA_HOSTS", default_scylla_hosts())),
            keyspace: env_or("SCYLLA_KEYSPACE", default_keyspace()),
            kafka_brokers: split_hosts(&env_or("KAFKA_BROKERS", default_kafka_brokers())),
            topic: env_or("KAFKA_TOPIC", default_topic()),
            redis_addr: env_or("REDIS_ADDR", default_redis_addr()),
            jwt_secret,
            node_id: env_parse("GATEWAY_NODE_ID", 1),
            gateway_bind: env_or("GATEWAY_BIND", default_gateway_bind()),
            api_bind: env_or("API_BIND", default_api_bind()),
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn env_parse(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(value) => match value.trim().parse::<i64>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("ignoring unparsable {name} value '{value}'");
                default
            }
        },
        Err(_) => default,
    }
}

fn split_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_scylla_hosts() -> String {
    "localhost:9042".into()
}
fn default_keyspace() -> String {
    "chat".into()
}
fn default_kafka_brokers() -> String {
    "localhost:19092".into()
}
fn default_topic() -> String {
    "chat-messages".into()
}
fn default_redis_addr() -> String {
    "localhost:6379".into()
}
fn default_jwt_secret() -> String {
    "tidings-dev-secret".into()
}
fn default_gateway_bind() -> String {
    "0.0.0.0:8080".into()
}
fn default_api_bind() -> String {
    "0.0.0.0:8081".into()
}

#[cfg(test)]
mod tests {
    use super::split_hosts;

    #[test]
    fn host_lists_split_and_trim() {
        assert_eq!(
            split_hosts("a:9042, b:9042 ,,c:9042"),
            vec!["a:9042", "b:9042", "c:9042"]
        );
        assert_eq!(split_hosts("localhost:19092"), vec!["localhost:19092"]);
    }
}
