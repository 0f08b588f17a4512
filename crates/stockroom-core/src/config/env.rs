use super::{Config, Secret};

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_index();
        self.apply_env_overrides_gateway();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("STOCKROOM_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("STOCKROOM_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("STOCKROOM_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("STOCKROOM_LLM_MAX_TOKENS") {
            if let Ok(tokens) = v.parse::<u32>() {
                self.llm.max_tokens = tokens;
            } else {
                tracing::warn!("ignoring invalid STOCKROOM_LLM_MAX_TOKENS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("STOCKROOM_OPENAI_API_KEY")
            && !v.trim().is_empty()
        {
            self.secrets.openai_api_key = Some(Secret::new(v));
        }
        if let Ok(v) = std::env::var("STOCKROOM_SQLITE_PATH") {
            self.catalog.sqlite_path = v;
        }
    }

    fn apply_env_overrides_index(&mut self) {
        if let Ok(v) = std::env::var("STOCKROOM_INDEX_BATCH_SIZE") {
            match v.parse::<usize>() {
                Ok(size) if size > 0 => self.index.batch_size = size,
                _ => tracing::warn!("ignoring invalid STOCKROOM_INDEX_BATCH_SIZE value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("STOCKROOM_INDEX_MAX_CONCURRENT_BATCHES") {
            match v.parse::<usize>() {
                Ok(n) if n > 0 => self.index.max_concurrent_batches = n,
                _ => tracing::warn!(
                    "ignoring invalid STOCKROOM_INDEX_MAX_CONCURRENT_BATCHES value: {v}"
                ),
            }
        }
        if let Ok(v) = std::env::var("STOCKROOM_INDEX_TOP_K") {
            match v.parse::<usize>() {
                Ok(k) => self.index.top_k = k,
                Err(_) => tracing::warn!("ignoring invalid STOCKROOM_INDEX_TOP_K value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("STOCKROOM_INDEX_MAX_TOP_K") {
            match v.parse::<usize>() {
                Ok(k) => self.index.max_top_k = k,
                Err(_) => tracing::warn!("ignoring invalid STOCKROOM_INDEX_MAX_TOP_K value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("STOCKROOM_INDEX_REFRESH_ON_STARTUP") {
            match v.parse::<bool>() {
                Ok(enabled) => self.index.refresh_on_startup = enabled,
                Err(_) => tracing::warn!(
                    "ignoring invalid STOCKROOM_INDEX_REFRESH_ON_STARTUP value: {v}"
                ),
            }
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("STOCKROOM_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("STOCKROOM_GATEWAY_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.gateway.port = port;
            } else {
                tracing::warn!("ignoring invalid STOCKROOM_GATEWAY_PORT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("STOCKROOM_GATEWAY_MAX_BODY_SIZE") {
            match v.parse::<usize>() {
                Ok(size) => self.gateway.max_body_size = size,
                Err(_) => tracing::warn!(
                    "ignoring invalid STOCKROOM_GATEWAY_MAX_BODY_SIZE value: {v}"
                ),
            }
        }
    }
}
