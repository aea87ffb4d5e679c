use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(app) = expect_optional_object(root, "app")? {
        validate_u64_field(
            app,
            "app.max_input_length",
            "max_input_length",
            1,
            1_000_000,
        )?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(providers) = expect_optional_object(root, "providers")? {
        validate_u64_field(
            providers,
            "providers.request_timeout_secs",
            "request_timeout_secs",
            1,
            3_600,
        )?;
        for name in ["llm", "embedding", "rerank", "vector"] {
            let Some(section) = expect_optional_object(providers, name)? else {
                continue;
            };
            let prefix = format!("providers.{}", name);
            validate_optional_string_field(section, &format!("{}.base_url", prefix), "base_url")?;
            validate_optional_string_field(section, &format!("{}.api_key", prefix), "api_key")?;
        }
        if let Some(embedding) = expect_optional_object(providers, "embedding")? {
            validate_u64_field(
                embedding,
                "providers.embedding.dimensions",
                "dimensions",
                1,
                16_384,
            )?;
        }
    }

    if let Some(guardrail) = expect_optional_object(root, "guardrail")? {
        validate_u64_field(
            guardrail,
            "guardrail.confidence_threshold",
            "confidence_threshold",
            1,
            10,
        )?;
        validate_f64_field(
            guardrail,
            "guardrail.similarity_threshold",
            "similarity_threshold",
            -1.0,
            1.0,
        )?;
        validate_optional_string_field(
            guardrail,
            "guardrail.domain_description",
            "domain_description",
        )?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        for key in [
            "total_candidates",
            "case_study_limit",
            "white_paper_limit",
            "case_study_rerank_top",
            "white_paper_rerank_top",
        ] {
            validate_u64_field(retrieval, &format!("retrieval.{}", key), key, 0, 1_000)?;
        }
    }

    if let Some(generation) = expect_optional_object(root, "generation")? {
        validate_u64_field(generation, "generation.max_steps", "max_steps", 1, 20)?;
    }

    if let Some(rate_limit) = expect_optional_object(root, "rate_limit")? {
        validate_u64_field(rate_limit, "rate_limit.requests", "requests", 1, 1_000_000)?;
        validate_u64_field(
            rate_limit,
            "rate_limit.window_ms",
            "window_ms",
            1,
            86_400_000,
        )?;
        validate_u64_field(
            rate_limit,
            "rate_limit.sweep_interval_ms",
            "sweep_interval_ms",
            1,
            86_400_000,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_document() {
        assert!(validate_config(&json!({})).is_ok());
    }

    #[test]
    fn rejects_confidence_outside_scale() {
        let err = validate_config(&json!({ "guardrail": { "confidence_threshold": 11 } }))
            .expect_err("11 is outside 1-10");
        assert!(err.to_string().contains("guardrail.confidence_threshold"));
    }

    #[test]
    fn rejects_non_numeric_similarity_threshold() {
        let err = validate_config(&json!({ "guardrail": { "similarity_threshold": "high" } }))
            .expect_err("string threshold");
        assert!(err.to_string().contains("expected number"));
    }

    #[test]
    fn rejects_zero_rate_limit_window() {
        assert!(validate_config(&json!({ "rate_limit": { "window_ms": 0 } })).is_err());
    }

    #[test]
    fn rejects_blank_cors_origin() {
        let err = validate_config(&json!({
            "server": { "cors_allowed_origins": ["http://localhost:3000", " "] }
        }))
        .expect_err("blank origin");
        assert!(err.to_string().contains("server.cors_allowed_origins[1]"));
    }
}
